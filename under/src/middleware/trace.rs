use std::fmt::Display;
use std::pin::Pin;

use super::{Middleware, Next};
use crate::context::Context;
use crate::Response;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// Logs a line before and after every request, with the matched method, path,
/// resulting status, and elapsed time.
pub struct TraceMiddleware;

impl TraceMiddleware {
    pub const fn new() -> Self {
        TraceMiddleware
    }
}

impl Default for TraceMiddleware {
    fn default() -> Self {
        TraceMiddleware
    }
}

#[async_trait]
impl Middleware for TraceMiddleware {
    async fn apply(
        self: Pin<&Self>,
        context: Context,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        let method = context.method().clone();
        let path = context.uri().path().to_string();
        log::info!("--> {} {}", method, path);
        let start = std::time::Instant::now();

        let result = next.apply(context).await;
        let elapse = start.elapsed();
        let status = StatusDisplay(&result);

        log::info!(
            "<-- {} {}: {} (in {}ms)",
            method,
            path,
            status,
            elapse.as_millis()
        );

        result
    }
}

struct StatusDisplay<'a>(&'a Result<Response, anyhow::Error>);

impl Display for StatusDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Ok(response) => write!(f, "{}", response.status()),
            Err(_) => write!(f, "(error)"),
        }
    }
}
