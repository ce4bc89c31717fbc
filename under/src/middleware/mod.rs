//! Pre-defined middleware.
//!
//! This module defines a few middlewares that might be useful for a given HTTP
//! application.  Their use should be as simple as this:
//!
//! ```rust
//! # use under::*;
//! # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
//! let mut http = under::http();
//! http.at("/home").get(under::endpoints::simple(|| {
//!     Response::text("hello, there!")
//! }));
//! # Ok(())
//! # }
//! ```

mod cors;
#[cfg(feature = "cookie")]
mod cookies;
mod state;
mod trace;

#[cfg(feature = "cookie")]
pub use self::cookies::{CookieExt, CookieMiddleware};
pub use self::cors::{AllowedOrigin, CorsMiddleware};
pub use self::state::{State, StateMiddleware};
pub use self::trace::TraceMiddleware;

use crate::context::Context;
use crate::{Endpoint, Response};
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The peer address of the TCP connection a request arrived on, inserted as
/// a request extension by [`crate::router::service`] for every connection
/// accepted through [`crate::Router::listen`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress(pub std::net::SocketAddr);

/// The next item(s) in the middleware chain.
///
/// This borrows from the chain itself, and so the lifetime here exceeds the
/// lifetime of a single request (but is not `'static`).  It contains a
/// reference to the eventual endpoint, any remaining middleware, and a
/// frame-local "consumed" flag that enforces calling [`Next::apply`] at most
/// once per frame.
#[derive(Clone)]
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    endpoint: Pin<&'a dyn Endpoint>,
    consumed: Arc<AtomicBool>,
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.middleware.len())
            .finish()
    }
}

#[async_trait]
/// An HTTP request/response modifier.
///
/// This sits between the context and the endpoint, allowing custom functions
/// to mutate either before being passed on.  A typical middleware will take
/// the incoming [`Context`], potentially modify it, before calling
/// [`Next::apply`] with the modified context; then, take the resulting
/// [`Response`], potentially modifying it, before returning.  However, since
/// every layer of the chain is fallible, it must be able to handle errors.
pub trait Middleware: Debug + Send + Sync + 'static {
    #[must_use]
    /// Handles the given context, returning a response.  The next parameter
    /// contains the information on how to process everything after the
    /// current middleware, i.e. generating a response from the endpoint.
    async fn apply(
        self: Pin<&Self>,
        context: Context,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error>;
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a [Arc<dyn Middleware>], endpoint: Pin<&'a dyn Endpoint>) -> Self {
        Next {
            middleware,
            endpoint,
            consumed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// This causes all of the remaining middleware and endpoint to be run,
    /// from this point; i.e., if there is any remaining middleware, execute
    /// that (passing in a modified version of this struct); otherwise,
    /// execute the endpoint.
    ///
    /// It is valid behavior to not call this function; not calling this
    /// function means interrupting the chain, and none of the remaining
    /// middleware nor the endpoint will be run.  This could be useful for
    /// e.g. requiring authentication.
    ///
    /// # Errors
    /// Returns [`crate::UnderError::NextCalledTwice`] if this is the second
    /// time `apply` has been called for this frame.
    pub async fn apply(self, context: Context) -> Result<Response, anyhow::Error> {
        if self.consumed.swap(true, Ordering::SeqCst) {
            return Err(crate::UnderError::NextCalledTwice.into());
        }

        if let Some((current, rest)) = self.middleware.split_first() {
            let new = Next {
                middleware: rest,
                endpoint: self.endpoint,
                consumed: Arc::new(AtomicBool::new(false)),
            };
            current.as_ref().apply(context, new).await
        } else {
            self.endpoint.apply(context).await
        }
    }
}
