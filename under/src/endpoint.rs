mod sync;

use crate::context::Context;
use crate::response::IntoResponse;
use crate::Response;
use std::future::Future;
use std::pin::Pin;

pub(crate) use self::sync::SyncEndpoint;

#[async_trait]
#[doc(notable_trait)]
/// A terminal HTTP request handler.
///
/// This is automatically implemented for
/// `Fn(Context) -> impl Future<Output = impl IntoResponse>` types, but it may
/// be useful to implement this yourself.  Unlike [`crate::Middleware`], an
/// endpoint has no `next` continuation to call - it is always the last thing
/// that runs in a chain.
pub trait Endpoint: Send + Sync + 'static {
    #[must_use]
    /// Transforms the context into the response.  However, this may fail,
    /// and such a failure can be handled further up the chain.
    async fn apply(self: Pin<&Self>, context: Context) -> Result<Response, anyhow::Error>;

    /// Formats a short description of this endpoint, used for trace logging.
    /// Defaults to the type name.
    fn describe(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(std::any::type_name::<Self>())
    }
}

impl std::fmt::Debug for dyn Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.describe(f)
    }
}

#[async_trait]
impl<Res, F, Fut> Endpoint for F
where
    F: Fn(Context) -> Fut + Sync + Send + 'static,
    Fut: Future<Output = Res> + Send + 'static,
    Res: IntoResponse + Send + 'static,
{
    async fn apply(self: Pin<&Self>, context: Context) -> Result<Response, anyhow::Error> {
        self(context).await.into_response()
    }
}

/// Creates an endpoint that synchronously generates a response.
///
/// This does not spawn a blocking task; so any endpoint that uses this should
/// not block the task in its processing.  This is useful for endpoints that
/// quickly generate a response, or otherwise do not use futures.
pub fn sync<F, Res>(func: F) -> impl Endpoint
where
    F: Fn(Context) -> Res + Send + Sync + 'static,
    Res: IntoResponse + Send + 'static,
{
    self::sync::SyncEndpoint(func)
}

/// Creates an endpoint that infallibly, synchronously generates a fixed
/// response regardless of the request.
pub fn r#static<F>(func: F) -> impl Endpoint
where
    F: Fn() -> Response + Send + Sync + 'static,
{
    sync::<_, Result<Response, std::convert::Infallible>>(move |_| Ok(func()))
}
