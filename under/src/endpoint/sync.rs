use std::pin::Pin;

use super::Endpoint;
use crate::context::Context;
use crate::response::{IntoResponse, Response};
use anyhow::Error;

pub(crate) struct SyncEndpoint<F>(pub(crate) F);

#[async_trait]
impl<F, Res> Endpoint for SyncEndpoint<F>
where
    F: Fn(Context) -> Res + Send + Sync + 'static,
    Res: IntoResponse + Send + 'static,
{
    async fn apply(self: Pin<&Self>, context: Context) -> Result<Response, Error> {
        let f = &self.0;
        f(context).into_response()
    }

    fn describe(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SyncEndpoint")
            .field(&std::any::type_name::<F>())
            .finish()
    }
}
