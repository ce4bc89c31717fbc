use std::pin::Pin;

use super::{Middleware, Next};
use crate::context::Context;
use crate::{HttpEntity, Response};

/// Which origins a [`CorsMiddleware`] accepts.
#[derive(Debug, Clone)]
pub enum AllowedOrigin {
    /// Accept any origin, answering with a literal `*`.
    Any,
    /// Accept only the listed origins, echoing the request's `Origin` back
    /// (and setting `Vary: Origin`, since the response then depends on it).
    Exact(Vec<String>),
}

impl AllowedOrigin {
    fn validate(&self, origin: &str) -> Option<String> {
        match self {
            AllowedOrigin::Any => Some("*".to_owned()),
            AllowedOrigin::Exact(origins) => origins
                .iter()
                .any(|allowed| allowed == origin)
                .then(|| origin.to_owned()),
        }
    }

    fn is_any(&self) -> bool {
        matches!(self, AllowedOrigin::Any)
    }
}

/// Adds CORS response headers, and answers preflight `OPTIONS` requests
/// directly.
///
/// A request with no `Origin` header is not a CORS request at all, and is
/// passed through untouched. A request whose `Origin` fails validation is
/// also passed through untouched - this middleware only ever adds headers
/// or answers preflight, it never rejects a request on the CORS policy
/// alone.
///
/// # Examples
/// ```rust
/// # use under::*;
/// let mut http = under::http();
/// http.with(under::middleware::CorsMiddleware::new(
///     under::middleware::AllowedOrigin::Any,
/// ).with_expose_headers(["X-Foo"]));
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    origin: AllowedOrigin,
    allowed_methods: Vec<http::Method>,
    allowed_headers: Vec<String>,
    expose_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<u32>,
}

impl CorsMiddleware {
    /// Creates a new middleware accepting the given origin policy, with no
    /// exposed headers, credentials support, or preflight caching, and a
    /// method/header allowlist of `*`.
    #[must_use]
    pub fn new(origin: AllowedOrigin) -> Self {
        CorsMiddleware {
            origin,
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: None,
        }
    }

    /// Restricts the methods advertised in a preflight response's
    /// `Access-Control-Allow-Methods` header. Defaults to empty, which
    /// advertises no methods to preflight requests (non-preflight requests
    /// are unaffected).
    #[must_use]
    pub fn with_methods<I: IntoIterator<Item = http::Method>>(mut self, methods: I) -> Self {
        self.allowed_methods = methods.into_iter().collect();
        self
    }

    /// Restricts the headers advertised in a preflight response's
    /// `Access-Control-Allow-Headers` header.
    #[must_use]
    pub fn with_headers<I, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `Access-Control-Expose-Headers` header on every
    /// CORS-eligible response.
    #[must_use]
    pub fn with_expose_headers<I, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets `Access-Control-Allow-Credentials: true`. A wildcard
    /// [`AllowedOrigin::Any`] combined with credentials is not meaningful
    /// per the CORS specification, but this is not validated here - callers
    /// constructing a middleware from untrusted configuration should check
    /// this themselves.
    #[must_use]
    pub fn with_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Sets the `Access-Control-Max-Age` header (in seconds) on preflight
    /// responses.
    #[must_use]
    pub fn with_max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn apply_common_headers(&self, response: &mut Response, origin: &str) -> Result<(), anyhow::Error> {
        response.headers_mut().insert(
            http::header::ACCESS_CONTROL_ALLOW_ORIGIN,
            http::HeaderValue::try_from(origin)?,
        );

        if !self.expose_headers.is_empty() {
            response.headers_mut().insert(
                http::header::ACCESS_CONTROL_EXPOSE_HEADERS,
                http::HeaderValue::try_from(self.expose_headers.join(", "))?,
            );
        }

        if self.allow_credentials {
            response.headers_mut().insert(
                http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                http::HeaderValue::from_static("true"),
            );
        }

        if !self.origin.is_any() {
            response
                .headers_mut()
                .append(http::header::VARY, http::HeaderValue::from_static("Origin"));
        }

        Ok(())
    }

    fn preflight_response(&self, origin: &str) -> Result<Response, anyhow::Error> {
        let mut response = Response::empty_204();
        self.apply_common_headers(&mut response, origin)?;

        if !self.allowed_methods.is_empty() {
            let methods = self
                .allowed_methods
                .iter()
                .map(http::Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            response.headers_mut().insert(
                http::header::ACCESS_CONTROL_ALLOW_METHODS,
                http::HeaderValue::try_from(methods)?,
            );
        }

        if !self.allowed_headers.is_empty() {
            response.headers_mut().insert(
                http::header::ACCESS_CONTROL_ALLOW_HEADERS,
                http::HeaderValue::try_from(self.allowed_headers.join(", "))?,
            );
        }

        if let Some(age) = self.max_age {
            response.headers_mut().insert(
                http::header::ACCESS_CONTROL_MAX_AGE,
                http::HeaderValue::try_from(age.to_string())?,
            );
        }

        Ok(response)
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn apply(
        self: Pin<&Self>,
        context: Context,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        let origin = context
            .headers()
            .get(http::header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let origin = match origin {
            Some(origin) => origin,
            None => return next.apply(context).await,
        };

        let validated = match self.origin.validate(&origin) {
            Some(validated) => validated,
            None => return next.apply(context).await,
        };

        if context.method() == http::Method::OPTIONS {
            return self.preflight_response(&validated);
        }

        let mut response = next.apply(context).await?;
        self.apply_common_headers(&mut response, &validated)?;
        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{endpoints, Request};

    fn router() -> crate::Router {
        let mut router = crate::Router::default();
        router.with(
            CorsMiddleware::new(AllowedOrigin::Any).with_expose_headers(["X-Foo"]),
        );
        router.at("/a").get(endpoints::simple(Response::empty_200));
        router.prepare();
        router
    }

    #[tokio::test]
    async fn test_wildcard_origin_adds_headers_without_vary() {
        let http = router();
        let response = http
            .handle(
                Request::get("/a")
                    .unwrap()
                    .with_header("Origin", "https://x")
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert_eq!(
            response
                .headers()
                .get(http::header::ACCESS_CONTROL_EXPOSE_HEADERS)
                .unwrap(),
            "X-Foo"
        );
        assert!(response.headers().get(http::header::VARY).is_none());
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let http = router();
        let response = http
            .handle(
                Request::from_method("/a", http::Method::OPTIONS)
                    .unwrap()
                    .with_header("Origin", "https://x")
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_no_origin_is_passthrough() {
        let http = router();
        let response = http.handle(Request::get("/a").unwrap()).await.unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
