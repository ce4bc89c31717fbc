use crate::Endpoint;
use std::sync::Arc;

/// A single registered route: a path pattern, an optional method
/// restriction, and the endpoint that handles it.
pub(crate) struct Route {
    pub(crate) path: String,
    method: Option<http::Method>,
    endpoint: Arc<dyn Endpoint>,
}

impl Route {
    /// Get a reference to the route's method.
    pub(crate) fn method(&self) -> Option<&http::Method> {
        self.method.as_ref()
    }

    /// Get a reference to the route's endpoint.
    pub(crate) fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    /// Whether this route should handle a request made with `method` - true
    /// if the route has no method restriction, or the restriction matches.
    pub(crate) fn matches(&self, method: &http::Method) -> bool {
        self.method.is_none() || self.method.as_ref() == Some(method)
    }

    /// Whether this route's method restriction is exactly `method` - used at
    /// registration time to decide whether a new registration replaces an
    /// existing one at the same node, rather than whether it would handle an
    /// incoming request.
    pub(crate) fn matches_exact(&self, method: Option<&http::Method>) -> bool {
        self.method.as_ref() == method
    }

    #[cfg(test)]
    pub(crate) fn test_route(method: http::Method, path: impl Into<String>) -> Arc<Route> {
        Arc::new(Route {
            path: path.into(),
            method: Some(method),
            endpoint: Arc::new(crate::endpoint::r#static(crate::Response::empty_500)),
        })
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// A description of a path in the router.
///
/// This is generated when you call [`crate::Router::at`], and it contains the
/// passed prefix from that function.  Here, you can specify the behavior to
/// perform at that prefix - the [`Endpoint`]s to perform on each method of
/// that Path.
///
/// Paths use a small segment-based syntax:
///
/// - a literal segment (`users`) matches itself exactly;
/// - `:name` matches any single segment, capturing it under `name`, readable
///   through [`crate::Context::param`];
/// - `:name?` is only valid as the final segment, and expands to two
///   registrations - one without the segment, one with a plain `:name` in
///   its place;
/// - `*name` matches the remainder of the path (one or more segments),
///   capturing it under `name`; `*` does the same without capturing a name
///   (available positionally through [`crate::router::matcher::Params::positional`]).
///   A wildcard is only valid as the final segment.
///
/// # Examples
/// ```rust,no_run
/// # use under::*;
/// # async fn expect_response(http: &under::Router, path: &str, status: http::StatusCode) -> Result<(), anyhow::Error> {
/// #     let response = http.handle(Request::get(path)?).await?;
/// #     assert_eq!(response.status(), status);
/// #     Ok(())
/// # }
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let endpoint = || under::endpoints::simple(Response::empty_204); // dummy endpoint
/// let mut http = under::http(); // this provides us with the Router instance.
/// http.at("/") // this is the Path instance.
///     .get(endpoint());
/// // a `/users/` followed by a captured id.
/// http.at("/users/:id")
///     .get(endpoint())
///     .post(endpoint());
/// // a path under `/public/` that captures everything after it.
/// http.at("/public/*rest")
///     .get(endpoint());
/// http.prepare();
/// expect_response(&http, "/users/1", StatusCode::NO_CONTENT).await?;
/// expect_response(&http, "/public/aa/a", StatusCode::NO_CONTENT).await?;
/// expect_response(&http, "/omega", StatusCode::NOT_FOUND).await?;
/// # Ok(())
/// # }
/// ```
pub struct Path<'a> {
    pub(super) prefix: String,
    pub(super) matcher: &'a mut dyn crate::router::matcher::Matcher,
}

macro_rules! method {
    ($($(#[$m:meta])* $v:vis fn $n:ident = $meth:expr;)+) => {
        $(
            $(#[$m])* $v fn $n<E: Endpoint>(&mut self, endpoint: E) -> &mut Self {
                self.method($meth, endpoint)
            }
        )+
    };
}

impl<'a> Path<'a> {
    pub(super) fn new(
        prefix: impl Into<String>,
        matcher: &'a mut dyn crate::router::matcher::Matcher,
    ) -> Self {
        Path {
            prefix: prefix.into(),
            matcher,
        }
    }

    /// This appends to the prefix, creating a new [`Path`] from the
    /// current one and the given supplemental prefix.  This assumes that the
    /// prefix is never terminated with a forward slash, but always prefixed
    /// with one.
    ///
    /// # Example
    /// ```rust
    /// # fn main() {
    /// # use under::{Router, Response, endpoints::simple};
    /// # let mut http = under::http();
    /// # let user_index = simple(Response::empty_204);
    /// # let user_show = simple(Response::empty_204);
    /// # let user_update = simple(Response::empty_204);
    /// # let user_destroy = simple(Response::empty_204);
    /// let mut base = http.at("/user");
    /// base.get(user_index);
    /// base.at("/:id")
    ///     .get(user_show)
    ///     .post(user_update)
    ///     .delete(user_destroy);
    /// # http.prepare();
    /// # }
    /// ```
    pub fn at<P: AsRef<str>>(&mut self, path: P) -> Path<'_> {
        Path::new(super::join_paths(&self.prefix, path.as_ref()), self.matcher)
    }

    /// This appends to the prefix, creating a new [`Path`] from the
    /// current one and the given supplemental prefix.  This assumes that the
    /// prefix is never terminated with a forward slash, but always prefixed
    /// with one.
    ///
    /// The created [`Path`] is then yielded to the given closure, which can
    /// be used to add routes to it; the current [`Path`] is then returned.
    ///
    /// # Example
    /// ```rust
    /// # fn main() {
    /// # use under::{Router, Response, endpoints::simple};
    /// # let mut http = under::http();
    /// # let user_index = simple(Response::empty_204);
    /// # let user_show = simple(Response::empty_204);
    /// # let user_update = simple(Response::empty_204);
    /// # let user_destroy = simple(Response::empty_204);
    /// http.under("/user", |base| {
    ///     base.get(user_index)
    ///         .under("/:id", |user| {
    ///             user
    ///                 .get(user_show)
    ///                 .post(user_update)
    ///                 .delete(user_destroy);
    ///         });
    /// });
    /// # http.prepare();
    /// # }
    /// ```
    pub fn under<P: AsRef<str>, F: FnOnce(&mut Path<'_>)>(&mut self, path: P, f: F) -> &mut Self {
        let mut base = self.at(path);
        f(&mut base);
        self
    }

    /// Attaches middleware to the subtree rooted at this path (this path and
    /// everything registered under it), in addition to any middleware
    /// already attached to the router as a whole.
    pub fn with<M: crate::Middleware>(&mut self, middleware: M) -> &mut Self {
        let pattern = if self.prefix.is_empty() || self.prefix == "/" {
            "*".to_owned()
        } else {
            format!("{}/*", self.prefix)
        };
        self.matcher
            .push_middleware(&pattern, Arc::new(middleware))
            .expect("invalid middleware pattern");
        self
    }

    /// Creates an endpoint responding to any method at the current prefix.
    ///
    /// # Examples
    /// ```rust
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// # use under::*;
    /// # let mut http = under::http();
    /// let endpoint = under::endpoints::simple(Response::empty_204);
    /// let method = http::Method::from_bytes(b"TEST")?;
    /// http.at("/user").all(endpoint);
    /// http.prepare();
    /// let response = http.handle(Request::from_method("/user", method.clone())?).await?;
    /// assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
    /// let response = http.handle(Request::post("/user")?).await?;
    /// assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
    /// # Ok(())
    /// # }
    /// ```
    pub fn all<E: Endpoint>(&mut self, endpoint: E) -> &mut Self {
        self.register(None, endpoint)
    }

    /// Creates an endpoint of the specified method at the current prefix.
    ///
    /// # Examples
    /// ```rust
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// # use under::*;
    /// # let mut http = under::http();
    /// # let endpoint = under::endpoints::simple(under::Response::empty_204);
    /// let method = http::Method::from_bytes(b"TEST")?;
    /// http.at("/user").method(method.clone(), endpoint);
    /// http.prepare();
    /// let response = http.handle(Request::from_method("/user", method)?).await?;
    /// assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
    /// # Ok(())
    /// # }
    /// ```
    pub fn method<E: Endpoint>(&mut self, method: http::Method, endpoint: E) -> &mut Self {
        self.register(Some(method), endpoint)
    }

    fn register<E: Endpoint>(&mut self, method: Option<http::Method>, endpoint: E) -> &mut Self {
        let route = Arc::new(Route {
            path: self.prefix.clone(),
            method,
            endpoint: Arc::new(endpoint),
        });
        self.matcher.add(route).expect("invalid route path");
        self
    }

    method![
        /// Creates a GET endpoint at the current prefix.
        ///
        /// # Examples
        /// ```rust
        /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
        /// # use under::*;
        /// let mut http = under::http();
        /// let endpoint = under::endpoints::simple(under::Response::empty_204);
        /// http.at("/user").get(endpoint);
        /// http.prepare();
        /// let response = http.handle(under::Request::get("/user")?).await?;
        /// # assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
        /// # Ok(())
        /// # }
        /// ```
        pub fn get = http::Method::GET;
        pub fn post = http::Method::POST;
        pub fn put = http::Method::PUT;
        pub fn delete = http::Method::DELETE;
        pub fn head = http::Method::HEAD;
        pub fn trace = http::Method::TRACE;
        pub fn connect = http::Method::CONNECT;
        pub fn patch = http::Method::PATCH;
        pub fn options = http::Method::OPTIONS;
    ];
}
