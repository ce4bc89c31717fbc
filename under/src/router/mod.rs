pub(crate) mod matcher;
mod route;
mod service;

pub use self::matcher::MatcherKind;
pub(crate) use self::matcher::{MatchedRoute, Params};
pub use self::route::Path;
pub(crate) use self::route::Route;
use crate::context::{Context, Env, Globals};
use crate::endpoint::Endpoint;
use crate::event::{Event, EventBus};
use crate::middleware::{Middleware, Next};
use crate::plugin::{Plugin, PluginManager};
use crate::{Request, Response};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// An HTTP router.
///
/// This owns a [`matcher::Matcher`] (picked at construction with
/// [`Router::with_matcher`], defaulting to [`MatcherKind::RegExp`]), the
/// server-wide [`Globals`]/[`Env`] every [`Context`] is built with, the
/// [`EventBus`] lifecycle events are emitted on, and the [`PluginManager`]
/// that gates dispatch until every registered plugin has settled.
///
/// Routes are registered through [`Router::at`]/[`Router::under`], which
/// yield a [`Path`] - see there for the path syntax and method registration
/// API.  Middleware registered directly on the router (via [`Router::with`])
/// applies globally, ahead of any path-scoped middleware.
pub struct Router {
    matcher: Box<dyn matcher::Matcher>,
    fallback: Option<Arc<dyn Endpoint>>,
    terminate: Option<watch::Receiver<bool>>,
    globals: Arc<Globals>,
    env: Arc<Env>,
    events: Arc<EventBus>,
    plugins: Vec<Arc<dyn Plugin>>,
    plugin_manager: OnceCell<PluginManager>,
}

impl Default for Router {
    fn default() -> Self {
        Router::with_matcher(MatcherKind::default())
    }
}

impl Router {
    /// Creates a router using the given path-matching backend.  See
    /// [`MatcherKind`] for the tradeoffs between them.
    #[must_use]
    pub fn with_matcher(kind: MatcherKind) -> Self {
        Router {
            matcher: kind.build(),
            fallback: None,
            terminate: None,
            globals: Arc::new(Globals::default()),
            env: Arc::new(Env::default()),
            events: Arc::new(EventBus::new()),
            plugins: Vec::new(),
            plugin_manager: OnceCell::new(),
        }
    }

    /// Seals the router's matcher, precompiling whatever it needs to ahead
    /// of dispatch (the regexp backend compiles its alternation regex here
    /// rather than paying that cost on the first request).
    ///
    /// This is automatically called by [`Router::listen`]; tests that call
    /// [`Router::handle`] directly may call this first, but it is not
    /// required - the matcher seals itself lazily on first use regardless.
    pub fn prepare(&mut self) {
        self.matcher.seal();
    }

    pub(crate) fn routes(&self) -> &[Arc<Route>] {
        self.matcher.routes()
    }

    /// Creates a [`Path`] at the provided prefix.  See [`Path::at`] for more.
    pub fn at<P: AsRef<str>>(&mut self, prefix: P) -> Path<'_> {
        Path::new(join_paths("", prefix.as_ref()), &mut *self.matcher)
    }

    /// Creates a [`Path`] at the provided prefix, and executes the provided
    /// closure with it.  See [`Path::under`] for more.
    pub fn under<P: AsRef<str>, F: FnOnce(&mut Path<'_>)>(
        &mut self,
        prefix: P,
        build: F,
    ) -> &mut Self {
        let mut path = Path::new(join_paths("", prefix.as_ref()), &mut *self.matcher);
        build(&mut path);
        self
    }

    /// Appends middleware to the router, applying globally, ahead of any
    /// path-scoped middleware.  Each middleware is executed in the order
    /// that it is appended to the router (i.e., the first middleware
    /// inserted executes first).
    ///
    /// # Examples
    /// ```rust
    /// let mut http = under::http();
    /// http.with(under::middleware::TraceMiddleware::new())
    ///     .with(under::middleware::StateMiddleware::new(123u32));
    /// ```
    pub fn with<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.matcher
            .push_middleware("*", Arc::new(middleware))
            .expect("global middleware pattern is always valid");
        self
    }

    /// Inserts a value into the server-wide [`Globals`] map, readable from
    /// any [`Context`] via [`Context::globals`].
    ///
    /// # Panics
    /// Panics if called after the router has already begun dispatching
    /// requests (i.e. after the first clone of its [`Globals`] has escaped) -
    /// in practice, after [`Router::listen`] or [`Router::handle`] has
    /// already run once.
    pub fn with_global<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> &mut Self {
        Arc::get_mut(&mut self.globals)
            .expect("with_global called after the router has started dispatching")
            .insert(key, value);
        self
    }

    /// Replaces the process-level [`Env`] injected into every [`Context`].
    /// Defaults to an empty [`Env`]; use [`Env::from_process`] to seed it
    /// from the process's environment variables.
    pub fn set_env(&mut self, env: Env) -> &mut Self {
        self.env = Arc::new(env);
        self
    }

    /// Registers a plugin.  Every registered plugin's [`Plugin::on_init`] is
    /// run, in registration order, before [`Router::listen`] serves its
    /// first connection (or, for [`Router::handle`], before the first
    /// request is dispatched).
    pub fn plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Subscribes `subscriber` to one of this router's lifecycle event
    /// channels ([`crate::event::SERVER_REQUEST`],
    /// [`crate::event::SERVER_RESPONSE`]), or any custom channel a plugin
    /// emits on.
    pub fn on(&mut self, channel: &'static str, subscriber: Arc<dyn crate::event::Subscriber>) -> &mut Self {
        self.events.subscribe(channel, subscriber);
        self
    }

    /// Sets a fallback endpoint.  If there exists no other endpoint in the
    /// router that could potentially respond to the request, it will first
    /// attempt to execute this fallback endpoint, before instead returning
    /// an empty `404 Not Found`.
    ///
    /// # Examples
    /// ```rust
    /// # use under::*;
    /// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
    /// let mut http = under::http();
    /// http.at("/foo").get(under::endpoints::simple(Response::empty_204));
    /// http.fallback(under::endpoints::simple(Response::empty_404));
    /// http.prepare();
    /// let response = http.handle(Request::get("/foo")?).await?;
    /// assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
    /// let response = http.handle(Request::get("/bar")?).await?;
    /// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    /// # Ok(())
    /// # }
    pub fn fallback<E: Endpoint>(&mut self, endpoint: E) -> &mut Self {
        self.fallback = Some(Arc::new(endpoint));
        self
    }

    /// A channel to handle the termination singal.  By default, the router does
    /// not terminate, at least not gracefully, even in the face of
    /// SIGINT/SIGTERM.  This allows you to signal to the router when it should
    /// terminate, and it will gracefully shut down, letting all current
    /// requests finish before exiting.  Note that the return type is not
    /// `Clone`, and dropping the sender will not terminate the router.
    ///
    /// Note this only applies to the router when listening, and not when
    /// handling a single request.
    pub fn termination_signal(&mut self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        self.terminate = Some(rx);
        tx
    }

    /// Handles a one-off request to the router: drives every registered
    /// plugin's initialization (if this is the first call to reach the
    /// plugin manager - see [`Self::plugin_manager`]), waits on the
    /// plugin-init barrier, then runs the request through the full dispatch
    /// pipeline.
    pub async fn handle(&self, request: Request) -> Result<Response, anyhow::Error> {
        Ok(self.dispatch(request).await)
    }

    /// Lazily constructs the [`PluginManager`] and, in the same
    /// initialization, drives every registered plugin's [`Plugin::on_init`].
    /// `OnceCell` guarantees this runs exactly once regardless of which
    /// caller gets here first - [`Router::listen`]'s background task, or a
    /// direct [`Router::handle`] call - satisfying the rule that `on_init`
    /// runs, in registration order, before any request is dispatched.
    async fn plugin_manager(&self) -> &PluginManager {
        self.plugin_manager
            .get_or_init(|| async {
                let manager = PluginManager::new(self.plugins.clone());
                manager.init_all(self.events.clone()).await;
                manager
            })
            .await
    }

    /// Runs a single request through the full pipeline described in the
    /// server core's dispatch contract: the plugin-init barrier, the
    /// `server:request`/`server:response` event emissions, the path
    /// matcher, the chain executor, and - on any uncaught error - the
    /// generic `500` fallback.  Never itself returns an error; every
    /// failure mode is translated into a `Response`.
    pub(crate) async fn dispatch(&self, request: Request) -> Response {
        self.plugin_manager().await.wait_ready().await;

        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        self.events
            .emit(
                crate::event::SERVER_REQUEST,
                Event::Request {
                    method: method.clone(),
                    path: path.clone(),
                },
            )
            .await;

        let response = match self.matcher.lookup(&method, &path) {
            Some(MatchedRoute {
                route,
                params,
                middleware,
            }) => {
                let context = Context::new(request, params, self.globals.clone(), self.env.clone());
                self.run(context, &middleware, route.endpoint()).await
            }
            None => match &self.fallback {
                Some(endpoint) => {
                    let context = Context::new(request, Params::default(), self.globals.clone(), self.env.clone());
                    self.run(context, &[], endpoint).await
                }
                None => default_not_found(),
            },
        };

        self.events
            .emit(
                crate::event::SERVER_RESPONSE,
                Event::Response {
                    status: response.status(),
                },
            )
            .await;

        response
    }

    async fn run(
        &self,
        context: Context,
        middleware: &[Arc<dyn Middleware>],
        endpoint: &Arc<dyn Endpoint>,
    ) -> Response {
        log::trace!("dispatching to {:?}", endpoint);
        let next = Next::new(middleware, Pin::new(endpoint.as_ref()));
        match next.apply(context).await {
            Ok(response) => response,
            Err(error) => match crate::error::recover_sentinel(error) {
                Ok(response) => response,
                Err(error) => {
                    log::error!("unhandled error while dispatching request: {:#}", error);
                    default_internal_error()
                }
            },
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("matcher", &self.matcher)
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

fn default_not_found() -> Response {
    Response::text("Not Found").with_status(http::StatusCode::NOT_FOUND)
}

fn default_internal_error() -> Response {
    Response::text("Internal Server Error").with_status(http::StatusCode::INTERNAL_SERVER_ERROR)
}

// Base *MUST* be either `""` or start with `"/"`.
fn join_paths(base: &str, extend: &str) -> String {
    let mut buffer = String::with_capacity(base.len() + extend.len());
    buffer.push_str(base);

    match (base.ends_with('/'), extend.starts_with('/')) {
        (true, true) => {
            buffer.push_str(&extend[1..]);
        }
        (false, true) | (true, false) => {
            buffer.push_str(extend);
        }
        (false, false) => {
            buffer.push('/');
            buffer.push_str(extend);
        }
    }

    buffer.shrink_to_fit();
    buffer
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::response::Response;
    use crate::Context;

    #[allow(clippy::unused_async)]
    async fn simple_endpoint(_: Context) -> Result<Response, anyhow::Error> {
        unimplemented!()
    }

    fn simple_router() -> Router {
        let mut router = Router::default();
        router.at("/").get(simple_endpoint);
        router.at("/alpha").get(simple_endpoint);
        router.at("/beta/:id").get(simple_endpoint);
        router.at("/gamma/*all").get(simple_endpoint);
        router.prepare();
        router
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/id"), "/id");
        assert_eq!(join_paths("", "id"), "/id");
        assert_eq!(join_paths("/user", "/id"), "/user/id");
        assert_eq!(join_paths("/user/", "/id"), "/user/id");
        assert_eq!(join_paths("/user/", "id"), "/user/id");
    }

    #[test]
    fn test_build() {
        simple_router();
    }

    #[tokio::test]
    async fn test_basic_match() {
        let router = simple_router();
        let response = router.handle(Request::get("/").unwrap()).await.unwrap();
        assert_ne!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_simple_match() {
        let matched = router_match("/beta/4444");
        assert_eq!(matched.route.path, "/beta/:id");
        assert_eq!(matched.params.get("id"), Some("4444"));
    }

    #[tokio::test]
    async fn test_multi_match() {
        let matched = router_match("/gamma/a/b/c");
        assert_eq!(matched.route.path, "/gamma/*all");
        assert_eq!(matched.params.get("all"), Some("a/b/c"));
    }

    #[tokio::test]
    async fn test_missing_match_is_404() {
        let router = simple_router();
        let response = router
            .handle(Request::get("/omega/aaa").unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_404() {
        let router = simple_router();
        let response = router
            .handle(Request::post("/alpha").unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    fn router_match(path: &str) -> MatchedRoute {
        let router = simple_router();
        router.matcher.lookup(&http::Method::GET, path).unwrap()
    }
}
