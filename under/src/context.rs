//! The per-request [`Context`] handed to every [`crate::Endpoint`] and
//! [`crate::Middleware`].

use crate::router::matcher::Params;
use crate::{HttpEntity, Request, Response};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Server-wide, read-only state shared by every request.
///
/// Populated at [`crate::Router`] construction time (via
/// [`crate::Router::with_global`]) and otherwise immutable for the lifetime
/// of the server; no framework-level lock is needed beyond the `Arc`.
#[derive(Default)]
pub struct Globals {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Globals {
    pub(crate) fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Looks up a server-wide value by key, downcasting it to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Globals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globals")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-level configuration injected into every [`Context`] at
/// construction.  This is deliberately a thin, read-only key/value view
/// (rather than a typed struct) so applications can shape it however they
/// like - a parsed config file, environment variables, or both.
#[derive(Debug, Default, Clone)]
pub struct Env {
    values: HashMap<String, String>,
}

impl Env {
    /// Builds an [`Env`] from the process's environment variables.
    pub fn from_process() -> Self {
        Env {
            values: std::env::vars().collect(),
        }
    }

    /// Inserts a key/value pair, returning the builder for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Looks up a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// The per-request handle passed to every [`crate::Endpoint`] and
/// [`crate::Middleware`].
///
/// A `Context` wraps the incoming [`Request`] (via `Deref`/`DerefMut`, so
/// every existing header/extension/body-reading method on [`Request`]
/// remains available directly on `Context`), and additionally carries the
/// captured path parameters, a per-request scratch map (`locals`), the
/// server-wide [`Globals`], and the process [`Env`].
pub struct Context {
    request: Request,
    params: Params,
    locals: HashMap<String, Box<dyn Any + Send + Sync>>,
    globals: Arc<Globals>,
    env: Arc<Env>,
    accumulated_headers: http::HeaderMap,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("params", &self.params)
            .field("locals", &self.locals.keys().collect::<Vec<_>>())
            .field("globals", &self.globals)
            .finish()
    }
}

impl Context {
    pub(crate) fn new(
        request: Request,
        params: Params,
        globals: Arc<Globals>,
        env: Arc<Env>,
    ) -> Self {
        Context {
            request,
            params,
            locals: HashMap::new(),
            globals,
            env,
            accumulated_headers: http::HeaderMap::new(),
        }
    }

    /// Merges the accumulated header set (built up via [`Self::set_headers`],
    /// [`Self::set_cookie`], [`Self::set_cookies`]) into `response`, and
    /// returns it.  Every builder method on this type (`json`, `text`,
    /// `html`, `redirect`) routes through this so the accumulator is never
    /// silently dropped.
    fn finish(&mut self, mut response: Response) -> Response {
        for (name, value) in std::mem::take(&mut self.accumulated_headers) {
            if let Some(name) = name {
                response.headers_mut().append(name, value);
            }
        }
        response
    }

    /// Appends to the accumulating header set that every response builder
    /// method (`json`, `text`, `html`, `redirect`) merges into its output.
    /// Array values are joined with a comma, per the HTTP convention for
    /// repeatable headers.
    pub fn set_headers<H, I, V>(&mut self, key: H, values: I) -> Result<(), http::Error>
    where
        H: http::header::IntoHeaderName,
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let value = http::HeaderValue::try_from(joined)?;
        self.accumulated_headers.append(key, value);
        Ok(())
    }

    /// Returns a single named path parameter captured by the route, if any.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns every named path parameter captured by the route.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Parses the query string into `S`.  Returns `None` if there is no
    /// query string, or if it fails to parse as `S`.
    #[cfg(feature = "serde")]
    #[doc(cfg(feature = "serde"))]
    pub fn query<'q, S: serde::Deserialize<'q>>(&'q self) -> Option<S> {
        self.request.query()
    }

    /// Parses the request body as `application/x-www-form-urlencoded`,
    /// deserializing it into `T`.  On a non-form content type, returns
    /// [`crate::UnderError::UnsupportedMediaType`]; `multipart/form-data`
    /// always takes this path, since no multipart parser exists in this
    /// crate's dependency stack.
    #[cfg(all(feature = "serde", feature = "from_form"))]
    #[doc(cfg(all(feature = "serde", feature = "from_form")))]
    pub async fn form_data<T>(&mut self, limit: u64) -> crate::Result<T, anyhow::Error>
    where
        T: serde::de::DeserializeOwned + crate::FromForm,
    {
        self.request.data(limit).as_sniff_form::<T>().await
    }

    /// Returns a per-request scratch value, if one was previously stored
    /// under `key` with [`Self::set_local`].
    pub fn local<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.locals.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Stores a per-request scratch value under `key`, for later retrieval
    /// (by other middleware, or the terminal endpoint) via [`Self::local`].
    pub fn set_local<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.locals.insert(key.into(), Box::new(value));
    }

    /// Returns the server-wide [`Globals`] map.
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Returns the process-level [`Env`] configuration.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Consumes the context, discarding the captured params/locals/globals,
    /// and returns the underlying [`Request`].  Useful for endpoints that
    /// hand the request off to a lower-level API that predates `Context`
    /// (e.g. [`crate::sse`]).
    #[must_use]
    pub fn into_request(self) -> Request {
        self.request
    }

    /// Builds a `200 OK` JSON response from `body`, with a canonical
    /// `application/json; charset=utf-8` content type, merging in whatever
    /// headers and cookies were previously accumulated on this context.
    #[cfg(feature = "json")]
    #[doc(cfg(feature = "json"))]
    pub fn json<V: serde::Serialize>(&mut self, body: &V) -> Result<Response, serde_json::Error> {
        let response = Response::json(body)?;
        Ok(self.finish(response))
    }

    /// Builds a `200 OK` plain-text response, merging in whatever headers
    /// and cookies were previously accumulated on this context.
    pub fn text<V: Into<String>>(&mut self, body: V) -> Response {
        let response = Response::text(body);
        self.finish(response)
    }

    /// Builds a `200 OK` HTML response, merging in whatever headers and
    /// cookies were previously accumulated on this context.
    pub fn html<V: Into<String>>(&mut self, body: V) -> Response {
        let response = Response::html(body);
        self.finish(response)
    }

    /// Builds a redirect response to `location`, defaulting to a `302
    /// Found` status, merging in whatever headers and cookies were
    /// previously accumulated on this context.
    pub fn redirect<T>(&mut self, location: T, status: http::StatusCode) -> Result<Response, http::Error>
    where
        http::HeaderValue: std::convert::TryFrom<T>,
        <http::HeaderValue as std::convert::TryFrom<T>>::Error: Into<http::Error>,
    {
        let response = Response::empty_status(status).with_header(http::header::LOCATION, location)?;
        Ok(self.finish(response))
    }

    /// Builds a response streaming `body` verbatim, merging in whatever
    /// headers and cookies were previously accumulated on this context.
    pub fn stream<B: Into<hyper::Body>>(&mut self, body: B) -> Response {
        let response = Response::stream(body);
        self.finish(response)
    }

    /// Appends a `Set-Cookie` entry to the accumulating header set, built
    /// from the given name, value, and attributes, using the
    /// [`crate::cookie_codec`] wire format.  The entry is only sent once a
    /// builder method (`json`, `text`, `html`, `redirect`, `stream`) is
    /// called to produce the eventual response.
    pub fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        options: &crate::cookie_codec::CookieOptions,
    ) -> crate::Result<()> {
        let encoded = crate::cookie_codec::serialize(name, value, options)?;
        let value = http::HeaderValue::try_from(encoded)?;
        self.accumulated_headers.append(http::header::SET_COOKIE, value);
        Ok(())
    }

    /// Appends one `Set-Cookie` header per entry in `cookies`, sharing the
    /// same attributes.
    pub fn set_cookies<'a, I>(
        &mut self,
        cookies: I,
        options: &crate::cookie_codec::CookieOptions,
    ) -> crate::Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in cookies {
            self.set_cookie(name, value, options)?;
        }
        Ok(())
    }
}

impl std::ops::Deref for Context {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

impl std::ops::DerefMut for Context {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.request
    }
}

impl crate::HttpEntity for Context {
    fn body_mut(&mut self) -> &mut hyper::Body {
        self.request.body_mut()
    }

    fn headers(&self) -> &http::HeaderMap {
        self.request.headers()
    }

    fn headers_mut(&mut self) -> &mut http::HeaderMap {
        self.request.headers_mut()
    }
}
