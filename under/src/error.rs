use std::fmt;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
/// Errors generated specifically from this library, and not its interactions
/// user code.
pub enum UnderError {
    #[error("could not parse the given string ({:?}) as an address", .0)]
    /// Generated when attempting to parse an address (during
    /// [`crate::Router::listen`]), but the address was invalid.
    InvalidAddress(String),
    #[error("could not serve server")]
    /// Generated when attempting to bind and listen using hyper, but it failed
    /// for some underlying reason.
    HyperServer(#[source] hyper::Error),
    /// Generated when attempting to read the body of a request, or response,
    /// and failing.
    #[error("could not read the body of a request or response")]
    ReadBody(#[source] std::io::Error),
    #[cfg(feature = "json")]
    #[doc(cfg(feature = "json"))]
    /// Generated when attempting to deserialize the body of a request or
    /// response from JSON.
    #[error("could not deserialize the body of a request or response from JSON")]
    JsonDeserialization(#[source] serde_json::Error),
    #[cfg(feature = "cbor")]
    #[doc(cfg(feature = "cbor"))]
    /// Generated when attempting to deserialize the body of a request or
    /// response from CBOR.
    #[error("could not deserialize the body of a request or response from CBOR")]
    CborDeserialization(#[source] anyhow::Error),
    #[cfg(feature = "msgpack")]
    #[doc(cfg(feature = "msgpack"))]
    /// Generated when attempting to deserialize the body of a request or
    /// response from MessagePack.
    #[error("could not deserialize the body of a request or response from MessagePack")]
    MsgpackDeserialization(#[source] rmp_serde::decode::Error),
    /// Generated when attempting to deserialize the body of a request or
    /// response from text.
    #[error("could not deserialize the body of a request or response from utf-8")]
    TextDeserialization(#[source] std::string::FromUtf8Error),
    #[cfg(feature = "from_form")]
    #[doc(cfg(feature = "from_form"))]
    /// Generated when attempting to deserialize the body of a request or
    /// response from x-www-form-urlencoded.
    #[error("could not deserialize the body of a request or response from urlencoded")]
    FormDeserialization(#[source] crate::from_form::FromFormError),
    /// Generated when attempting to sniff the request or response of its
    /// content type.
    #[error("the content-type of the request was invalid")]
    UnsupportedMediaType(Option<mime::Mime>),
    /// Generated when the request body of the request (if not provided with
    /// a Content-Length header) is too large.
    #[error("the request body of the request was too long, and was cut off")]
    PayloadTooLarge(#[source] anyhow::Error),
    /// Generated when a route's path could not be parsed - an empty dynamic
    /// segment (a bare `:`), for instance.
    #[error("the route path {0:?} could not be parsed")]
    UnsupportedPath(String),
    /// Generated when a wildcard segment (`*`/`*name`) appears anywhere but
    /// the final segment of a route path.
    #[error("the route path {0:?} places a wildcard segment somewhere other than the end")]
    WildcardMisplacement(String),
    /// Generated when attempting to register a route on a [`crate::router::MatcherKind::RegExp`]
    /// matcher after it has already sealed itself (on first lookup).
    #[error("the matcher has already been sealed, and cannot accept new routes")]
    MatcherSealed,
    /// Generated when the same `(method, path)` pair is registered twice with
    /// no way to disambiguate between the two registrations.
    #[error("the route {1} {0:?} was already registered")]
    DuplicateRoute(String, http::Method),
    /// Generated when a middleware's `next()` continuation is invoked more
    /// than once within the same frame.
    #[error("next() was called more than once in the same middleware frame")]
    NextCalledTwice,
    /// Generated when a cookie's `SameSite` or `Priority` attribute is set to
    /// a value outside of the attribute's fixed vocabulary.
    #[error("{0:?} is not a valid value for the cookie attribute {1}")]
    InvalidCookieOption(String, &'static str),
    /// Generated when a cookie's name contains a character outside of the
    /// RFC 6265 `token` character class.
    #[error("{0:?} is not a valid cookie name")]
    InvalidCookieName(String),
    /// Generated when a cookie's value contains a character outside of the
    /// RFC 6265 `cookie-octet` character class.
    #[error("{0:?} is not a valid cookie value")]
    InvalidCookieValue(String),
    /// Generated when a cookie's `Domain` attribute is not a syntactically
    /// valid domain.
    #[error("{0:?} is not a valid cookie domain")]
    InvalidCookieDomain(String),
    /// Generated when a cookie's `Path` attribute contains a character
    /// outside of the permitted path-value character class.
    #[error("{0:?} is not a valid cookie path")]
    InvalidCookiePath(String),
    /// Generated when the request body could not be parsed according to its
    /// declared `Content-Type`.  Unlike the other deserialization errors,
    /// this is meant to be turned directly into a `400` response rather than
    /// propagated as a `500`.
    #[error("the request body could not be parsed as {0}")]
    BodyParseError(String),
}

/// A sentinel error carrying a pre-built [`crate::Response`].
///
/// The [`crate::middleware::Next`] chain executor specifically recognizes
/// this type (and [`Redirect`]) via `downcast_ref` before falling back to
/// logging-and-500: raising one of these from an [`crate::Endpoint`] or
/// [`crate::Middleware`] commits the carried response verbatim, instead of
/// being treated as an unhandled error.
///
/// # Examples
/// ```rust
/// # use under::*;
/// # use under::error::HttpException;
/// async fn handle(_: Context) -> Result<Response, anyhow::Error> {
///     Err(HttpException::new(http::StatusCode::FORBIDDEN, "not allowed").into())
/// }
/// ```
pub struct HttpException {
    response: Response,
}

use crate::Response;

impl HttpException {
    /// Creates a new exception that, when raised, commits a response with
    /// the given status and a plain-text body.
    pub fn new(status: http::StatusCode, message: impl Into<String>) -> Self {
        let response = Response::text(message.into()).with_status(status);
        HttpException { response }
    }

    /// Creates a new exception wrapping an already-constructed response.
    pub fn with_response(response: Response) -> Self {
        HttpException { response }
    }

    /// Returns the response this exception carries.
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

impl fmt::Debug for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpException")
            .field("status", &self.response.status())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http exception: {}", self.response.status())
    }
}

impl std::error::Error for HttpException {}

/// A sentinel error that, when raised, commits a redirect response.
///
/// See [`HttpException`] for how the chain executor recognizes this type.
///
/// # Examples
/// ```rust
/// # use under::*;
/// # use under::error::Redirect;
/// async fn handle(_: Context) -> Result<Response, anyhow::Error> {
///     Err(Redirect::new("/login").into())
/// }
/// ```
pub struct Redirect {
    response: Response,
}

impl Redirect {
    /// Creates a redirect to `location` with the default status (302 Found).
    pub fn new(location: impl AsRef<str>) -> Self {
        Self::with_status(location, http::StatusCode::FOUND)
    }

    /// Creates a redirect to `location` with the given status.
    pub fn with_status(location: impl AsRef<str>, status: http::StatusCode) -> Self {
        let response = http::Response::builder()
            .status(status)
            .header(http::header::LOCATION, location.as_ref())
            .body(hyper::Body::empty())
            .map(Response::from)
            .unwrap_or_else(|_| Response::empty_status(status));
        Redirect { response }
    }

    /// Returns the response this redirect carries.
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

impl fmt::Debug for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redirect")
            .field("status", &self.response.status())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect to {:?}", self.response.headers().get(http::header::LOCATION))
    }
}

impl std::error::Error for Redirect {}

/// Attempts to recover a pre-built [`crate::Response`] out of an
/// [`anyhow::Error`], if it wraps an [`HttpException`] or [`Redirect`].
/// Returns the original error back if it was neither, so the caller can fall
/// through to its own logging-and-500 handling.
pub(crate) fn recover_sentinel(error: anyhow::Error) -> Result<Response, anyhow::Error> {
    let error = match error.downcast::<HttpException>() {
        Ok(exc) => return Ok(exc.into_response()),
        Err(error) => error,
    };
    match error.downcast::<Redirect>() {
        Ok(redirect) => Ok(redirect.into_response()),
        Err(error) => Err(error),
    }
}
