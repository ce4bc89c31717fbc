//! A standalone, dependency-light cookie wire-format codec.
//!
//! This intentionally does not delegate to the `cookie` crate's own
//! `Display`/`FromStr` implementations: this module's attribute ordering and
//! validation rules are a fixed contract ([`serialize`] always emits
//! attributes in the order `Max-Age, Domain, Expires, HttpOnly, Partitioned,
//! Path, SameSite, Priority, Secure`), where the `cookie` crate leaves
//! ordering and some validation up to the caller. The `cookie` crate is still
//! used elsewhere (see [`crate::middleware::CookieMiddleware`]) for the
//! jar-as-extension convenience layer; this module only concerns itself with
//! the bytes that go on the wire.

use crate::UnderError;
use std::fmt::Write as _;

/// How a cookie's `SameSite` attribute restricts cross-site sending.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    fn parse(value: &str) -> Result<Self, UnderError> {
        match value {
            "Strict" | "strict" => Ok(SameSite::Strict),
            "Lax" | "lax" => Ok(SameSite::Lax),
            "None" | "none" => Ok(SameSite::None),
            other => Err(UnderError::InvalidCookieOption(other.to_string(), "SameSite")),
        }
    }
}

/// A non-standard but widely supported `Priority` attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    fn parse(value: &str) -> Result<Self, UnderError> {
        match value {
            "Low" | "low" => Ok(Priority::Low),
            "Medium" | "medium" => Ok(Priority::Medium),
            "High" | "high" => Ok(Priority::High),
            other => Err(UnderError::InvalidCookieOption(other.to_string(), "Priority")),
        }
    }
}

/// The attributes of a cookie, aside from its name and value.
///
/// [`serialize`] always emits whichever of these are set in the fixed order
/// `Max-Age, Domain, Expires, HttpOnly, Partitioned, Path, SameSite,
/// Priority, Secure`, regardless of the order they were set on the builder.
#[derive(Debug, Default, Clone)]
pub struct CookieOptions {
    max_age: Option<i64>,
    domain: Option<String>,
    expires: Option<String>,
    http_only: bool,
    partitioned: bool,
    path: Option<String>,
    same_site: Option<SameSite>,
    priority: Option<Priority>,
    secure: bool,
}

impl CookieOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Expires` attribute verbatim; callers are responsible for
    /// providing an RFC 7231 `HTTP-date`.
    #[must_use]
    pub fn expires(mut self, http_date: impl Into<String>) -> Self {
        self.expires = Some(http_date.into());
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

fn is_valid_name_char(c: char) -> bool {
    matches!(c, '!' | '#'..='\'' | '*' | '+' | '-' | '.' | '^'..='`' | '|' | '~' | '0'..='9' | 'A'..='Z' | 'a'..='z')
}

fn is_valid_cookie_octet(c: char) -> bool {
    matches!(c, '\u{21}' | '\u{23}'..='\u{2B}' | '\u{2D}'..='\u{3A}' | '\u{3C}'..='\u{5B}' | '\u{5D}'..='\u{7E}')
}

fn is_valid_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

fn is_valid_path_char(c: char) -> bool {
    // any CHAR except CTL or ";"
    !c.is_ascii_control() && c != ';'
}

fn validate_name(name: &str) -> Result<(), UnderError> {
    if !name.is_empty() && name.chars().all(is_valid_name_char) {
        Ok(())
    } else {
        Err(UnderError::InvalidCookieName(name.to_string()))
    }
}

fn validate_value(value: &str) -> Result<(), UnderError> {
    if value.chars().all(is_valid_cookie_octet) {
        Ok(())
    } else {
        Err(UnderError::InvalidCookieValue(value.to_string()))
    }
}

fn validate_domain(domain: &str) -> Result<(), UnderError> {
    if !domain.is_empty() && domain.chars().all(is_valid_domain_char) {
        Ok(())
    } else {
        Err(UnderError::InvalidCookieDomain(domain.to_string()))
    }
}

fn validate_path(path: &str) -> Result<(), UnderError> {
    if path.starts_with('/') && path.chars().all(is_valid_path_char) {
        Ok(())
    } else {
        Err(UnderError::InvalidCookiePath(path.to_string()))
    }
}

/// Serializes a cookie name/value pair and its attributes into a single
/// `Set-Cookie` header value.
///
/// # Errors
/// Returns an error if the name, value, domain, or path contain characters
/// outside of their respective character classes, or if the `SameSite` value
/// is not recognized.
pub fn serialize(name: &str, value: &str, options: &CookieOptions) -> Result<String, UnderError> {
    validate_name(name)?;
    validate_value(value)?;
    if let Some(domain) = &options.domain {
        validate_domain(domain)?;
    }
    if let Some(path) = &options.path {
        validate_path(path)?;
    }

    let mut out = String::with_capacity(name.len() + value.len() + 32);
    let _ = write!(out, "{}={}", name, value);

    if let Some(max_age) = options.max_age {
        let _ = write!(out, "; Max-Age={}", max_age);
    }
    if let Some(domain) = &options.domain {
        let _ = write!(out, "; Domain={}", domain);
    }
    if let Some(expires) = &options.expires {
        let _ = write!(out, "; Expires={}", expires);
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if options.partitioned {
        out.push_str("; Partitioned");
    }
    if let Some(path) = &options.path {
        let _ = write!(out, "; Path={}", path);
    }
    if let Some(same_site) = options.same_site {
        let _ = write!(out, "; SameSite={}", same_site.as_str());
    }
    if let Some(priority) = options.priority {
        let _ = write!(out, "; Priority={}", priority.as_str());
    }
    if options.secure {
        out.push_str("; Secure");
    }

    Ok(out)
}

/// Parses a `Cookie` request header into its name/value pairs.
///
/// Splits on `;`, trims surrounding whitespace, strips matching surrounding
/// double quotes, and URL-decodes values. Malformed segments (those with no
/// `=`) are ignored. When a name appears more than once, the first
/// occurrence wins.
#[must_use]
pub fn parse(header: &str) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut pairs = Vec::new();

    for segment in header.split(';') {
        let segment = segment.trim();
        let Some(eq) = segment.find('=') else {
            continue;
        };
        let name = segment[..eq].trim();
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }
        let mut value = segment[eq + 1..].trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        let decoded = percent_decode(value);
        pairs.push((name.to_string(), decoded));
    }

    pairs
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_minimal() {
        let opts = CookieOptions::new();
        assert_eq!(serialize("foo", "bar", &opts).unwrap(), "foo=bar");
    }

    #[test]
    fn serialize_attribute_order() {
        let opts = CookieOptions::new()
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .domain("example.com")
            .max_age(60);
        assert_eq!(
            serialize("foo", "bar", &opts).unwrap(),
            "foo=bar; Max-Age=60; Domain=example.com; HttpOnly; Path=/; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn serialize_rejects_bad_name() {
        let opts = CookieOptions::new();
        assert!(serialize("foo bar", "baz", &opts).is_err());
    }

    #[test]
    fn serialize_rejects_bad_same_site() {
        // constructed through the strict enum, so this path is only
        // reachable by parsing an externally supplied string.
        assert!(SameSite::parse("Loose").is_err());
        assert!(SameSite::parse("Strict").is_ok());
    }

    #[test]
    fn parse_basic() {
        let pairs = parse("foo=bar; baz=qux");
        assert_eq!(
            pairs,
            vec![("foo".to_string(), "bar".to_string()), ("baz".to_string(), "qux".to_string())]
        );
    }

    #[test]
    fn parse_first_occurrence_wins() {
        let pairs = parse("foo=first; foo=second");
        assert_eq!(pairs, vec![("foo".to_string(), "first".to_string())]);
    }

    #[test]
    fn parse_strips_quotes_and_decodes() {
        let pairs = parse(r#"foo="hello%20world""#);
        assert_eq!(pairs, vec![("foo".to_string(), "hello world".to_string())]);
    }

    #[test]
    fn parse_ignores_malformed_segments() {
        let pairs = parse("foo=bar; malformed; baz=qux");
        assert_eq!(
            pairs,
            vec![("foo".to_string(), "bar".to_string()), ("baz".to_string(), "qux".to_string())]
        );
    }
}
