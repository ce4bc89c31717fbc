//! Path matching backends.
//!
//! A [`Matcher`] turns a registered set of `(method, path)` route
//! descriptors into a fast lookup from an incoming request's path to the
//! route(s) that should handle it, plus whatever parameters the path
//! captured along the way.  Three implementations of the same contract are
//! provided - [`trie`], [`radix`], and [`regexp`] - and a [`crate::Router`]
//! picks one of them at construction time (defaulting to the regexp
//! variant, which is the fastest for large route tables).

pub(crate) mod radix;
pub(crate) mod regexp;
pub(crate) mod trie;

use crate::router::Route;
use crate::UnderError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which [`Matcher`] implementation a [`crate::Router`] should use.
///
/// The default, [`MatcherKind::RegExp`], compiles every parameterized route
/// into a single alternation regular expression, and keeps static routes in
/// a direct hash map; this is the recommended choice for most applications.
/// [`MatcherKind::Trie`] and [`MatcherKind::Radix`] are provided for
/// applications that want to avoid the up-front compile cost of sealing, or
/// that want the (slightly) simpler semantics of a plain segment tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatcherKind {
    /// One node per path segment.
    Trie,
    /// Path-compressed segment tree; nodes may span multiple segments.
    Radix,
    /// Static hash map plus a single compiled alternation regex.
    #[default]
    RegExp,
}

impl MatcherKind {
    pub(crate) fn build(self) -> Box<dyn Matcher> {
        match self {
            MatcherKind::Trie => Box::<trie::TrieMatcher>::default(),
            MatcherKind::Radix => Box::<radix::RadixMatcher>::default(),
            MatcherKind::RegExp => Box::<regexp::RegExpMatcher>::default(),
        }
    }
}

/// The parameters captured while matching a path.
///
/// Named captures (`:name`, `*name`) are available through [`Params::get`];
/// unnamed wildcard captures (`*`) are appended, in path order, to a
/// positional list available through [`Params::positional`].
#[derive(Clone, Debug, Default)]
pub struct Params {
    named: HashMap<Arc<str>, String>,
    positional: Vec<String>,
}

impl Params {
    /// Looks up a named capture.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Iterates over every named capture.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(k, v)| (&**k, v.as_str()))
    }

    /// Returns the unnamed wildcard captures, in the order they were bound.
    pub fn positional(&self) -> &[String] {
        &self.positional[..]
    }

    pub(crate) fn insert_named(&mut self, name: Arc<str>, value: String) {
        self.named.insert(name, value);
    }

    pub(crate) fn push_positional(&mut self, value: String) {
        self.positional.push(value);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

/// A single route, matched against an incoming request.
pub(crate) struct MatchedRoute {
    pub(crate) route: Arc<Route>,
    pub(crate) params: Params,
    /// Middleware collected from the path from root to the matched leaf,
    /// in execution order (root first), already deduplicated.
    pub(crate) middleware: Vec<Arc<dyn crate::Middleware>>,
}

/// The common contract every path-matching backend implements.
///
/// Registration (`add`, `push_middleware`) happens before requests are
/// dispatched; some backends (notably [`regexp::RegExpMatcher`]) seal
/// themselves on first use and reject further registration afterwards.
pub(crate) trait Matcher: Send + Sync + fmt::Debug {
    /// Registers a route.  Fails if the path is malformed, if a wildcard is
    /// not the final segment ([`UnderError::WildcardMisplacement`]), or if
    /// the matcher has already been sealed ([`UnderError::MatcherSealed`]).
    fn add(&mut self, route: Arc<Route>) -> Result<(), UnderError>;

    /// Attaches middleware at the given pattern.  A pattern of `"*"` attaches
    /// globally; a pattern ending in `*` attaches to the subtree rooted at
    /// its prefix; any other pattern attaches to that exact node (which is
    /// created if it does not already exist).
    fn push_middleware(
        &mut self,
        pattern: &str,
        middleware: Arc<dyn crate::Middleware>,
    ) -> Result<(), UnderError>;

    /// Looks up the route (if any) that should handle `(method, path)`.
    fn lookup(&self, method: &http::Method, path: &str) -> Option<MatchedRoute>;

    /// All currently registered routes, in registration order.
    fn routes(&self) -> &[Arc<Route>];

    /// Eagerly prepares the matcher for dispatch. The regexp backend uses
    /// this to precompile its alternation regex ahead of the first request,
    /// rather than paying that cost on the first lookup; the trie and radix
    /// backends have nothing to precompute, so the default no-op applies.
    fn seal(&self) {}
}

/// A single path segment, as parsed from the canonical route syntax:
/// literal segments, `:name` dynamic segments, `*`/`*name` tail wildcards.
/// `name?` optional dynamic segments are expanded into two concrete
/// registrations (with and without the segment) before this type is ever
/// constructed - see [`expand_optional`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Static(String),
    Dynamic(Arc<str>),
    Wildcard(Option<Arc<str>>),
}

impl Segment {
    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard(_))
    }
}

/// Splits a normalized path into segments.  Empty segments (from a leading,
/// trailing, or doubled `/`) are dropped, matching the normalization rule
/// that `/` is the empty segment list.
pub(crate) fn segments_of(path: &str) -> Result<Vec<Segment>, UnderError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(vec![]);
    }

    let mut segments = Vec::new();
    let parts: Vec<&str> = trimmed.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if let Some(name) = part.strip_prefix('*') {
            if i != parts.len() - 1 {
                return Err(UnderError::WildcardMisplacement(path.to_owned()));
            }
            let name = if name.is_empty() {
                None
            } else {
                Some(Arc::from(name))
            };
            segments.push(Segment::Wildcard(name));
        } else if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(UnderError::UnsupportedPath(path.to_owned()));
            }
            segments.push(Segment::Dynamic(Arc::from(name)));
        } else {
            segments.push(Segment::Static((*part).to_owned()));
        }
    }

    Ok(segments)
}

/// Expands a path with a trailing optional dynamic segment (`/:name?`) into
/// the two concrete paths it stands for - one without the segment, one with
/// a plain (non-optional) `:name` in its place.  Any other path is returned
/// unchanged, as a single-element vector.  Per the optional-parameter design
/// note, this expansion happens once, at registration time.
pub(crate) fn expand_optional(path: &str) -> Vec<String> {
    let trimmed = path.trim_end_matches('/');
    if let Some(stripped) = trimmed.strip_suffix('?') {
        if let Some(slash) = stripped.rfind('/') {
            let (head, tail) = stripped.split_at(slash);
            if tail.starts_with("/:") {
                let without = if head.is_empty() { "/" } else { head };
                return vec![without.to_owned(), stripped.to_owned()];
            }
        }
    }
    vec![path.to_owned()]
}

/// Deduplicates a list of middleware by `Arc` pointer identity, keeping the
/// first occurrence of each.
pub(crate) fn dedup_middleware(
    list: Vec<Arc<dyn crate::Middleware>>,
) -> Vec<Arc<dyn crate::Middleware>> {
    let mut seen: Vec<*const ()> = Vec::with_capacity(list.len());
    let mut out = list;
    out.retain(|m| {
        let ptr = Arc::as_ptr(m) as *const ();
        if seen.contains(&ptr) {
            false
        } else {
            seen.push(ptr);
            true
        }
    });
    out
}

/// Collects, reverses, and deduplicates (by `Arc` pointer identity) the
/// middleware gathered while descending to a matched node.  The caller
/// passes middleware in leaf-to-root order (as is natural while climbing
/// back out of a recursive descent); this returns them in root-to-leaf
/// (i.e. execution) order.
pub(crate) fn finish_middleware(
    mut leaf_to_root: Vec<Arc<dyn crate::Middleware>>,
) -> Vec<Arc<dyn crate::Middleware>> {
    leaf_to_root.reverse();
    dedup_middleware(leaf_to_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_of_splits_and_classifies() {
        let segments = segments_of("/heroes/:name/:action").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Static("heroes".to_owned()),
                Segment::Dynamic(Arc::from("name")),
                Segment::Dynamic(Arc::from("action")),
            ]
        );
    }

    #[test]
    fn segments_of_root_is_empty() {
        assert_eq!(segments_of("/").unwrap(), vec![]);
    }

    #[test]
    fn segments_of_rejects_interior_wildcard() {
        assert!(segments_of("/assets/*path/more").is_err());
    }

    #[test]
    fn expand_optional_splits_trailing_dynamic() {
        let expanded = expand_optional("/users/:id?");
        assert_eq!(expanded, vec!["/users".to_owned(), "/users/:id".to_owned()]);
    }

    #[test]
    fn expand_optional_leaves_other_paths_alone() {
        assert_eq!(expand_optional("/users/:id"), vec!["/users/:id".to_owned()]);
    }
}
