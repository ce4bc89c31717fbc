//! The precompiled-regular-expression path matcher.
//!
//! This is the default backend used by [`crate::Router`].  Static routes
//! (no `:`/`*` segments) are kept in a direct hash map; parameterized routes
//! are compiled, once, into a single alternation [`regex::Regex`] where each
//! alternative is wrapped in a uniquely-named group so the matching
//! alternative - and its captures - can be recovered from one regex pass.
//! Registering further routes after the first [`Matcher::lookup`] call (or
//! an explicit [`RegExpMatcher::seal`]) fails with
//! [`UnderError::MatcherSealed`].

use super::{dedup_middleware, expand_optional, segments_of, MatchedRoute, Matcher, Params, Segment};
use crate::router::Route;
use crate::{Middleware, UnderError};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Capture {
    Named(Arc<str>),
    Positional,
}

#[derive(Debug)]
struct Alternative {
    group: String,
    routes: Vec<Arc<Route>>,
    captures: Vec<(String, Capture)>,
}

#[derive(Debug)]
struct Sealed {
    regex: regex::Regex,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default)]
pub(crate) struct RegExpMatcher {
    routes: Vec<Arc<Route>>,
    static_index: HashMap<String, Vec<usize>>,
    dynamic_index: HashMap<String, Vec<usize>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
    node_middleware: Vec<(String, Arc<dyn Middleware>)>,
    subtree_middleware: Vec<(String, Arc<dyn Middleware>)>,
    sealed: Mutex<Option<Sealed>>,
}

impl RegExpMatcher {
    fn seal(&self) -> Sealed {
        let mut alternatives = Vec::new();
        let mut pattern = String::from("^(?:");
        let mut first = true;

        // `dynamic_index` is a HashMap, so its key order is not reproducible
        // across runs; since the regex crate resolves an ambiguous `(?:a|b)`
        // alternation by picking whichever branch appears first, that
        // nondeterminism would leak into match precedence. Sort dynamic
        // paths ahead of wildcard ones (matching the trie/radix backends'
        // static -> dynamic -> wildcard precedence), with a lexicographic
        // tiebreak so the order is fully deterministic either way.
        let mut paths: Vec<&String> = self.dynamic_index.keys().collect();
        paths.sort_by(|a, b| path_has_wildcard(a).cmp(&path_has_wildcard(b)).then_with(|| a.cmp(b)));

        for (i, path) in paths.into_iter().enumerate() {
            let indices = &self.dynamic_index[path];
            let routes: Vec<Arc<Route>> = indices.iter().map(|&i| self.routes[i].clone()).collect();
            let segments = segments_of(path).expect("registered path must be well-formed");
            let group = format!("r{}", i);
            let mut captures = Vec::new();
            let mut body = String::new();
            for segment in &segments {
                body.push('/');
                match segment {
                    Segment::Static(literal) => body.push_str(&regex::escape(literal)),
                    Segment::Dynamic(name) => {
                        let gname = format!("{}_{}", group, sanitize(name));
                        let _ = write!(body, "(?P<{}>[^/]+)", gname);
                        captures.push((gname, Capture::Named(name.clone())));
                    }
                    Segment::Wildcard(name) => {
                        let gname = format!("{}_w", group);
                        let _ = write!(body, "(?P<{}>.*)", gname);
                        match name {
                            Some(n) => captures.push((gname, Capture::Named(n.clone()))),
                            None => captures.push((gname, Capture::Positional)),
                        }
                    }
                }
            }
            if !first {
                pattern.push('|');
            }
            first = false;
            let _ = write!(pattern, "(?P<{}>{})", group, body);
            alternatives.push(Alternative {
                group,
                routes,
                captures,
            });
            static_map.insert(path.clone(), ());
        }
        pattern.push_str(")$");

        let regex = if alternatives.is_empty() {
            regex::Regex::new("^\\z\\A(?!)$").expect("never matches")
        } else {
            regex::Regex::new(&pattern).expect("matcher produced an invalid regex")
        };

        Sealed {
            regex,
            alternatives,
        }
    }

    fn ensure_sealed(&self) -> std::sync::MutexGuard<'_, Option<Sealed>> {
        let mut guard = self.sealed.lock().unwrap();
        if guard.is_none() {
            let sealed = self.seal();
            *guard = Some(sealed);
        }
        guard
    }

    fn is_sealed(&self) -> bool {
        self.sealed.lock().unwrap().is_some()
    }

    fn normalized_key(path: &str) -> String {
        let trimmed = path.trim_matches('/');
        format!("/{}", trimmed)
    }

    fn is_dynamic(path: &str) -> bool {
        path.contains(':') || path.contains('*')
    }

    fn collect_middleware(&self, matched_path: &str) -> Vec<Arc<dyn Middleware>> {
        let mut collected: Vec<Arc<dyn Middleware>> = self.global_middleware.clone();
        for (prefix, mw) in &self.subtree_middleware {
            if under_prefix(matched_path, prefix) {
                collected.push(mw.clone());
            }
        }
        for (node, mw) in &self.node_middleware {
            if node == matched_path {
                collected.push(mw.clone());
            }
        }
        dedup_middleware(collected)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Whether `path`'s final segment is a wildcard, used to rank dynamic
/// alternatives ahead of wildcard ones when sealing (wildcards are only ever
/// valid as the final segment, so checking the last one suffices).
fn path_has_wildcard(path: &str) -> bool {
    segments_of(path)
        .ok()
        .and_then(|segments| segments.last().map(Segment::is_wildcard))
        .unwrap_or(false)
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() || prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

impl Matcher for RegExpMatcher {
    fn add(&mut self, route: Arc<Route>) -> Result<(), UnderError> {
        if self.is_sealed() {
            return Err(UnderError::MatcherSealed);
        }

        for expanded in expand_optional(&route.path) {
            let segments = segments_of(&expanded)?;
            let key = Self::normalized_key(&expanded);
            let index = self.routes.len();
            self.routes.push(route.clone());

            let table = if Self::is_dynamic(&expanded) {
                &mut self.dynamic_index
            } else {
                &mut self.static_index
            };

            let entry = table.entry(key).or_default();
            if let Some(pos) = entry
                .iter()
                .position(|&i| self.routes[i].matches_exact(route.method()))
            {
                entry[pos] = index;
            } else {
                entry.push(index);
            }

            let _ = &segments;
        }

        Ok(())
    }

    fn push_middleware(
        &mut self,
        pattern: &str,
        middleware: Arc<dyn Middleware>,
    ) -> Result<(), UnderError> {
        if pattern == "*" {
            self.global_middleware.push(middleware);
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            self.subtree_middleware
                .push((Self::normalized_key(prefix.trim_end_matches('/')), middleware));
        } else {
            self.node_middleware
                .push((Self::normalized_key(pattern), middleware));
        }
        Ok(())
    }

    fn lookup(&self, method: &http::Method, path: &str) -> Option<MatchedRoute> {
        let key = Self::normalized_key(path);

        // Sealing must happen on the first `match()` call regardless of
        // which index answers it, so `add()` reliably rejects registration
        // afterwards (see `UnderError::MatcherSealed`).
        let guard = self.ensure_sealed();

        if let Some(indices) = self.static_index.get(&key) {
            if let Some(&idx) = indices.iter().rev().find(|&&i| self.routes[i].matches(method)) {
                let route = self.routes[idx].clone();
                let middleware = self.collect_middleware(&key);
                return Some(MatchedRoute {
                    route,
                    params: Params::default(),
                    middleware,
                });
            }
        }

        let sealed = guard.as_ref()?;
        let captures = sealed.regex.captures(path)?;

        for alt in &sealed.alternatives {
            if captures.name(&alt.group).is_none() {
                continue;
            }

            let route = alt
                .routes
                .iter()
                .rev()
                .find(|r| r.matches(method))?
                .clone();

            let mut params = Params::default();
            for (gname, capture) in &alt.captures {
                if let Some(m) = captures.name(gname) {
                    match capture {
                        Capture::Named(name) => {
                            params.insert_named(name.clone(), m.as_str().to_owned())
                        }
                        Capture::Positional => params.push_positional(m.as_str().to_owned()),
                    }
                }
            }

            let middleware = self.collect_middleware(&key);
            return Some(MatchedRoute {
                route,
                params,
                middleware,
            });
        }

        None
    }

    fn routes(&self) -> &[Arc<Route>] {
        &self.routes[..]
    }

    fn seal(&self) {
        let _ = self.ensure_sealed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Route;

    fn route(method: http::Method, path: &str) -> Arc<Route> {
        Route::test_route(method, path)
    }

    #[test]
    fn static_route_skips_the_regex_entirely() {
        let mut m = RegExpMatcher::default();
        m.add(route(http::Method::GET, "/users/me")).unwrap();
        m.add(route(http::Method::GET, "/users/:id")).unwrap();

        let matched = m.lookup(&http::Method::GET, "/users/me").unwrap();
        assert_eq!(matched.route.path, "/users/me");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn dynamic_route_captures_named_params() {
        let mut m = RegExpMatcher::default();
        m.add(route(http::Method::GET, "/heroes/:name/:action"))
            .unwrap();

        let matched = m
            .lookup(&http::Method::GET, "/heroes/spiderman/save")
            .unwrap();
        assert_eq!(matched.params.get("name"), Some("spiderman"));
        assert_eq!(matched.params.get("action"), Some("save"));
    }

    #[test]
    fn wildcard_captures_remainder() {
        let mut m = RegExpMatcher::default();
        m.add(route(http::Method::GET, "/assets/*path")).unwrap();

        let matched = m
            .lookup(&http::Method::GET, "/assets/images/logo.png")
            .unwrap();
        assert_eq!(matched.params.get("path"), Some("images/logo.png"));
    }

    #[test]
    fn add_after_lookup_is_sealed() {
        let mut m = RegExpMatcher::default();
        m.add(route(http::Method::GET, "/a")).unwrap();
        let _ = m.lookup(&http::Method::GET, "/a");
        let err = m.add(route(http::Method::GET, "/b")).unwrap_err();
        assert!(matches!(err, UnderError::MatcherSealed));
    }

    #[test]
    fn missing_route_is_none() {
        let mut m = RegExpMatcher::default();
        m.add(route(http::Method::GET, "/a")).unwrap();
        assert!(m.lookup(&http::Method::GET, "/omega").is_none());
    }
}
