//! The trie path matcher.
//!
//! One node per path segment.  Simple and predictable: registration order
//! only matters for which route wins when two registrations collide on the
//! exact same `(method, path)`; traversal at each node always tries a
//! static child first, then the dynamic child, then the wildcard child.

use super::{dedup_middleware, expand_optional, segments_of, MatchedRoute, Matcher, Params, Segment};
use crate::router::Route;
use crate::{Middleware, UnderError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Node {
    static_children: HashMap<String, Node>,
    dynamic_child: Option<(Arc<str>, Box<Node>)>,
    wildcard_child: Option<(Option<Arc<str>>, Box<Node>)>,
    routes: Vec<Arc<Route>>,
    exact_middleware: Vec<Arc<dyn Middleware>>,
    subtree_middleware: Vec<Arc<dyn Middleware>>,
}

enum Capture {
    Named(Arc<str>, String),
    Positional(String),
}

impl Node {
    fn child_mut(&mut self, segment: &Segment) -> &mut Node {
        match segment {
            Segment::Static(literal) => self.static_children.entry(literal.clone()).or_default(),
            Segment::Dynamic(name) => {
                &mut *self
                    .dynamic_child
                    .get_or_insert_with(|| (name.clone(), Box::default()))
                    .1
            }
            Segment::Wildcard(name) => {
                &mut *self
                    .wildcard_child
                    .get_or_insert_with(|| (name.clone(), Box::default()))
                    .1
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TrieMatcher {
    root: Node,
    routes: Vec<Arc<Route>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
}

impl TrieMatcher {
    fn find<'a>(
        node: &'a Node,
        segments: &[&str],
        trail: &mut Vec<&'a Node>,
        captures: &mut Vec<Capture>,
    ) -> bool {
        trail.push(node);

        let Some((head, rest)) = segments.split_first() else {
            return true;
        };

        if let Some(child) = node.static_children.get(*head) {
            if Self::find(child, rest, trail, captures) {
                return true;
            }
        }

        if let Some((name, child)) = &node.dynamic_child {
            captures.push(Capture::Named(name.clone(), (*head).to_owned()));
            if Self::find(child, rest, trail, captures) {
                return true;
            }
            captures.pop();
        }

        if let Some((name, child)) = &node.wildcard_child {
            let remainder = segments.join("/");
            match name {
                Some(n) => captures.push(Capture::Named(n.clone(), remainder)),
                None => captures.push(Capture::Positional(remainder)),
            }
            trail.push(child);
            return true;
        }

        trail.pop();
        false
    }

    fn collect_middleware(trail: &[&Node]) -> Vec<Arc<dyn Middleware>> {
        let mut collected = Vec::new();
        for (i, node) in trail.iter().enumerate() {
            collected.extend(node.subtree_middleware.iter().cloned());
            if i == trail.len() - 1 {
                collected.extend(node.exact_middleware.iter().cloned());
            }
        }
        collected
    }
}

impl Matcher for TrieMatcher {
    fn add(&mut self, route: Arc<Route>) -> Result<(), UnderError> {
        for expanded in expand_optional(&route.path) {
            let segments = segments_of(&expanded)?;
            let mut node = &mut self.root;
            for segment in &segments {
                node = node.child_mut(segment);
            }

            if let Some(pos) = node
                .routes
                .iter()
                .position(|r| r.matches_exact(route.method()))
            {
                node.routes[pos] = route.clone();
            } else {
                node.routes.push(route.clone());
            }
        }

        self.routes.push(route);
        Ok(())
    }

    fn push_middleware(
        &mut self,
        pattern: &str,
        middleware: Arc<dyn Middleware>,
    ) -> Result<(), UnderError> {
        if pattern == "*" {
            self.global_middleware.push(middleware);
            return Ok(());
        }

        let (prefix, subtree) = match pattern.strip_suffix('*') {
            Some(p) => (p.trim_end_matches('/'), true),
            None => (pattern, false),
        };

        let segments = segments_of(prefix)?;
        let mut node = &mut self.root;
        for segment in &segments {
            node = node.child_mut(segment);
        }

        if subtree {
            node.subtree_middleware.push(middleware);
        } else {
            node.exact_middleware.push(middleware);
        }
        Ok(())
    }

    fn lookup(&self, method: &http::Method, path: &str) -> Option<MatchedRoute> {
        let trimmed = path.trim_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            vec![]
        } else {
            trimmed.split('/').collect()
        };

        let mut trail = Vec::new();
        let mut captures = Vec::new();
        if !Self::find(&self.root, &segments[..], &mut trail, &mut captures) {
            return None;
        }

        let terminal = *trail.last()?;
        let route = terminal
            .routes
            .iter()
            .rev()
            .find(|r| r.matches(method))?
            .clone();

        let mut params = Params::default();
        for capture in captures {
            match capture {
                Capture::Named(name, value) => params.insert_named(name, value),
                Capture::Positional(value) => params.push_positional(value),
            }
        }

        let mut middleware = self.global_middleware.clone();
        middleware.extend(Self::collect_middleware(&trail[..]));
        let middleware = dedup_middleware(middleware);

        Some(MatchedRoute {
            route,
            params,
            middleware,
        })
    }

    fn routes(&self) -> &[Arc<Route>] {
        &self.routes[..]
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
    fn static_wins_over_dynamic() {
        let mut m = TrieMatcher::default();
        m.add(route(http::Method::GET, "/users/:id")).unwrap();
        m.add(route(http::Method::GET, "/users/me")).unwrap();

        let matched = m.lookup(&http::Method::GET, "/users/me").unwrap();
        assert_eq!(matched.route.path, "/users/me");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn dynamic_only_tried_after_static_fails() {
        let mut m = TrieMatcher::default();
        m.add(route(http::Method::GET, "/users/:id")).unwrap();
        m.add(route(http::Method::GET, "/users/me")).unwrap();

        let matched = m.lookup(&http::Method::GET, "/users/123").unwrap();
        assert_eq!(matched.route.path, "/users/:id");
        assert_eq!(matched.params.get("id"), Some("123"));
    }

    #[test]
    fn wildcard_collects_remainder() {
        let mut m = TrieMatcher::default();
        m.add(route(http::Method::GET, "/assets/*path")).unwrap();

        let matched = m
            .lookup(&http::Method::GET, "/assets/images/logo.png")
            .unwrap();
        assert_eq!(matched.params.get("path"), Some("images/logo.png"));
    }

    #[test]
    fn subtree_middleware_applies_to_descendants() {
        use crate::middleware::TraceMiddleware;

        let mut m = TrieMatcher::default();
        m.add(route(http::Method::GET, "/api/x")).unwrap();
        m.push_middleware("/api/*", Arc::new(TraceMiddleware::new()))
            .unwrap();

        let matched = m.lookup(&http::Method::GET, "/api/x").unwrap();
        assert_eq!(matched.middleware.len(), 1);
    }

    #[test]
    fn missing_route_is_none() {
        let mut m = TrieMatcher::default();
        m.add(route(http::Method::GET, "/a")).unwrap();
        assert!(m.lookup(&http::Method::GET, "/omega").is_none());
    }
}
