//! The radix (path-compressed) path matcher.
//!
//! Structurally identical to [`super::trie`] in its matching semantics -
//! static, then dynamic, then wildcard children - but static edges are
//! compacted: a chain of literal segments with no branch point is stored as
//! a single edge rather than one node per segment. Inserting a path that
//! diverges partway through an existing edge splits that edge in two.

use super::{dedup_middleware, expand_optional, segments_of, MatchedRoute, Matcher, Params, Segment};
use crate::router::Route;
use crate::{Middleware, UnderError};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Node {
    /// The literal segments this edge represents, relative to its parent.
    prefix: Vec<String>,
    children: Vec<Node>,
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

fn common_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Ensures a static child edge exists for exactly `run`, splitting or
/// creating nodes as necessary, and returns a reference to it.
fn ensure_static_path<'a>(children: &'a mut Vec<Node>, run: &[String]) -> &'a mut Node {
    for i in 0..children.len() {
        let common = common_len(&children[i].prefix, run);
        if common == 0 {
            continue;
        }

        if common < children[i].prefix.len() {
            split_child(&mut children[i], common);
        }

        return if common == run.len() {
            &mut children[i]
        } else {
            ensure_static_path(&mut children[i].children, &run[common..])
        };
    }

    children.push(Node {
        prefix: run.to_vec(),
        ..Node::default()
    });
    let last = children.len() - 1;
    &mut children[last]
}

fn split_child(node: &mut Node, at: usize) {
    let tail_prefix = node.prefix.split_off(at);
    let tail_node = Node {
        prefix: tail_prefix,
        children: std::mem::take(&mut node.children),
        dynamic_child: node.dynamic_child.take(),
        wildcard_child: node.wildcard_child.take(),
        routes: std::mem::take(&mut node.routes),
        exact_middleware: std::mem::take(&mut node.exact_middleware),
        subtree_middleware: std::mem::take(&mut node.subtree_middleware),
    };
    node.children = vec![tail_node];
}

fn insert<'a>(node: &'a mut Node, segments: &[Segment]) -> &'a mut Node {
    let Some(first) = segments.first() else {
        return node;
    };

    match first {
        Segment::Dynamic(name) => {
            let child = node
                .dynamic_child
                .get_or_insert_with(|| (name.clone(), Box::default()));
            child.0 = name.clone();
            insert(&mut child.1, &segments[1..])
        }
        Segment::Wildcard(name) => {
            let child = node
                .wildcard_child
                .get_or_insert_with(|| (name.clone(), Box::default()));
            child.0 = name.clone();
            &mut child.1
        }
        Segment::Static(_) => {
            let run_len = segments
                .iter()
                .take_while(|s| matches!(s, Segment::Static(_)))
                .count();
            let run: Vec<String> = segments[..run_len]
                .iter()
                .map(|s| match s {
                    Segment::Static(literal) => literal.clone(),
                    _ => unreachable!(),
                })
                .collect();
            let target = ensure_static_path(&mut node.children, &run);
            insert(target, &segments[run_len..])
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RadixMatcher {
    root: Node,
    routes: Vec<Arc<Route>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
}

impl RadixMatcher {
    fn find<'a>(
        node: &'a Node,
        segments: &[&str],
        trail: &mut Vec<&'a Node>,
        captures: &mut Vec<Capture>,
    ) -> bool {
        trail.push(node);

        if segments.is_empty() {
            return true;
        }

        for child in &node.children {
            let len = child.prefix.len();
            if len <= segments.len() && child.prefix.iter().zip(segments).all(|(a, b)| a == b) {
                if Self::find(child, &segments[len..], trail, captures) {
                    return true;
                }
            }
        }

        if let Some((name, child)) = &node.dynamic_child {
            captures.push(Capture::Named(name.clone(), segments[0].to_owned()));
            if Self::find(child, &segments[1..], trail, captures) {
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

impl Matcher for RadixMatcher {
    fn add(&mut self, route: Arc<Route>) -> Result<(), UnderError> {
        for expanded in expand_optional(&route.path) {
            let segments = segments_of(&expanded)?;
            let node = insert(&mut self.root, &segments);

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
        let node = insert(&mut self.root, &segments);

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
    fn compacts_shared_literal_runs() {
        let mut m = RadixMatcher::default();
        m.add(route(http::Method::GET, "/users/active/count"))
            .unwrap();
        m.add(route(http::Method::GET, "/users/active/list"))
            .unwrap();

        assert_eq!(m.root.children.len(), 1);
        let shared = &m.root.children[0];
        assert_eq!(shared.prefix, vec!["users".to_owned(), "active".to_owned()]);
        assert_eq!(shared.children.len(), 2);
    }

    #[test]
    fn splits_on_divergence() {
        let mut m = RadixMatcher::default();
        m.add(route(http::Method::GET, "/users/active"))
            .unwrap();
        m.add(route(http::Method::GET, "/users/banned"))
            .unwrap();

        let matched_active = m.lookup(&http::Method::GET, "/users/active").unwrap();
        let matched_banned = m.lookup(&http::Method::GET, "/users/banned").unwrap();
        assert_eq!(matched_active.route.path, "/users/active");
        assert_eq!(matched_banned.route.path, "/users/banned");
    }

    #[test]
    fn static_wins_over_dynamic() {
        let mut m = RadixMatcher::default();
        m.add(route(http::Method::GET, "/users/:id")).unwrap();
        m.add(route(http::Method::GET, "/users/me")).unwrap();

        let matched = m.lookup(&http::Method::GET, "/users/me").unwrap();
        assert_eq!(matched.route.path, "/users/me");
    }

    #[test]
    fn wildcard_collects_remainder() {
        let mut m = RadixMatcher::default();
        m.add(route(http::Method::GET, "/assets/*path")).unwrap();

        let matched = m
            .lookup(&http::Method::GET, "/assets/images/logo.png")
            .unwrap();
        assert_eq!(matched.params.get("path"), Some("images/logo.png"));
    }

    #[test]
    fn missing_route_is_none() {
        let mut m = RadixMatcher::default();
        m.add(route(http::Method::GET, "/a")).unwrap();
        assert!(m.lookup(&http::Method::GET, "/omega").is_none());
    }
}
