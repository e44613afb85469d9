//! Segment trie: one tree of path segments per HTTP method.
//!
//! Patterns are split on `/` and stored one node per segment. Literal
//! segments live in a map keyed by their text; parameter segments
//! (`{name}` / `{name:regex}`) live in an ordered list, with insertion order
//! as the tie-break when several constrained parameters could match.
//!
//! Lookup is non-backtracking across kinds: an exact literal child always
//! wins at its level, and once chosen its subtree is never abandoned in
//! favour of a parameter sibling. Parameter siblings do fall through to one
//! another. This is a deliberate simplification over full backtracking radix
//! matchers and is part of the routing contract, not an optimisation to fix.
//!
//! Trees are built during registration and only read afterwards — `find`
//! takes `&self`, so a frozen router shares them across requests without
//! locks.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::interceptor::Interceptor;

/// One segment trie. The root matches the bare `/` path.
pub(crate) struct Tree {
    root: Node,
}

/// One trie vertex.
pub(crate) struct Node {
    /// The raw pattern segment this node was created from (`users`, `{id}`,
    /// `{id:[0-9]+}`). Param children are deduplicated by this text, so
    /// registering `/a/{id}/x` and `/a/{id}/y` shares one `{id}` node.
    segment: String,
    param: Option<ParamSpec>,
    literal_children: HashMap<String, Node>,
    param_children: Vec<Node>,
    handler: Option<BoxedHandler>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

struct ParamSpec {
    name: String,
    constraint: Option<Regex>,
}

impl ParamSpec {
    /// Returns the captured text when `segment` satisfies this parameter.
    ///
    /// Unconstrained parameters accept any non-empty segment whole; a
    /// constrained parameter captures the first non-empty match its regex
    /// finds inside the segment.
    fn capture<'s>(&self, segment: &'s str) -> Option<&'s str> {
        match &self.constraint {
            None => (!segment.is_empty()).then_some(segment),
            Some(re) => re
                .find(segment)
                .map(|m| m.as_str())
                .filter(|m| !m.is_empty()),
        }
    }
}

/// A successful lookup: the terminal node's handler, its route-bound
/// interceptors, and the captured path parameters.
pub(crate) struct RouteMatch<'t> {
    pub(crate) handler: &'t BoxedHandler,
    pub(crate) interceptors: &'t [Arc<dyn Interceptor>],
    pub(crate) params: HashMap<String, String>,
}

impl Node {
    fn new(segment: &str, param: Option<ParamSpec>) -> Self {
        Self {
            segment: segment.to_owned(),
            param,
            literal_children: HashMap::new(),
            param_children: Vec::new(),
            handler: None,
            interceptors: Vec::new(),
        }
    }

    fn descend<'t>(
        &'t self,
        segments: &[&str],
        params: &mut HashMap<String, String>,
    ) -> Option<&'t Node> {
        let Some((&segment, rest)) = segments.split_first() else {
            return Some(self);
        };
        if let Some(child) = self.literal_children.get(segment) {
            // Literal wins; no fallback into param siblings from here.
            return child.descend(rest, params);
        }
        for child in &self.param_children {
            let Some(spec) = child.param.as_ref() else {
                continue;
            };
            let Some(captured) = spec.capture(segment) else {
                continue;
            };
            if let Some(found) = child.descend(rest, params) {
                params.insert(spec.name.clone(), captured.to_owned());
                return Some(found);
            }
        }
        None
    }
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            root: Node::new("/", None),
        }
    }

    /// Registers `handler` under `pattern`, creating missing nodes along the
    /// walk. Fails on a duplicate terminal handler or an uncompilable
    /// parameter constraint; it never overwrites an existing registration.
    pub(crate) fn add(
        &mut self,
        pattern: &str,
        handler: BoxedHandler,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<(), Error> {
        let mut current = &mut self.root;
        if pattern != current.segment {
            for segment in pattern.trim_start_matches('/').split('/') {
                match parse_param(segment)? {
                    None => {
                        current = current
                            .literal_children
                            .entry(segment.to_owned())
                            .or_insert_with(|| Node::new(segment, None));
                    }
                    Some(spec) => {
                        let idx = match current
                            .param_children
                            .iter()
                            .position(|n| n.segment == segment)
                        {
                            Some(idx) => idx,
                            None => {
                                current.param_children.push(Node::new(segment, Some(spec)));
                                current.param_children.len() - 1
                            }
                        };
                        current = &mut current.param_children[idx];
                    }
                }
            }
        }
        if current.handler.is_some() {
            return Err(Error::DuplicateRoute(pattern.to_owned()));
        }
        current.handler = Some(handler);
        current.interceptors = interceptors;
        Ok(())
    }

    /// Resolves a concrete path to a registered route.
    ///
    /// A node only matches once all segments are consumed *and* it owns a
    /// handler; partially-bound parameters from failed branches never leak
    /// into the returned map.
    pub(crate) fn find(&self, path: &str) -> Option<RouteMatch<'_>> {
        let mut params = HashMap::new();
        let node = if path == self.root.segment {
            &self.root
        } else {
            let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            self.root.descend(&segments, &mut params)?
        };
        let handler = node.handler.as_ref()?;
        Some(RouteMatch {
            handler,
            interceptors: &node.interceptors,
            params,
        })
    }
}

/// Parses the parameter-delimiter syntax.
///
/// Returns `None` for a literal segment. Inside braces, the first `:`
/// divides name from constraint; a trailing `:` with nothing after it is
/// treated as name-only.
fn parse_param(segment: &str) -> Result<Option<ParamSpec>, Error> {
    if segment.len() < 2 || !segment.starts_with('{') || !segment.ends_with('}') {
        return Ok(None);
    }
    let inner = &segment[1..segment.len() - 1];
    let spec = match inner.find(':') {
        None => ParamSpec {
            name: inner.to_owned(),
            constraint: None,
        },
        Some(idx) if idx == inner.len() - 1 => ParamSpec {
            name: inner[..idx].to_owned(),
            constraint: None,
        },
        Some(idx) => {
            let (name, pattern) = (&inner[..idx], &inner[idx + 1..]);
            let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                name: name.to_owned(),
                pattern: pattern.to_owned(),
                source,
            })?;
            ParamSpec {
                name: name.to_owned(),
                constraint: Some(regex),
            }
        }
    };
    Ok(Some(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::Handler;
    use crate::render::Payload;

    fn noop() -> BoxedHandler {
        async fn h(_ctx: Arc<Context>) -> Option<Payload> {
            None
        }
        h.into_boxed_handler()
    }

    fn tree_with(patterns: &[&str]) -> Tree {
        let mut tree = Tree::new();
        for pattern in patterns {
            tree.add(pattern, noop(), Vec::new()).unwrap();
        }
        tree
    }

    #[test]
    fn exact_literal_path_matches_with_empty_params() {
        let tree = tree_with(&["/users/active", "/health"]);
        let matched = tree.find("/users/active").unwrap();
        assert!(matched.params.is_empty());
        assert!(tree.find("/health").is_some());
        assert!(tree.find("/users").is_none());
        assert!(tree.find("/users/active/extra").is_none());
    }

    #[test]
    fn root_path_matches_only_when_registered() {
        let bare = tree_with(&["/ping"]);
        assert!(bare.find("/").is_none());

        let rooted = tree_with(&["/"]);
        assert!(rooted.find("/").is_some());
    }

    #[test]
    fn unconstrained_param_captures_any_nonempty_segment() {
        let tree = tree_with(&["/users/{id}"]);
        let matched = tree.find("/users/42").unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("42"));

        let matched = tree.find("/users/alice").unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("alice"));

        assert!(tree.find("/users//").is_none());
    }

    #[test]
    fn constrained_param_rejects_nonmatching_segments() {
        let tree = tree_with(&["/users/{id:[0-9]+}"]);
        let matched = tree.find("/users/7").unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("7"));
        assert!(tree.find("/users/abc").is_none());
    }

    #[test]
    fn literal_child_beats_param_child_at_same_depth() {
        let tree = tree_with(&["/users/active", "/users/{id}"]);

        let matched = tree.find("/users/active").unwrap();
        assert!(matched.params.is_empty());

        let matched = tree.find("/users/42").unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn literal_subtree_is_not_abandoned_for_param_sibling() {
        // `/files/special` exists as a literal, so `/files/special/data`
        // descends into the literal subtree, finds nothing, and does not
        // retry `{name}/data`.
        let tree = tree_with(&["/files/special", "/files/{name}/data"]);
        assert!(tree.find("/files/special/data").is_none());
        assert!(tree.find("/files/other/data").is_some());
    }

    #[test]
    fn param_siblings_fall_through_in_insertion_order() {
        let tree = tree_with(&["/v/{num:[0-9]+}/n", "/v/{word:[a-z]+}/w"]);

        let matched = tree.find("/v/12/n").unwrap();
        assert_eq!(matched.params.get("num").map(String::as_str), Some("12"));

        let matched = tree.find("/v/ab/w").unwrap();
        assert_eq!(matched.params.get("word").map(String::as_str), Some("ab"));

        // Satisfies the first constraint but only the second's suffix: the
        // first child is tried, fails deeper, and the scan moves on.
        assert!(tree.find("/v/12/w").is_none());
    }

    #[test]
    fn failed_branches_leave_no_param_bindings() {
        let tree = tree_with(&["/a/{x}/end"]);
        assert!(tree.find("/a/value/nope").is_none());

        let matched = tree.find("/a/value/end").unwrap();
        assert_eq!(matched.params.len(), 1);
    }

    #[test]
    fn shared_param_node_carries_both_terminals() {
        let tree = tree_with(&["/users/{id}", "/users/{id}/posts"]);
        assert!(tree.find("/users/9").is_some());
        let matched = tree.find("/users/9/posts").unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("9"));
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut tree = tree_with(&["/users/{id}"]);
        let err = tree.add("/users/{id}", noop(), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute(_)));
    }

    #[test]
    fn trailing_colon_means_name_only() {
        let tree = tree_with(&["/tags/{tag:}"]);
        let matched = tree.find("/tags/rust").unwrap();
        assert_eq!(matched.params.get("tag").map(String::as_str), Some("rust"));
    }

    #[test]
    fn uncompilable_constraint_is_an_error() {
        let mut tree = Tree::new();
        let err = tree.add("/x/{id:[}", noop(), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn braceless_colon_segment_is_literal() {
        let tree = tree_with(&["/time/12:30"]);
        assert!(tree.find("/time/12:30").is_some());
        assert!(tree.find("/time/12").is_none());
    }
}
