//! Segment trie: one tree per HTTP method.
//!
//! A pattern is split on `/` and each segment becomes one level of the tree.
//! Segments come in three kinds, and each node has a slot per kind:
//!
//! | segment        | slot               | matches                              |
//! |----------------|--------------------|--------------------------------------|
//! | `users`        | `static_children`  | exactly `users`                      |
//! | `:id`          | `param_child`      | any one segment, bound as `id`       |
//! | `:id(^\d+$)`   | `param_child`      | one segment satisfying the regex     |
//! | `*`            | `wildcard_child`   | this segment and everything after it |
//!
//! Lookup walks one segment at a time and picks the most specific slot that
//! accepts it: static, then parameter, then wildcard. There is no
//! backtracking: once a level has picked a slot, the lookup either succeeds
//! below it or fails as a whole.
//!
//! Constraints must match the whole segment: `:id([0-9]+)` accepts `42` but
//! not `x42y`. Incoming segments are percent-decoded one at a time before
//! matching, so `%2F` stays inside its segment instead of splitting it.
//!
//! The tree is built with `&mut self` during startup and only read with
//! `&self` afterwards, so a `RouteTree` shared behind an `Arc` cannot change
//! under concurrent lookups.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::error::RouteError;

/// Parameter name → bound segment value.
pub type Params = HashMap<String, String>;

/// One vertex of a [`RouteTree`], standing for a single path segment.
///
/// A node may terminate a route and have children at the same time:
/// registering `/users` and `/users/:id` gives the `users` node both.
pub struct Node<T> {
    segment: String,
    static_children: HashMap<String, Node<T>>,
    param_child: Option<Box<Node<T>>>,
    /// Registered regex text and its whole-segment compilation.
    constraint: Option<(String, Regex)>,
    wildcard_child: Option<Box<Node<T>>>,
    route: Option<(String, T)>,
}

impl<T> Node<T> {
    fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            static_children: HashMap::new(),
            param_child: None,
            constraint: None,
            wildcard_child: None,
            route: None,
        }
    }

    /// The segment this node stands for: literal text, the parameter name
    /// for a parameter node, `*` for a wildcard, empty for a root.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The full pattern registered at this node, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.route.as_ref().map(|(p, _)| p.as_str())
    }

    /// The value registered at this node, if any.
    pub fn value(&self) -> Option<&T> {
        self.route.as_ref().map(|(_, v)| v)
    }

    /// The regex a parameter node's value must satisfy, if any.
    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_ref().map(|(source, _)| source.as_str())
    }

    fn static_or_create(&mut self, segment: &str) -> &mut Node<T> {
        self.static_children
            .entry(segment.to_owned())
            .or_insert_with(|| Node::new(segment))
    }

    fn wildcard_or_create(&mut self) -> &mut Node<T> {
        self.wildcard_child.get_or_insert_with(|| Box::new(Node::new("*"))).as_mut()
    }

    fn param_or_create(
        &mut self,
        pattern: &str,
        param: ParamSegment<'_>,
    ) -> Result<&mut Node<T>, RouteError> {
        let constraint = param
            .constraint
            .map(|re| {
                Regex::new(&format!("^(?:{re})$"))
                    .map(|compiled| (re.to_owned(), compiled))
                    .map_err(|source| RouteError::InvalidConstraint {
                        pattern: pattern.to_owned(),
                        constraint: re.to_owned(),
                        source,
                    })
            })
            .transpose()?;

        if let Some(existing) = &self.param_child {
            if existing.segment != param.name || existing.constraint() != param.constraint {
                return Err(RouteError::ParamConflict {
                    pattern: pattern.to_owned(),
                    existing: existing.describe_param(),
                    new: param.to_string(),
                });
            }
        }

        let child = self.param_child.get_or_insert_with(|| {
            let mut child = Node::new(param.name);
            child.constraint = constraint;
            Box::new(child)
        });
        Ok(child.as_mut())
    }

    fn describe_param(&self) -> String {
        match self.constraint() {
            Some(re) => format!("{}({re})", self.segment),
            None => self.segment.clone(),
        }
    }

    fn accepts(&self, value: &str) -> bool {
        self.constraint.as_ref().is_none_or(|(_, re)| re.is_match(value))
    }
}

/// A routing trie for a single HTTP method.
pub struct RouteTree<T> {
    root: Node<T>,
}

impl<T> RouteTree<T> {
    pub fn new() -> Self {
        Self { root: Node::new("") }
    }

    /// Registers `value` under `pattern`.
    ///
    /// Re-registering an identical pattern replaces the previous value.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`]: an empty interior segment (`/a//b`), a malformed
    /// or non-compiling parameter constraint, a parameter whose name or
    /// constraint differs from the one already registered at the same
    /// position, or a `*` that is not the final segment.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), RouteError> {
        let segments = split(pattern).ok_or_else(|| RouteError::EmptySegment {
            pattern: pattern.to_owned(),
        })?;

        let mut node = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            node = if *segment == "*" {
                if i + 1 != segments.len() {
                    return Err(RouteError::WildcardNotLast { pattern: pattern.to_owned() });
                }
                node.wildcard_or_create()
            } else if let Some(rest) = segment.strip_prefix(':') {
                let param = ParamSegment::parse(pattern, segment, rest)?;
                node.param_or_create(pattern, param)?
            } else {
                node.static_or_create(segment)
            };
        }

        node.route = Some((pattern.to_owned(), value));
        Ok(())
    }

    /// Resolves `path` to a node, collecting parameter bindings on the way.
    ///
    /// Returns `None` when some level has no child that accepts the segment.
    /// A returned node may still carry no value (e.g. `/users` when only
    /// `/users/:id` is registered); callers treat that as not found.
    pub fn find(&self, path: &str) -> Option<MatchResult<'_, T>> {
        let segments = split_lenient(path);
        let mut params = Params::new();
        let mut node = &self.root;

        for raw in segments {
            if raw.is_empty() {
                return None;
            }
            // a segment that is not UTF-8 once decoded can only be absorbed by a wildcard
            if let Some(segment) = decode(raw) {
                if let Some(child) = node.static_children.get(&*segment) {
                    node = child;
                    continue;
                }
                if let Some(child) = node.param_child.as_deref().filter(|c| c.accepts(&segment)) {
                    params.insert(child.segment.clone(), segment.into_owned());
                    node = child;
                    continue;
                }
            }
            // catch-all: absorbs this segment and the rest
            return node
                .wildcard_child
                .as_deref()
                .map(|wildcard| MatchResult { node: wildcard, params });
        }

        Some(MatchResult { node, params })
    }

    /// The method's root node.
    pub fn root(&self) -> &Node<T> {
        &self.root
    }
}

impl<T> Default for RouteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of a successful [`RouteTree::find`].
pub struct MatchResult<'a, T> {
    pub node: &'a Node<T>,
    /// Every parameter bound along the path; empty when none were.
    pub params: Params,
}

impl<'a, T> MatchResult<'a, T> {
    /// The value at the resolved node, if the node terminates a route.
    pub fn value(&self) -> Option<&'a T> {
        self.node.value()
    }

    /// The pattern registered at the resolved node.
    pub fn pattern(&self) -> Option<&'a str> {
        self.node.pattern()
    }
}

// ── Parameter segments ────────────────────────────────────────────────────────

/// `:name` or `:name(regex)`, already split.
struct ParamSegment<'p> {
    name: &'p str,
    constraint: Option<&'p str>,
}

impl<'p> ParamSegment<'p> {
    /// `rest` is `segment` without its leading `:`.
    fn parse(pattern: &str, segment: &str, rest: &'p str) -> Result<Self, RouteError> {
        let (name, constraint) = match rest.find('(') {
            None => (rest, None),
            Some(open) => {
                let inner = rest[open + 1..].strip_suffix(')').ok_or_else(|| {
                    RouteError::UnclosedConstraint {
                        pattern: pattern.to_owned(),
                        segment: segment.to_owned(),
                    }
                })?;
                (&rest[..open], Some(inner))
            }
        };

        if name.is_empty() {
            return Err(RouteError::EmptyParamName {
                pattern: pattern.to_owned(),
                segment: segment.to_owned(),
            });
        }
        Ok(Self { name, constraint })
    }
}

impl std::fmt::Display for ParamSegment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.constraint {
            Some(re) => write!(f, "{}({re})", self.name),
            None => f.write_str(self.name),
        }
    }
}

// ── Splitting ─────────────────────────────────────────────────────────────────

/// Splits on `/`, dropping one empty element at each end so that `/a`, `a/`
/// and `/a/` all yield `["a"]`.
fn split_lenient(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    if segments.first().is_some_and(|s| s.is_empty()) {
        segments.remove(0);
    }
    segments
}

/// Percent-decodes one segment. `None` if the bytes are not UTF-8.
fn decode(raw: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(raw).decode_utf8().ok()
}

/// [`split_lenient`], rejecting any remaining empty element.
fn split(pattern: &str) -> Option<Vec<&str>> {
    let segments = split_lenient(pattern);
    segments.iter().all(|s| !s.is_empty()).then_some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(patterns: &[&'static str]) -> RouteTree<&'static str> {
        let mut tree = RouteTree::new();
        for p in patterns {
            tree.insert(p, *p).unwrap();
        }
        tree
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn split_trims_one_separator_at_each_end() {
        assert_eq!(split_lenient("/a/b"), ["a", "b"]);
        assert_eq!(split_lenient("a/b/"), ["a", "b"]);
        assert_eq!(split_lenient("/a/b/"), ["a", "b"]);
        assert!(split_lenient("/").is_empty());
        assert!(split_lenient("").is_empty());
        assert_eq!(split_lenient("//a"), ["", "a"]);
    }

    #[test]
    fn registered_patterns_resolve_to_themselves() {
        let cases = [
            "/user/add",
            "/user/del",
            "/user/save",
            "/user/getList",
            "user/getList",
            "/user/*",
            "/user/:userId/:action",
        ];
        let mut tree = RouteTree::new();
        for p in cases {
            tree.insert(p, p).unwrap();
            let m = tree.find(p).unwrap_or_else(|| panic!("{p} not found"));
            assert_eq!(m.pattern(), Some(p));
            assert_eq!(m.value(), Some(&p));
        }
    }

    #[test]
    fn root_pattern() {
        let tree = tree(&["/"]);
        assert_eq!(tree.find("/").unwrap().pattern(), Some("/"));
        assert_eq!(tree.find("").unwrap().pattern(), Some("/"));
    }

    #[test]
    fn empty_interior_segment_is_rejected() {
        let mut tree = RouteTree::new();
        for bad in ["/user//add", "//////", "//user//add//", "//user"] {
            let err = tree.insert(bad, ()).unwrap_err();
            assert!(matches!(err, RouteError::EmptySegment { .. }), "{bad}: {err}");
            assert!(err.to_string().contains("must not contain an empty '//' segment"));
        }
    }

    #[test]
    fn static_beats_param() {
        let tree = tree(&["/user/:id", "/user/list"]);
        let m = tree.find("/user/list").unwrap();
        assert_eq!(m.pattern(), Some("/user/list"));
        assert!(m.params.is_empty());

        let m = tree.find("/user/7").unwrap();
        assert_eq!(m.pattern(), Some("/user/:id"));
        assert_eq!(m.params, params(&[("id", "7")]));
    }

    #[test]
    fn param_beats_wildcard() {
        let tree = tree(&["/files/*", "/files/:name"]);
        assert_eq!(tree.find("/files/a").unwrap().pattern(), Some("/files/:name"));
        // no backtracking: the param branch was taken at `a`, `b` has nowhere to go
        assert!(tree.find("/files/a/b").is_none());
    }

    #[test]
    fn binds_every_param_along_the_path() {
        let tree = tree(&["/user/:userId/:action"]);
        let m = tree.find("/user/123/add").unwrap();
        assert_eq!(m.params, params(&[("userId", "123"), ("action", "add")]));
    }

    #[test]
    fn extra_segments_do_not_match() {
        let tree = tree(&["/user/:userId/:action"]);
        assert!(tree.find("/user/123/add/extra").is_none());
    }

    #[test]
    fn wildcard_absorbs_any_suffix() {
        let tree = tree(&["/user/*"]);
        for path in ["/user/update", "/user/update/v1", "/user/a/b/c/d/"] {
            let m = tree.find(path).unwrap();
            assert_eq!(m.pattern(), Some("/user/*"), "{path}");
            assert_eq!(m.node.segment(), "*");
        }
    }

    #[test]
    fn wildcard_absorbs_empty_segments_after_it() {
        let tree = tree(&["/assets/*"]);
        assert!(tree.find("/assets/css//site.css").is_some());
    }

    #[test]
    fn prefix_of_a_route_resolves_to_a_node_without_value() {
        let tree = tree(&["/user/*"]);
        let m = tree.find("/user").unwrap();
        assert!(m.value().is_none());
        assert!(m.pattern().is_none());
    }

    #[test]
    fn lookup_with_empty_interior_segment_fails() {
        let tree = tree(&["/user/:id", "/user/:id/:action"]);
        assert!(tree.find("/user//add").is_none());
    }

    #[test]
    fn unknown_path_fails() {
        let tree = tree(&["/user/list"]);
        assert!(tree.find("/order/list").is_none());
        assert!(tree.find("/user/list/more").is_none());
    }

    #[test]
    fn constraint_is_checked_against_the_incoming_segment() {
        let tree = tree(&["/room/:id(^[0-9]+$)"]);
        let m = tree.find("/room/42").unwrap();
        assert_eq!(m.params, params(&[("id", "42")]));
        assert_eq!(m.node.constraint(), Some("^[0-9]+$"));

        assert!(tree.find("/room/abc").is_none());
    }

    #[test]
    fn constraint_must_match_the_whole_segment() {
        let tree = tree(&["/room/:id([0-9]+)"]);
        assert_eq!(tree.find("/room/42").unwrap().params, params(&[("id", "42")]));
        assert!(tree.find("/room/x1y").is_none());
        assert!(tree.find("/room/1y").is_none());
    }

    #[test]
    fn segments_are_percent_decoded_before_matching() {
        let tree = tree(&["/users/:name", "/room/:id(^[0-9]+$)", "/caf\u{e9}/menu"]);
        let m = tree.find("/users/john%20doe").unwrap();
        assert_eq!(m.params, params(&[("name", "john doe")]));

        let m = tree.find("/room/%34%32").unwrap();
        assert_eq!(m.params, params(&[("id", "42")]));

        assert_eq!(tree.find("/caf%C3%A9/menu").unwrap().pattern(), Some("/caf\u{e9}/menu"));
    }

    #[test]
    fn encoded_slash_stays_inside_its_segment() {
        let tree = tree(&["/files/:name"]);
        let m = tree.find("/files/a%2Fb").unwrap();
        assert_eq!(m.params, params(&[("name", "a/b")]));
    }

    #[test]
    fn undecodable_segment_only_reaches_a_wildcard() {
        let tree = tree(&["/users/:name", "/assets/*"]);
        assert!(tree.find("/users/%FF").is_none());
        assert_eq!(tree.find("/assets/%FF").unwrap().pattern(), Some("/assets/*"));
    }

    #[test]
    fn constraint_mismatch_falls_through_to_wildcard() {
        let tree = tree(&["/room/:id(^[0-9]+$)", "/room/*"]);
        assert_eq!(tree.find("/room/42").unwrap().pattern(), Some("/room/:id(^[0-9]+$)"));

        let m = tree.find("/room/lobby/chat").unwrap();
        assert_eq!(m.pattern(), Some("/room/*"));
        assert!(m.params.is_empty());
    }

    #[test]
    fn constraint_may_contain_parentheses() {
        let tree = tree(&["/v/:tag((alpha|beta)[0-9])"]);
        assert!(tree.find("/v/beta2").is_some());
        assert!(tree.find("/v/gamma2").is_none());
    }

    #[test]
    fn malformed_params_are_rejected() {
        let mut tree = RouteTree::new();
        assert!(matches!(tree.insert("/a/:", ()), Err(RouteError::EmptyParamName { .. })));
        assert!(matches!(tree.insert("/a/:(x)", ()), Err(RouteError::EmptyParamName { .. })));
        assert!(matches!(tree.insert("/a/:id(x", ()), Err(RouteError::UnclosedConstraint { .. })));
        assert!(matches!(tree.insert("/a/:id([)", ()), Err(RouteError::InvalidConstraint { .. })));
    }

    #[test]
    fn conflicting_param_names_are_rejected() {
        let mut tree = tree(&["/user/:id"]);
        let err = tree.insert("/user/:name/posts", "x").unwrap_err();
        assert!(matches!(err, RouteError::ParamConflict { ref existing, ref new, .. }
            if existing == "id" && new == "name"));

        let err = tree.insert("/user/:id(^[0-9]+$)/posts", "x").unwrap_err();
        assert!(matches!(err, RouteError::ParamConflict { .. }));

        // same name, same constraint: shared node
        tree.insert("/user/:id/posts", "/user/:id/posts").unwrap();
        assert_eq!(tree.find("/user/1/posts").unwrap().pattern(), Some("/user/:id/posts"));
        assert_eq!(tree.find("/user/1").unwrap().pattern(), Some("/user/:id"));
    }

    #[test]
    fn wildcard_must_be_last() {
        let mut tree = RouteTree::new();
        assert!(matches!(tree.insert("/a/*/b", ()), Err(RouteError::WildcardNotLast { .. })));
    }

    #[test]
    fn reregistration_overwrites() {
        let mut tree = RouteTree::new();
        tree.insert("/user/:id", 1).unwrap();
        tree.insert("/user/:id", 2).unwrap();
        assert_eq!(tree.find("/user/9").unwrap().value(), Some(&2));
    }

    #[test]
    fn node_can_terminate_and_have_children() {
        let tree = tree(&["/users", "/users/:id"]);
        assert_eq!(tree.find("/users").unwrap().pattern(), Some("/users"));
        assert_eq!(tree.find("/users/3").unwrap().pattern(), Some("/users/:id"));
    }
}
