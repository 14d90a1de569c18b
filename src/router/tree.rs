//! # Segment Trie
//!
//! One [`Tree`] per HTTP method. Every node holds one classified [`Segment`],
//! its children in insertion order, and at most one terminal value.
//!
//! ## Insertion
//!
//! A pattern is split on `/`; empty segments are dropped and the rest are
//! trimmed and classified up front, so a malformed route never leaves
//! partial nodes behind. Children are shared only when their raw text is
//! identical, which keeps `/users/:id` and `/users/:uid` on separate branches.
//!
//! ## Lookup
//!
//! Lookup is a single walk with no backtracking: at each level the first
//! child (in registration order) that accepts the request segment wins.
//! Request segments are percent-decoded after the split, so `%2F` stays
//! inside its segment and `/users/john%20doe` binds `"john doe"`.
//!
//! ```text
//! GET /users/new        registered first
//! GET /users/:id        registered second
//!
//! /users/new  -> first route
//! /users/42   -> second route, id = "42"
//! ```
//!
//! If `/users/:id` had been registered first, `/users/new` would bind
//! `id = "new"` instead. Registration order is the precedence contract.

use std::borrow::Cow;
use std::fmt::Write as _;

use http::Method;
use percent_encoding::percent_decode_str;

use super::params::Params;
use super::segment::{Segment, SegmentKind};
use crate::error::RouteError;

/// Split a route pattern into its non-empty, trimmed segments.
#[inline]
pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').map(str::trim).filter(|s| !s.is_empty())
}

/// Split a request path into its non-empty segments, each percent-decoded.
///
/// Invalid UTF-8 after decoding is replaced rather than rejected.
#[inline]
pub(crate) fn split_request_path(path: &str) -> impl Iterator<Item = Cow<'_, str>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy())
}

/// A node of the trie.
pub struct Node<T> {
    segment: Segment,
    children: Vec<Node<T>>,
    terminal: Option<T>,
}

impl<T> Node<T> {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            children: Vec::new(),
            terminal: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Node<T>] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn terminal(&self) -> Option<&T> {
        self.terminal.as_ref()
    }

    fn child_index(&self, raw: &str) -> Option<usize> {
        self.children.iter().position(|c| c.segment.raw() == raw)
    }
}

/// Routing trie for a single HTTP method.
pub struct Tree<T> {
    method: Method,
    root: Node<T>,
    len: usize,
}

impl<T> Tree<T> {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            root: Node::new(Segment::root()),
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node<T> {
        &self.root
    }

    /// Number of routes stored in this tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` at the node for `pattern`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidRegex`] / [`RouteError::EmptyParamName`] if a
    ///   segment cannot be classified; the tree is left untouched.
    /// - [`RouteError::Duplicate`] if the terminal node already has a value.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), RouteError> {
        let segments = split_path(pattern)
            .map(|raw| Segment::parse(raw, pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut node = &mut self.root;
        for segment in segments {
            let idx = match node.child_index(segment.raw()) {
                Some(idx) => idx,
                None => {
                    node.children.push(Node::new(segment));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }

        if node.terminal.is_some() {
            return Err(RouteError::Duplicate {
                method: self.method.clone(),
                path: pattern.to_string(),
            });
        }
        node.terminal = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Walk the tree for `path`.
    ///
    /// Returns the terminal value and the captured parameters, or `None` if
    /// a segment has no accepting child or the final node has no value.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<(&T, Params)> {
        let mut params = Params::new();
        let mut node = &self.root;

        for part in split_request_path(path) {
            let (child, capture) = node
                .children
                .iter()
                .find_map(|c| c.segment.matches(&part).map(|cap| (c, cap)))?;
            if let Some(capture) = capture {
                params.bind(capture, &part);
            }
            node = child;
        }

        node.terminal.as_ref().map(|value| (value, params))
    }

    /// Render the tree as an indented listing, one node per line.
    ///
    /// Terminal nodes are marked with `*`.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({} routes)", self.method, self.len);
        dump_node(&self.root, 0, &mut out);
        out
    }
}

fn dump_node<T>(node: &Node<T>, depth: usize, out: &mut String) {
    let marker = if node.terminal.is_some() { " *" } else { "" };
    let label = if depth == 0 { "/" } else { node.segment.raw() };
    let kind = match node.segment.kind() {
        SegmentKind::Static => "",
        SegmentKind::Param { .. } => " [param]",
        SegmentKind::Regex { .. } => " [regex]",
    };
    let _ = writeln!(out, "{:indent$}{label}{kind}{marker}", "", indent = depth * 2);
    for child in &node.children {
        dump_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(routes: &[&str]) -> Tree<usize> {
        let mut t = Tree::new(Method::GET);
        for (i, r) in routes.iter().enumerate() {
            t.insert(r, i).unwrap();
        }
        t
    }

    #[test]
    fn test_root_and_slash_share_the_root_node() {
        let mut t = Tree::new(Method::GET);
        t.insert("/", 1).unwrap();
        let err = t.insert("", 2).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(t.lookup("/").map(|(v, _)| *v), Some(1));
        assert_eq!(t.lookup("").map(|(v, _)| *v), Some(1));
    }

    #[test]
    fn test_empty_segments_and_whitespace_are_ignored() {
        let t = tree(&["/users/ list /"]);
        assert!(t.lookup("/users/list").is_some());
        assert!(t.lookup("//users//list//").is_some());
        assert_eq!(t.root().children().len(), 1);
    }

    #[test]
    fn test_request_segments_are_decoded_but_not_trimmed() {
        let t = tree(&["/files/:name", "/café"]);
        let (_, params) = t.lookup("/files/a%2Fb").unwrap();
        assert_eq!(params.get("name"), Some("a/b"));
        assert!(t.lookup("/caf%C3%A9").is_some());

        let (_, params) = t.lookup("/files/%20x%20").unwrap();
        assert_eq!(params.get("name"), Some(" x "));
    }

    #[test]
    fn test_failed_insert_leaves_no_nodes() {
        let mut t: Tree<usize> = Tree::new(Method::GET);
        assert!(t.insert("/a/b/:|(|", 0).is_err());
        assert!(t.root().children().is_empty());
        assert!(t.is_empty());
    }

    #[test]
    fn test_distinct_param_names_are_distinct_children() {
        let t = tree(&["/users/:id", "/users/:uid/posts"]);
        let users = &t.root().children()[0];
        assert_eq!(users.children().len(), 2);
    }

    #[test]
    fn test_no_backtracking_after_first_accepting_child() {
        // `:id` accepts "new", so `/users/new/edit` is never reached
        let t = tree(&["/users/:id", "/users/new/edit"]);
        assert!(t.lookup("/users/new/edit").is_none());
    }

    #[test]
    fn test_intermediate_node_without_value_is_a_miss() {
        let t = tree(&["/a/b/c"]);
        assert!(t.lookup("/a/b").is_none());
        assert!(t.lookup("/a/b/c").is_some());
    }

    #[test]
    fn test_dump_marks_terminals_and_kinds() {
        let t = tree(&["/users/:id", r"/files/:|\d+|"]);
        let dump = t.dump();
        assert!(dump.starts_with("GET (2 routes)"));
        assert!(dump.contains(":id [param] *"));
        assert!(dump.contains("[regex] *"));
    }
}
