//! Path segment classification.
//!
//! A route pattern is split on `/` and every piece is classified exactly once,
//! when the route is registered:
//!
//! | Pattern segment | Kind      | Captures                                   |
//! |-----------------|-----------|--------------------------------------------|
//! | `users`         | Static    | nothing, matched by equality               |
//! | `:id`           | Param     | `id → segment`                             |
//! | `:\|\d+\|`      | Regex     | positional (`regex_param(1)`, `(2)`, ...)  |
//! | `:id\|\d+\|`    | Regex     | `id → segment`, only if the pattern holds  |
//!
//! Regex patterns are anchored, so `:|\d+|` never matches `12ab`.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouteError;

/// Marker that opens a parameter or regex segment.
pub const PARAM_MARKER: char = ':';
/// Delimiter around the pattern of a regex segment.
pub const REGEX_DELIMITER: char = '|';

/// What a segment matches and what it binds.
#[derive(Clone)]
pub enum SegmentKind {
    Static,
    Param { name: Arc<str> },
    Regex {
        name: Option<Arc<str>>,
        pattern: Regex,
    },
}

/// One classified `/`-delimited component of a route pattern.
///
/// `raw` is the text exactly as registered; the tree uses it to decide
/// whether two routes share a node, so `:id` and `:uid` stay distinct.
#[derive(Clone)]
pub struct Segment {
    raw: Arc<str>,
    kind: SegmentKind,
}

/// How a matching segment binds the request value.
///
/// Names are handed out as `&Arc<str>` so binding a capture is a refcount
/// bump rather than a string copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture<'s> {
    Named(&'s Arc<str>),
    Positional,
}

impl Segment {
    /// Classify one pattern segment. `route` is only used for error messages.
    pub fn parse(raw: &str, route: &str) -> Result<Self, RouteError> {
        let kind = match raw.strip_prefix(PARAM_MARKER) {
            None => SegmentKind::Static,
            Some(rest) => match split_regex(rest) {
                Some((name, inner)) => {
                    let pattern = Regex::new(&format!("^(?:{inner})$")).map_err(|source| {
                        RouteError::InvalidRegex {
                            path: route.to_string(),
                            segment: raw.to_string(),
                            source,
                        }
                    })?;
                    SegmentKind::Regex {
                        name: (!name.is_empty()).then(|| Arc::from(name)),
                        pattern,
                    }
                }
                None if rest.is_empty() => {
                    return Err(RouteError::EmptyParamName {
                        path: route.to_string(),
                    })
                }
                None => SegmentKind::Param {
                    name: Arc::from(rest),
                },
            },
        };

        Ok(Self {
            raw: Arc::from(raw),
            kind,
        })
    }

    /// A static segment, used for the tree root.
    pub(crate) fn root() -> Self {
        Self {
            raw: Arc::from(""),
            kind: SegmentKind::Static,
        }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.kind, SegmentKind::Static)
    }

    /// Test a request segment against this pattern segment.
    ///
    /// Returns `None` when it does not match, `Some(None)` for a match that
    /// binds nothing, and `Some(Some(capture))` when the value must be
    /// recorded. Raw text equality always matches without binding.
    #[inline]
    #[must_use]
    pub fn matches(&self, segment: &str) -> Option<Option<Capture<'_>>> {
        if &*self.raw == segment {
            return Some(None);
        }
        match &self.kind {
            SegmentKind::Static => None,
            SegmentKind::Param { name } => Some(Some(Capture::Named(name))),
            SegmentKind::Regex { name, pattern } => {
                if !pattern.is_match(segment) {
                    return None;
                }
                Some(Some(match name {
                    Some(name) => Capture::Named(name),
                    None => Capture::Positional,
                }))
            }
        }
    }
}

/// Split `name|pattern|` into `(name, pattern)`.
///
/// Requires a non-empty pattern between the first `|` and the final `|`.
fn split_regex(rest: &str) -> Option<(&str, &str)> {
    let open = rest.find(REGEX_DELIMITER)?;
    let inner = rest[open + 1..].strip_suffix(REGEX_DELIMITER)?;
    if inner.is_empty() {
        return None;
    }
    Some((&rest[..open], inner))
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SegmentKind::Static => "static",
            SegmentKind::Param { .. } => "param",
            SegmentKind::Regex { .. } => "regex",
        };
        f.debug_struct("Segment")
            .field("raw", &self.raw)
            .field("kind", &kind)
            .finish()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
