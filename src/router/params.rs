//! Captured path parameters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::segment::Capture;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:postId).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Key under which a captured segment is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// `:name` and `:name|pattern|` segments.
    Named(Arc<str>),
    /// Unnamed `:|pattern|` segments, numbered from 1 in path order.
    Positional(usize),
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Named(name) => f.write_str(name),
            ParamKey::Positional(n) => write!(f, "${n}"),
        }
    }
}

/// Stack-allocated parameter storage for the hot path.
pub type ParamVec = SmallVec<[(ParamKey, String); MAX_INLINE_PARAMS]>;

/// Parameters captured while walking a tree, in path order.
///
/// Named keys are unique: when a pattern repeats a name, later occurrences
/// are stored as `name_1`, `name_2`, ... instead of overwriting the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: ParamVec,
    positional: usize,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the named parameter, if captured.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match k {
            ParamKey::Named(n) if &**n == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Value of the `position`-th unnamed regex segment (1-based).
    #[inline]
    #[must_use]
    pub fn positional(&self, position: usize) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match k {
            ParamKey::Positional(n) if *n == position => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Named captures only, in path order.
    pub fn named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Named(n) => Some((&**n, v.as_str())),
            ParamKey::Positional(_) => None,
        })
    }

    /// Unnamed regex captures, in path order.
    pub fn positionals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Positional(_) => Some(v.as_str()),
            ParamKey::Named(_) => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Named captures as an owned map.
    /// Note: This allocates - use get() in hot paths instead
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.named()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub(crate) fn bind(&mut self, capture: Capture<'_>, value: &str) {
        let key = match capture {
            Capture::Positional => {
                self.positional += 1;
                ParamKey::Positional(self.positional)
            }
            Capture::Named(name) if self.get(name).is_none() => ParamKey::Named(Arc::clone(name)),
            Capture::Named(name) => ParamKey::Named(self.disambiguate(name)),
        };
        self.entries.push((key, value.to_string()));
    }

    fn disambiguate(&self, name: &str) -> Arc<str> {
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{name}_{suffix}");
            if self.get(&candidate).is_none() {
                return Arc::from(candidate);
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_name_gets_numeric_suffix() {
        let id: Arc<str> = Arc::from("id");
        let mut params = Params::new();
        params.bind(Capture::Named(&id), "1");
        params.bind(Capture::Named(&id), "2");
        params.bind(Capture::Named(&id), "3");

        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.get("id_1"), Some("2"));
        assert_eq!(params.get("id_2"), Some("3"));
    }

    #[test]
    fn test_positional_numbering_skips_named() {
        let name: Arc<str> = Arc::from("slug");
        let mut params = Params::new();
        params.bind(Capture::Positional, "10");
        params.bind(Capture::Named(&name), "hello");
        params.bind(Capture::Positional, "20");

        assert_eq!(params.positional(1), Some("10"));
        assert_eq!(params.positional(2), Some("20"));
        assert_eq!(params.positional(3), None);
        assert_eq!(params.named().collect::<Vec<_>>(), vec![("slug", "hello")]);
        assert_eq!(params.positionals().collect::<Vec<_>>(), vec!["10", "20"]);
    }
}
