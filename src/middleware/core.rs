use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::context::Context;

/// Middleware matching a single request rarely exceeds this count.
pub const MAX_INLINE_MIDDLEWARE: usize = 8;

/// Middleware selected for one request, in registration order.
pub type MiddlewareChain<'a> = SmallVec<[&'a MiddlewareEntry; MAX_INLINE_MIDDLEWARE]>;

/// A step of the request pipeline.
///
/// In manual mode an implementation must call [`Context::next`] to let the
/// request continue; returning without doing so ends the pipeline. In
/// automatic mode the dispatcher advances on its own and `next()` does
/// nothing.
///
/// Any `Fn(&mut Context<'_>) -> anyhow::Result<()>` closure is a middleware.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>) -> anyhow::Result<()>;
}

impl<F> Middleware for F
where
    F: Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// A registered middleware and the path prefix it is scoped to.
#[derive(Clone)]
pub struct MiddlewareEntry {
    prefix: Arc<str>,
    middleware: Arc<dyn Middleware>,
}

impl MiddlewareEntry {
    /// Scope `middleware` to `prefix`.
    ///
    /// Trailing slashes are dropped, so `/api/` and `/api` are the same
    /// scope; an empty prefix becomes `/`, which matches every path.
    pub fn new(prefix: &str, middleware: Arc<dyn Middleware>) -> Self {
        let trimmed = prefix.trim().trim_end_matches('/');
        let prefix = if trimmed.is_empty() { "/" } else { trimmed };
        Self {
            prefix: Arc::from(prefix),
            middleware,
        }
    }

    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        path_matches(&self.prefix, path)
    }

    #[inline]
    pub fn handle(&self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.middleware.handle(ctx)
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Whether a middleware scoped to `prefix` runs for `path`.
///
/// Matches when the prefix is empty or `/`, equals the path, or is a
/// prefix of the path ending at a segment boundary. `/use` therefore does
/// not match `/users`.
#[must_use]
pub fn path_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() || prefix == "/" || prefix == path {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Middleware entries that apply to `path`, keeping registration order.
#[must_use]
pub fn select<'a>(entries: &'a [MiddlewareEntry], path: &str) -> MiddlewareChain<'a> {
    entries.iter().filter(|e| e.applies_to(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn Middleware> {
        Arc::new(|_: &mut Context<'_>| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn test_path_matches_segment_boundary() {
        assert!(path_matches("/users", "/users"));
        assert!(path_matches("/users", "/users/42"));
        assert!(!path_matches("/use", "/users"));
        assert!(!path_matches("/users", "/user"));
        assert!(path_matches("/api/", "/api/v1"));
    }

    #[test]
    fn test_root_and_empty_prefix_match_everything() {
        assert!(path_matches("", "/anything/at/all"));
        assert!(path_matches("/", "/anything"));
        assert!(path_matches("/", "/"));
    }

    #[test]
    fn test_entry_normalizes_prefix() {
        assert_eq!(MiddlewareEntry::new("", noop()).prefix(), "/");
        assert_eq!(MiddlewareEntry::new("/api/", noop()).prefix(), "/api");
        assert!(MiddlewareEntry::new("/api/", noop()).applies_to("/api"));
    }

    #[test]
    fn test_select_keeps_registration_order() {
        let entries = vec![
            MiddlewareEntry::new("/api", noop()),
            MiddlewareEntry::new("/other", noop()),
            MiddlewareEntry::new("/", noop()),
        ];
        let chain = select(&entries, "/api/users");
        let prefixes: Vec<_> = chain.iter().map(|e| e.prefix()).collect();
        assert_eq!(prefixes, vec!["/api", "/"]);
    }
}
