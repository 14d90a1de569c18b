use dashmap::DashMap;
use http::header::CONTENT_LENGTH;
use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::context;

/// Upper bound on distinct `Name: value` lines kept for reuse.
pub const MAX_INTERNED_HEADERS: usize = 4096;

// may_minihttp only accepts `&'static str` header lines.
static HEADER_LINES: Lazy<HeaderLines> = Lazy::new(|| HeaderLines::new(MAX_INTERNED_HEADERS));

/// Reason phrase for the status line.
#[must_use]
pub fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Leaked `'static` header lines.
///
/// Up to `capacity` distinct lines are leaked once and reused. Past that,
/// every new line is leaked for its own response and not remembered. A line
/// is always returned.
pub(crate) struct HeaderLines {
    lines: DashMap<String, &'static str>,
    capacity: usize,
}

impl HeaderLines {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
        }
    }

    pub(crate) fn line(&self, name: &str, value: &str) -> &'static str {
        let line = format!("{name}: {value}");
        if let Some(existing) = self.lines.get(&line) {
            return *existing;
        }
        if self.lines.len() >= self.capacity {
            return Box::leak(line.into_boxed_str());
        }
        let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
        *self.lines.entry(line).or_insert(leaked)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }
}

/// A `'static` copy of `name: value`, shared when it has been seen before.
pub(crate) fn intern_header(name: &str, value: &str) -> &'static str {
    HEADER_LINES.line(name, value)
}

/// Serialize a buffered response onto the wire.
pub fn write_response(res: &mut Response, response: context::Response) {
    let (status, headers, body) = response.into_parts();
    res.status_code(usize::from(status.as_u16()), status_reason(status));

    for (name, value) in &headers {
        // may_minihttp computes the length from the body
        if *name == CONTENT_LENGTH {
            continue;
        }
        let Ok(value) = value.to_str() else {
            warn!(header = %name, "Dropping non-ASCII response header");
            continue;
        };
        res.header(intern_header(name.as_str(), value));
    }
    res.body_vec(body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(StatusCode::OK), "OK");
        assert_eq!(status_reason(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(status_reason(StatusCode::PERMANENT_REDIRECT), "Permanent Redirect");
    }

    #[test]
    fn test_intern_header_reuses_lines() {
        let a = intern_header("content-type", "application/json");
        let b = intern_header("content-type", "application/json");
        assert_eq!(a, "content-type: application/json");
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_full_cache_still_yields_new_lines() {
        let lines = HeaderLines::new(8);
        for i in 0..8 {
            lines.line("location", &format!("/profiles/{i}"));
        }
        assert_eq!(lines.len(), 8);

        let fresh = lines.line("location", "/profiles/new-user");
        assert_eq!(fresh, "location: /profiles/new-user");
        assert_eq!(lines.len(), 8);

        let cached = lines.line("location", "/profiles/3");
        assert!(std::ptr::eq(cached, lines.line("location", "/profiles/3")));
    }
}
