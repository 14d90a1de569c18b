use http::{HeaderMap, StatusCode};

/// Buffered response written by middleware and handlers.
///
/// The transport only serializes it after the pipeline returns, so every
/// field stays mutable until then. A response counts as *committed* once a
/// status or any body bytes were written; setting headers alone does not
/// commit it.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    status_written: bool,
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.status_written = true;
    }

    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Append to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status_written || !self.body.is_empty()
    }

    /// Discard everything written so far.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::HeaderValue;

    #[test]
    fn test_headers_alone_do_not_commit() {
        let mut res = Response::new();
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!res.is_committed());
        res.write(b"hi");
        assert!(res.is_committed());
    }

    #[test]
    fn test_status_commits_and_reset_clears() {
        let mut res = Response::new();
        res.set_status(StatusCode::NO_CONTENT);
        assert!(res.is_committed());
        res.reset();
        assert!(!res.is_committed());
        assert_eq!(res.status(), StatusCode::OK);
    }
}
