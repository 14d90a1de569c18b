//! # Request Context
//!
//! One [`Context`] is created for every matched request and handed, by
//! mutable reference, to each matching middleware and finally to the route
//! handler. It carries:
//!
//! - the request (read-only) and the buffered [`Response`]
//! - the path parameters captured by the router
//! - a per-request key/value store shared by middleware and handler
//! - the continuation cursor used by [`Context::next`] in manual mode
//!
//! ## Manual chaining
//!
//! ```rust,ignore
//! registry.use_middleware("/api", |ctx: &mut Context<'_>| {
//!     ctx.set("user", "alice".to_string());
//!     ctx.next() // run the rest of the chain, then the handler
//! });
//! ```
//!
//! A middleware that returns without calling `next()` ends the pipeline;
//! whatever it wrote to the response is what the client receives.

mod response;

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use http::header::{HeaderName, CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Method, Request, StatusCode};
use serde::Serialize;
use tracing::trace;

pub use response::Response;

use crate::dispatcher::DispatchMode;
use crate::error::{ContextError, PipelineError};
use crate::ids::RequestId;
use crate::middleware::MiddlewareChain;
use crate::router::Params;

/// A route handler. Middleware closures share the same signature.
pub type Handler = Arc<dyn Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Position of the manual continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Pending,
    Middleware(usize),
    Completed,
}

struct Chain<'a> {
    middlewares: MiddlewareChain<'a>,
    handler: Handler,
    mode: DispatchMode,
    cursor: Cursor,
}

/// Per-request state shared by the middleware pipeline and the handler.
pub struct Context<'a> {
    request: &'a Request<Vec<u8>>,
    response: &'a mut Response,
    request_id: RequestId,
    pattern: Arc<str>,
    params: Params,
    keys: HashMap<String, Box<dyn Any + Send + Sync>>,
    chain: Chain<'a>,
}

impl<'a> Context<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        request: &'a Request<Vec<u8>>,
        response: &'a mut Response,
        request_id: RequestId,
        pattern: Arc<str>,
        params: Params,
        middlewares: MiddlewareChain<'a>,
        handler: Handler,
        mode: DispatchMode,
    ) -> Self {
        Self {
            request,
            response,
            request_id,
            pattern,
            params,
            keys: HashMap::new(),
            chain: Chain {
                middlewares,
                handler,
                mode,
                cursor: Cursor::Pending,
            },
        }
    }

    /// Run the pipeline according to the dispatch mode.
    pub(crate) fn run(&mut self) -> Result<(), PipelineError> {
        match self.chain.mode {
            DispatchMode::Automatic => {
                for index in 0..self.chain.middlewares.len() {
                    let entry = self.chain.middlewares[index];
                    entry
                        .handle(self)
                        .map_err(|error| PipelineError::Middleware {
                            index,
                            prefix: entry.prefix().to_string(),
                            error,
                        })?;
                }
                self.chain.cursor = Cursor::Completed;
                let handler = Arc::clone(&self.chain.handler);
                handler(self).map_err(|error| PipelineError::Handler {
                    pattern: self.pattern.to_string(),
                    error,
                })
            }
            DispatchMode::Manual => self.next().map_err(PipelineError::Chain),
        }
    }

    /// Invoke the next matching middleware, or the handler once every
    /// middleware has run.
    ///
    /// Returns whatever the invoked step returns. In automatic mode, and
    /// after the handler has run, this is a no-op.
    pub fn next(&mut self) -> anyhow::Result<()> {
        if self.chain.mode == DispatchMode::Automatic {
            return Ok(());
        }
        let index = match self.chain.cursor {
            Cursor::Pending => 0,
            Cursor::Middleware(i) => i + 1,
            Cursor::Completed => return Ok(()),
        };

        match self.chain.middlewares.get(index).copied() {
            Some(entry) => {
                self.chain.cursor = Cursor::Middleware(index);
                trace!(index, prefix = %entry.prefix(), "Invoking middleware");
                entry.handle(self)
            }
            None => {
                self.chain.cursor = Cursor::Completed;
                trace!(pattern = %self.pattern, "Invoking handler");
                let handler = Arc::clone(&self.chain.handler);
                handler(self)
            }
        }
    }

    /// Index of the middleware currently running in manual mode.
    ///
    /// `None` before the chain starts, once the handler is reached, and
    /// always in automatic mode.
    #[must_use]
    pub fn middleware_index(&self) -> Option<usize> {
        match (self.chain.mode, self.chain.cursor) {
            (DispatchMode::Manual, Cursor::Middleware(i)) => Some(i),
            _ => None,
        }
    }

    /// Number of middleware selected for this request.
    #[must_use]
    pub fn total_middlewares(&self) -> usize {
        self.chain.middlewares.len()
    }

    #[inline]
    #[must_use]
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.chain.mode
    }

    // --- request -----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn request(&self) -> &Request<Vec<u8>> {
        self.request
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// First value of a request header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The pattern of the matched route, e.g. `/users/:id`.
    #[inline]
    #[must_use]
    pub fn route_pattern(&self) -> &str {
        &self.pattern
    }

    // --- path parameters ---------------------------------------------------

    /// Value bound to a named parameter (`:name` or `:name|pattern|`).
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Parse a named parameter into `T`.
    ///
    /// # Errors
    ///
    /// [`ContextError::ParamNotFound`] if the route did not capture `name`,
    /// [`ContextError::InvalidValue`] if parsing fails.
    pub fn param_as<T>(&self, name: &str) -> Result<T, ContextError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .param(name)
            .ok_or_else(|| ContextError::ParamNotFound(name.to_string()))?;
        parse_value(name, raw)
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Named parameters as an owned map.
    #[must_use]
    pub fn named_params(&self) -> HashMap<String, String> {
        self.params.to_map()
    }

    /// Value of the `position`-th unnamed regex segment, starting at 1.
    #[must_use]
    pub fn regex_param(&self, position: usize) -> Option<&str> {
        self.params.positional(position)
    }

    /// Parse the `position`-th unnamed regex segment into `T`.
    ///
    /// # Errors
    ///
    /// [`ContextError::RegexParamNotFound`] or [`ContextError::InvalidValue`].
    pub fn regex_param_as<T>(&self, position: usize) -> Result<T, ContextError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .regex_param(position)
            .ok_or(ContextError::RegexParamNotFound(position))?;
        parse_value(&format!("${position}"), raw)
    }

    /// All unnamed regex captures, in path order.
    #[must_use]
    pub fn regex_params(&self) -> Vec<&str> {
        self.params.positionals().collect()
    }

    // --- query string ------------------------------------------------------

    /// First value of a query-string parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Parse a query-string parameter into `T`.
    ///
    /// # Errors
    ///
    /// [`ContextError::QueryNotFound`] or [`ContextError::InvalidValue`].
    pub fn query_as<T>(&self, name: &str) -> Result<T, ContextError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .query(name)
            .ok_or_else(|| ContextError::QueryNotFound(name.to_string()))?;
        parse_value(name, &raw)
    }

    /// All query-string pairs in order, percent-decoded.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.request
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    // --- key/value state ---------------------------------------------------

    /// Store a value for later middleware or the handler.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keys.insert(key.into(), Box::new(value));
    }

    /// Fetch a value stored with [`set`](Self::set).
    ///
    /// Returns `None` if the key is missing or holds a different type.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.get(key)?.downcast_ref::<T>()
    }

    // --- response ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn response(&self) -> &Response {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut *self.response
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.set_status(status);
        self
    }

    /// Set (replace) a response header.
    ///
    /// # Errors
    ///
    /// [`ContextError::InvalidHeader`] if the name or value is not valid.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, ContextError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ContextError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ContextError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.response.headers_mut().insert(header_name, header_value);
        Ok(self)
    }

    /// Append raw bytes to the response body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    /// Write a plain-text response.
    pub fn send_text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.response.set_status(status);
        self.response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.response.set_body(body.into());
    }

    /// Serialize `value` as the JSON response body.
    ///
    /// # Errors
    ///
    /// [`ContextError::Json`] if serialization fails; nothing is written.
    pub fn send_json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), ContextError> {
        let body = serde_json::to_vec(value)?;
        self.response.set_status(status);
        self.response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.response.set_body(body);
        Ok(())
    }

    /// Redirect to `location`. Codes outside 300–308 are replaced with 302.
    ///
    /// # Errors
    ///
    /// [`ContextError::InvalidHeader`] if `location` is not a valid header value.
    pub fn redirect(&mut self, status: u16, location: &str) -> Result<(), ContextError> {
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|s| (300..=308).contains(&s.as_u16()))
            .unwrap_or(StatusCode::FOUND);
        let value = HeaderValue::from_str(location).map_err(|e| ContextError::InvalidHeader {
            name: LOCATION.to_string(),
            reason: e.to_string(),
        })?;
        self.response.headers_mut().insert(LOCATION, value);
        self.response.set_status(status);
        Ok(())
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ContextError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| ContextError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.method())
            .field("path", &self.path())
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("request_id", &self.request_id)
            .field("mode", &self.chain.mode)
            .field("cursor", &self.chain.cursor)
            .finish_non_exhaustive()
    }
}
