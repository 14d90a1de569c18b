//! # Router Module
//!
//! Per-method segment tries that map a request path to a registered
//! endpoint and its captured parameters.
//!
//! ## Pattern syntax
//!
//! | Segment          | Matches                         | Binds                  |
//! |------------------|---------------------------------|------------------------|
//! | `users`          | exactly `users`                 | nothing                |
//! | `:id`            | any non-empty segment           | `id`                   |
//! | `:|\d+|`         | segments fully matching `\d+`   | positional `1`, `2`, … |
//! | `:year|\d{4}|`   | segments fully matching `\d{4}` | `year`                 |
//!
//! ## Rules
//!
//! - Routes are compiled once. A route that fails to compile (bad regex,
//!   empty parameter name, duplicate terminal, unsupported method) is
//!   logged and skipped; the rest of the table is unaffected.
//! - `/users` and `/users/:id` coexist; a prefix of a route is a route of
//!   its own only if it was registered.
//! - Lookup takes the first child, in registration order, that accepts the
//!   segment, and never backtracks.
//! - A name repeated along one path is stored as `name`, `name_1`, `name_2`.
//! - Request segments are percent-decoded after splitting on `/`; pattern
//!   segments are taken literally.
//! - The named regex form `:name|pat|` is an extension of the plain
//!   `:name` / `:|pat|` pair. A parameter name therefore cannot contain a
//!   `|...|` pair; such text is read as a named regex.
//!
//! ```rust,ignore
//! let (table, rejected) = RouteTable::compile(routes);
//! if let Some(m) = table.lookup(&Method::GET, "/users/42") {
//!     assert_eq!(m.param("id"), Some("42"));
//! }
//! ```

mod core;
mod params;
mod segment;
mod tree;

pub use core::{Endpoint, RouteMatch, RouteSpec, RouteTable, SUPPORTED_METHODS};
pub use params::{ParamKey, ParamVec, Params, MAX_INLINE_PARAMS};
pub use segment::{Capture, Segment, SegmentKind, PARAM_MARKER, REGEX_DELIMITER};
pub use tree::{Node, Tree};
