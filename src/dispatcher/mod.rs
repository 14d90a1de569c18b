//! # Dispatcher Module
//!
//! The dispatcher turns a request into a response:
//!
//! 1. Look up the method's tree. No tree, or no match, is a `404` with a
//!    JSON body `{"error":"Not Found","method":..,"path":..}`.
//! 2. Select the middleware whose prefix covers the path.
//! 3. Create one [`Context`](crate::context::Context) and run the pipeline
//!    in the configured [`DispatchMode`].
//!
//! ## Modes
//!
//! | Mode        | Who advances the chain        | Middleware error         |
//! |-------------|-------------------------------|--------------------------|
//! | `Automatic` | the dispatcher, in order      | `500`, handler skipped   |
//! | `Manual`    | each middleware via `next()`  | `500` unless committed   |
//!
//! A handler error becomes `500` only when nothing has been written to the
//! response yet; otherwise it is logged and the partial response stands.
//!
//! The dispatcher never writes a success response on its own; if the
//! handler writes nothing the transport sends `200` with an empty body.

mod core;

pub use core::{write_json_error, DispatchMode, DispatchOutcome, Dispatcher};
