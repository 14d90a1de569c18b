//! # arbor
//!
//! **arbor** is an embedded HTTP request router for the `may` coroutine runtime.
//! Routes are compiled into one segment trie per HTTP method; a request is
//! resolved by a single walk down its method's trie, then run through a
//! path-scoped middleware pipeline before reaching the handler.
//!
//! ## Architecture
//!
//! - **[`router`]** - Segment classification, per-method tries and the compiled [`RouteTable`]
//! - **[`registry`]** - Collects routes and middleware, then builds a [`Dispatcher`]
//! - **[`dispatcher`]** - Resolves a request and runs the pipeline in a [`DispatchMode`]
//! - **[`context`]** - The per-request [`Context`] handed to middleware and handlers
//! - **[`middleware`]** - Prefix-scoped middleware plus tracing and metrics implementations
//! - **[`server`]** - `may_minihttp` transport with hot-swappable dispatcher
//! - **[`config`]** / **[`runtime_config`]** / **[`logging`]** - Process setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as RouterService<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant MW as Middleware
//!     participant Handler
//!
//!     Client->>Server: GET /users/42
//!     Server->>Dispatcher: http::Request
//!     Dispatcher->>Table: lookup(GET, "/users/42")
//!     alt no match
//!         Table-->>Dispatcher: None
//!         Dispatcher-->>Server: 404 JSON
//!     else match
//!         Table-->>Dispatcher: endpoint + params {id: "42"}
//!         Dispatcher->>MW: every middleware whose prefix covers the path
//!         MW->>Handler: automatic: in order / manual: ctx.next()
//!         Handler-->>Dispatcher: Ok or Err
//!         Dispatcher-->>Server: buffered Response
//!     end
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use arbor::{server, Context, Registry};
//! use http::StatusCode;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.get("/users/:id", |ctx: &mut Context<'_>| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.send_text(StatusCode::OK, id);
//!         Ok(())
//!     });
//!
//!     let service = server::RouterService::new(registry.build());
//!     let handle = server::start(service, "127.0.0.1:8080")?;
//!     let _ = handle.join();
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime Considerations
//!
//! arbor runs on `may`, not tokio:
//!
//! - Each connection is served by a coroutine; handlers run on it synchronously
//! - Stack size is configurable via the `ARBOR_STACK_SIZE` environment variable
//! - Deep recursion or large stack buffers in handlers need a larger stack

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use context::{Context, Handler, Response};
pub use dispatcher::{DispatchMode, DispatchOutcome, Dispatcher};
pub use error::{ContextError, PipelineError, RouteError};
pub use ids::RequestId;
pub use middleware::Middleware;
pub use registry::Registry;
pub use router::{Params, RouteMatch, RouteTable};
