//! # Route Registry
//!
//! [`Registry`] collects routes and middleware, then compiles them into an
//! immutable [`Dispatcher`]. Nothing is validated at registration time;
//! malformed or duplicate routes are reported (and skipped) by
//! [`build`](Registry::build).
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//! registry
//!     .get("/users/:id", |ctx: &mut Context<'_>| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.send_text(StatusCode::OK, id);
//!         Ok(())
//!     })
//!     .use_middleware("/users", |ctx: &mut Context<'_>| ctx.next());
//!
//! let dispatcher = registry.build();
//! ```

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::context::{Context, Handler};
use crate::dispatcher::{DispatchMode, Dispatcher};
use crate::error::RouteError;
use crate::middleware::{Middleware, MiddlewareEntry};
use crate::router::{RouteSpec, RouteTable};

/// Builder for a [`Dispatcher`].
#[derive(Clone, Default)]
pub struct Registry {
    routes: Vec<RouteSpec>,
    middlewares: Vec<MiddlewareEntry>,
    mode: DispatchMode,
}

macro_rules! method_shortcuts {
    ($($(#[$doc:meta])* $name:ident => $method:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&mut self, pattern: &str, handler: F) -> &mut Self
            where
                F: Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
            {
                self.route(Method::$method, pattern, handler)
            }
        )*
    };
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    method_shortcuts! {
        /// Register a `GET` route.
        get => GET,
        /// Register a `POST` route.
        post => POST,
        /// Register a `PUT` route.
        put => PUT,
        /// Register a `DELETE` route.
        delete => DELETE,
        /// Register a `PATCH` route.
        patch => PATCH,
        /// Register a `HEAD` route.
        head => HEAD,
        /// Register an `OPTIONS` route.
        options => OPTIONS,
    }

    /// Register a route for any method.
    ///
    /// Methods without a tree (anything but the seven above) are rejected
    /// when the registry is built.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.route_handler(method, pattern, Arc::new(handler))
    }

    /// Register a route with an already shared handler.
    pub fn route_handler(&mut self, method: Method, pattern: &str, handler: Handler) -> &mut Self {
        debug!(method = %method, pattern = %pattern, "Route registered");
        self.routes.push(RouteSpec {
            method,
            pattern: pattern.to_string(),
            handler,
        });
        self
    }

    /// Register a middleware closure scoped to `prefix` (empty means `/`).
    pub fn use_middleware<F>(&mut self, prefix: &str, middleware: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.attach(prefix, Arc::new(middleware))
    }

    /// Register a [`Middleware`] implementation scoped to `prefix`.
    pub fn attach(&mut self, prefix: &str, middleware: Arc<dyn Middleware>) -> &mut Self {
        let entry = MiddlewareEntry::new(prefix, middleware);
        debug!(prefix = %entry.prefix(), "Middleware registered");
        self.middlewares.push(entry);
        self
    }

    pub fn set_mode(&mut self, mode: DispatchMode) -> &mut Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Number of registered routes, including ones that will fail to build.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Compile the registrations into a [`Dispatcher`].
    ///
    /// Rejected routes are logged and left out. Calling this again yields an
    /// equivalent dispatcher.
    #[must_use]
    pub fn build(&self) -> Dispatcher {
        self.build_with_report().0
    }

    /// Like [`build`](Self::build), also returning the rejected routes.
    #[must_use]
    pub fn build_with_report(&self) -> (Dispatcher, Vec<RouteError>) {
        let (table, rejected) = RouteTable::compile(self.routes.iter().cloned());
        let dispatcher = Dispatcher::new(table, self.middlewares.clone(), self.mode);
        (dispatcher, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &mut Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_build_reports_and_skips_bad_routes() {
        let mut registry = Registry::new();
        registry
            .get("/users/:id", ok)
            .get("/users/:id", ok)
            .get("/files/:|(|", ok)
            .route(Method::TRACE, "/trace", ok)
            .post("/users", ok);

        let (dispatcher, rejected) = registry.build_with_report();
        assert_eq!(rejected.len(), 3);
        assert!(matches!(rejected[0], RouteError::Duplicate { .. }));
        assert!(matches!(rejected[1], RouteError::InvalidRegex { .. }));
        assert!(matches!(rejected[2], RouteError::UnsupportedMethod { .. }));
        assert_eq!(dispatcher.table().len(), 2);
    }

    #[test]
    fn test_build_is_repeatable() {
        let mut registry = Registry::new();
        registry.get("/a", ok).get("/b", ok);
        assert_eq!(registry.build().table().len(), 2);
        assert_eq!(registry.build().table().len(), 2);
    }

    #[test]
    fn test_empty_middleware_prefix_is_root() {
        let mut registry = Registry::new();
        registry.use_middleware("", |ctx: &mut Context<'_>| ctx.next());
        let dispatcher = registry.build();
        assert_eq!(dispatcher.middlewares()[0].prefix(), "/");
    }
}
