//! Router core module - hot path for request routing.
//!
//! [`RouteTable`] owns one [`Tree`] per supported method and is the only
//! thing the dispatcher consults to resolve a request.

// Keep the lookup path free of needless allocations.
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::{debug, error, info, warn};

use super::params::Params;
use super::tree::Tree;
use crate::context::Handler;
use crate::error::RouteError;

/// Methods that get a tree. Anything else is rejected at build time.
pub static SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// A route as registered, before compilation.
#[derive(Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub pattern: String,
    pub handler: Handler,
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSpec")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Terminal value of a tree node.
#[derive(Clone)]
pub struct Endpoint {
    /// The pattern exactly as registered (e.g. `/users/:id`)
    pub pattern: Arc<str>,
    pub handler: Handler,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    /// Path parameters extracted from the URL, in path order
    pub params: Params,
}

impl RouteMatch {
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.endpoint.pattern
    }

    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// Compiled, immutable set of per-method trees.
#[derive(Default)]
pub struct RouteTable {
    trees: HashMap<Method, Tree<Endpoint>>,
}

impl RouteTable {
    /// Compile `routes` in registration order.
    ///
    /// A route that fails to compile is logged and skipped; the remaining
    /// routes are still inserted. The rejected routes are returned alongside
    /// the table.
    #[must_use]
    pub fn compile<I>(routes: I) -> (Self, Vec<RouteError>)
    where
        I: IntoIterator<Item = RouteSpec>,
    {
        let mut trees: HashMap<Method, Tree<Endpoint>> = HashMap::new();
        let mut rejected = Vec::new();

        for route in routes {
            if let Err(err) = Self::insert_into(&mut trees, route) {
                error!(error = %err, path = %err.path(), "Route rejected");
                warn!(path = %err.path(), "Skipping route");
                rejected.push(err);
            }
        }

        let table = Self { trees };
        info!(
            routes_count = table.len(),
            methods = ?table.methods().collect::<Vec<_>>(),
            rejected_count = rejected.len(),
            routing_algorithm = "segment_trie",
            "Routing table compiled"
        );
        (table, rejected)
    }

    fn insert_into(
        trees: &mut HashMap<Method, Tree<Endpoint>>,
        route: RouteSpec,
    ) -> Result<(), RouteError> {
        if !SUPPORTED_METHODS.contains(&route.method) {
            return Err(RouteError::UnsupportedMethod {
                method: route.method,
                path: route.pattern,
            });
        }
        let endpoint = Endpoint {
            pattern: Arc::from(route.pattern.as_str()),
            handler: route.handler,
        };
        trees
            .entry(route.method.clone())
            .or_insert_with(|| Tree::new(route.method))
            .insert(&route.pattern, endpoint)
    }

    /// Resolve a request to its endpoint and captured parameters.
    ///
    /// `None` means 404: either no route exists for the method, or the
    /// method's tree has no match for the path.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        let Some(tree) = self.trees.get(method) else {
            debug!(method = %method, path = %path, "No routes registered for method");
            return None;
        };

        match tree.lookup(path) {
            Some((endpoint, params)) => {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %endpoint.pattern,
                    path_params = ?params,
                    "Route matched"
                );
                Some(RouteMatch {
                    endpoint: endpoint.clone(),
                    params,
                })
            }
            None => {
                debug!(method = %method, path = %path, "No route matched");
                None
            }
        }
    }

    #[must_use]
    pub fn tree(&self, method: &Method) -> Option<&Tree<Endpoint>> {
        self.trees.get(method)
    }

    /// Methods with at least one route, in [`SUPPORTED_METHODS`] order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        SUPPORTED_METHODS
            .iter()
            .filter(move |m| self.trees.contains_key(*m))
    }

    /// Total number of routes across all methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.values().map(Tree::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every tree rendered with [`Tree::dump`], in method order.
    #[must_use]
    pub fn dump_routes(&self) -> String {
        self.methods()
            .filter_map(|m| self.trees.get(m))
            .map(Tree::dump)
            .collect()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("methods", &self.methods().collect::<Vec<_>>())
            .field("routes", &self.len())
            .finish()
    }
}
