//! Per-method request router and dispatcher.
//!
//! One segment trie per HTTP method, one middleware chain for the whole app.
//! Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use crate::context::Context;
use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{self, Middleware, MiddlewareChain};
use crate::tree::{MatchResult, RouteTree};

/// Body of the response to requests no route matches.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// The application router.
///
/// Registration takes and returns `self`, so the route table is built by a
/// single owner and chains naturally:
///
/// ```rust
/// use trellis::{Context, Method, Router, middleware};
/// use http::StatusCode;
///
/// fn get_user(ctx: &mut Context) {
///     let id = ctx.param("id").unwrap_or("unknown").to_owned();
///     ctx.text(StatusCode::OK, id);
/// }
/// fn list_users(ctx: &mut Context) { ctx.write("[]"); }
/// fn assets(ctx: &mut Context) { ctx.write("static"); }
///
/// let app = Router::new()
///     .layer(middleware::trace())
///     .get("/users", list_users)
///     .get("/users/:id(^[0-9]+$)", get_user)
///     .on(Method::Get, "/assets/*", assets);
///
/// assert!(app.find_route(Method::Get, "/users/42").is_some());
/// assert!(app.find_route(Method::Get, "/users/alice").is_none());
/// ```
///
/// Pattern syntax: literal segments, `:name` parameters, `:name(regex)`
/// parameters whose value must match `regex`, and a trailing `*` catch-all.
/// At each segment a literal match wins over a parameter, and a parameter
/// over a wildcard.
pub struct Router {
    routes: HashMap<Method, RouteTree<BoxedHandler>>,
    middleware: MiddlewareChain,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: MiddlewareChain::new() }
    }

    /// Register a handler for a method + pattern pair. Returns `self` for chaining.
    ///
    /// Registering the same pair twice keeps only the second handler.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is malformed (see [`RouteError`]). A bad pattern
    /// is a bug in the program, caught the first time it starts; use
    /// [`Router::try_on`] when patterns come from outside the source.
    ///
    /// Besides syntax errors (`//`, `:`, an unclosed or invalid constraint)
    /// two well-formed pattern sets are rejected too:
    ///
    /// - two parameters at the same position with different names or
    ///   constraints, e.g. `/user/:id` then `/user/:name/posts`; a level has
    ///   one parameter slot, so reuse the first name (`/user/:id/posts`);
    /// - a `*` followed by more segments, e.g. `/files/*/meta`, which the
    ///   catch-all would make unreachable.
    ///
    /// Constraints match the whole segment: `:id([0-9]+)` behaves like
    /// `:id(^[0-9]+$)`.
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.try_on(method, pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route `{method} {pattern}`: {e}"))
    }

    /// Fallible form of [`Router::on`].
    pub fn try_on(
        mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<Self, RouteError> {
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler.into_boxed_handler())?;
        debug!(%method, pattern, "route registered");
        Ok(self)
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    /// Appends a middleware. The first one added is the outermost layer of
    /// every request; order relative to route registration does not matter.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Resolves `path` in `method`'s tree.
    ///
    /// `None` if the method has no routes or the path reaches no node. A
    /// returned match may sit on a node without a handler (a strict prefix
    /// of some route); [`Router::dispatch`] answers those with 404 too.
    pub fn find_route(&self, method: Method, path: &str) -> Option<MatchResult<'_, BoxedHandler>> {
        self.routes.get(&method)?.find(path)
    }

    /// Routes one request and runs it through the middleware chain.
    ///
    /// On a miss the context receives `404 Not Found` and no middleware runs.
    /// On a hit the bound parameters and matched pattern are stored in the
    /// context and the composed chain is invoked exactly once. Panics in
    /// handlers or middleware propagate to the caller.
    pub fn dispatch(&self, ctx: &mut Context) {
        let matched = self.find_route(ctx.method(), ctx.path()).and_then(|m| {
            let (pattern, handler) = (m.pattern()?, m.value()?);
            Some((pattern, Arc::clone(handler), m.params))
        });

        let Some((pattern, handler, params)) = matched else {
            debug!(method = %ctx.method(), path = ctx.path(), "no route");
            ctx.text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
            return;
        };

        ctx.bind_route(pattern, params);
        self.middleware.then(middleware::finalize(handler))(ctx);
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
