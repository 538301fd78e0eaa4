//! Middleware layer.
//!
//! Middleware is the right place for cross-cutting concerns: structured
//! tracing, request-id injection, authentication-header inspection.
//!
//! A middleware turns the *next* handler into a wrapped one. Layers nest like
//! an onion: for layers registered `A`, `B` around handler `H` one request
//! runs
//!
//! ```text
//! A-pre → B-pre → H → B-post → A-post
//! ```
//!
//! A layer that returns without calling `next` short-circuits everything
//! inside it, while every layer outside it still runs its post-logic.
//!
//! Built-in middleware:
//! - [`trace`] — one structured event per request with method, route, status, latency

mod trace;

pub use trace::{Trace, trace};

use std::sync::Arc;

use crate::handler::{self, BoxedHandler};

/// Wraps the next handler in the chain.
///
/// Implemented for every `Fn(BoxedHandler) -> BoxedHandler`, so most
/// middleware is a plain function:
///
/// ```rust
/// use trellis::{BoxedHandler, Router, handler};
/// use http::StatusCode;
///
/// fn require_token(next: BoxedHandler) -> BoxedHandler {
///     handler::from_fn(move |ctx| {
///         if ctx.header("authorization").is_none() {
///             ctx.text(StatusCode::UNAUTHORIZED, "missing token");
///             return;
///         }
///         next(ctx);
///     })
/// }
///
/// let app = Router::new().layer(require_token);
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Middleware in registration order, composed around a terminal handler on
/// demand.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware` as the new innermost layer.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.layers.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `terminal` in every layer. Folding from the back makes the
    /// first registered layer the outermost.
    pub fn then(&self, terminal: BoxedHandler) -> BoxedHandler {
        self.layers
            .iter()
            .rev()
            .fold(terminal, |next, layer| layer.wrap(next))
    }
}

/// The innermost wrapper placed around every matched handler. Runs right
/// after the handler returns, unless some layer short-circuited.
pub(crate) fn finalize(handler: BoxedHandler) -> BoxedHandler {
    handler::from_fn(move |ctx| {
        handler(ctx);
        ctx.finalize();
    })
}
