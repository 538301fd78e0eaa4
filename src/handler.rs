//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* closure types in one tree per
//! method, and middleware wraps one handler in another. Both need a single
//! concrete type, so every handler is erased into a [`BoxedHandler`]:
//!
//! ```text
//! fn hello(ctx: &mut Context) { … }          ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                 ← Handler blanket impl
//!        ↓
//! Arc::new(hello)                            ← BoxedHandler
//!        ↓  stored in the tree, cloned per request
//! middleware.wrap(handler)                   ← still a BoxedHandler
//!        ↓
//! handler(&mut ctx)                          ← one vtable call per layer
//! ```
//!
//! Handlers are synchronous: they run to completion on whatever thread the
//! server dispatched the request on. Their only output is what they write
//! into the [`Context`].

use std::sync::Arc;

use crate::context::Context;

/// A type-erased handler shared across concurrent requests.
///
/// This is also the currency of middleware: a [`Middleware`](crate::Middleware)
/// receives the next `BoxedHandler` and returns a new one.
pub type BoxedHandler = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(ctx: &mut Context)
/// ```
///
/// The trait is sealed so that the blanket impl is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F where F: Fn(&mut Context) + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

/// Erases a closure into a [`BoxedHandler`].
///
/// Middleware bodies use this to build the handler they return; going
/// through a generic bound gives the closure the right higher-ranked
/// signature without annotations.
///
/// ```rust
/// use trellis::{BoxedHandler, handler};
///
/// fn timing(next: BoxedHandler) -> BoxedHandler {
///     handler::from_fn(move |ctx| {
///         let started = std::time::Instant::now();
///         next(ctx);
///         tracing::debug!(elapsed = ?started.elapsed(), "handled");
///     })
/// }
/// ```
pub fn from_fn<F>(f: F) -> BoxedHandler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    f.into_boxed_handler()
}
