//! Per-request tracing.

use std::time::Instant;

use tracing::{Level, event};

use crate::handler::{self, BoxedHandler};

use super::Middleware;

/// Emits one event per request after the inner chain returns.
///
/// Fields: `method`, `path`, `route` (the matched pattern), `status` and
/// `latency_us`. Server errors are logged at `ERROR`, everything else at
/// `INFO`.
///
/// ```rust,no_run
/// use trellis::{Router, middleware};
///
/// let app = Router::new().layer(middleware::trace());
/// ```
pub fn trace() -> Trace {
    Trace { _priv: () }
}

/// See [`trace`].
#[derive(Clone, Debug)]
pub struct Trace {
    _priv: (),
}

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        handler::from_fn(move |ctx| {
            let started = Instant::now();
            next(ctx);
            let latency_us = started.elapsed().as_micros() as u64;

            let status = ctx.status().map_or(0, |s| s.as_u16());
            let route = ctx.route().unwrap_or("-");
            if status >= 500 {
                event!(Level::ERROR, method = %ctx.method(), path = ctx.path(), route, status, latency_us, "request failed");
            } else {
                event!(Level::INFO, method = %ctx.method(), path = ctx.path(), route, status, latency_us, "request");
            }
        })
    }
}
