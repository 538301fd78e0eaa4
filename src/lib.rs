//! # trellis
//!
//! The request-routing core of a minimal HTTP framework: a per-method
//! segment trie and an onion-style middleware chain. Nothing more.
//!
//! ## The contract
//!
//! Given a method and a path, trellis finds the registered handler, binds
//! the path parameters, and runs the handler inside every middleware layer.
//! That is the whole job. TLS, body limits, content negotiation and load
//! shedding belong to the reverse proxy in front of it.
//!
//! - Routing — static, `:param`, `:param(regex)` and `*` catch-all segments;
//!   at each level a literal beats a parameter beats a wildcard
//! - Middleware — `(next) -> handler` layers, first registered is outermost
//! - Serving — hyper over tokio, graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{Context, Router, Server, middleware};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .layer(middleware::trace())
//!         .get("/users/:id(^[0-9]+$)", get_user)
//!         .post("/users",              create_user)
//!         .get("/assets/*",            assets);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn get_user(ctx: &mut Context) {
//!     let id: u64 = ctx.param_as("id").unwrap_or_default();
//!     let _ = ctx.json(StatusCode::OK, &serde_json::json!({ "id": id }));
//! }
//!
//! fn create_user(ctx: &mut Context) {
//!     if ctx.body().is_empty() {
//!         ctx.set_status(StatusCode::BAD_REQUEST);
//!         return;
//!     }
//!     ctx.set_status(StatusCode::CREATED);
//! }
//!
//! fn assets(ctx: &mut Context) {
//!     let path = ctx.path().to_owned();
//!     ctx.write(path);
//! }
//! ```

mod context;
mod error;
mod method;
mod router;
mod server;

pub mod handler;
pub mod middleware;
pub mod tree;

pub use context::Context;
pub use error::{ContextError, Error, RouteError, UnknownMethod};
pub use handler::{BoxedHandler, Handler};
pub use method::Method;
pub use middleware::{Middleware, MiddlewareChain};
pub use router::{NOT_FOUND_BODY, Router};
pub use server::Server;
pub use tree::{MatchResult, Node, Params, RouteTree};
