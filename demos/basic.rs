//! Minimal trellis example: parameter, constrained, wildcard routes and
//! middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/alice            # 404, id must be numeric
//!   curl http://localhost:3000/users/42/posts?page=2
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/assets/css/site.css
//!   curl -H 'x-block: 1' http://localhost:3000/users/42  # short-circuited

use http::StatusCode;
use serde::Deserialize;
use trellis::{BoxedHandler, Context, Router, Server, handler, middleware};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Router::new()
        .layer(middleware::trace())
        .layer(block_flagged)
        .get("/users/:id(^[0-9]+$)",       get_user)
        .get("/users/:id(^[0-9]+$)/posts", list_posts)
        .post("/users",                    create_user)
        .get("/assets/*",                  assets);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// Refuses any request carrying `x-block`, without reaching the handler.
fn block_flagged(next: BoxedHandler) -> BoxedHandler {
    handler::from_fn(move |ctx| {
        if ctx.header("x-block").is_some() {
            ctx.text(StatusCode::FORBIDDEN, "blocked");
            return;
        }
        next(ctx);
    })
}

// GET /users/:id
fn get_user(ctx: &mut Context) {
    let id = ctx.param("id").unwrap_or("unknown").to_owned();
    let _ = ctx.json(StatusCode::OK, &serde_json::json!({ "id": id, "name": "alice" }));
}

// GET /users/:id/posts?page=N
fn list_posts(ctx: &mut Context) {
    let page: u32 = match ctx.query("page") {
        None => 1,
        Some(_) => match ctx.query_as("page") {
            Ok(page) => page,
            Err(e) => return ctx.text(StatusCode::BAD_REQUEST, e.to_string()),
        },
    };
    let id = ctx.param("id").unwrap_or_default().to_owned();
    let _ = ctx.json(StatusCode::OK, &serde_json::json!({ "user": id, "page": page, "posts": [] }));
}

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

// POST /users
fn create_user(ctx: &mut Context) {
    match ctx.bind_json::<CreateUser>() {
        Ok(input) => {
            ctx.response_headers_mut()
                .insert(http::header::LOCATION, http::HeaderValue::from_static("/users/99"));
            let _ = ctx.json(StatusCode::CREATED, &serde_json::json!({ "id": "99", "name": input.name }));
        }
        Err(e) => ctx.text(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

// GET /assets/* — anything below /assets lands here
fn assets(ctx: &mut Context) {
    let file = ctx.path().trim_start_matches("/assets/").to_owned();
    ctx.write(format!("would serve {file}"));
}
