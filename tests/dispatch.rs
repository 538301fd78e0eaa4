//! Routing and middleware behaviour observed from outside the crate.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use http::header::CONTENT_TYPE;
use trellis::{BoxedHandler, Context, Method, NOT_FOUND_BODY, Router, handler};

type Log = Arc<Mutex<Vec<String>>>;

fn layer(log: &Log, name: &'static str) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |next: BoxedHandler| -> BoxedHandler {
        let log = Arc::clone(&log);
        handler::from_fn(move |ctx| {
            log.lock().unwrap().push(format!("{name}-pre"));
            next(ctx);
            log.lock().unwrap().push(format!("{name}-post"));
        })
    }
}

fn dispatch(app: &Router, method: Method, path: &str) -> Context {
    let mut ctx = Context::new(method, path);
    app.dispatch(&mut ctx);
    ctx
}

#[test]
fn middleware_wraps_handler_in_registration_order() {
    let log = Log::default();
    let handler_log = Arc::clone(&log);
    let app = Router::new()
        .layer(layer(&log, "M1"))
        .get("/user", move |_: &mut Context| handler_log.lock().unwrap().push("H".to_owned()))
        .layer(layer(&log, "M2"));

    dispatch(&app, Method::Get, "/user");
    assert_eq!(*log.lock().unwrap(), ["M1-pre", "M2-pre", "H", "M2-post", "M1-post"]);
}

#[test]
fn short_circuit_answers_without_the_handler() {
    let app = Router::new()
        .layer(|next: BoxedHandler| -> BoxedHandler {
            handler::from_fn(move |ctx| {
                if ctx.header("authorization").is_none() {
                    ctx.text(StatusCode::UNAUTHORIZED, "missing token");
                    return;
                }
                next(ctx);
            })
        })
        .get("/secret", |ctx: &mut Context| ctx.write("42"));

    let ctx = dispatch(&app, Method::Get, "/secret");
    assert_eq!(ctx.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(ctx.response_body(), b"missing token");
    assert!(!ctx.is_finalized());

    let mut ctx = Context::new(Method::Get, "/secret")
        .with_header(http::header::AUTHORIZATION, "Bearer t".parse().unwrap());
    app.dispatch(&mut ctx);
    assert_eq!(ctx.status(), Some(StatusCode::OK));
    assert_eq!(ctx.response_body(), b"42");
}

#[test]
fn outer_middleware_sees_the_finalized_response() {
    let seen = Arc::new(Mutex::new(None));
    let record = Arc::clone(&seen);
    let app = Router::new()
        .layer(move |next: BoxedHandler| -> BoxedHandler {
            let record = Arc::clone(&record);
            handler::from_fn(move |ctx| {
                next(ctx);
                *record.lock().unwrap() = Some((ctx.status(), ctx.is_finalized()));
            })
        })
        .get("/", |ctx: &mut Context| ctx.write("hello"));

    let ctx = dispatch(&app, Method::Get, "/");
    assert_eq!(*seen.lock().unwrap(), Some((Some(StatusCode::OK), true)));

    let res = ctx.into_response();
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
}

#[test]
fn not_found_response() {
    let app = Router::new().get("/user/:userId/:action", |_: &mut Context| {});

    let res = dispatch(&app, Method::Get, "/user/123/add/extra").into_response();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let ctx = dispatch(&app, Method::Post, "/user/123/add");
    assert_eq!(ctx.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(ctx.response_body(), NOT_FOUND_BODY.as_bytes());
}

#[test]
fn wildcard_and_constrained_routes() {
    let app = Router::new()
        .get("/room/:id(^[0-9]+$)", |ctx: &mut Context| {
            let id: u32 = ctx.param_as("id").unwrap();
            ctx.write(format!("room {id}"));
        })
        .get("/room/*", |ctx: &mut Context| {
            assert!(ctx.params().is_empty());
            ctx.write("lobby");
        });

    assert_eq!(dispatch(&app, Method::Get, "/room/42").response_body(), b"room 42");
    assert_eq!(dispatch(&app, Method::Get, "/room/abc").response_body(), b"lobby");
    assert_eq!(dispatch(&app, Method::Get, "/room/abc/def/").response_body(), b"lobby");
}

#[test]
fn query_and_json_inside_handlers() {
    #[derive(serde::Deserialize)]
    struct NewUser {
        name: String,
    }

    let app = Router::new().post("/users", |ctx: &mut Context| {
        let verbose: bool = ctx.query_as("verbose").unwrap_or(false);
        match ctx.bind_json::<NewUser>() {
            Ok(user) => {
                let body = serde_json::json!({ "name": user.name, "verbose": verbose });
                ctx.json(StatusCode::CREATED, &body).unwrap();
            }
            Err(e) => ctx.text(StatusCode::BAD_REQUEST, e.to_string()),
        }
    });

    let mut ctx = Context::new(Method::Post, "/users?verbose=true").with_body(r#"{"name":"ada"}"#);
    app.dispatch(&mut ctx);
    assert_eq!(ctx.status(), Some(StatusCode::CREATED));
    let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
    assert_eq!(body, serde_json::json!({ "name": "ada", "verbose": true }));

    let ctx = dispatch(&app, Method::Post, "/users");
    assert_eq!(ctx.status(), Some(StatusCode::BAD_REQUEST));
}

#[test]
#[should_panic(expected = "handler failed")]
fn handler_panics_are_not_masked() {
    fn boom(_: &mut Context) {
        panic!("handler failed");
    }

    let app = Router::new().get("/boom", boom);
    dispatch(&app, Method::Get, "/boom");
}
