//! Per-request context: the request as it arrived plus the response being
//! built for it.
//!
//! Handlers never return anything. They read from the context and write a
//! status, headers and body into it; the server turns whatever is in the
//! buffer into the wire response once the middleware chain has unwound.
//! Buffering is what lets outer middleware observe (and rewrite) the
//! response after the handler ran.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::error::ContextError;
use crate::method::Method;
use crate::tree::Params;

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// The request/response capability handed to every handler and middleware.
pub struct Context {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,

    params: Params,
    route: Option<String>,
    query_cache: OnceCell<HashMap<String, String>>,
    form_cache: OnceCell<HashMap<String, String>>,

    status: Option<StatusCode>,
    response_headers: HeaderMap,
    response_body: Vec<u8>,
    finalized: bool,
}

impl Context {
    /// A context for `method` on `target`, which may carry a `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_owned(),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
            route: None,
            query_cache: OnceCell::new(),
            form_cache: OnceCell::new(),
            status: None,
            response_headers: HeaderMap::new(),
            response_body: Vec::new(),
            finalized: false,
        }
    }

    /// Adds a request header. Builder-style, for constructing contexts
    /// outside the server (tests, embedding).
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn from_parts(method: Method, parts: http::request::Parts, body: Bytes) -> Self {
        let mut ctx = Self::new(method, parts.uri.path());
        ctx.query = parts.uri.query().map(str::to_owned);
        ctx.headers = parts.headers;
        ctx.body = body;
        ctx
    }

    // ── Request side ──────────────────────────────────────────────────────────

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header value as text. `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The pattern the request was routed through, e.g. `/users/:id`.
    /// `None` until the dispatcher has matched a route.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// All bound path parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// A path parameter parsed into `T`.
    pub fn param_as<T>(&self, key: &str) -> Result<T, ContextError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value("path", key, self.param(key))
    }

    /// A query-string value. The query is decoded once per request.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_cache
            .get_or_init(|| decode(self.query.as_deref().unwrap_or_default().as_bytes()))
            .get(key)
            .map(String::as_str)
    }

    /// A query-string value parsed into `T`.
    pub fn query_as<T>(&self, key: &str) -> Result<T, ContextError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value("query", key, self.query(key))
    }

    /// A value from an `application/x-www-form-urlencoded` body. Bodies of any
    /// other content type have no form values.
    pub fn form(&self, key: &str) -> Option<&str> {
        self.form_cache
            .get_or_init(|| {
                let is_form = self
                    .header(CONTENT_TYPE.as_str())
                    .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
                if is_form { decode(&self.body) } else { HashMap::new() }
            })
            .get(key)
            .map(String::as_str)
    }

    /// Decodes the JSON body into `T`.
    ///
    /// Unknown fields are accepted unless `T` opts out with
    /// `#[serde(deny_unknown_fields)]`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        if self.body.is_empty() {
            return Err(ContextError::EmptyBody);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub(crate) fn bind_route(&mut self, pattern: &str, params: Params) {
        self.route = Some(pattern.to_owned());
        self.params = params;
    }

    // ── Response side ─────────────────────────────────────────────────────────

    /// The response status written so far, `None` if nothing set one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Appends to the response body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.response_body.extend_from_slice(bytes.as_ref());
    }

    /// Replaces the response with `status` and a plain-text body.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.respond(status, TEXT_PLAIN, body.into().into_bytes());
    }

    /// Replaces the response with `status` and `value` serialised as JSON.
    ///
    /// On a serialisation error the response is left untouched.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), ContextError> {
        let body = serde_json::to_vec(value)?;
        self.respond(status, APPLICATION_JSON, body);
        Ok(())
    }

    fn respond(&mut self, status: StatusCode, content_type: &'static str, body: Vec<u8>) {
        self.status = Some(status);
        self.response_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.response_body = body;
    }

    /// Whether the finalizing step behind the handler has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Settles the buffered response once the terminal handler returned:
    /// an unset status becomes `200 OK` and an unlabelled non-empty body is
    /// sent as plain text.
    pub(crate) fn finalize(&mut self) {
        self.status.get_or_insert(StatusCode::OK);
        if !self.response_body.is_empty() && !self.response_headers.contains_key(CONTENT_TYPE) {
            self.response_headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        }
        self.finalized = true;
    }

    /// Converts the buffered response into a hyper-ready response.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.response_body)));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.response_headers;
        res
    }
}

fn decode(input: &[u8]) -> HashMap<String, String> {
    // first occurrence wins for repeated keys
    let mut values = HashMap::new();
    for (k, v) in form_urlencoded::parse(input) {
        values.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    values
}

fn parse_value<T>(source_name: &'static str, key: &str, raw: Option<&str>) -> Result<T, ContextError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw.ok_or_else(|| ContextError::Missing { source_name, key: key.to_owned() })?;
    raw.parse().map_err(|e: T::Err| ContextError::Invalid {
        source_name,
        key: key.to_owned(),
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}
