//! Error types.
//!
//! Three families, one per phase of a router's life:
//!
//! - [`RouteError`] — registration. Raised while the tree is being built;
//!   [`Router::on`](crate::Router::on) turns it into a panic because a bad
//!   pattern is a startup bug, not a runtime condition.
//! - [`ContextError`] — request handling. Returned by [`Context`](crate::Context)
//!   accessors; the handler decides which response that deserves.
//! - [`Error`] — infrastructure. Binding a port or accepting a connection.
//!
//! A route that does not match is *not* an error anywhere in this crate: it
//! is `None` from the lookup and a `404` from the dispatcher.

use thiserror::Error;

/// The error type returned by [`Server::serve`](crate::Server::serve).
///
/// Application-level outcomes (404, 422, etc.) are expressed as responses
/// written into the [`Context`](crate::Context), not as `Error`s.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A pattern that cannot be compiled into the route tree.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("path format unsupported: path must not contain an empty '//' segment (`{pattern}`)")]
    EmptySegment { pattern: String },

    #[error("parameter segment `{segment}` in `{pattern}` has no name")]
    EmptyParamName { pattern: String, segment: String },

    #[error("parameter segment `{segment}` in `{pattern}` opens a constraint but never closes it")]
    UnclosedConstraint { pattern: String, segment: String },

    #[error("invalid constraint `{constraint}` in `{pattern}`: {source}")]
    InvalidConstraint {
        pattern: String,
        constraint: String,
        #[source]
        source: regex::Error,
    },

    #[error("parameter `:{new}` in `{pattern}` conflicts with existing parameter `:{existing}` at the same position")]
    ParamConflict {
        pattern: String,
        existing: String,
        new: String,
    },

    #[error("wildcard `*` must be the last segment of `{pattern}`")]
    WildcardNotLast { pattern: String },
}

/// A request value that is missing or malformed.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("missing {source_name} value `{key}`")]
    Missing { source_name: &'static str, key: String },

    #[error("{source_name} value `{key}` = `{value}` is invalid: {reason}")]
    Invalid {
        source_name: &'static str,
        key: String,
        value: String,
        reason: String,
    },

    #[error("request body is empty")]
    EmptyBody,

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A method string outside the closed [`Method`](crate::Method) set.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown HTTP method `{0}`")]
pub struct UnknownMethod(pub String);
