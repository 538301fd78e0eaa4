//! HTTP method as a closed enum.
//!
//! Routes are registered per method, so a typo in a method name must fail at
//! registration, not silently create a tree nobody will ever hit. Wire names
//! stay the canonical external form: [`Method::as_str`] and [`FromStr`] map
//! between the two, case-sensitively per RFC 9110 §9.1.
//!
//! Covers the RFC 9110 methods, the WebDAV family (RFC 4918 / 4791 / 3253 /
//! 5323) and `PURGE` as used by nginx and Varnish.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownMethod;

macro_rules! methods {
    ($($variant:ident => $wire:literal,)+) => {
        /// A known HTTP method.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Method {
            $($variant,)+
        }

        impl Method {
            /// Every method, in declaration order.
            pub const ALL: &'static [Method] = &[$(Method::$variant,)+];

            /// Returns the uppercase wire representation (e.g. `"GET"`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for Method {
            type Err = UnknownMethod;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownMethod(other.to_owned())),
                }
            }
        }
    };
}

methods! {
    // RFC 9110
    Connect    => "CONNECT",
    Delete     => "DELETE",
    Get        => "GET",
    Head       => "HEAD",
    Options    => "OPTIONS",
    Patch      => "PATCH",
    Post       => "POST",
    Put        => "PUT",
    Trace      => "TRACE",
    // WebDAV, RFC 4918
    Copy       => "COPY",
    Lock       => "LOCK",
    Mkcol      => "MKCOL",
    Move       => "MOVE",
    Propfind   => "PROPFIND",
    Proppatch  => "PROPPATCH",
    Unlock     => "UNLOCK",
    // WebDAV extensions
    Mkcalendar => "MKCALENDAR", // RFC 4791, CalDAV
    Report     => "REPORT",     // RFC 3253
    Search     => "SEARCH",     // RFC 5323
    // cache invalidation
    Purge      => "PURGE",
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
