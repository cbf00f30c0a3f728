//! Verb markers, the body-source marker and declared annotations.
//!
//! Markers are pure data. The `#[endpoint]` macro turns `#[get]`, `#[post]`,
//! ... into [`Verb`] values and `#[body]` into a body-source flag on the
//! parameter (or, for older handlers, on the whole method).

use std::fmt;

use http::Method;
use serde::{Serialize, Serializer};

/// HTTP verb carried by a marker. A marker names exactly one verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

/// The single mapping between verbs and their wire-level method names.
const WIRE_NAMES: [(Verb, &str); 7] = [
    (Verb::Get, "GET"),
    (Verb::Post, "POST"),
    (Verb::Put, "PUT"),
    (Verb::Delete, "DELETE"),
    (Verb::Patch, "PATCH"),
    (Verb::Options, "OPTIONS"),
    (Verb::Head, "HEAD"),
];

impl Verb {
    pub const ALL: [Verb; 7] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Patch,
        Verb::Options,
        Verb::Head,
    ];

    /// Wire-level method name, e.g. `"GET"`.
    pub fn as_str(self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(verb, _)| *verb == self)
            .map(|(_, name)| *name)
            .unwrap_or("GET")
    }

    /// Parses a marker name case-insensitively (`get`, `POST`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        WIRE_NAMES
            .iter()
            .find(|(_, wire)| wire.eq_ignore_ascii_case(name))
            .map(|(verb, _)| *verb)
    }

    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
            Verb::Patch => Method::PATCH,
            Verb::Options => Method::OPTIONS,
            Verb::Head => Method::HEAD,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Verb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Whether requests with this method conventionally carry a body.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// "Read this value from the parsed request body."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BodySource;

/// A declared annotation other than a marker: `#[meta(key = "value")]` or a
/// doc comment (key `doc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
