//! Verb and handler resolution.
//!
//! Precedence, per candidate type:
//!
//! 1. exactly one type-level marker: the verb is that marker, the handler is
//!    the first function named `*_async` whose return type is a result type.
//!    No such function rejects the type;
//! 2. otherwise, exactly one function carrying exactly one marker: that
//!    function and its verb;
//! 3. otherwise the type is rejected.
//!
//! Rejection is silent. Callers get `None` and register nothing.

use serde::Serialize;

use crate::handler::{HandlerFunction, HandlerType};
use crate::marker::Verb;

/// Name suffix of designated asynchronous action handlers.
pub const ASYNC_SUFFIX: &str = "_async";

/// Which marker decided the verb. Route derivation depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    ClassMarker,
    MethodMarker,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub verb: Verb,
    pub function: &'a HandlerFunction,
    pub resolution: Resolution,
}

pub fn resolve(ty: &HandlerType) -> Option<Resolved<'_>> {
    if let [verb] = ty.markers.as_slice() {
        return ty
            .functions
            .iter()
            .find(|f| is_action_handler(f))
            .map(|function| Resolved {
                verb: *verb,
                function,
                resolution: Resolution::ClassMarker,
            });
    }

    let mut marked = ty
        .functions
        .iter()
        .filter_map(|f| f.single_marker().map(|verb| (verb, f)));

    match (marked.next(), marked.next()) {
        (Some((verb, function)), None) => Some(Resolved {
            verb,
            function,
            resolution: Resolution::MethodMarker,
        }),
        _ => None,
    }
}

fn is_action_handler(function: &HandlerFunction) -> bool {
    function.name.ends_with(ASYNC_SUFFIX) && function.returns_result
}
