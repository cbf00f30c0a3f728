//! Handler type auto-discovery via `inventory`.
//!
//! `#[endpoint]` emits an `inventory::submit!` that registers a
//! [`HandlerTypeRegistration`] at link time. [`Universe::discovered()`]
//! builds every registered [`HandlerType`]; [`scan`] keeps the ones that
//! carry a marker anywhere.

use crate::handler::HandlerType;

/// A link-time registration emitted by `#[endpoint]`.
pub struct HandlerTypeRegistration {
    /// Builds the handler type record.
    pub describe: fn() -> HandlerType,
}

impl HandlerTypeRegistration {
    pub const fn new(describe: fn() -> HandlerType) -> Self {
        Self { describe }
    }
}

inventory::collect!(HandlerTypeRegistration);

/// The set of handler types an application is built from.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    types: Vec<HandlerType>,
}

impl Universe {
    /// A universe with exactly the given types.
    pub fn new(types: Vec<HandlerType>) -> Self {
        Self { types }
    }

    /// Every handler type registered through `#[endpoint]` in the binary.
    pub fn discovered() -> Self {
        let types = inventory::iter::<HandlerTypeRegistration>
            .into_iter()
            .map(|registration| (registration.describe)())
            .collect::<Vec<_>>();
        tracing::debug!(count = types.len(), "collected handler type registrations");
        Self { types }
    }

    pub fn with(mut self, ty: HandlerType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn types(&self) -> &[HandlerType] {
        &self.types
    }

    /// The scanner's view of this universe.
    pub fn candidates(&self) -> Vec<&HandlerType> {
        scan(&self.types)
    }
}

/// Keeps the types that carry a marker on the type or on any function.
pub fn scan(types: &[HandlerType]) -> Vec<&HandlerType> {
    types.iter().filter(|ty| is_candidate(ty)).collect()
}

pub fn is_candidate(ty: &HandlerType) -> bool {
    !ty.markers.is_empty() || ty.functions.iter().any(|f| !f.markers.is_empty())
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::handler::{HandlerFunction, SourceLocation};
    use crate::marker::Verb;
    use crate::response::IntoResponse;

    fn source() -> SourceLocation {
        SourceLocation {
            file: file!(),
            module_path: module_path!(),
            manifest_dir: env!("CARGO_MANIFEST_DIR"),
        }
    }

    fn function(name: &'static str) -> HandlerFunction {
        HandlerFunction::new(name, |_| async { Ok(StatusCode::OK.into_response()) })
    }

    #[test]
    fn test_scan_keeps_class_marked_types() {
        let ty = HandlerType::new("A", "x::A", source()).marker(Verb::Get);
        assert!(is_candidate(&ty));
    }

    #[test]
    fn test_scan_keeps_method_marked_types() {
        let ty = HandlerType::new("B", "x::B", source()).function(function("handle").marker(Verb::Post));
        assert!(is_candidate(&ty));
    }

    #[test]
    fn test_scan_drops_unmarked_types() {
        let ty = HandlerType::new("C", "x::C", source()).function(function("execute_async"));
        assert!(!is_candidate(&ty));

        let universe = Universe::new(vec![ty]).with(HandlerType::new("D", "x::D", source()).marker(Verb::Put));
        let names: Vec<_> = universe.candidates().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["D"]);
    }
}
