//! The immutable endpoint table built at startup.

use std::collections::BTreeMap;

use crate::discovery::Universe;
use crate::error::DiscoveryError;
use crate::handler::HandlerFunction;
use crate::marker::{Annotation, Verb};
use crate::params::ParameterSpec;
use crate::resolve::{Resolution, resolve};
use crate::route::RouteDeriver;

/// A fully resolved endpoint.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    /// Short handler type name.
    pub type_name: &'static str,
    pub type_path: &'static str,
    pub verb: Verb,
    pub resolution: Resolution,
    pub route: String,
    pub handler: HandlerFunction,
    pub type_markers: Vec<Verb>,
    pub type_annotations: Vec<Annotation>,
}

impl EndpointDescriptor {
    pub fn params(&self) -> &[ParameterSpec] {
        &self.handler.params
    }
}

#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    endpoints: Vec<EndpointDescriptor>,
}

impl EndpointTable {
    /// Scans, resolves and derives routes for every candidate in `universe`.
    ///
    /// Types that do not resolve are left out. Route derivation failures and
    /// two endpoints claiming the same verb and path abort the build.
    pub fn build(universe: &Universe, deriver: &RouteDeriver) -> Result<Self, DiscoveryError> {
        let mut by_route: BTreeMap<(String, Verb), EndpointDescriptor> = BTreeMap::new();

        for ty in universe.candidates() {
            let Some(resolved) = resolve(ty) else {
                tracing::debug!(handler_type = ty.type_path, "excluded: no unambiguous handler");
                continue;
            };

            let route = deriver.derive(ty, resolved.resolution)?;
            let descriptor = EndpointDescriptor {
                type_name: ty.name,
                type_path: ty.type_path,
                verb: resolved.verb,
                resolution: resolved.resolution,
                route: route.clone(),
                handler: resolved.function.clone(),
                type_markers: ty.markers.clone(),
                type_annotations: ty.annotations.clone(),
            };

            if let Some(existing) = by_route.get(&(route.clone(), resolved.verb)) {
                return Err(DiscoveryError::DuplicateRoute {
                    method: resolved.verb.to_string(),
                    path: route,
                    first: existing.type_path.to_string(),
                    second: ty.type_path.to_string(),
                });
            }
            by_route.insert((route, resolved.verb), descriptor);
        }

        Ok(Self {
            endpoints: by_route.into_values().collect(),
        })
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn find(&self, verb: Verb, route: &str) -> Option<&EndpointDescriptor> {
        self.endpoints
            .iter()
            .find(|e| e.verb == verb && e.route == route)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::handler::{HandlerType, SourceLocation};
    use crate::response::{ActionResult, IntoResponse};

    // Every type below points at this file, so routes end in `/table`.
    fn ty(name: &'static str) -> HandlerType {
        HandlerType::new(
            name,
            name,
            SourceLocation {
                file: file!(),
                module_path: module_path!(),
                manifest_dir: env!("CARGO_MANIFEST_DIR"),
            },
        )
    }

    fn function(name: &'static str) -> HandlerFunction {
        HandlerFunction::new(name, |_| async { Ok(StatusCode::OK.into_response()) })
    }

    #[test]
    fn test_build_resolves_and_derives() {
        let universe = Universe::new(vec![
            ty("ListThings").function(function("handle").marker(Verb::Get)),
            ty("CreateThing")
                .marker(Verb::Post)
                .function(function("execute_async").returns::<ActionResult>()),
            ty("Plain").function(function("helper")),
        ]);

        let table = EndpointTable::build(&universe, &RouteDeriver::new()).unwrap();
        assert_eq!(table.len(), 2);

        let list = table.find(Verb::Get, "/api/table").unwrap();
        assert_eq!(list.type_name, "ListThings");
        assert_eq!(list.resolution, Resolution::MethodMarker);

        let create = table.find(Verb::Post, "/api").unwrap();
        assert_eq!(create.handler.name, "execute_async");
    }

    #[test]
    fn test_ambiguous_types_are_excluded() {
        let universe = Universe::new(vec![
            ty("Ambiguous")
                .function(function("a").marker(Verb::Get))
                .function(function("b").marker(Verb::Get)),
            ty("NoHandler").marker(Verb::Get).function(function("handle")),
        ]);

        let table = EndpointTable::build(&universe, &RouteDeriver::new()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_same_verb_and_route_is_fatal() {
        let universe = Universe::new(vec![
            ty("First").function(function("handle").marker(Verb::Get)),
            ty("Second").function(function("handle").marker(Verb::Get)),
        ]);

        let err = EndpointTable::build(&universe, &RouteDeriver::new()).unwrap_err();
        match err {
            DiscoveryError::DuplicateRoute { method, path, first, second } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/api/table");
                assert_eq!(first, "First");
                assert_eq!(second, "Second");
            }
            other => panic!("expected DuplicateRoute, got {other:?}"),
        }
    }

    #[test]
    fn test_same_route_different_verbs_coexist() {
        let universe = Universe::new(vec![
            ty("Read").function(function("handle").marker(Verb::Get)),
            ty("Write").function(function("handle").marker(Verb::Put)),
        ]);

        let table = EndpointTable::build(&universe, &RouteDeriver::new()).unwrap();
        let verbs: Vec<_> = table.endpoints().iter().map(|e| e.verb).collect();
        assert_eq!(verbs, vec![Verb::Get, Verb::Put]);
    }
}
