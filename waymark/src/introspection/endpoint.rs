//! Introspection endpoint for exposing route metadata.

use std::sync::Arc;

use http::{Response, StatusCode};

use crate::introspection::RouteInfo;
use crate::response::{BoxBody, IntoResponse, json_response};

pub const ROUTES_PATH: &str = "/__waymark/routes";

/// Registry of route information captured when the application is built.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    /// Creates a new empty route registry.
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Creates a route registry with the given routes.
    pub fn with_routes(routes: Vec<RouteInfo>) -> Self {
        Self { routes }
    }

    /// Returns the registered routes.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }
}

/// Handler for the introspection endpoint.
///
/// Returns all registered routes as JSON.
pub async fn list_routes(registry: Arc<RouteRegistry>) -> Response<BoxBody> {
    match serde_json::to_vec(registry.routes()) {
        Ok(json) => json_response(StatusCode::OK, json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize route registry");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
