//! Introspection utilities for Waymark applications.
//!
//! Lists every route the application serves, discovered or hand-registered,
//! together with the metadata republished from its handler.

mod endpoint;
mod route_info;

pub use endpoint::{ROUTES_PATH, RouteRegistry, list_routes};
pub use route_info::RouteInfo;
