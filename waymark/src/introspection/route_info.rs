//! Route metadata for introspection.

use serde::Serialize;

use crate::metadata::Metadata;

/// Metadata about a registered route.
///
/// # Examples
///
/// ```
/// use waymark::introspection::RouteInfo;
///
/// let info = RouteInfo::new("GET", "/api/catalog/list_products", "handle", None, Vec::new());
/// assert_eq!(info.method, "GET");
/// assert_eq!(info.path, "/api/catalog/list_products");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteInfo {
    /// The HTTP method (GET, POST, PUT, DELETE, etc.).
    pub method: String,
    /// The derived route.
    pub path: String,
    /// The name of the handler function.
    pub handler_name: String,
    /// The handler type, for discovered endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_type: Option<String>,
    /// Markers and annotations republished from the handler.
    pub metadata: Vec<Metadata>,
}

impl RouteInfo {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        handler_name: impl Into<String>,
        handler_type: Option<String>,
        metadata: Vec<Metadata>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            handler_name: handler_name.into(),
            handler_type,
            metadata,
        }
    }
}
