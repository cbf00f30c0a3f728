use std::ops::Deref;
use std::sync::Arc;

use http::StatusCode;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::di::{Resolve, Scope};
use crate::error::ContainerError;
use crate::response::{BoxBody, IntoResponse, json_response};

/// JSON response body. Also usable as a body-sourced parameter type.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<'de, T: DeserializeOwned> serde::Deserialize<'de> for Json<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Json)
    }
}

impl<T: Serialize + JsonSchema> IntoResponse for Json<T> {
    fn into_response(self) -> http::Response<BoxBody> {
        let body = serde_json::to_vec(&self.0).unwrap_or_default();
        json_response(StatusCode::OK, body)
    }

    fn response_schema() -> Option<serde_json::Value> {
        serde_json::to_value(schemars::schema_for!(T)).ok()
    }
}

/// A service resolved from the request's scope.
///
/// ```rust,ignore
/// #[get]
/// async fn handle(&self, catalog: Inject<Catalog>) -> Json<Vec<Product>> {
///     Json(catalog.all())
/// }
/// ```
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Inject(Arc::clone(&self.0))
    }
}

impl<T> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Send + Sync + 'static> Resolve for Inject<T> {
    fn resolve(scope: &Scope) -> Result<Self, ContainerError> {
        scope.resolve::<T>().map(Inject)
    }
}
