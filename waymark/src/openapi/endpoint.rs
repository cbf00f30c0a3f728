//! OpenAPI endpoint for exposing the API specification

use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;

use crate::openapi::OpenApiSpec;
use crate::response::{BoxBody, json_response};

pub const OPENAPI_PATH: &str = "/__waymark/openapi.json";

/// Holds the generated OpenAPI document
#[derive(Debug, Clone)]
pub struct OpenApiRegistry {
    spec: OpenApiSpec,
}

impl OpenApiRegistry {
    pub fn new(spec: OpenApiSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }
}

/// Handler for the OpenAPI endpoint
///
/// Returns the OpenAPI specification as JSON
pub async fn openapi_spec(registry: Arc<OpenApiRegistry>) -> Response<BoxBody> {
    match serde_json::to_vec_pretty(registry.spec()) {
        Ok(json) => json_response(StatusCode::OK, json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize OpenAPI document");
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, StatusCode};
    use serde_json::Value;

    use super::OPENAPI_PATH;
    use crate::app::Waymark;
    use crate::discovery::Universe;
    use crate::router::Router;
    use crate::testing::TestClient;

    fn app(router: Router) -> Waymark {
        Waymark::new()
            .router(router)
            .discover_from(Universe::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_openapi_spec_returns_200_with_json_content_type() {
        let router = Router::new().get("/hello", |_| async { "hello" });
        let client = TestClient::new(app(router).openapi("openapi-test", "1.0")).await;
        let response = client.get(OPENAPI_PATH).send().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
    }

    #[tokio::test]
    async fn test_openapi_spec_returns_valid_openapi_json_structure() {
        let router = Router::new().get("/hello", |_| async { "hello" });
        let client = TestClient::new(app(router).openapi("openapi-test", "1.0")).await;
        let json = client.get(OPENAPI_PATH).send().await.json::<Value>();

        assert_eq!(json["openapi"], "3.0.3");
        assert_eq!(json["info"]["title"], "openapi-test");
        assert!(json.get("paths").is_some());
        assert!(json.get("components").is_some());
    }

    #[tokio::test]
    async fn test_openapi_spec_returns_404_when_openapi_is_disabled() {
        let router = Router::new().get("/hello", |_| async { "hello" });
        let client = TestClient::new(app(router)).await;
        let response = client.get(OPENAPI_PATH).send().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.text().is_empty());
    }
}
