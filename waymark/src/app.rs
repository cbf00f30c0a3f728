//! Application builder.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::config::WaymarkConfig;
use crate::context::{BoxError, boxed};
use crate::di::{ServiceCollection, ServiceProvider};
use crate::discovery::Universe;
use crate::error::DiscoveryError;
use crate::introspection::{ROUTES_PATH, RouteInfo, RouteRegistry, list_routes};
use crate::marker::Verb;
use crate::metadata;
use crate::observability::TracingConfig;
use crate::openapi::endpoint::{OPENAPI_PATH, openapi_spec};
use crate::openapi::{OpenApiBuilder, OpenApiRegistry};
use crate::register::{add_endpoint_services, map_endpoints};
use crate::response::{BoxBody, IntoResponse};
use crate::route::RouteDeriver;
use crate::router::{EndpointBuilder, RouteTable, Router};
use crate::server;
use crate::table::EndpointTable;

type GroupConvention = Box<dyn Fn(&mut EndpointBuilder) + Send + Sync>;

/// Builder for a Waymark application.
///
/// ```rust,ignore
/// Waymark::new()
///     .with_tracing(TracingConfig::new())
///     .services(|s| {
///         s.add_singleton(Catalog::default());
///     })
///     .openapi("shop", "1.0.0")
///     .discover()?
///     .listen("127.0.0.1:3000")
///     .await
/// ```
pub struct Waymark {
    config: WaymarkConfig,
    services: ServiceCollection,
    router: Router,
    table: EndpointTable,
    openapi: Option<(String, String)>,
    introspection: bool,
    conventions: Vec<GroupConvention>,
}

impl Waymark {
    pub fn new() -> Self {
        Self {
            config: WaymarkConfig::default(),
            services: ServiceCollection::new(),
            router: Router::new(),
            table: EndpointTable::default(),
            openapi: None,
            introspection: false,
            conventions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WaymarkConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs the global tracing subscriber.
    pub fn with_tracing(self, config: TracingConfig) -> Self {
        if !config.init() {
            tracing::debug!("tracing subscriber already installed");
        }
        self
    }

    /// Registers application services.
    pub fn services(mut self, configure: impl FnOnce(&mut ServiceCollection)) -> Self {
        configure(&mut self.services);
        self
    }

    /// Adds hand-written routes next to the discovered ones.
    pub fn router(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Serves an OpenAPI document of the discovered endpoints.
    pub fn openapi(mut self, title: impl Into<String>, version: impl Into<String>) -> Self {
        self.openapi = Some((title.into(), version.into()));
        self
    }

    /// Serves the route list.
    pub fn with_introspection(mut self, enabled: bool) -> Self {
        self.introspection = enabled;
        self
    }

    /// Queues a convention applied to every discovered endpoint.
    pub fn endpoint_conventions<F>(mut self, convention: F) -> Self
    where
        F: Fn(&mut EndpointBuilder) + Send + Sync + 'static,
    {
        self.conventions.push(Box::new(convention));
        self
    }

    pub fn config(&self) -> &WaymarkConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.table
    }

    /// Discovers every `#[endpoint]` type linked into the binary.
    pub fn discover(self) -> Result<Self, DiscoveryError> {
        self.discover_from(Universe::discovered())
    }

    /// Builds the endpoint table from an explicit universe and registers
    /// its handler types as services.
    pub fn discover_from(mut self, universe: Universe) -> Result<Self, DiscoveryError> {
        self.table = EndpointTable::build(&universe, &self.deriver())?;
        add_endpoint_services(&universe, &mut self.services);
        tracing::debug!(endpoints = self.table.len(), "endpoint table built");
        Ok(self)
    }

    fn deriver(&self) -> RouteDeriver {
        let deriver = RouteDeriver::new().with_api_root(self.config.api_root.clone());
        match &self.config.project_root {
            Some(root) => deriver.with_search_root(root.clone()),
            None => deriver,
        }
    }

    /// Maps the endpoint table onto the router and freezes everything.
    pub fn build(self) -> Application {
        let provider = self.services.build();
        let mut router = self.router;

        let mut docs = self.openapi.map(|(title, version)| OpenApiBuilder::new(title, version));
        let group = match docs.as_mut() {
            Some(docs) => map_endpoints(&self.table, &provider, &mut router, docs),
            None => map_endpoints(&self.table, &provider, &mut router, &mut ()),
        };
        for convention in self.conventions {
            group.add_convention(convention);
        }

        if let Some(docs) = docs {
            let registry = Arc::new(OpenApiRegistry::new(docs.build()));
            router.map(Method::GET, OPENAPI_PATH, move |_| openapi_spec(Arc::clone(&registry)));
        }

        let registry: Arc<OnceLock<Arc<RouteRegistry>>> = Arc::default();
        if self.introspection {
            let slot = Arc::clone(&registry);
            router.map(Method::GET, ROUTES_PATH, move |_| {
                let registry = slot.get().cloned();
                async move {
                    match registry {
                        Some(registry) => list_routes(registry).await,
                        None => StatusCode::NOT_FOUND.into_response(),
                    }
                }
            });
        }

        let routes = router.build();
        if self.introspection {
            let infos = route_infos(&routes, &self.table);
            let _ = registry.set(Arc::new(RouteRegistry::with_routes(infos)));
        }

        Application {
            config: self.config,
            provider,
            table: Arc::new(self.table),
            routes: Arc::new(routes),
        }
    }

    /// Builds the application and serves it on `addr`.
    pub async fn listen<A: ToSocketAddrs>(self, addr: A) -> std::io::Result<()> {
        self.build().listen(addr).await
    }

    /// Builds the application and serves it on the configured address.
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        self.listen(addr).await
    }
}

impl Default for Waymark {
    fn default() -> Self {
        Self::new()
    }
}

fn route_infos(routes: &RouteTable, table: &EndpointTable) -> Vec<RouteInfo> {
    routes
        .endpoints()
        .iter()
        .map(|endpoint| {
            let descriptor = Verb::from_name(endpoint.method.as_str())
                .and_then(|verb| table.find(verb, &endpoint.path));
            match descriptor {
                Some(d) => RouteInfo::new(
                    endpoint.method.as_str(),
                    &endpoint.path,
                    d.handler.name,
                    Some(d.type_name.to_string()),
                    metadata::collect(d),
                ),
                None => RouteInfo::new(
                    endpoint.method.as_str(),
                    &endpoint.path,
                    &endpoint.display_name,
                    None,
                    Vec::new(),
                ),
            }
        })
        .collect()
}

/// A built application: frozen routes and services.
#[derive(Clone)]
pub struct Application {
    config: WaymarkConfig,
    provider: Arc<ServiceProvider>,
    table: Arc<EndpointTable>,
    routes: Arc<RouteTable>,
}

impl Application {
    /// Handles one request in-process.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.routes.handle(req.map(boxed)).await
    }

    pub fn services(&self) -> &Arc<ServiceProvider> {
        &self.provider
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.table
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &WaymarkConfig {
        &self.config
    }

    pub async fn listen<A: ToSocketAddrs>(self, addr: A) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        server::serve(self, listener).await
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("endpoints", &self.table.len())
            .field("routes", &self.routes.endpoints().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::error::Error;
    use crate::handler::{HandlerFunction, HandlerType, SourceLocation};
    use crate::params::{ParamKind, ParameterSpec};
    use crate::testing::TestClient;

    fn echo_type() -> HandlerType {
        HandlerType::new(
            "Echo",
            "app::Echo",
            SourceLocation {
                file: file!(),
                module_path: module_path!(),
                manifest_dir: env!("CARGO_MANIFEST_DIR"),
            },
        )
        .function(
            HandlerFunction::new("handle", |invocation| async move {
                let (_scope, mut args) = invocation.into_parts();
                let word: String = args.take()?;
                Ok::<_, Error>(word.into_response())
            })
            .marker(Verb::Get)
            .returns::<String>()
            .param(ParameterSpec::value::<String>("word", ParamKind::Text)),
        )
    }

    #[tokio::test]
    async fn test_discovered_endpoint_is_served() {
        let app = Waymark::new()
            .discover_from(Universe::new(vec![echo_type()]))
            .unwrap();
        let client = TestClient::new(app).await;

        let response = client.get("/api/app?word=hi").send().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "hi");
    }

    #[tokio::test]
    async fn test_api_root_comes_from_config() {
        let config = WaymarkConfig {
            api_root: "v2".to_string(),
            ..WaymarkConfig::default()
        };
        let app = Waymark::new()
            .with_config(config)
            .discover_from(Universe::new(vec![echo_type()]))
            .unwrap();

        assert!(app.endpoints().find(Verb::Get, "/v2/app").is_some());
    }

    #[tokio::test]
    async fn test_endpoint_conventions_reach_discovered_routes() {
        let app = Waymark::new()
            .router(Router::new().get("/manual", |_| async { "m" }))
            .endpoint_conventions(|endpoint| {
                endpoint.with_metadata("discovered", Value::Bool(true));
            })
            .discover_from(Universe::new(vec![echo_type()]))
            .unwrap()
            .build();

        let discovered = app.routes().endpoint(&Method::GET, "/api/app").unwrap();
        assert_eq!(discovered.metadata("discovered"), Some(&Value::Bool(true)));
        assert_eq!(discovered.display_name, "Echo::handle");

        let manual = app.routes().endpoint(&Method::GET, "/manual").unwrap();
        assert!(manual.metadata("discovered").is_none());
    }

    #[tokio::test]
    async fn test_introspection_lists_discovered_metadata() {
        let app = Waymark::new()
            .with_introspection(true)
            .discover_from(Universe::new(vec![echo_type()]))
            .unwrap();
        let client = TestClient::new(app).await;

        let routes = client.get(ROUTES_PATH).send().await.json::<Value>();
        let echo = routes
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["path"] == "/api/app")
            .unwrap();
        assert_eq!(echo["handler_name"], "handle");
        assert_eq!(echo["handler_type"], "Echo");
        assert_eq!(echo["metadata"][0]["kind"]["marker"], "GET");
    }
}
