//! Method + path dispatch.
//!
//! The router is the host side of registration: it accepts a verb, a path
//! and an async callback, and hands back a [`RouteHandle`] on which
//! conventions can be queued. Conventions run when the router is finalized
//! into a [`RouteTable`], so they see every endpoint registered before that.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;

use crate::context::Body;
use crate::response::{BoxBody, IntoResponse};

type BoxFuture = Pin<Box<dyn Future<Output = Response<BoxBody>> + Send>>;
pub(crate) type HandlerFn = Arc<dyn Fn(Request<Body>) -> BoxFuture + Send + Sync>;

/// A convention applied to an endpoint when the router is built.
pub type Convention = Box<dyn FnOnce(&mut EndpointBuilder) + Send>;

/// The mutable view of one endpoint that conventions operate on.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    pub method: Method,
    pub path: String,
    pub display_name: String,
    pub metadata: Vec<(String, Value)>,
}

impl EndpointBuilder {
    pub fn with_metadata(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.metadata.push((key.into(), value));
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Deferred-convention handle for one registered route.
#[derive(Clone, Default)]
pub struct RouteHandle {
    conventions: Arc<Mutex<Vec<Convention>>>,
}

impl RouteHandle {
    /// Queues a convention. It runs when the router is built.
    pub fn add_convention<F>(&self, convention: F) -> &Self
    where
        F: FnOnce(&mut EndpointBuilder) + Send + 'static,
    {
        self.conventions.lock().push(Box::new(convention));
        self
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: Value) -> &Self {
        let key = key.into();
        self.add_convention(move |endpoint| {
            endpoint.with_metadata(key, value);
        })
    }

    pub fn with_name(&self, name: impl Into<String>) -> &Self {
        let name = name.into();
        self.add_convention(move |endpoint| endpoint.display_name = name)
    }

    fn drain(&self) -> Vec<Convention> {
        std::mem::take(&mut *self.conventions.lock())
    }
}

impl fmt::Debug for RouteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandle")
            .field("pending", &self.conventions.lock().len())
            .finish()
    }
}

/// One handle standing for several routes. Conventions added here are
/// forwarded to every member.
#[derive(Clone, Default)]
pub struct RouteGroup {
    handles: Vec<RouteHandle>,
}

impl RouteGroup {
    pub fn new(handles: Vec<RouteHandle>) -> Self {
        Self { handles }
    }

    pub fn push(&mut self, handle: RouteHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Queues `convention` on every route in the group.
    pub fn add_convention<F>(&self, convention: F) -> &Self
    where
        F: Fn(&mut EndpointBuilder) + Send + Sync + 'static,
    {
        let convention = Arc::new(convention);
        for handle in &self.handles {
            let convention = Arc::clone(&convention);
            handle.add_convention(move |endpoint| (*convention)(endpoint));
        }
        self
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: Value) -> &Self {
        let key = key.into();
        self.add_convention(move |endpoint| {
            endpoint.with_metadata(key.clone(), value.clone());
        })
    }
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup").field("routes", &self.handles.len()).finish()
    }
}

struct PendingRoute {
    handler: HandlerFn,
    display_name: String,
    handle: RouteHandle,
}

pub struct Router {
    routes: HashMap<(Method, String), PendingRoute>,
    order: Vec<(Method, String)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn route<F, Fut, Out>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.map(method, path, handler);
        self
    }

    pub fn get<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F, Fut, Out>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Registers a route and returns its convention handle. A later
    /// registration for the same method and path replaces the earlier one.
    pub fn map<F, Fut, Out>(&mut self, method: Method, path: &str, handler: F) -> RouteHandle
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let handler: HandlerFn = Arc::new(move |req: Request<Body>| {
            let fut = handler(req);
            Box::pin(async move { fut.await.into_response() }) as BoxFuture
        });

        let key = (method.clone(), path.to_string());
        let handle = RouteHandle::default();
        let pending = PendingRoute {
            handler,
            display_name: format!("{method} {path}"),
            handle: handle.clone(),
        };

        if self.routes.insert(key.clone(), pending).is_some() {
            tracing::warn!(%method, path, "route replaced");
        } else {
            self.order.push(key);
        }
        handle
    }

    /// Moves every route of `other` into this router.
    pub fn merge(mut self, mut other: Router) -> Self {
        for key in other.order.drain(..) {
            if let Some(pending) = other.routes.remove(&key) {
                if self.routes.insert(key.clone(), pending).is_none() {
                    self.order.push(key);
                }
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Applies queued conventions and freezes the routes.
    pub fn build(mut self) -> RouteTable {
        let mut routes = HashMap::with_capacity(self.routes.len());
        let mut endpoints = Vec::with_capacity(self.routes.len());

        for (method, path) in self.order.drain(..) {
            let Some(pending) = self.routes.remove(&(method.clone(), path.clone())) else {
                continue;
            };

            let mut endpoint = EndpointBuilder {
                method: method.clone(),
                path: path.clone(),
                display_name: pending.display_name,
                metadata: Vec::new(),
            };
            for convention in pending.handle.drain() {
                convention(&mut endpoint);
            }

            routes.insert((method, path), pending.handler);
            endpoints.push(endpoint);
        }

        RouteTable { routes, endpoints }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.order).finish()
    }
}

/// Finalized routes. Read-only and shared across requests.
pub struct RouteTable {
    routes: HashMap<(Method, String), HandlerFn>,
    endpoints: Vec<EndpointBuilder>,
}

impl RouteTable {
    /// Endpoints in registration order, with conventions applied.
    pub fn endpoints(&self) -> &[EndpointBuilder] {
        &self.endpoints
    }

    pub fn endpoint(&self, method: &Method, path: &str) -> Option<&EndpointBuilder> {
        self.endpoints
            .iter()
            .find(|e| e.method == *method && e.path == path)
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<BoxBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.routes.get(&(method, path)) {
            Some(handler) => handler(req).await,
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
