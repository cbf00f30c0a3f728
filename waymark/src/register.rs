//! Registration glue: discovered endpoints onto the service collection, the
//! router and the documentation sink.

use std::sync::Arc;

use http::{Request, Response};
use tracing::Instrument;

use crate::bind::bind_arguments;
use crate::context::{Body, RequestContext};
use crate::di::{ServiceCollection, ServiceProvider};
use crate::discovery::Universe;
use crate::handler::Invocation;
use crate::metadata::{self, DocumentationSink};
use crate::response::{BoxBody, IntoResponse};
use crate::router::{RouteGroup, Router};
use crate::table::{EndpointDescriptor, EndpointTable};

/// Metadata key holding the handler type path on discovered routes.
pub const HANDLER_TYPE_KEY: &str = "waymark.handler_type";

/// Registers every candidate handler type as a scoped service.
pub fn add_endpoint_services(universe: &Universe, services: &mut ServiceCollection) {
    for ty in universe.candidates() {
        if !ty.register_service(services) {
            tracing::debug!(handler_type = ty.type_path, "handler type has no service registration");
        }
    }
}

/// Maps every endpoint of `table` onto `router` and documents it.
///
/// The returned group stands for all routes registered here; conventions
/// added to it apply to each of them when the router is built.
pub fn map_endpoints(
    table: &EndpointTable,
    provider: &Arc<ServiceProvider>,
    router: &mut Router,
    docs: &mut dyn DocumentationSink,
) -> RouteGroup {
    let mut group = RouteGroup::default();

    for descriptor in table.endpoints() {
        let shared = Arc::new(descriptor.clone());
        let provider = Arc::clone(provider);

        let handle = router.map(descriptor.verb.method(), &descriptor.route, move |req| {
            dispatch(Arc::clone(&shared), Arc::clone(&provider), req)
        });
        handle
            .with_name(format!("{}::{}", descriptor.type_name, descriptor.handler.name))
            .with_metadata(HANDLER_TYPE_KEY, descriptor.type_path.into());

        docs.add_operation(metadata::describe(descriptor));

        tracing::info!(
            method = %descriptor.verb,
            path = %descriptor.route,
            handler_type = descriptor.type_name,
            "endpoint registered"
        );
        group.push(handle);
    }

    group
}

/// Runs one request against a resolved endpoint.
///
/// The request scope is released when the handler future completes or when
/// this future is dropped, whichever comes first.
pub async fn dispatch(
    descriptor: Arc<EndpointDescriptor>,
    provider: Arc<ServiceProvider>,
    req: Request<Body>,
) -> Response<BoxBody> {
    let ctx = RequestContext::new(req);
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        method = %ctx.method(),
        path = %descriptor.route,
    );

    async move {
        let scope = provider.create_scope();
        let handler = &descriptor.handler;

        let result = match bind_arguments(handler, &ctx, &scope).await {
            Ok(arguments) => handler.invoke(Invocation { scope, arguments }).await,
            Err(e) => {
                drop(scope);
                Err(e)
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_server_error() {
                    tracing::error!(status = e.status, error = %e, "handler failed");
                } else {
                    tracing::debug!(status = e.status, error = %e, "request rejected");
                }
                e.into_response()
            }
        };

        tracing::debug!(
            status = response.status().as_u16(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}
