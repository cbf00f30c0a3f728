//! Endpoint metadata and documentation entries.
//!
//! [`collect`] republishes every marker and annotation found on the handler
//! type, the handler function and its parameters. [`describe`] turns a
//! descriptor into an [`OperationDoc`] for a [`DocumentationSink`]. Neither
//! affects binding.

use serde::Serialize;
use serde_json::Value;

use crate::marker::{Annotation, Verb};
use crate::params::ParamKind;
use crate::table::EndpointDescriptor;

/// Annotation key carrying doc comments.
pub const DOC_KEY: &str = "doc";
/// Annotation key carrying operation tags.
pub const TAG_KEY: &str = "tag";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "on", content = "name", rename_all = "snake_case")]
pub enum MetadataTarget {
    Type,
    Function,
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Marker(Verb),
    BodySource,
    Annotation(Annotation),
}

/// One item of endpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub target: MetadataTarget,
    pub kind: MetadataKind,
}

impl Metadata {
    fn new(target: MetadataTarget, kind: MetadataKind) -> Self {
        Self { target, kind }
    }
}

/// Everything declared on the endpoint, in declaration order: type, then
/// function, then each parameter.
pub fn collect(descriptor: &EndpointDescriptor) -> Vec<Metadata> {
    let mut items = Vec::new();

    for verb in &descriptor.type_markers {
        items.push(Metadata::new(MetadataTarget::Type, MetadataKind::Marker(*verb)));
    }
    for annotation in &descriptor.type_annotations {
        items.push(Metadata::new(
            MetadataTarget::Type,
            MetadataKind::Annotation(annotation.clone()),
        ));
    }

    let handler = &descriptor.handler;
    for verb in &handler.markers {
        items.push(Metadata::new(MetadataTarget::Function, MetadataKind::Marker(*verb)));
    }
    if handler.body_source {
        items.push(Metadata::new(MetadataTarget::Function, MetadataKind::BodySource));
    }
    for annotation in &handler.annotations {
        items.push(Metadata::new(
            MetadataTarget::Function,
            MetadataKind::Annotation(annotation.clone()),
        ));
    }

    for param in &handler.params {
        let target = || MetadataTarget::Parameter(param.name.clone());
        if param.body_sourced {
            items.push(Metadata::new(target(), MetadataKind::BodySource));
        }
        for annotation in &param.annotations {
            items.push(Metadata::new(target(), MetadataKind::Annotation(annotation.clone())));
        }
    }

    items
}

/// A query or body input of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDoc {
    pub name: String,
    /// JSON Schema primitive: `string`, `boolean`, `integer`, `number`,
    /// `array` or `object`.
    pub schema_type: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Documentation for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDoc {
    pub method: Verb,
    pub path: String,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub query: Vec<ParameterDoc>,
    pub body: Vec<ParameterDoc>,
    pub response_schema: Value,
}

/// Consumes per-operation documentation.
pub trait DocumentationSink {
    fn add_operation(&mut self, operation: OperationDoc);
}

impl DocumentationSink for Vec<OperationDoc> {
    fn add_operation(&mut self, operation: OperationDoc) {
        self.push(operation);
    }
}

/// Discards documentation.
impl DocumentationSink for () {
    fn add_operation(&mut self, _operation: OperationDoc) {}
}

pub fn describe(descriptor: &EndpointDescriptor) -> OperationDoc {
    let handler = &descriptor.handler;
    let mut query = Vec::new();
    let mut body = Vec::new();

    // Every parameter except request-context ones gets an entry. Services
    // document as `object` and are never required from the client.
    for param in handler.params.iter().filter(|p| p.kind != ParamKind::Context) {
        let required = param.kind.is_value()
            && param.default.is_none()
            && param.decode(Value::Null).is_none();
        let doc = ParameterDoc {
            name: param.name.clone(),
            schema_type: param.kind.schema_type(),
            required,
            description: annotation(&param.annotations, DOC_KEY),
        };
        if param.body_sourced || handler.body_source {
            body.push(doc);
        } else {
            query.push(doc);
        }
    }

    let response_schema = handler.response_schema().unwrap_or_else(|| {
        tracing::debug!(
            handler_type = descriptor.type_path,
            "no typed response schema, documenting a generic object"
        );
        serde_json::json!({ "type": "object" })
    });

    let tags = descriptor
        .type_annotations
        .iter()
        .chain(&handler.annotations)
        .filter(|a| a.key == TAG_KEY)
        .map(|a| a.value.clone())
        .collect();

    OperationDoc {
        method: descriptor.verb,
        path: descriptor.route.clone(),
        operation_id: descriptor.type_name.to_string(),
        summary: annotation(&handler.annotations, DOC_KEY)
            .or_else(|| annotation(&descriptor.type_annotations, DOC_KEY)),
        tags,
        query,
        body,
        response_schema,
    }
}

fn annotation(annotations: &[Annotation], key: &str) -> Option<String> {
    let lines: Vec<&str> = annotations
        .iter()
        .filter(|a| a.key == key)
        .map(|a| a.value.trim())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" ").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;

    use super::*;
    use crate::context::RequestContext;
    use crate::extract::Json;
    use crate::handler::HandlerFunction;
    use crate::params::{ParamKind, ParameterSpec};
    use crate::resolve::Resolution;
    use crate::response::{ActionResult, IntoResponse};

    struct Catalog;

    fn descriptor(handler: HandlerFunction) -> EndpointDescriptor {
        EndpointDescriptor {
            type_name: "CreateProduct",
            type_path: "shop::api::catalog::CreateProduct",
            verb: Verb::Post,
            resolution: Resolution::ClassMarker,
            route: "/api/catalog".to_string(),
            handler,
            type_markers: vec![Verb::Post],
            type_annotations: vec![Annotation::new(TAG_KEY, "catalog")],
        }
    }

    fn handler() -> HandlerFunction {
        HandlerFunction::new("execute_async", |_| async { Ok(StatusCode::OK.into_response()) })
            .returns::<ActionResult>()
            .annotation(DOC_KEY, " Creates a product.")
            .param(
                ParameterSpec::value::<String>("name", ParamKind::Text)
                    .body()
                    .annotation(DOC_KEY, "Display name"),
            )
            .param(ParameterSpec::value::<f64>("price", ParamKind::Number).body().with_default(0.0))
            .param(ParameterSpec::value::<Vec<String>>("tags", ParamKind::TextList))
            .param(ParameterSpec::value::<Option<i64>>("limit", ParamKind::Integer))
            .param(ParameterSpec::context::<RequestContext>("ctx"))
            .param(ParameterSpec::service::<Arc<Catalog>>("catalog"))
    }

    #[test]
    fn test_collect_republishes_everything() {
        let items = collect(&descriptor(handler()));

        assert_eq!(
            items[0],
            Metadata::new(MetadataTarget::Type, MetadataKind::Marker(Verb::Post))
        );
        assert!(items.contains(&Metadata::new(
            MetadataTarget::Type,
            MetadataKind::Annotation(Annotation::new(TAG_KEY, "catalog"))
        )));
        assert!(items.contains(&Metadata::new(
            MetadataTarget::Parameter("name".into()),
            MetadataKind::BodySource
        )));
        assert!(items.contains(&Metadata::new(
            MetadataTarget::Parameter("name".into()),
            MetadataKind::Annotation(Annotation::new(DOC_KEY, "Display name"))
        )));
        assert!(!items.contains(&Metadata::new(
            MetadataTarget::Parameter("tags".into()),
            MetadataKind::BodySource
        )));
    }

    #[test]
    fn test_describe_splits_body_and_query() {
        let doc = describe(&descriptor(handler()));

        let body: Vec<_> = doc.body.iter().map(|p| (p.name.as_str(), p.schema_type)).collect();
        assert_eq!(body, vec![("name", "string"), ("price", "number")]);

        let query: Vec<_> = doc.query.iter().map(|p| (p.name.as_str(), p.schema_type)).collect();
        assert_eq!(query, vec![("tags", "array"), ("limit", "integer"), ("catalog", "object")]);
    }

    #[test]
    fn test_describe_documents_services_but_not_context() {
        let handler = HandlerFunction::new("handle", |_| async { Ok(StatusCode::OK.into_response()) })
            .param(ParameterSpec::value::<String>("name", ParamKind::Text))
            .param(ParameterSpec::context::<RequestContext>("ctx"))
            .param(ParameterSpec::service::<Arc<Catalog>>("catalog"));
        let doc = describe(&descriptor(handler));

        let query: Vec<_> = doc.query.iter().map(|p| (p.name.as_str(), p.schema_type)).collect();
        assert_eq!(query, vec![("name", "string"), ("catalog", "object")]);
        assert!(!doc.query[1].required);

        let legacy = HandlerFunction::new("handle", |_| async { Ok(StatusCode::OK.into_response()) })
            .body_source()
            .param(ParameterSpec::service::<Arc<Catalog>>("catalog"));
        let doc = describe(&descriptor(legacy));
        assert!(doc.query.is_empty());
        assert_eq!(doc.body[0].name, "catalog");
        assert_eq!(doc.body[0].schema_type, "object");
    }

    #[test]
    fn test_describe_required_and_descriptions() {
        let doc = describe(&descriptor(handler()));

        assert!(doc.body[0].required);
        assert_eq!(doc.body[0].description.as_deref(), Some("Display name"));
        assert!(!doc.body[1].required);
        assert!(!doc.query[1].required);
    }

    #[test]
    fn test_describe_summary_tags_and_fallback_schema() {
        let doc = describe(&descriptor(handler()));

        assert_eq!(doc.summary.as_deref(), Some("Creates a product."));
        assert_eq!(doc.tags, vec!["catalog"]);
        assert_eq!(doc.operation_id, "CreateProduct");
        assert_eq!(doc.response_schema, serde_json::json!({ "type": "object" }));
    }

    #[test]
    fn test_describe_uses_typed_response_schema() {
        let handler = HandlerFunction::new("handle", |_| async { Ok(StatusCode::OK.into_response()) })
            .returns::<Json<Vec<String>>>();
        let doc = describe(&descriptor(handler));

        assert_eq!(doc.response_schema["type"], "array");
    }

    #[test]
    fn test_legacy_body_marker_documents_body() {
        let handler = HandlerFunction::new("handle", |_| async { Ok(StatusCode::OK.into_response()) })
            .body_source()
            .param(ParameterSpec::value::<bool>("active", ParamKind::Boolean));
        let doc = describe(&descriptor(handler));

        assert_eq!(doc.body.len(), 1);
        assert_eq!(doc.body[0].schema_type, "boolean");
        assert!(doc.query.is_empty());
    }

    #[test]
    fn test_sinks() {
        let mut docs: Vec<OperationDoc> = Vec::new();
        docs.add_operation(describe(&descriptor(handler())));
        assert_eq!(docs.len(), 1);

        let mut discard = ();
        discard.add_operation(describe(&descriptor(handler())));
    }
}
