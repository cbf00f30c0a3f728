//! OpenAPI 3.0 document built from discovered endpoints.
//!
//! [`OpenApiBuilder`] is a [`DocumentationSink`]: registration feeds it one
//! [`OperationDoc`] per endpoint and [`OpenApiBuilder::build`] produces the
//! serializable [`OpenApiSpec`].

pub mod endpoint;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::marker::Verb;
use crate::metadata::{DocumentationSink, OperationDoc, ParameterDoc};

pub use endpoint::OpenApiRegistry;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document root.
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiSpec {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// Operations for a single path, one slot per verb.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, verb: Verb) -> &mut Option<Operation> {
        match verb {
            Verb::Get => &mut self.get,
            Verb::Post => &mut self.post,
            Verb::Put => &mut self.put,
            Verb::Delete => &mut self.delete,
            Verb::Patch => &mut self.patch,
            Verb::Options => &mut self.options,
            Verb::Head => &mut self.head,
        }
    }

    pub fn operation(&self, verb: Verb) -> Option<&Operation> {
        match verb {
            Verb::Get => self.get.as_ref(),
            Verb::Post => self.post.as_ref(),
            Verb::Put => self.put.as_ref(),
            Verb::Delete => self.delete.as_ref(),
            Verb::Patch => self.patch.as_ref(),
            Verb::Options => self.options.as_ref(),
            Verb::Head => self.head.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseDoc>,
}

/// A query parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Value>,
}

/// Collects operations into an [`OpenApiSpec`].
#[derive(Debug, Clone)]
pub struct OpenApiBuilder {
    title: String,
    version: String,
    paths: BTreeMap<String, PathItem>,
}

impl OpenApiBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            paths: BTreeMap::new(),
        }
    }

    pub fn build(self) -> OpenApiSpec {
        OpenApiSpec {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: self.title,
                version: self.version,
            },
            paths: self.paths,
            components: Components::default(),
        }
    }
}

impl DocumentationSink for OpenApiBuilder {
    fn add_operation(&mut self, op: OperationDoc) {
        let method = op.method;
        let item = self.paths.entry(op.path.clone()).or_default();
        *item.slot(method) = Some(operation(op));
    }
}

fn operation(op: OperationDoc) -> Operation {
    let parameters = op
        .query
        .iter()
        .map(|p| Parameter {
            name: p.name.clone(),
            location: "query",
            required: p.required,
            description: p.description.clone(),
            schema: primitive_schema(p),
        })
        .collect();

    let request_body = (!op.body.is_empty()).then(|| {
        let properties: serde_json::Map<String, Value> = op
            .body
            .iter()
            .map(|p| (p.name.clone(), primitive_schema(p)))
            .collect();
        let required: Vec<&str> = op
            .body
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        RequestBody {
            required: !required.is_empty(),
            content: json_content(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            })),
        }
    });

    let mut responses = BTreeMap::new();
    responses.insert(
        "200".to_string(),
        ResponseDoc {
            description: "Successful response".to_string(),
            content: Some(json_content(op.response_schema)),
        },
    );
    responses.insert(
        "400".to_string(),
        ResponseDoc {
            description: "Request could not be bound".to_string(),
            content: None,
        },
    );

    Operation {
        operation_id: op.operation_id,
        summary: op.summary,
        tags: op.tags,
        parameters,
        request_body,
        responses,
    }
}

fn primitive_schema(param: &ParameterDoc) -> Value {
    if param.schema_type == "array" {
        json!({ "type": "array", "items": {} })
    } else {
        json!({ "type": param.schema_type })
    }
}

fn json_content(schema: Value) -> BTreeMap<String, MediaType> {
    let mut content = BTreeMap::new();
    content.insert("application/json".to_string(), MediaType { schema });
    content
}
