//! Request-time parameter binding.
//!
//! Each parameter of the resolved handler function gets exactly one value,
//! in declaration order:
//!
//! - context parameters are taken from the [`RequestContext`];
//! - service parameters are resolved from the request [`Scope`];
//! - value parameters are read from the JSON body when they are
//!   body-sourced and the request carries a JSON body, otherwise from the
//!   query string. A missing or unconvertible value falls back to the
//!   declared default, then `null`, then the kind's empty value.

pub mod body;
pub(crate) mod query;

use serde_json::Value;

use crate::context::RequestContext;
use crate::di::Scope;
use crate::error::Error;
use crate::handler::{Arguments, HandlerFunction};
use crate::marker::carries_body;
use crate::params::{ArgSource, BoxedArg, ParamKind, ParameterSpec};

/// Binds every parameter of `function` for one request.
///
/// Conversion problems never fail the request. The only errors are a
/// service that cannot be resolved (500) and a declared type that cannot
/// be built even from its empty value (400).
pub async fn bind_arguments(
    function: &HandlerFunction,
    ctx: &RequestContext,
    scope: &Scope,
) -> Result<Arguments, Error> {
    let mut values = Vec::with_capacity(function.params.len());

    for param in &function.params {
        let value = match param.source {
            ArgSource::Context(from_context) => from_context(ctx),
            ArgSource::Service(resolve) => resolve(scope).map_err(|e| {
                tracing::error!(
                    handler = function.name,
                    parameter = %param.name,
                    error = %e,
                    "failed to resolve service parameter"
                );
                Error::from(e)
            })?,
            ArgSource::Value(_) => bind_value(function, param, ctx).await?,
        };
        values.push(value);
    }

    Ok(Arguments::new(values))
}

/// Whether the body is the source for this parameter on this request.
fn body_applies(function: &HandlerFunction, param: &ParameterSpec, ctx: &RequestContext) -> bool {
    (param.body_sourced || function.body_source) && carries_body(ctx.method()) && ctx.is_json()
}

async fn bind_value(
    function: &HandlerFunction,
    param: &ParameterSpec,
    ctx: &RequestContext,
) -> Result<BoxedArg, Error> {
    let candidate = if body_applies(function, param, ctx) {
        let fields = ctx.body_cache().fields().await;
        fields
            .get(&param.name)
            .and_then(|raw| from_json(param.kind, raw))
    } else {
        query::convert(param.kind, &ctx.query_values(&param.name))
    };

    if let Some(candidate) = candidate {
        if let Some(value) = param.decode(candidate) {
            return Ok(value);
        }
        tracing::debug!(parameter = %param.name, "bound value does not fit declared type");
    }

    fallback(param).ok_or_else(|| {
        Error::bad_request(format!(
            "parameter `{}` could not be bound to {}",
            param.name, param.type_name
        ))
    })
}

/// Declared default, then `null`, then the kind's empty value.
fn fallback(param: &ParameterSpec) -> Option<BoxedArg> {
    if let Some(default) = &param.default {
        if let Some(value) = param.decode(default.clone()) {
            return Some(value);
        }
        tracing::debug!(parameter = %param.name, "declared default does not fit declared type");
    }

    param
        .decode(Value::Null)
        .or_else(|| param.decode(param.kind.empty_value()))
}

/// Applies the per-kind body conversion rules to a raw JSON field.
fn from_json(kind: ParamKind, raw: &Value) -> Option<Value> {
    match kind {
        ParamKind::Text => raw.is_string().then(|| raw.clone()),
        ParamKind::Boolean => match raw {
            Value::Bool(_) => Some(raw.clone()),
            Value::String(s) => query::parse_bool(s).map(Value::Bool),
            _ => None,
        },
        ParamKind::TextList => match raw {
            Value::Array(items) if items.iter().all(Value::is_string) => Some(raw.clone()),
            _ => None,
        },
        ParamKind::Integer
        | ParamKind::Number
        | ParamKind::List
        | ParamKind::Structured => Some(raw.clone()),
        ParamKind::Context | ParamKind::Service => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use http::{Method, Request, StatusCode, header};
    use http_body_util::Full;
    use serde::Deserialize;

    use super::*;
    use crate::context::boxed;
    use crate::di::ServiceCollection;
    use crate::response::IntoResponse;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Address {
        city: String,
    }

    struct Catalog {
        name: &'static str,
    }

    fn function() -> HandlerFunction {
        HandlerFunction::new("handle", |_| async { Ok(StatusCode::OK.into_response()) })
    }

    fn request(method: Method, uri: &str, json: Option<&'static str>) -> RequestContext {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Bytes::from_static(json.as_bytes())
            }
            None => Bytes::new(),
        };
        RequestContext::new(builder.body(boxed(Full::new(body))).unwrap())
    }

    fn scope() -> Scope {
        let mut services = ServiceCollection::new();
        services.add_singleton(Catalog { name: "main" });
        services.build().create_scope()
    }

    #[tokio::test]
    async fn test_query_string_binding() {
        let f = function().param(ParameterSpec::value::<String>("category", ParamKind::Text));
        let ctx = request(Method::GET, "/p?category=widgets", None);

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "widgets");
    }

    #[tokio::test]
    async fn test_body_binding_reads_stream_once() {
        let f = function()
            .param(ParameterSpec::value::<String>("name", ParamKind::Text).body())
            .param(ParameterSpec::value::<i32>("qty", ParamKind::Integer).body());
        let ctx = request(Method::POST, "/p", Some(r#"{"name":"x","qty":4}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "x");
        assert_eq!(args.take::<i32>().unwrap(), 4);
        assert_eq!(ctx.body_cache().body_reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_body_field_uses_default() {
        let f = function().param(
            ParameterSpec::value::<String>("category", ParamKind::Text)
                .body()
                .with_default("general"),
        );
        let ctx = request(Method::POST, "/p", Some(r#"{"name":"x"}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "general");
    }

    #[tokio::test]
    async fn test_missing_field_without_default_is_empty() {
        let f = function()
            .param(ParameterSpec::value::<String>("name", ParamKind::Text).body())
            .param(ParameterSpec::value::<Option<String>>("note", ParamKind::Text).body())
            .param(ParameterSpec::value::<Vec<String>>("tags", ParamKind::TextList).body());
        let ctx = request(Method::POST, "/p", Some("{}"));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "");
        assert_eq!(args.take::<Option<String>>().unwrap(), None);
        assert!(args.take::<Vec<String>>().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_body_type_downgrades_to_default() {
        let f = function().param(
            ParameterSpec::value::<String>("name", ParamKind::Text)
                .body()
                .with_default("anon"),
        );
        let ctx = request(Method::POST, "/p", Some(r#"{"name":42}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "anon");
    }

    #[tokio::test]
    async fn test_body_boolean_accepts_string_literal() {
        let f = function().param(ParameterSpec::value::<bool>("active", ParamKind::Boolean).body());
        let ctx = request(Method::PUT, "/p", Some(r#"{"active":"TRUE"}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert!(args.take::<bool>().unwrap());
    }

    #[tokio::test]
    async fn test_body_ignored_for_get_falls_back_to_query() {
        let f = function().param(ParameterSpec::value::<String>("name", ParamKind::Text).body());
        let ctx = request(Method::GET, "/p?name=fromquery", Some(r#"{"name":"frombody"}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "fromquery");
        assert!(!ctx.body_cache().is_populated());
    }

    #[tokio::test]
    async fn test_legacy_function_body_marker() {
        let f = function()
            .body_source()
            .param(ParameterSpec::value::<String>("name", ParamKind::Text));
        let ctx = request(Method::PATCH, "/p", Some(r#"{"name":"legacy"}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "legacy");
    }

    #[tokio::test]
    async fn test_unparsable_bool_query() {
        let f = function()
            .param(ParameterSpec::value::<bool>("flag", ParamKind::Boolean))
            .param(ParameterSpec::value::<bool>("strict", ParamKind::Boolean).with_default(true));
        let ctx = request(Method::GET, "/p?flag=notabool&strict=notabool", None);

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert!(!args.take::<bool>().unwrap());
        assert!(args.take::<bool>().unwrap());
    }

    #[tokio::test]
    async fn test_structured_body_parameter() {
        let f = function().param(ParameterSpec::value::<Address>("address", ParamKind::Structured).body());
        let ctx = request(Method::POST, "/p", Some(r#"{"address":{"city":"Oslo"}}"#));

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<Address>().unwrap(), Address { city: "Oslo".into() });
    }

    #[tokio::test]
    async fn test_unbuildable_structured_parameter_is_bad_request() {
        let f = function().param(ParameterSpec::value::<Address>("address", ParamKind::Structured).body());
        let ctx = request(Method::POST, "/p", Some("{}"));

        let err = bind_arguments(&f, &ctx, &scope()).await.unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_context_and_service_parameters() {
        let f = function()
            .param(ParameterSpec::context::<RequestContext>("ctx"))
            .param(ParameterSpec::service::<Arc<Catalog>>("catalog"));
        let ctx = request(Method::GET, "/p", None);

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<RequestContext>().unwrap().request_id(), ctx.request_id());
        assert_eq!(args.take::<Arc<Catalog>>().unwrap().name, "main");
    }

    #[tokio::test]
    async fn test_unregistered_service_is_internal_error() {
        struct Missing;
        let f = function().param(ParameterSpec::service::<Arc<Missing>>("missing"));
        let ctx = request(Method::GET, "/p", None);

        let err = bind_arguments(&f, &ctx, &scope()).await.unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[tokio::test]
    async fn test_non_json_content_uses_query() {
        let f = function().param(ParameterSpec::value::<String>("name", ParamKind::Text).body());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/p?name=q")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(boxed(Full::new(Bytes::from_static(br#"{"name":"b"}"#))))
            .unwrap();
        let ctx = RequestContext::new(req);

        let mut args = bind_arguments(&f, &ctx, &scope()).await.unwrap();
        assert_eq!(args.take::<String>().unwrap(), "q");
    }
}
