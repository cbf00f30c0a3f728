//! Handler parameter specifications.
//!
//! A [`ParameterSpec`] is derived once from a handler signature. Besides the
//! descriptive fields it carries a monomorphized conversion function that
//! turns a bound JSON value, the request context or a scope into the
//! parameter's declared Rust type.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{FromContext, RequestContext};
use crate::di::{Resolve, Scope};
use crate::error::ContainerError;
use crate::marker::Annotation;

/// A bound argument, downcast back to the declared type by the invoker.
pub type BoxedArg = Box<dyn Any + Send>;

/// How a parameter is bound, decided from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// `String`
    Text,
    /// `bool`
    Boolean,
    /// `Vec<String>`
    TextList,
    /// Integer primitives.
    Integer,
    /// `f32`, `f64`, decimals.
    Number,
    /// Other sequence shapes.
    List,
    /// Any other body-sourced type, decoded with serde.
    Structured,
    /// Injected from the request context.
    Context,
    /// Resolved from the request's service scope.
    Service,
}

impl ParamKind {
    /// Kinds bound from the body or the query string.
    pub fn is_value(self) -> bool {
        !matches!(self, ParamKind::Context | ParamKind::Service)
    }

    /// JSON Schema primitive used in documentation entries.
    pub fn schema_type(self) -> &'static str {
        match self {
            ParamKind::Text => "string",
            ParamKind::Boolean => "boolean",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::TextList | ParamKind::List => "array",
            ParamKind::Structured | ParamKind::Context | ParamKind::Service => "object",
        }
    }

    /// The kind's empty representation, tried after `null`.
    pub(crate) fn empty_value(self) -> Value {
        match self {
            ParamKind::Text => Value::String(String::new()),
            ParamKind::Boolean => Value::Bool(false),
            ParamKind::TextList | ParamKind::List => Value::Array(Vec::new()),
            ParamKind::Integer => Value::from(0),
            ParamKind::Number => Value::from(0.0),
            ParamKind::Structured | ParamKind::Context | ParamKind::Service => {
                Value::Object(serde_json::Map::new())
            }
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum ArgSource {
    Value(fn(Value) -> Option<BoxedArg>),
    Context(fn(&RequestContext) -> BoxedArg),
    Service(fn(&Scope) -> Result<BoxedArg, ContainerError>),
}

#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    /// Declared Rust type, as reported by `std::any::type_name`.
    pub type_name: &'static str,
    pub kind: ParamKind,
    pub body_sourced: bool,
    pub default: Option<Value>,
    pub annotations: Vec<Annotation>,
    pub(crate) source: ArgSource,
}

impl ParameterSpec {
    /// A body- or query-bound parameter of type `T`.
    pub fn value<T>(name: impl Into<String>, kind: ParamKind) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        debug_assert!(kind.is_value(), "{kind:?} is not a value kind");
        Self::with_source(name, std::any::type_name::<T>(), kind, ArgSource::Value(decode::<T>))
    }

    /// A request-context parameter (`RequestContext`, `HeaderMap`, ...).
    pub fn context<T>(name: impl Into<String>) -> Self
    where
        T: FromContext + Send + 'static,
    {
        Self::with_source(
            name,
            std::any::type_name::<T>(),
            ParamKind::Context,
            ArgSource::Context(from_context::<T>),
        )
    }

    /// A parameter resolved from the service scope.
    pub fn service<T>(name: impl Into<String>) -> Self
    where
        T: Resolve + Send + 'static,
    {
        Self::with_source(
            name,
            std::any::type_name::<T>(),
            ParamKind::Service,
            ArgSource::Service(resolve::<T>),
        )
    }

    fn with_source(
        name: impl Into<String>,
        type_name: &'static str,
        kind: ParamKind,
        source: ArgSource,
    ) -> Self {
        Self {
            name: name.into(),
            type_name,
            kind,
            body_sourced: false,
            default: None,
            annotations: Vec::new(),
            source,
        }
    }

    /// Marks the parameter as read from the JSON request body.
    pub fn body(mut self) -> Self {
        if self.kind.is_value() {
            self.body_sourced = true;
        }
        self
    }

    /// Declared default, used when binding finds nothing usable.
    pub fn with_default(mut self, default: impl Serialize) -> Self {
        match serde_json::to_value(default) {
            Ok(value) => self.default = Some(value),
            Err(e) => tracing::warn!(parameter = %self.name, error = %e, "ignoring unserializable default"),
        }
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(key, value));
        self
    }

    /// Converts a JSON value to the declared type, if it fits.
    pub(crate) fn decode(&self, value: Value) -> Option<BoxedArg> {
        match self.source {
            ArgSource::Value(decode) => decode(value),
            _ => None,
        }
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("body_sourced", &self.body_sourced)
            .field("default", &self.default)
            .finish()
    }
}

fn decode<T: DeserializeOwned + Send + 'static>(value: Value) -> Option<BoxedArg> {
    serde_json::from_value::<T>(value)
        .ok()
        .map(|v| Box::new(v) as BoxedArg)
}

fn from_context<T: FromContext + Send + 'static>(ctx: &RequestContext) -> BoxedArg {
    Box::new(T::from_context(ctx))
}

fn resolve<T: Resolve + Send + 'static>(scope: &Scope) -> Result<BoxedArg, ContainerError> {
    T::resolve(scope).map(|v| Box::new(v) as BoxedArg)
}
