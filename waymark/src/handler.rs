//! Handler type and handler function records.
//!
//! These are the startup-time stand-ins for reflection: `#[endpoint]`
//! generates one [`HandlerType`] per annotated `impl` block, and tests or
//! hosts can build them by hand with the same builder API.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Response;
use serde_json::Value;

use crate::di::{Injectable, Scope, ServiceCollection};
use crate::error::Error;
use crate::marker::{Annotation, Verb};
use crate::params::{BoxedArg, ParameterSpec};
use crate::response::{BoxBody, IntoResponse};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<BoxBody>, Error>> + Send>>;

pub type Invoker = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

/// Bound arguments in declaration order.
pub struct Arguments {
    values: VecDeque<BoxedArg>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<BoxedArg>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the next argument, downcast to its declared type.
    pub fn take<T: 'static>(&mut self) -> Result<T, Error> {
        let value = self
            .values
            .pop_front()
            .ok_or_else(|| Error::internal("handler called with too few arguments"))?;

        value.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::internal(format!(
                "argument is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments").field("len", &self.values.len()).finish()
    }
}

/// Everything an invoker needs for one call.
pub struct Invocation {
    pub scope: Scope,
    pub arguments: Arguments,
}

impl Invocation {
    pub fn into_parts(self) -> (Scope, Arguments) {
        (self.scope, self.arguments)
    }
}

/// One recorded function of a handler type.
#[derive(Clone)]
pub struct HandlerFunction {
    pub name: &'static str,
    /// Method-level markers, in declaration order.
    pub markers: Vec<Verb>,
    /// Legacy function-level body marker.
    pub body_source: bool,
    /// Whether the return type declares itself a result type.
    pub returns_result: bool,
    pub annotations: Vec<Annotation>,
    pub params: Vec<ParameterSpec>,
    response_schema: fn() -> Option<Value>,
    invoker: Invoker,
}

impl HandlerFunction {
    pub fn new<F, Fut>(name: &'static str, invoker: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody>, Error>> + Send + 'static,
    {
        Self {
            name,
            markers: Vec::new(),
            body_source: false,
            returns_result: false,
            annotations: Vec::new(),
            params: Vec::new(),
            response_schema: no_schema,
            invoker: Arc::new(move |invocation: Invocation| -> HandlerFuture { Box::pin(invoker(invocation)) }),
        }
    }

    pub fn marker(mut self, verb: Verb) -> Self {
        self.markers.push(verb);
        self
    }

    pub fn body_source(mut self) -> Self {
        self.body_source = true;
        self
    }

    /// Records the declared return type's result capability and schema.
    pub fn returns<R: IntoResponse>(mut self) -> Self {
        self.returns_result = R::ACTION_RESULT;
        self.response_schema = R::response_schema;
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(key, value));
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    /// The single method-level marker, if exactly one is declared.
    pub fn single_marker(&self) -> Option<Verb> {
        match self.markers.as_slice() {
            [verb] => Some(*verb),
            _ => None,
        }
    }

    pub fn response_schema(&self) -> Option<Value> {
        (self.response_schema)()
    }

    pub fn invoke(&self, invocation: Invocation) -> HandlerFuture {
        (self.invoker)(invocation)
    }
}

fn no_schema() -> Option<Value> {
    None
}

impl fmt::Debug for HandlerFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFunction")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("body_source", &self.body_source)
            .field("returns_result", &self.returns_result)
            .field("params", &self.params)
            .finish()
    }
}

/// Where a handler type was declared, as captured at the macro site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// `file!()`
    pub file: &'static str,
    /// `module_path!()`
    pub module_path: &'static str,
    /// `env!("CARGO_MANIFEST_DIR")`
    pub manifest_dir: &'static str,
}

#[derive(Clone)]
pub struct HandlerType {
    /// Short type name, e.g. `ListProducts`.
    pub name: &'static str,
    /// Fully qualified type path.
    pub type_path: &'static str,
    pub source: SourceLocation,
    /// Class-level markers.
    pub markers: Vec<Verb>,
    pub annotations: Vec<Annotation>,
    pub functions: Vec<HandlerFunction>,
    register: Option<fn(&mut ServiceCollection)>,
}

impl HandlerType {
    pub fn new(name: &'static str, type_path: &'static str, source: SourceLocation) -> Self {
        Self {
            name,
            type_path,
            source,
            markers: Vec::new(),
            annotations: Vec::new(),
            functions: Vec::new(),
            register: None,
        }
    }

    /// A handler type that is registered as a scoped service of `T`.
    pub fn of<T: Injectable>(source: SourceLocation) -> Self {
        let type_path = std::any::type_name::<T>();
        let name = type_path.rsplit("::").next().unwrap_or(type_path);
        let mut ty = Self::new(name, type_path, source);
        ty.register = Some(add_scoped::<T>);
        ty
    }

    pub fn marker(mut self, verb: Verb) -> Self {
        self.markers.push(verb);
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(key, value));
        self
    }

    pub fn function(mut self, function: HandlerFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Adds the type itself to the service collection, if it knows how.
    pub fn register_service(&self, services: &mut ServiceCollection) -> bool {
        match self.register {
            Some(register) => {
                register(services);
                true
            }
            None => false,
        }
    }
}

fn add_scoped<T: Injectable>(services: &mut ServiceCollection) {
    services.add_scoped::<T>();
}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("name", &self.name)
            .field("source", &self.source.file)
            .field("markers", &self.markers)
            .field("functions", &self.functions)
            .finish()
    }
}
