//! Response conversion and the result types designated handlers return.

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;

pub type BoxBody = Full<Bytes>;

/// Converts a handler's return value into an HTTP response.
///
/// `ACTION_RESULT` is the explicit "I am a result type" capability. A type
/// marker on a handler type only picks a `*_async` method whose return type
/// declares it.
pub trait IntoResponse {
    const ACTION_RESULT: bool = false;

    fn into_response(self) -> Response<BoxBody>;

    /// JSON Schema of the success body, if the type can describe it.
    fn response_schema() -> Option<Value> {
        None
    }
}

impl IntoResponse for Response<BoxBody> {
    fn into_response(self) -> Response<BoxBody> {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response<BoxBody> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = self;
        response
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response<BoxBody> {
        StatusCode::OK.into_response()
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response<BoxBody> {
        text_response(StatusCode::OK, Bytes::from_static(self.as_bytes()))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<BoxBody> {
        text_response(StatusCode::OK, Bytes::from(self))
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    const ACTION_RESULT: bool = T::ACTION_RESULT;

    fn into_response(self) -> Response<BoxBody> {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }

    fn response_schema() -> Option<Value> {
        T::response_schema()
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    const ACTION_RESULT: bool = T::ACTION_RESULT;

    fn into_response(self) -> Response<BoxBody> {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }

    fn response_schema() -> Option<Value> {
        T::response_schema()
    }
}

fn text_response(status: StatusCode, body: Bytes) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub(crate) fn json_response(status: StatusCode, body: Vec<u8>) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Single result type: a status code with an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    status: StatusCode,
    body: Option<Value>,
}

impl ActionResult {
    pub fn status(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn json(status: StatusCode, body: impl Serialize) -> Self {
        Self {
            status,
            body: Some(serde_json::to_value(body).unwrap_or(Value::Null)),
        }
    }

    pub fn ok(body: impl Serialize) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn created(body: impl Serialize) -> Self {
        Self::json(StatusCode::CREATED, body)
    }

    pub fn no_content() -> Self {
        Self::status(StatusCode::NO_CONTENT)
    }

    pub fn not_found() -> Self {
        Self::status(StatusCode::NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::json(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": message.into() }),
        )
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl IntoResponse for ActionResult {
    const ACTION_RESULT: bool = true;

    fn into_response(self) -> Response<BoxBody> {
        match self.body {
            Some(body) => json_response(self.status, serde_json::to_vec(&body).unwrap_or_default()),
            None => self.status.into_response(),
        }
    }
}

/// Multi-variant result: a handler returns one of two response types.
#[derive(Debug, Clone, PartialEq)]
pub enum Results<A, B> {
    Left(A),
    Right(B),
}

impl<A: IntoResponse, B: IntoResponse> IntoResponse for Results<A, B> {
    const ACTION_RESULT: bool = true;

    fn into_response(self) -> Response<BoxBody> {
        match self {
            Results::Left(a) => a.into_response(),
            Results::Right(b) => b.into_response(),
        }
    }

    fn response_schema() -> Option<Value> {
        match (A::response_schema(), B::response_schema()) {
            (Some(a), Some(b)) => Some(serde_json::json!({ "oneOf": [a, b] })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_types_are_not_action_results() {
        assert!(!<String as IntoResponse>::ACTION_RESULT);
        assert!(!<&'static str as IntoResponse>::ACTION_RESULT);
        assert!(!<StatusCode as IntoResponse>::ACTION_RESULT);
        assert!(!<() as IntoResponse>::ACTION_RESULT);
    }

    #[test]
    fn test_result_types_declare_themselves() {
        assert!(<ActionResult as IntoResponse>::ACTION_RESULT);
        assert!(<Results<ActionResult, StatusCode> as IntoResponse>::ACTION_RESULT);
        assert!(<Result<ActionResult, crate::error::Error> as IntoResponse>::ACTION_RESULT);
        assert!(!<Result<String, crate::error::Error> as IntoResponse>::ACTION_RESULT);
    }

    #[test]
    fn test_action_result_status_and_body() {
        let response = ActionResult::created(serde_json::json!({"id": 7})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let response = ActionResult::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_results_dispatches_variant() {
        let left: Results<ActionResult, StatusCode> = Results::Left(ActionResult::ok("x"));
        assert_eq!(left.into_response().status(), StatusCode::OK);

        let right: Results<ActionResult, StatusCode> = Results::Right(StatusCode::CONFLICT);
        assert_eq!(right.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_tuple_overrides_status() {
        let response = (StatusCode::ACCEPTED, "queued").into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
