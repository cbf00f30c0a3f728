//! Per-request context.
//!
//! One [`RequestContext`] is created per inbound request. It owns the
//! request head, the lazily parsed JSON body ([`RequestBodyCache`]) and the
//! parsed query string. Clones share the same state; nothing here outlives
//! the request.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri, header};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::bind::body::RequestBodyCache;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request body type handed to route callbacks.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// Boxes any `http_body::Body` into [`Body`].
pub fn boxed<B>(body: B) -> Body
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed_unsync()
}

#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    received_at: Instant,
    body: RequestBodyCache,
    query: OnceLock<Vec<(String, String)>>,
}

impl RequestContext {
    pub fn new(req: Request<Body>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            inner: Arc::new(Inner {
                request_id: uuid::Uuid::new_v4().to_string(),
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                received_at: Instant::now(),
                body: RequestBodyCache::new(body),
                query: OnceLock::new(),
            }),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.received_at.elapsed()
    }

    /// The request's body cache. Populated on first body-bound access.
    pub fn body_cache(&self) -> &RequestBodyCache {
        &self.inner.body
    }

    /// Whether the request declares JSON content
    /// (`application/json` or `application/*+json`).
    pub fn is_json(&self) -> bool {
        let Some(content_type) = self
            .inner
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };

        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        mime == "application/json"
            || (mime.starts_with("application/") && mime.ends_with("+json"))
    }

    /// Decoded query pairs, in order. Repeated keys appear repeatedly.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.inner.query.get_or_init(|| {
            let raw = self.inner.uri.query().unwrap_or("");
            serde_urlencoded::from_str::<Vec<(String, String)>>(raw).unwrap_or_default()
        })
    }

    /// All values of one query key.
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query_pairs()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.inner.request_id)
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .finish()
    }
}

/// Request-context types injected into handler parameters as-is.
pub trait FromContext: Sized {
    fn from_context(ctx: &RequestContext) -> Self;
}

impl FromContext for RequestContext {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.clone()
    }
}

impl FromContext for HeaderMap {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.headers().clone()
    }
}

impl FromContext for Method {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.method().clone()
    }
}

impl FromContext for Uri {
    fn from_context(ctx: &RequestContext) -> Self {
        ctx.uri().clone()
    }
}
