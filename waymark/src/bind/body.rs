//! Lazily parsed JSON request body.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::context::Body;

/// Field name to raw JSON value.
pub type JsonFields = Map<String, Value>;

/// Per-request body cache.
///
/// The body stream is read at most once, on the first call to
/// [`fields`](Self::fields). Every later call returns the same map.
pub struct RequestBodyCache {
    body: Mutex<Option<Body>>,
    fields: OnceCell<Arc<JsonFields>>,
    reads: AtomicUsize,
}

impl RequestBodyCache {
    pub fn new(body: Body) -> Self {
        Self {
            body: Mutex::new(Some(body)),
            fields: OnceCell::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Returns the parsed body, reading and parsing it on first use.
    ///
    /// A body that fails to read, is not JSON, or is not a JSON object
    /// yields an empty map.
    pub async fn fields(&self) -> Arc<JsonFields> {
        self.fields
            .get_or_init(|| async {
                let bytes = self.read_body().await;
                Arc::new(parse_fields(&bytes))
            })
            .await
            .clone()
    }

    pub fn is_populated(&self) -> bool {
        self.fields.initialized()
    }

    /// How many times the underlying body stream was consumed (0 or 1).
    pub fn body_reads(&self) -> usize {
        self.reads.load(Ordering::Acquire)
    }

    async fn read_body(&self) -> Bytes {
        let body = self.body.lock().take();
        let Some(body) = body else {
            return Bytes::new();
        };
        self.reads.fetch_add(1, Ordering::AcqRel);

        match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read request body");
                Bytes::new()
            }
        }
    }
}

fn parse_fields(bytes: &[u8]) -> JsonFields {
    if bytes.is_empty() {
        return JsonFields::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::debug!("request body is not a JSON object");
            JsonFields::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "request body is not valid JSON");
            JsonFields::new()
        }
    }
}
