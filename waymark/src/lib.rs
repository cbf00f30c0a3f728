//! Waymark turns plain handler types into registered HTTP routes.
//!
//! A handler type is a struct whose inherent `impl` block carries
//! [`#[endpoint]`](macro@endpoint). Markers name the HTTP verb, either on the
//! type (`#[endpoint(get)]`) or on a single method (`#[post]`). The route is
//! derived from where the handler lives in the project:
//!
//! ```text
//! src/api/catalog/list_products.rs  ->  GET /api/catalog/list_products   (method marker)
//! src/api/catalog/create.rs         ->  POST /api/catalog                (type marker)
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use waymark::prelude::*;
//!
//! #[derive(Injectable)]
//! pub struct ListProducts {
//!     catalog: Arc<Catalog>,
//! }
//!
//! #[endpoint]
//! impl ListProducts {
//!     #[get]
//!     async fn handle(&self, category: String) -> Json<Vec<Product>> {
//!         Json(self.catalog.by_category(&category))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Waymark::new()
//!         .services(|s| {
//!             s.add_singleton(Catalog::default());
//!         })
//!         .discover()
//!         .map_err(std::io::Error::other)?
//!         .listen("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod app;
pub mod bind;
pub mod config;
pub mod context;
pub mod di;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod handler;
pub mod introspection;
pub mod marker;
pub mod metadata;
pub mod observability;
pub mod openapi;
pub mod params;
pub mod register;
pub mod resolve;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod table;
pub mod testing;

pub use waymark_macros::{Injectable, endpoint};

pub mod prelude {
    pub use std::sync::Arc;

    pub use http::{HeaderMap, Method, StatusCode, Uri};
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};

    pub use crate::app::{Application, Waymark};
    pub use crate::config::{WaymarkConfig, load_dotenv};
    pub use crate::context::RequestContext;
    pub use crate::di::{Injectable, Resolve, Scope, ServiceCollection};
    pub use crate::error::{Error, Result};
    pub use crate::extract::{Inject, Json};
    pub use crate::marker::Verb;
    pub use crate::response::{ActionResult, IntoResponse, Results};
    pub use crate::router::Router;
    pub use waymark_macros::{Injectable, endpoint};
}

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
