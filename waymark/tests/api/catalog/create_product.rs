use waymark::prelude::*;

use crate::shop::{Catalog, NewProduct};

#[derive(Injectable)]
pub struct CreateProduct {
    catalog: Arc<Catalog>,
}

#[endpoint(post)]
impl CreateProduct {
    async fn describe_async(&self) -> String {
        "creates a product".to_string()
    }

    async fn create_async(&self, #[body] product: NewProduct) -> Result<ActionResult> {
        if product.name.trim().is_empty() {
            return Err(Error::bad_request("product name must not be empty"));
        }
        Ok(ActionResult::created(self.catalog.add(product)))
    }

    async fn archive_async(&self) -> ActionResult {
        ActionResult::no_content()
    }
}
