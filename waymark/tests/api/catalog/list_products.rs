use waymark::prelude::*;

use crate::shop::{Catalog, Product};

#[derive(Injectable)]
pub struct ListProducts {
    catalog: Arc<Catalog>,
}

#[endpoint]
#[meta(tag = "catalog")]
impl ListProducts {
    /// Products in one category.
    #[get]
    async fn handle(
        &self,
        category: String,
        #[param(default = 10)] limit: u32,
        #[meta(doc = "only products with stock left")] in_stock: bool,
    ) -> Json<Vec<Product>> {
        Json(self.catalog.by_category(&category, in_stock, limit as usize))
    }
}
