use std::collections::BTreeMap;

use waymark::prelude::*;

use crate::shop::Catalog;

#[derive(Debug, Serialize, JsonSchema)]
pub struct StockReport {
    pub warehouse: Option<String>,
    pub levels: BTreeMap<String, u32>,
}

#[derive(Injectable)]
pub struct StockLevels {
    catalog: Arc<Catalog>,
}

#[endpoint]
impl StockLevels {
    #[get]
    async fn levels(&self, sku: Vec<String>, headers: HeaderMap) -> Json<StockReport> {
        let warehouse = headers
            .get("x-warehouse")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let levels = sku
            .into_iter()
            .filter_map(|sku| self.catalog.quantity(&sku).map(|q| (sku, q)))
            .collect();
        Json(StockReport { warehouse, levels })
    }
}
