//! In-memory services shared by the handler types under `tests/api/`.

use parking_lot::Mutex;
use waymark::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Default)]
pub struct Catalog {
    products: Mutex<Vec<Product>>,
}

impl Catalog {
    pub fn seeded() -> Self {
        let products = [
            ("T-1", "hammer", "tools", 4),
            ("T-2", "wrench", "tools", 0),
            ("T-3", "level", "tools", 7),
            ("G-1", "rake", "garden", 2),
        ]
        .into_iter()
        .map(|(sku, name, category, quantity)| Product {
            sku: sku.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            quantity,
        })
        .collect();

        Self {
            products: Mutex::new(products),
        }
    }

    pub fn by_category(&self, category: &str, in_stock: bool, limit: usize) -> Vec<Product> {
        self.products
            .lock()
            .iter()
            .filter(|p| p.category == category)
            .filter(|p| !in_stock || p.quantity > 0)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn quantity(&self, sku: &str) -> Option<u32> {
        self.products
            .lock()
            .iter()
            .find(|p| p.sku == sku)
            .map(|p| p.quantity)
    }

    pub fn add(&self, new: NewProduct) -> Product {
        let mut products = self.products.lock();
        let product = Product {
            sku: format!("N-{}", products.len() + 1),
            name: new.name,
            category: new.category,
            quantity: new.quantity,
        };
        products.push(product.clone());
        product
    }
}

#[derive(Debug, Default)]
pub struct OrderLog {
    submitted: Mutex<Vec<(String, bool)>>,
}

impl OrderLog {
    pub fn record(&self, order_id: &str, rush: bool) {
        self.submitted.lock().push((order_id.to_string(), rush));
    }

    pub fn len(&self) -> usize {
        self.submitted.lock().len()
    }
}
