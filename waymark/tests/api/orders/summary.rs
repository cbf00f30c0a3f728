use waymark::prelude::*;

/// Type marker without an action-result handler.
#[derive(Injectable)]
pub struct OrderSummary;

#[endpoint(get)]
impl OrderSummary {
    async fn summary_async(&self) -> String {
        "summary".to_string()
    }
}
