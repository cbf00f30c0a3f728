use serde_json::json;
use waymark::prelude::*;

use crate::shop::OrderLog;

#[derive(Injectable)]
pub struct LegacySubmit {
    log: Arc<OrderLog>,
}

#[endpoint]
impl LegacySubmit {
    #[post]
    #[body]
    async fn submit(&self, order_id: String, rush: bool, ctx: RequestContext) -> ActionResult {
        self.log.record(&order_id, rush);
        ActionResult::json(
            StatusCode::ACCEPTED,
            json!({
                "order_id": order_id,
                "rush": rush,
                "request_id": ctx.request_id(),
            }),
        )
    }
}
