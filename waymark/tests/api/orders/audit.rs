use waymark::prelude::*;

use crate::shop::OrderLog;

#[derive(Injectable)]
pub struct AuditOrders {
    log: Arc<OrderLog>,
}

#[endpoint]
impl AuditOrders {
    #[get]
    async fn run(&self, strict: bool) -> Result<String> {
        if strict {
            return Err(Error::internal("audit failed"));
        }
        Ok(format!("{} orders", self.log.len()))
    }
}
