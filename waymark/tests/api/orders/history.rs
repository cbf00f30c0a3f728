use waymark::prelude::*;

/// Two marked methods, so no single handler can be picked.
#[derive(Injectable)]
pub struct OrderHistory;

#[endpoint]
impl OrderHistory {
    #[get]
    async fn recent(&self) -> &'static str {
        "recent"
    }

    #[get]
    async fn archived(&self) -> &'static str {
        "archived"
    }
}
