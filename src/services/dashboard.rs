use std::sync::Arc;

use crate::store::{DashboardMetrics, Store};
use crate::Result;

/// Products with fewer units than this count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn metrics(&self) -> Result<DashboardMetrics> {
        self.store.dashboard_metrics(LOW_STOCK_THRESHOLD).await
    }
}
