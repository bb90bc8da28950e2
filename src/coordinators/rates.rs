use crate::api::RateSource;
use crate::coordinators::poller::{PollOutcome, Poller, SyncTask};
use crate::error::Result;
use crate::events::{EventBus, SyncEvent};
use crate::models::{RateTable, UsdRate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_RATE_INTERVAL: Duration = Duration::from_secs(30);

type SharedTable = Arc<RwLock<Arc<RateTable>>>;

/// Fetches both rate lists and swaps in a fresh table
pub struct RateTask {
    source: Arc<dyn RateSource>,
    table: SharedTable,
    events: EventBus,
}

#[async_trait]
impl SyncTask for RateTask {
    type Output = RateTable;

    fn name(&self) -> &'static str {
        "rates"
    }

    async fn fetch(&self) -> Result<RateTable> {
        // Either list failing fails the cycle, so the table is never half-updated
        let (rates, usd_rates) =
            futures::try_join!(self.source.fetch_rates(), self.source.fetch_usd_rates())?;
        Ok(RateTable::new(rates, usd_rates))
    }

    async fn apply(&self, table: RateTable) -> Result<()> {
        info!(
            "Rates updated: {} pairs, {} USD prices",
            table.len(),
            table.usd_rates().count()
        );
        *self.table.write().await = Arc::new(table);
        self.events.publish(SyncEvent::RatesUpdated);
        Ok(())
    }
}

/// Keeps an in-memory table of exchange rates fresh
pub struct RateCoordinator {
    poller: Poller<RateTask>,
    table: SharedTable,
}

impl RateCoordinator {
    pub fn new(source: Arc<dyn RateSource>, events: EventBus, interval: Duration) -> Self {
        let table: SharedTable = Arc::new(RwLock::new(Arc::new(RateTable::default())));
        let task = RateTask {
            source,
            table: table.clone(),
            events,
        };

        Self {
            poller: Poller::new(task, interval),
            table,
        }
    }

    pub fn resume(&self) {
        self.poller.resume();
    }

    pub fn pause(&self) {
        self.poller.pause();
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    pub async fn poll_once(&self) -> PollOutcome {
        self.poller.poll_once().await
    }

    /// The current complete table
    pub async fn snapshot(&self) -> Arc<RateTable> {
        self.table.read().await.clone()
    }

    pub async fn rate(&self, source: &str, dest: &str) -> Option<f64> {
        self.table.read().await.rate(source, dest)
    }

    pub async fn usd_rate(&self, symbol: &str) -> Option<UsdRate> {
        self.table.read().await.usd_rate(symbol).cloned()
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.table.read().await.updated_at()
    }
}
