use crate::api::TransactionSource;
use crate::coordinators::poller::{Poller, SyncTask};
use crate::db::StorageManager;
use crate::error::Result;
use crate::models::Transaction;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HISTORY_INTERVAL: Duration = Duration::from_secs(60);

pub type TransactionHistoryCoordinator = Poller<HistorySyncTask>;

/// New transactions of one wallet
pub struct HistoryPage {
    address: String,
    transactions: Vec<Transaction>,
}

/// Pulls new history for the active wallet from the block explorer
pub struct HistorySyncTask {
    source: Arc<dyn TransactionSource>,
    storage: Arc<StorageManager>,
}

impl HistorySyncTask {
    pub fn new(source: Arc<dyn TransactionSource>, storage: Arc<StorageManager>) -> Self {
        Self { source, storage }
    }

    pub fn coordinator(self, interval: Duration) -> TransactionHistoryCoordinator {
        Poller::new(self, interval)
    }
}

#[async_trait]
impl SyncTask for HistorySyncTask {
    type Output = Option<HistoryPage>;

    fn name(&self) -> &'static str {
        "history-sync"
    }

    async fn fetch(&self) -> Result<Option<HistoryPage>> {
        let Some(wallet) = self.storage.current_wallet().await else {
            return Ok(None);
        };

        let start_block = wallet.latest_block().await?.map_or(0, |block| block + 1);
        let transactions = self
            .source
            .fetch_transactions(wallet.address(), start_block)
            .await?;

        Ok(Some(HistoryPage {
            address: wallet.address().to_string(),
            transactions,
        }))
    }

    async fn apply(&self, page: Option<HistoryPage>) -> Result<()> {
        let Some(page) = page else {
            return Ok(());
        };
        if page.transactions.is_empty() {
            return Ok(());
        }

        let Some(wallet) = self.storage.current_wallet().await else {
            return Ok(());
        };
        if wallet.address() != page.address {
            debug!("Wallet switched away from {}, dropping history page", page.address);
            return Ok(());
        }

        wallet.upsert_transactions(&page.transactions).await?;
        info!("Stored {} new transactions for {}", page.transactions.len(), page.address);
        Ok(())
    }
}
