use crate::api::TokenListSource;
use crate::coordinators::poller::{Poller, SyncTask};
use crate::db::StorageManager;
use crate::error::Result;
use crate::models::{normalize_address, Token};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOKEN_SYNC_INTERVAL: Duration = Duration::from_secs(300);

pub type TokenSyncCoordinator = Poller<TokenSyncTask>;

/// Merges the server-published token list into the active wallet's catalog
pub struct TokenSyncTask {
    source: Arc<dyn TokenListSource>,
    storage: Arc<StorageManager>,
}

impl TokenSyncTask {
    pub fn new(source: Arc<dyn TokenListSource>, storage: Arc<StorageManager>) -> Self {
        Self { source, storage }
    }

    pub fn coordinator(self, interval: Duration) -> TokenSyncCoordinator {
        Poller::new(self, interval)
    }
}

#[async_trait]
impl SyncTask for TokenSyncTask {
    type Output = Vec<Token>;

    fn name(&self) -> &'static str {
        "token-sync"
    }

    async fn fetch(&self) -> Result<Vec<Token>> {
        self.source.fetch_supported_tokens().await
    }

    async fn apply(&self, tokens: Vec<Token>) -> Result<()> {
        // A transient empty payload must not look like "every token was delisted"
        if tokens.is_empty() {
            warn!("Supported token list came back empty, keeping current catalog");
            return Ok(());
        }

        let Some(wallet) = self.storage.current_wallet().await else {
            debug!("No wallet open, skipping token merge");
            return Ok(());
        };

        let total = tokens.len();
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| match normalize_address(&token.address) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Dropping supported token {}: {}", token.symbol, e);
                    false
                }
            })
            .collect();
        if tokens.len() < total {
            warn!("Skipped {} malformed entries of {} supported tokens", total - tokens.len(), total);
        }
        if tokens.is_empty() {
            return Ok(());
        }

        wallet.upsert_tokens(&tokens).await?;
        info!("Merged {} supported tokens into wallet {}", tokens.len(), wallet.address());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinators::PollOutcome;
    use crate::events::EventBus;
    use std::sync::Mutex;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const KNC: &str = "0xdd974d5c2e2928dea5f71b9825b8b646686bd200";
    const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

    struct FixedList {
        tokens: Mutex<Vec<Token>>,
    }

    #[async_trait]
    impl TokenListSource for FixedList {
        async fn fetch_supported_tokens(&self) -> Result<Vec<Token>> {
            Ok(self.tokens.lock().unwrap().clone())
        }
    }

    async fn setup(tokens: Vec<Token>) -> (tempfile::TempDir, Arc<StorageManager>, Arc<FixedList>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageManager::open(dir.path(), 1, EventBus::new()).await.unwrap());
        let source = Arc::new(FixedList {
            tokens: Mutex::new(tokens),
        });
        (dir, storage, source)
    }

    #[tokio::test]
    async fn repeated_syncs_leave_one_row_per_token() {
        let (_dir, storage, source) = setup(vec![
            Token::new(KNC, "KNC", "Kyber Network", 18),
            Token::new(DAI, "DAI", "Dai", 18),
        ])
        .await;
        let wallet = storage.switch_wallet(WALLET).await.unwrap();
        let sync = TokenSyncTask::new(source, storage.clone()).coordinator(DEFAULT_TOKEN_SYNC_INTERVAL);

        assert_eq!(sync.poll_once().await, PollOutcome::Applied);
        assert_eq!(sync.poll_once().await, PollOutcome::Applied);

        let tokens = wallet.tokens().await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| !t.is_custom));
    }

    #[tokio::test]
    async fn empty_list_keeps_existing_catalog() {
        let (_dir, storage, source) = setup(vec![Token::new(KNC, "KNC", "Kyber Network", 18)]).await;
        let wallet = storage.switch_wallet(WALLET).await.unwrap();
        let sync = TokenSyncTask::new(source.clone(), storage.clone()).coordinator(DEFAULT_TOKEN_SYNC_INTERVAL);

        sync.poll_once().await;
        source.tokens.lock().unwrap().clear();
        assert_eq!(sync.poll_once().await, PollOutcome::Applied);

        assert_eq!(wallet.tokens().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_entries_do_not_block_the_merge() {
        let (_dir, storage, source) = setup(vec![
            Token::new(KNC, "KNC", "Kyber Network", 18),
            Token::new("", "BROKEN", "Broken", 18),
            Token::new("0x1234", "SHORT", "Short", 18),
        ])
        .await;
        let wallet = storage.switch_wallet(WALLET).await.unwrap();
        let sync = TokenSyncTask::new(source, storage.clone()).coordinator(DEFAULT_TOKEN_SYNC_INTERVAL);

        assert_eq!(sync.poll_once().await, PollOutcome::Applied);

        let tokens = wallet.tokens().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, KNC);
    }

    #[tokio::test]
    async fn skips_when_no_wallet_is_open() {
        let (_dir, storage, source) = setup(vec![Token::new(KNC, "KNC", "Kyber Network", 18)]).await;
        let sync = TokenSyncTask::new(source, storage.clone()).coordinator(DEFAULT_TOKEN_SYNC_INTERVAL);

        assert_eq!(sync.poll_once().await, PollOutcome::Applied);
        assert!(storage.current_wallet().await.is_none());
    }
}
