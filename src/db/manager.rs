use crate::db::{global_store_path, wallet_store_path, GlobalStore, WalletStore};
use crate::error::Result;
use crate::events::{EventBus, SyncEvent};
use crate::models::{normalize_address, Token};
use log::info;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Owns the global store and the store of the active wallet.
///
/// Switching wallets closes the previous wallet store; handles to it that callers still
/// hold report `StoreClosed` from then on.
pub struct StorageManager {
    data_dir: PathBuf,
    chain_id: u64,
    events: EventBus,
    seed_tokens: Vec<Token>,
    global: GlobalStore,
    wallet: RwLock<Option<WalletStore>>,
}

impl StorageManager {
    pub async fn open<P: AsRef<Path>>(data_dir: P, chain_id: u64, events: EventBus) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let global = GlobalStore::open(global_store_path(&data_dir, chain_id), chain_id, events.clone()).await?;
        info!("Opened global store for chain {} in {}", chain_id, data_dir.display());

        Ok(Self {
            data_dir,
            chain_id,
            events,
            seed_tokens: Vec::new(),
            global,
            wallet: RwLock::new(None),
        })
    }

    /// Tokens written into every newly opened wallet whose catalog is empty
    pub fn with_seed_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.seed_tokens = tokens;
        self
    }

    pub fn global(&self) -> &GlobalStore {
        &self.global
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn current_wallet(&self) -> Option<WalletStore> {
        self.wallet.read().await.clone()
    }

    /// Make `address` the active wallet, opening its store
    pub async fn switch_wallet(&self, address: &str) -> Result<WalletStore> {
        let address = normalize_address(address)?;
        let mut current = self.wallet.write().await;

        if let Some(store) = current.as_ref() {
            if store.address() == address && !store.is_closed() {
                return Ok(store.clone());
            }
        }

        if let Some(previous) = current.take() {
            info!("Closing store of wallet {}", previous.address());
            previous.close().await;
        }

        let path = wallet_store_path(&self.data_dir, &address, self.chain_id);
        let store = WalletStore::open(&path, &address, self.chain_id, self.events.clone()).await?;
        store.seed_tokens_if_empty(&self.seed_tokens).await?;
        info!("Switched to wallet {} ({})", address, path.display());

        *current = Some(store.clone());
        drop(current);

        self.events.publish(SyncEvent::WalletSwitched(address));
        Ok(store)
    }

    /// Close every open store
    pub async fn close(&self) {
        if let Some(store) = self.wallet.write().await.take() {
            store.close().await;
        }
        self.global.close().await;
    }
}
