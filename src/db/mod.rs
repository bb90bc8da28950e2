mod global_store;
mod manager;
pub mod sqlite;
mod wallet_store;

pub use global_store::GlobalStore;
pub use manager::StorageManager;
pub use sqlite::Database;
pub use wallet_store::WalletStore;

use std::path::{Path, PathBuf};

/// File holding one wallet's data on one chain
pub fn wallet_store_path(data_dir: &Path, address: &str, chain_id: u64) -> PathBuf {
    data_dir.join(format!("{}-{}.sqlite", address.trim().to_lowercase(), chain_id))
}

/// File holding the user session, notifications and alerts of one chain
pub fn global_store_path(data_dir: &Path, chain_id: u64) -> PathBuf {
    data_dir.join(format!("global-{}.sqlite", chain_id))
}
