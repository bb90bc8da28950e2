mod history;
mod notifications;
pub mod poller;
mod rates;
mod tokens;

pub use history::{TransactionHistoryCoordinator, HistorySyncTask, DEFAULT_HISTORY_INTERVAL};
pub use notifications::{
    NotificationSyncCoordinator, NotificationSyncTask, DEFAULT_NOTIFICATION_INTERVAL,
};
pub use poller::{PollOutcome, Poller, SyncTask};
pub use rates::{RateCoordinator, RateTask, DEFAULT_RATE_INTERVAL};
pub use tokens::{TokenSyncCoordinator, TokenSyncTask, DEFAULT_TOKEN_SYNC_INTERVAL};

use log::info;

/// Every background coordinator of a running wallet
pub struct SyncService {
    pub rates: RateCoordinator,
    pub tokens: TokenSyncCoordinator,
    pub notifications: NotificationSyncCoordinator,
    pub history: TransactionHistoryCoordinator,
}

impl SyncService {
    /// Resume every coordinator, e.g. when the app comes to the foreground
    pub fn resume_all(&self) {
        info!("Resuming sync coordinators");
        self.rates.resume();
        self.tokens.resume();
        self.notifications.resume();
        self.history.resume();
    }

    pub fn pause_all(&self) {
        info!("Pausing sync coordinators");
        self.rates.pause();
        self.tokens.pause();
        self.notifications.pause();
        self.history.pause();
    }
}
