use crate::api::NotificationSource;
use crate::coordinators::poller::{Poller, SyncTask};
use crate::db::StorageManager;
use crate::error::Result;
use crate::models::{Notification, PriceAlert};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(60);

pub type NotificationSyncCoordinator = Poller<NotificationSyncTask>;

/// Server lists fetched for one user
pub struct UserInbox {
    user_id: i64,
    notifications: Vec<Notification>,
    alerts: Vec<PriceAlert>,
}

/// Replaces local notifications and alerts with the server's lists
pub struct NotificationSyncTask {
    source: Arc<dyn NotificationSource>,
    storage: Arc<StorageManager>,
}

impl NotificationSyncTask {
    pub fn new(source: Arc<dyn NotificationSource>, storage: Arc<StorageManager>) -> Self {
        Self { source, storage }
    }

    pub fn coordinator(self, interval: Duration) -> NotificationSyncCoordinator {
        Poller::new(self, interval)
    }
}

#[async_trait]
impl SyncTask for NotificationSyncTask {
    type Output = Option<UserInbox>;

    fn name(&self) -> &'static str {
        "notification-sync"
    }

    async fn fetch(&self) -> Result<Option<UserInbox>> {
        let Some(user) = self.storage.global().current_user().await? else {
            debug!("No user signed in, skipping notification sync");
            return Ok(None);
        };

        let (notifications, alerts) = futures::try_join!(
            self.source.fetch_notifications(&user.access_token),
            self.source.fetch_alerts(&user.access_token),
        )?;

        Ok(Some(UserInbox {
            user_id: user.id,
            notifications,
            alerts,
        }))
    }

    async fn apply(&self, inbox: Option<UserInbox>) -> Result<()> {
        let Some(inbox) = inbox else {
            return Ok(());
        };

        let global = self.storage.global();
        let current = global.current_user().await?.map(|u| u.id);
        if current != Some(inbox.user_id) {
            debug!("User {} signed out during sync, dropping inbox", inbox.user_id);
            return Ok(());
        }

        global.replace_notifications(&inbox.notifications).await?;
        global.replace_alerts(&inbox.alerts).await?;
        info!(
            "Synced {} notifications and {} alerts for user {}",
            inbox.notifications.len(),
            inbox.alerts.len(),
            inbox.user_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinators::PollOutcome;
    use crate::events::EventBus;
    use crate::models::User;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::{Notify, Semaphore};

    /// Serves a fixed notification list; when gated, each fetch waits for a permit
    struct Inbox {
        notifications: Mutex<Vec<Notification>>,
        tokens_seen: Mutex<Vec<String>>,
        gated: bool,
        gate: Semaphore,
        started: Notify,
    }

    #[async_trait]
    impl NotificationSource for Inbox {
        async fn fetch_notifications(&self, access_token: &str) -> Result<Vec<Notification>> {
            self.tokens_seen.lock().unwrap().push(access_token.to_string());
            self.started.notify_one();
            if self.gated {
                self.gate
                    .acquire()
                    .await
                    .map_err(|e| crate::error::Error::Config(e.to_string()))?
                    .forget();
            }
            Ok(self.notifications.lock().unwrap().clone())
        }

        async fn fetch_alerts(&self, _access_token: &str) -> Result<Vec<PriceAlert>> {
            Ok(Vec::new())
        }
    }

    fn notification(id: i64) -> Notification {
        Notification {
            id,
            title: format!("Notice {}", id),
            body: String::new(),
            label: "news".into(),
            read: false,
            created_at: Utc.timestamp_opt(1_600_000_000 + id, 0).unwrap(),
            data: json!({}),
        }
    }

    async fn setup_with(gated: bool) -> (tempfile::TempDir, Arc<StorageManager>, Arc<Inbox>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageManager::open(dir.path(), 1, EventBus::new()).await.unwrap());
        let inbox = Arc::new(Inbox {
            notifications: Mutex::new(vec![notification(1), notification(2)]),
            tokens_seen: Mutex::new(Vec::new()),
            gated,
            gate: Semaphore::new(0),
            started: Notify::new(),
        });
        (dir, storage, inbox)
    }

    async fn setup() -> (tempfile::TempDir, Arc<StorageManager>, Arc<Inbox>) {
        setup_with(false).await
    }

    fn signed_in_user(id: i64) -> User {
        let mut user = User::new(id, "Alice", "alice@example.com");
        user.access_token = format!("token-{}", id);
        user
    }

    /// Start a gated sync, run `interrupt` while its fetch is outstanding, then let it finish
    async fn sync_interrupted_by<F, Fut>(
        storage: Arc<StorageManager>,
        inbox: Arc<Inbox>,
        interrupt: F,
    ) -> PollOutcome
    where
        F: FnOnce(Arc<StorageManager>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let sync = Arc::new(
            NotificationSyncTask::new(inbox.clone(), storage.clone())
                .coordinator(DEFAULT_NOTIFICATION_INTERVAL),
        );
        let background = sync.clone();
        let pending = tokio::spawn(async move { background.poll_once().await });
        inbox.started.notified().await;

        interrupt(storage).await;
        inbox.gate.add_permits(1);
        pending.await.unwrap()
    }

    #[tokio::test]
    async fn does_nothing_while_signed_out() {
        let (_dir, storage, inbox) = setup().await;
        let sync = NotificationSyncTask::new(inbox.clone(), storage.clone())
            .coordinator(DEFAULT_NOTIFICATION_INTERVAL);

        assert_eq!(sync.poll_once().await, PollOutcome::Applied);
        assert!(inbox.tokens_seen.lock().unwrap().is_empty());
        assert!(storage.global().notifications().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replaces_local_list_with_server_list() {
        let (_dir, storage, inbox) = setup().await;
        let mut user = User::new(7, "Alice", "alice@example.com");
        user.access_token = "secret".into();
        storage.global().sign_in(user).await.unwrap();

        let sync = NotificationSyncTask::new(inbox.clone(), storage.clone())
            .coordinator(DEFAULT_NOTIFICATION_INTERVAL);
        sync.poll_once().await;
        assert_eq!(storage.global().notifications().await.unwrap().len(), 2);

        // Deleted locally, still on the server: it comes back
        storage.global().delete_notification(1).await.unwrap();
        inbox.notifications.lock().unwrap().push(notification(3));
        sync.poll_once().await;

        let ids: Vec<i64> = storage
            .global()
            .notifications()
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(inbox.tokens_seen.lock().unwrap()[0], "secret");
    }

    #[tokio::test]
    async fn inbox_is_dropped_when_another_user_signs_in_mid_fetch() {
        let (_dir, storage, inbox) = setup_with(true).await;
        storage.global().sign_in(signed_in_user(7)).await.unwrap();

        let outcome = sync_interrupted_by(storage.clone(), inbox, |storage| async move {
            storage.global().sign_in(signed_in_user(8)).await.unwrap();
        })
        .await;

        assert_eq!(outcome, PollOutcome::Applied);
        assert!(storage.global().notifications().await.unwrap().is_empty());
        assert_eq!(storage.global().current_user().await.unwrap().unwrap().id, 8);
    }

    #[tokio::test]
    async fn inbox_is_dropped_after_sign_out_mid_fetch() {
        let (_dir, storage, inbox) = setup_with(true).await;
        storage.global().sign_in(signed_in_user(7)).await.unwrap();

        let outcome = sync_interrupted_by(storage.clone(), inbox, |storage| async move {
            storage.global().sign_out().await.unwrap();
        })
        .await;

        assert_eq!(outcome, PollOutcome::Applied);
        assert!(storage.global().notifications().await.unwrap().is_empty());
    }
}
