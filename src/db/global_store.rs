use crate::db::sqlite::{from_millis, to_millis, Database};
use crate::error::{Error, Result};
use crate::events::{Collection, EventBus, SyncEvent};
use crate::models::{AlertStatus, KycStatus, Notification, PriceAlert, User};
use log::{debug, info};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::Path;

const GLOBAL_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        access_token TEXT NOT NULL,
        refresh_token TEXT NOT NULL,
        token_expiry INTEGER,
        kyc_status TEXT NOT NULL,
        registered_addresses TEXT NOT NULL,
        is_signed_in BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        label TEXT NOT NULL,
        read BOOLEAN NOT NULL DEFAULT FALSE,
        created_at INTEGER NOT NULL,
        data TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY,
        symbol TEXT NOT NULL,
        base TEXT NOT NULL,
        target REAL NOT NULL,
        above BOOLEAN NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        triggered_at INTEGER
    )",
];

/// Per-chain store for data that is not tied to a wallet: the user session,
/// notifications and price alerts
#[derive(Debug, Clone)]
pub struct GlobalStore {
    db: Database,
    chain_id: u64,
    events: EventBus,
}

impl GlobalStore {
    pub async fn open<P: AsRef<Path>>(path: P, chain_id: u64, events: EventBus) -> Result<Self> {
        let db = Database::open(path).await?;
        Self::with_database(db, chain_id, events).await
    }

    pub async fn with_database(db: Database, chain_id: u64, events: EventBus) -> Result<Self> {
        db.init_schema(GLOBAL_SCHEMA).await?;
        Ok(Self {
            db,
            chain_id,
            events,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_closed()
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    fn changed(&self, collection: Collection) {
        self.events.publish(SyncEvent::StoreChanged(collection));
    }

    // Users

    /// Sign `user` in. Every other stored user is removed in the same transaction,
    /// so at most one user is ever signed in.
    pub async fn sign_in(&self, user: User) -> Result<User> {
        let mut user = user;
        user.is_signed_in = true;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM users WHERE id != ?")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        write_user(&mut tx, &user).await?;
        tx.commit().await?;

        info!("User {} signed in", user.id);
        self.changed(Collection::Users);
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
        tx.commit().await?;

        info!("User signed out");
        self.changed(Collection::Users);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE is_signed_in = TRUE LIMIT 1")
            .fetch_optional(self.db.pool()?)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Update the profile of the signed-in user
    pub async fn update_user(&self, user: User) -> Result<User> {
        let mut user = user;
        let mut tx = self.db.begin().await?;

        let signed_in: Option<bool> =
            sqlx::query_scalar("SELECT is_signed_in FROM users WHERE id = ?")
                .bind(user.id)
                .fetch_optional(&mut *tx)
                .await?;
        if signed_in != Some(true) {
            return Err(Error::NotSignedIn);
        }

        user.is_signed_in = true;
        write_user(&mut tx, &user).await?;
        tx.commit().await?;

        self.changed(Collection::Users);
        Ok(user)
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    // Notifications

    /// Replace the local list with the server's. Items deleted locally but still
    /// present on the server come back.
    pub async fn replace_notifications(&self, notifications: &[Notification]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM notifications")
            .execute(&mut *tx)
            .await?;
        for n in notifications {
            sqlx::query(
                "INSERT OR REPLACE INTO notifications (id, title, body, label, read, created_at, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(n.id)
            .bind(&n.title)
            .bind(&n.body)
            .bind(&n.label)
            .bind(n.read)
            .bind(to_millis(&n.created_at))
            .bind(serde_json::to_string(&n.data)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Replaced notifications with {} items", notifications.len());
        self.changed(Collection::Notifications);
        Ok(())
    }

    /// Notifications, newest first
    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query("SELECT * FROM notifications ORDER BY created_at DESC, id DESC")
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(notification_from_row).collect()
    }

    pub async fn mark_notifications_read(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        for id in ids {
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.changed(Collection::Notifications);
        Ok(())
    }

    pub async fn delete_notification(&self, id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted > 0 {
            self.changed(Collection::Notifications);
        }
        Ok(deleted > 0)
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE read = FALSE")
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(count as u64)
    }

    // Alerts

    pub async fn replace_alerts(&self, alerts: &[PriceAlert]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM alerts").execute(&mut *tx).await?;
        for alert in alerts {
            write_alert(&mut tx, alert).await?;
        }
        tx.commit().await?;

        debug!("Replaced alerts with {} items", alerts.len());
        self.changed(Collection::Alerts);
        Ok(())
    }

    /// Alerts, most recently updated first
    pub async fn alerts(&self) -> Result<Vec<PriceAlert>> {
        let rows = sqlx::query("SELECT * FROM alerts ORDER BY updated_at DESC, id DESC")
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(alert_from_row).collect()
    }

    pub async fn triggered_alerts(&self) -> Result<Vec<PriceAlert>> {
        let rows = sqlx::query("SELECT * FROM alerts WHERE status = ? ORDER BY triggered_at DESC")
            .bind(AlertStatus::Triggered.to_string())
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(alert_from_row).collect()
    }

    pub async fn upsert_alert(&self, alert: PriceAlert) -> Result<()> {
        let mut tx = self.db.begin().await?;
        write_alert(&mut tx, &alert).await?;
        tx.commit().await?;

        self.changed(Collection::Alerts);
        Ok(())
    }

    pub async fn delete_alert(&self, id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query("DELETE FROM alerts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted > 0 {
            self.changed(Collection::Alerts);
        }
        Ok(deleted > 0)
    }
}

async fn write_user(tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO users (
            id, name, email, access_token, refresh_token, token_expiry,
            kyc_status, registered_addresses, is_signed_in
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.access_token)
    .bind(&user.refresh_token)
    .bind(user.token_expiry.as_ref().map(to_millis))
    .bind(user.kyc_status.to_string())
    .bind(serde_json::to_string(&user.registered_addresses)?)
    .bind(user.is_signed_in)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn write_alert(
    tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
    alert: &PriceAlert,
) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO alerts (
            id, symbol, base, target, above, status, created_at, updated_at, triggered_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(alert.id)
    .bind(alert.symbol.to_uppercase())
    .bind(alert.base.to_string())
    .bind(alert.target)
    .bind(alert.above)
    .bind(alert.status.to_string())
    .bind(to_millis(&alert.created_at))
    .bind(to_millis(&alert.updated_at))
    .bind(alert.triggered_at.as_ref().map(to_millis))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let kyc_status: String = row.try_get("kyc_status")?;
    let addresses: String = row.try_get("registered_addresses")?;
    let token_expiry: Option<i64> = row.try_get("token_expiry")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        token_expiry: token_expiry.map(from_millis).transpose()?,
        kyc_status: kyc_status.parse::<KycStatus>().unwrap_or_default(),
        registered_addresses: serde_json::from_str(&addresses)?,
        is_signed_in: row.try_get("is_signed_in")?,
    })
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    let data: String = row.try_get("data")?;
    Ok(Notification {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        label: row.try_get("label")?,
        read: row.try_get("read")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        data: serde_json::from_str(&data)?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<PriceAlert> {
    let base: String = row.try_get("base")?;
    let status: String = row.try_get("status")?;
    let triggered_at: Option<i64> = row.try_get("triggered_at")?;
    Ok(PriceAlert {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        base: base.parse().map_err(Error::Cast)?,
        target: row.try_get("target")?,
        above: row.try_get("above")?,
        status: status.parse().map_err(Error::Cast)?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
        triggered_at: triggered_at.map(from_millis).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::init_test_db;
    use crate::models::AlertBase;

    async fn store() -> GlobalStore {
        let db = init_test_db().await.unwrap();
        GlobalStore::with_database(db, 1, EventBus::new()).await.unwrap()
    }

    fn notification(id: i64, created: i64) -> Notification {
        Notification {
            id,
            title: format!("title {}", id),
            body: "body".into(),
            label: "alert".into(),
            read: false,
            created_at: from_millis(created).unwrap(),
            data: serde_json::json!({ "token": "KNC" }),
        }
    }

    fn alert(id: i64, status: AlertStatus) -> PriceAlert {
        PriceAlert {
            id,
            symbol: "knc".into(),
            base: AlertBase::Usd,
            target: 1.5,
            above: true,
            status,
            created_at: from_millis(1_000).unwrap(),
            updated_at: from_millis(1_000 + id).unwrap(),
            triggered_at: None,
        }
    }

    #[tokio::test]
    async fn signing_in_replaces_previous_user() {
        let store = store().await;
        store.sign_in(User::new(3, "old", "old@example.com")).await.unwrap();
        store.sign_in(User::new(7, "new", "new@example.com")).await.unwrap();

        let users = store.users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, 7);
        assert!(users[0].is_signed_in);
        assert_eq!(store.current_user().await.unwrap().unwrap().id, 7);
    }

    #[tokio::test]
    async fn at_most_one_signed_in_user_over_any_sequence() {
        let store = store().await;
        let ops: [(i64, bool); 7] = [(1, true), (2, true), (2, false), (3, true), (1, true), (1, false), (4, true)];

        for (id, sign_in) in ops {
            if sign_in {
                store.sign_in(User::new(id, "u", "u@example.com")).await.unwrap();
            } else {
                store.sign_out().await.unwrap();
            }
            let signed_in = store
                .users()
                .await
                .unwrap()
                .into_iter()
                .filter(|u| u.is_signed_in)
                .count();
            assert!(signed_in <= 1);
        }

        assert_eq!(store.current_user().await.unwrap().unwrap().id, 4);
    }

    #[tokio::test]
    async fn user_fields_round_trip() {
        let store = store().await;
        let mut user = User::new(9, "alice", "alice@example.com");
        user.access_token = "access".into();
        user.kyc_status = KycStatus::Pending;
        user.registered_addresses = vec!["0xabc".into(), "0xdef".into()];
        user.token_expiry = Some(from_millis(1_700_000_000_000).unwrap());

        store.sign_in(user.clone()).await.unwrap();
        let stored = store.current_user().await.unwrap().unwrap();

        user.is_signed_in = true;
        assert_eq!(stored, user);
    }

    #[tokio::test]
    async fn update_requires_signed_in_user() {
        let store = store().await;
        assert!(matches!(
            store.update_user(User::new(1, "x", "x@example.com")).await,
            Err(Error::NotSignedIn)
        ));

        store.sign_in(User::new(1, "x", "x@example.com")).await.unwrap();
        let mut user = store.current_user().await.unwrap().unwrap();
        user.kyc_status = KycStatus::Approved;
        store.update_user(user).await.unwrap();

        assert_eq!(
            store.current_user().await.unwrap().unwrap().kyc_status,
            KycStatus::Approved
        );

        store.sign_out().await.unwrap();
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_list_replaces_local_notifications() {
        let store = store().await;
        store
            .replace_notifications(&[notification(1, 1_000), notification(2, 2_000)])
            .await
            .unwrap();

        assert!(store.delete_notification(1).await.unwrap());
        store.mark_notifications_read(&[2]).await.unwrap();
        assert_eq!(store.unread_count().await.unwrap(), 0);

        // Still on the server, so it reappears
        store
            .replace_notifications(&[notification(1, 1_000), notification(2, 2_000)])
            .await
            .unwrap();
        let list = store.notifications().await.unwrap();
        assert_eq!(list.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(list[0].data["token"], "KNC");
        assert_eq!(store.unread_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn alerts_replace_and_filter() {
        let store = store().await;
        store
            .replace_alerts(&[alert(1, AlertStatus::Active), alert(2, AlertStatus::Triggered)])
            .await
            .unwrap();

        let alerts = store.alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, 2);
        assert_eq!(alerts[0].symbol, "KNC");

        let triggered = store.triggered_alerts().await.unwrap();
        assert_eq!(triggered.len(), 1);

        store.upsert_alert(alert(3, AlertStatus::Active)).await.unwrap();
        assert!(store.delete_alert(1).await.unwrap());
        store.replace_alerts(&[]).await.unwrap();
        assert!(store.alerts().await.unwrap().is_empty());
    }
}
