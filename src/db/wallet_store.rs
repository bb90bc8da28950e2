use crate::db::sqlite::{from_millis, to_millis, Database};
use crate::error::{Error, Result};
use crate::events::{Collection, EventBus, SyncEvent};
use crate::models::{normalize_address, Contact, Token, Transaction, TransactionKind};
use log::{debug, info};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::Path;

const WALLET_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tokens (
        address TEXT PRIMARY KEY,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        decimals INTEGER NOT NULL,
        icon TEXT,
        is_custom BOOLEAN NOT NULL DEFAULT FALSE,
        is_hidden BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS contacts (
        address TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        last_used INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        hash TEXT NOT NULL,
        token_key TEXT NOT NULL,
        block_number INTEGER NOT NULL,
        from_address TEXT NOT NULL,
        to_address TEXT NOT NULL,
        value TEXT NOT NULL,
        token_address TEXT,
        token_symbol TEXT NOT NULL,
        token_decimals INTEGER NOT NULL,
        nonce INTEGER NOT NULL,
        gas_used INTEGER NOT NULL,
        gas_price TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        is_error BOOLEAN NOT NULL DEFAULT FALSE,
        kind TEXT NOT NULL,
        PRIMARY KEY (hash, token_key)
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_token ON transactions (token_address)",
];

/// Tokens, contacts and cached history of one wallet on one chain
#[derive(Debug, Clone)]
pub struct WalletStore {
    db: Database,
    address: String,
    chain_id: u64,
    events: EventBus,
}

impl WalletStore {
    pub async fn open<P: AsRef<Path>>(
        path: P,
        address: &str,
        chain_id: u64,
        events: EventBus,
    ) -> Result<Self> {
        let db = Database::open(path).await?;
        Self::with_database(db, address, chain_id, events).await
    }

    pub async fn with_database(
        db: Database,
        address: &str,
        chain_id: u64,
        events: EventBus,
    ) -> Result<Self> {
        db.init_schema(WALLET_SCHEMA).await?;
        Ok(Self {
            db,
            address: normalize_address(address)?,
            chain_id,
            events,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
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

    // Tokens

    /// Insert or update tokens by contract address.
    ///
    /// Flags the user set locally (`is_custom`, `is_hidden`) survive the update.
    pub async fn upsert_tokens(&self, tokens: &[Token]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        for token in tokens {
            let address = normalize_address(&token.address)?;
            sqlx::query(
                "INSERT INTO tokens (address, symbol, name, decimals, icon, is_custom, is_hidden)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(address) DO UPDATE SET
                    symbol = excluded.symbol,
                    name = excluded.name,
                    decimals = excluded.decimals,
                    icon = COALESCE(excluded.icon, tokens.icon)",
            )
            .bind(&address)
            .bind(&token.symbol)
            .bind(&token.name)
            .bind(token.decimals as i64)
            .bind(&token.icon)
            .bind(token.is_custom)
            .bind(token.is_hidden)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Upserted {} tokens into wallet {}", tokens.len(), self.address);
        self.changed(Collection::Tokens);
        Ok(())
    }

    /// Seed the catalog from bundled tokens when nothing has been synced yet
    pub async fn seed_tokens_if_empty(&self, tokens: &[Token]) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(self.db.pool()?)
            .await?;
        if count > 0 || tokens.is_empty() {
            return Ok(false);
        }

        info!("Seeding wallet {} with {} bundled tokens", self.address, tokens.len());
        self.upsert_tokens(tokens).await?;
        Ok(true)
    }

    pub async fn tokens(&self) -> Result<Vec<Token>> {
        let rows = sqlx::query("SELECT * FROM tokens ORDER BY symbol")
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(token_from_row).collect()
    }

    pub async fn token(&self, address: &str) -> Result<Option<Token>> {
        let address = normalize_address(address)?;
        let row = sqlx::query("SELECT * FROM tokens WHERE address = ?")
            .bind(&address)
            .fetch_optional(self.db.pool()?)
            .await?;
        row.as_ref().map(token_from_row).transpose()
    }

    pub async fn token_by_symbol(&self, symbol: &str) -> Result<Option<Token>> {
        let row = sqlx::query("SELECT * FROM tokens WHERE UPPER(symbol) = UPPER(?) LIMIT 1")
            .bind(symbol)
            .fetch_optional(self.db.pool()?)
            .await?;
        row.as_ref().map(token_from_row).transpose()
    }

    /// Add a user token. A token already synced from the supported list becomes custom,
    /// so `delete_custom_token` can remove it again.
    pub async fn add_custom_token(&self, token: Token) -> Result<()> {
        let address = normalize_address(&token.address)?;
        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO tokens (address, symbol, name, decimals, icon, is_custom, is_hidden)
             VALUES (?, ?, ?, ?, ?, TRUE, FALSE)
             ON CONFLICT(address) DO UPDATE SET
                symbol = excluded.symbol,
                name = excluded.name,
                decimals = excluded.decimals,
                is_custom = TRUE,
                is_hidden = FALSE",
        )
        .bind(&address)
        .bind(&token.symbol)
        .bind(&token.name)
        .bind(token.decimals as i64)
        .bind(&token.icon)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Added custom token {} ({})", token.symbol, address);
        self.changed(Collection::Tokens);
        Ok(())
    }

    /// Remove a user-added token. Tokens referenced by history are kept.
    ///
    /// Returns `false` if no custom token with that address exists.
    pub async fn delete_custom_token(&self, address: &str) -> Result<bool> {
        let address = normalize_address(address)?;
        let mut tx = self.db.begin().await?;

        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE token_address = ?")
                .bind(&address)
                .fetch_one(&mut *tx)
                .await?;
        if references > 0 {
            return Err(Error::TokenInUse(address));
        }

        let deleted = sqlx::query("DELETE FROM tokens WHERE address = ? AND is_custom = TRUE")
            .bind(&address)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted > 0 {
            self.changed(Collection::Tokens);
        }
        Ok(deleted > 0)
    }

    pub async fn set_token_hidden(&self, address: &str, hidden: bool) -> Result<()> {
        let address = normalize_address(address)?;
        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE tokens SET is_hidden = ? WHERE address = ?")
            .bind(hidden)
            .bind(&address)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.changed(Collection::Tokens);
        Ok(())
    }

    // Contacts

    /// Add a contact or rename an existing one, marking it as just used
    pub async fn upsert_contact(&self, contact: Contact) -> Result<()> {
        let address = normalize_address(&contact.address)?;
        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO contacts (address, name, last_used) VALUES (?, ?, ?)
             ON CONFLICT(address) DO UPDATE SET name = excluded.name, last_used = excluded.last_used",
        )
        .bind(&address)
        .bind(&contact.name)
        .bind(to_millis(&contact.last_used))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.changed(Collection::Contacts);
        Ok(())
    }

    /// Contacts, most recently used first
    pub async fn contacts(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query("SELECT * FROM contacts ORDER BY last_used DESC, name")
            .fetch_all(self.db.pool()?)
            .await?;
        rows.iter().map(contact_from_row).collect()
    }

    pub async fn contact(&self, address: &str) -> Result<Option<Contact>> {
        let address = normalize_address(address)?;
        let row = sqlx::query("SELECT * FROM contacts WHERE address = ?")
            .bind(&address)
            .fetch_optional(self.db.pool()?)
            .await?;
        row.as_ref().map(contact_from_row).transpose()
    }

    pub async fn delete_contact(&self, address: &str) -> Result<bool> {
        let address = normalize_address(address)?;
        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query("DELETE FROM contacts WHERE address = ?")
            .bind(&address)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted > 0 {
            self.changed(Collection::Contacts);
        }
        Ok(deleted > 0)
    }

    // Transactions

    /// Insert or replace history entries, keyed by hash and transferred token
    pub async fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        for t in transactions {
            let token_address = t
                .token_address
                .as_deref()
                .map(normalize_address)
                .transpose()?;
            sqlx::query(
                "INSERT OR REPLACE INTO transactions (
                    hash, token_key, block_number, from_address, to_address, value,
                    token_address, token_symbol, token_decimals, nonce, gas_used, gas_price,
                    timestamp, is_error, kind
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(t.hash.to_lowercase())
            .bind(token_address.clone().unwrap_or_default())
            .bind(t.block_number as i64)
            .bind(t.from.to_lowercase())
            .bind(t.to.to_lowercase())
            .bind(&t.value)
            .bind(&token_address)
            .bind(&t.token_symbol)
            .bind(t.token_decimals as i64)
            .bind(t.nonce as i64)
            .bind(t.gas_used as i64)
            .bind(&t.gas_price)
            .bind(t.timestamp)
            .bind(t.is_error)
            .bind(t.kind.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Stored {} transactions for wallet {}", transactions.len(), self.address);
        self.changed(Collection::Transactions);
        Ok(())
    }

    /// Most recent transactions first
    pub async fn transactions(&self, limit: u32) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT * FROM transactions ORDER BY block_number DESC, timestamp DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool()?)
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    /// Highest block already cached, used as the start of the next history fetch
    pub async fn latest_block(&self) -> Result<Option<u64>> {
        let block: Option<i64> = sqlx::query_scalar("SELECT MAX(block_number) FROM transactions")
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(block.map(|b| b as u64))
    }

    pub async fn delete_all_transactions(&self) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM transactions")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.changed(Collection::Transactions);
        Ok(())
    }
}

fn token_from_row(row: &SqliteRow) -> Result<Token> {
    let decimals: i64 = row.try_get("decimals")?;
    Ok(Token {
        address: row.try_get("address")?,
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        decimals: u8::try_from(decimals)
            .map_err(|_| Error::cast(format!("token decimals {} out of range", decimals)))?,
        icon: row.try_get("icon")?,
        is_custom: row.try_get("is_custom")?,
        is_hidden: row.try_get("is_hidden")?,
    })
}

fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    Ok(Contact {
        address: row.try_get("address")?,
        name: row.try_get("name")?,
        last_used: from_millis(row.try_get("last_used")?)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    let kind: String = row.try_get("kind")?;
    let decimals: i64 = row.try_get("token_decimals")?;
    Ok(Transaction {
        hash: row.try_get("hash")?,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        from: row.try_get("from_address")?,
        to: row.try_get("to_address")?,
        value: row.try_get("value")?,
        token_address: row.try_get("token_address")?,
        token_symbol: row.try_get("token_symbol")?,
        token_decimals: u8::try_from(decimals)
            .map_err(|_| Error::cast(format!("token decimals {} out of range", decimals)))?,
        nonce: row.try_get::<i64, _>("nonce")? as u64,
        gas_used: row.try_get::<i64, _>("gas_used")? as u64,
        gas_price: row.try_get("gas_price")?,
        timestamp: row.try_get("timestamp")?,
        is_error: row.try_get("is_error")?,
        kind: kind.parse::<TransactionKind>().map_err(Error::Cast)?,
    })
}
