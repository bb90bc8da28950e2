//! Shared fixtures for the sync integration tests: a throwaway data directory and an
//! in-process stand-in for the Kyber services.
#![allow(dead_code)]

use async_trait::async_trait;
use kyber_wallet_sync::api::{NotificationSource, RateSource, TokenListSource};
use kyber_wallet_sync::db::StorageManager;
use kyber_wallet_sync::events::{EventBus, SyncEvent};
use kyber_wallet_sync::models::{Notification, PriceAlert, Rate, Token, UsdRate};
use kyber_wallet_sync::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const CHAIN_ID: u64 = 3;
pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";
pub const KNC: &str = "0xdd974d5c2e2928dea5f71b9825b8b646686bd200";
pub const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

/// Test environment with automatic cleanup
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub events: EventBus,
    pub storage: Arc<StorageManager>,
}

impl TestEnvironment {
    pub async fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        log::info!("Test directory: {:?}", temp_dir.path());

        let events = EventBus::new();
        let storage = StorageManager::open(temp_dir.path(), CHAIN_ID, events.clone()).await?;

        Ok(Self {
            temp_dir,
            events,
            storage: Arc::new(storage),
        })
    }
}

/// In-process replacement for the Kyber rate, token and user services.
///
/// `None` in a slot makes the matching call fail like a dropped connection.
#[derive(Default)]
pub struct FakeKyber {
    pub rates: Mutex<Option<Vec<Rate>>>,
    pub usd_rates: Mutex<Option<Vec<UsdRate>>>,
    pub tokens: Mutex<Vec<Token>>,
    pub notifications: Mutex<Vec<Notification>>,
}

impl FakeKyber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            usd_rates: Mutex::new(Some(Vec::new())),
            ..Default::default()
        })
    }

    pub fn set_rates(&self, rates: Option<Vec<Rate>>) {
        *self.rates.lock().unwrap() = rates;
    }

    pub fn set_tokens(&self, tokens: Vec<Token>) {
        *self.tokens.lock().unwrap() = tokens;
    }
}

fn offline() -> Error {
    Error::cast("service unreachable")
}

#[async_trait]
impl RateSource for FakeKyber {
    async fn fetch_rates(&self) -> Result<Vec<Rate>> {
        self.rates.lock().unwrap().clone().ok_or_else(offline)
    }

    async fn fetch_usd_rates(&self) -> Result<Vec<UsdRate>> {
        self.usd_rates.lock().unwrap().clone().ok_or_else(offline)
    }
}

#[async_trait]
impl TokenListSource for FakeKyber {
    async fn fetch_supported_tokens(&self) -> Result<Vec<Token>> {
        Ok(self.tokens.lock().unwrap().clone())
    }
}

#[async_trait]
impl NotificationSource for FakeKyber {
    async fn fetch_notifications(&self, _access_token: &str) -> Result<Vec<Notification>> {
        Ok(self.notifications.lock().unwrap().clone())
    }

    async fn fetch_alerts(&self, _access_token: &str) -> Result<Vec<PriceAlert>> {
        Ok(Vec::new())
    }
}

pub fn rate(source: &str, dest: &str, value: f64) -> Rate {
    Rate {
        source: source.to_string(),
        dest: dest.to_string(),
        rate: value,
        min_rate: value * 0.97,
    }
}

/// Wait for the next event matching `wanted`, failing after a second
pub async fn expect_event(
    rx: &mut broadcast::Receiver<SyncEvent>,
    wanted: impl Fn(&SyncEvent) -> bool,
) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = rx.recv().await.expect("event bus closed");
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
