use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-pushed message shown in the notification list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}
