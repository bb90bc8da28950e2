use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response shape: {0}")]
    Cast(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid ENS name: {0}")]
    InvalidEnsName(String),

    #[error("Store has been closed")]
    StoreClosed,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Token {0} is referenced by transaction history")]
    TokenInUse(String),
}

impl Error {
    pub fn cast(what: impl Into<String>) -> Self {
        Error::Cast(what.into())
    }
}
