pub mod api;
pub mod config;
pub mod coordinators;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod utils;
pub mod web3;

pub use error::{Error, Result};
