mod network;
mod types;

pub use network::{Environment, NetworkDescriptor};
pub use types::{load_config, Config};
