mod defaults;
mod io;
mod schema;
mod validate;

pub use io::load_config;
pub use schema::{Config, EngineConfig, ProviderConfig, ProviderKind, StatusStoreConfig};
pub use validate::ConfigError;
