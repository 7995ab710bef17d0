//! provenv configuration layer
//!
//! All environment-variable reads live here; the rest of the workspace works
//! with structured config.
//!
//! - `loader`: `.env` parsing and the env_or / env_optional / env_bool lookups
//! - `schema`: `ProvisionConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants and their aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, parse_dotenv};
pub use schema::{
    ConfigError, ObservabilityConfig, ProvisionArgs, ProvisionConfig, DEFAULT_ENV_NAME,
};
