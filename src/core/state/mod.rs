// Persisted state: Withings tokens and crash-safe writes

pub mod atomic;
pub mod token_store;

pub use atomic::write_atomic;
pub use token_store::{TokenRecord, TokenStore, TOKEN_SCHEMA_VERSION};
