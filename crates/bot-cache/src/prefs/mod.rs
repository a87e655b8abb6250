//! Persisted per-guild command preferences

mod error;
mod json_store;

pub use error::CacheError;
pub use json_store::JsonCommandsConfig;
