pub mod config;

pub use config::{GantryConfig, LoggingConfig, ResponseConfig, ServerConfig};
