pub mod api;
pub mod client_config;

pub use api::{ApiError, InventoryApi};
pub use client_config::ClientConfig;
