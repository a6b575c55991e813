pub mod config;
pub mod csrf;
pub mod error;
pub mod models;
pub mod render;
pub mod repo;
pub mod routes;
pub mod security;
pub mod storage;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
