pub mod config;
pub mod models;
pub mod placement;
pub mod store;
pub mod variables;
