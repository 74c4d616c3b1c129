// src/core/mod.rs
//! Infrastructure shared by the feature modules

pub mod cache;
pub mod config_manager;
pub mod database;

pub use cache::{InMemoryTagCache, NoopTagCache, TagCache};
pub use config_manager::ConfigManager;
pub use database::Database;
