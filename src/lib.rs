//! Landr job info backend: validated, owner-scoped job info records with a
//! tag-invalidated read cache, served over a Rocket JSON API.

pub mod auth;
pub mod core;
pub mod job_infos;
pub mod utils;
pub mod web;

pub use web::{build_rocket, start_web_server, AppState};
