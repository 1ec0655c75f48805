//! Lendshelf - peer-to-peer item lending
//!
//! Owns the loan lifecycle for items shared between people and community pools:
//! the pure transition table and availability projection (`lending`), the
//! authoritative REST/push backend (`api`, `services`, `repository`) and the
//! command facade a UI layer drives over that backend (`client`).

use std::sync::Arc;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod lending;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
