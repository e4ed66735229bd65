//! Windsurf Gear Tracker
//!
//! A multi-tenant REST JSON API for keeping track of windsurf gear: the
//! spots and storage places it lives at, its categories, maintenance
//! history and time on the water.

use std::sync::Arc;
use std::time::Instant;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::{images::ImageStore, weather::WeatherProvider, Services};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repository: Repository,
        weather: Arc<dyn WeatherProvider>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let services = Services::new(repository, &config, weather, images);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            started_at: Instant::now(),
        }
    }
}
