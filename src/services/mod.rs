//! Business logic services

pub mod auth;
pub mod boxes;
pub mod categories;
pub mod email;
pub mod images;
pub mod items;
pub mod locations;
pub mod qr;
pub mod tokens;
pub mod weather;

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::AppConfig,
    error::{validation_messages, AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub locations: locations::LocationsService,
    pub categories: categories::CategoriesService,
    pub items: items::ItemsService,
    pub boxes: boxes::BoxesService,
}

impl Services {
    /// Create all services with the given repository and external adapters
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        weather: Arc<dyn weather::WeatherProvider>,
        images: Arc<dyn images::ImageStore>,
    ) -> Self {
        let tokens = tokens::TokenService::new(config.auth.clone());
        let email = email::EmailService::new(config.email.clone());

        Self {
            auth: auth::AuthService::new(repository.clone(), tokens, email, config.auth.clone()),
            locations: locations::LocationsService::new(repository.clone(), weather.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            items: items::ItemsService::new(repository.clone(), weather, images, config.uploads.clone()),
            boxes: boxes::BoxesService::new(repository),
        }
    }
}

/// Validate several values at once, reporting every failure together
pub(crate) fn validate_all(parts: &[&dyn Validate]) -> AppResult<()> {
    let messages: Vec<String> = parts
        .iter()
        .filter_map(|part| part.validate().err())
        .flat_map(|errors| validation_messages(&errors))
        .collect();

    if messages.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationErrors(messages))
    }
}
