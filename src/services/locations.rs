//! Locations service

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        location::{CreateLocation, Location, UpdateLocation, WindConditions},
        query::{ListQuery, Pagination},
    },
    repository::Repository,
};

use super::{
    validate_all,
    weather::{CurrentWeather, WeatherProvider},
};

const NO_WIND: WindConditions = WindConditions {
    average_speed: None,
    direction: None,
};

/// Trimmed location name, 2 to 100 characters
fn checked_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if !(2..=100).contains(&name.chars().count()) {
        return Err(AppError::Validation(
            "Location name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(name)
}

#[derive(Clone)]
pub struct LocationsService {
    repository: Repository,
    weather: Arc<dyn WeatherProvider>,
}

impl LocationsService {
    pub fn new(repository: Repository, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { repository, weather }
    }

    pub async fn list(&self, owner_id: Uuid, query: &ListQuery) -> AppResult<(Vec<Location>, Pagination)> {
        let (locations, total) = self.repository.locations.list(owner_id, query).await?;
        Ok((locations, query.page_request().pagination(total)))
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Location> {
        self.repository.locations.get(owner_id, id).await
    }

    pub async fn create(&self, owner_id: Uuid, data: &CreateLocation) -> AppResult<Location> {
        validate_all(&[
            data as &dyn Validate,
            &data.coordinates,
            &data.address.clone().unwrap_or_default(),
            &data.wind_conditions.unwrap_or(NO_WIND),
        ])?;

        let name = checked_name(&data.name)?;
        if self.repository.locations.name_exists(owner_id, name, None).await? {
            return Err(AppError::DuplicateName("Location with this name already exists".to_string()));
        }

        let location = self.repository.locations.create(owner_id, data).await?;
        tracing::info!(location_id = %location.id, "Location created");
        Ok(location)
    }

    pub async fn update(&self, owner_id: Uuid, id: Uuid, data: &UpdateLocation) -> AppResult<Location> {
        let current = self.repository.locations.get(owner_id, id).await?;

        let coordinates = data.coordinates.unwrap_or(current.coordinates);
        validate_all(&[
            data as &dyn Validate,
            &coordinates,
            &data.address.clone().unwrap_or_default(),
            &data.wind_conditions.unwrap_or(NO_WIND),
        ])?;
        if let Some(ref name) = data.name {
            checked_name(name)?;
        }

        let merged = current.apply(data);
        if data.name.is_some()
            && self
                .repository
                .locations
                .name_exists(owner_id, &merged.name, Some(id))
                .await?
        {
            return Err(AppError::DuplicateName("Location with this name already exists".to_string()));
        }

        self.repository.locations.update(&merged).await
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        self.repository.locations.delete(owner_id, id).await?;
        tracing::info!(location_id = %id, "Location deleted");
        Ok(())
    }

    /// Current weather at one of the owner's locations
    pub async fn weather(&self, owner_id: Uuid, id: Uuid) -> AppResult<CurrentWeather> {
        let location = self.repository.locations.get(owner_id, id).await?;
        Ok(self
            .weather
            .current(location.coordinates.latitude, location.coordinates.longitude)
            .await)
    }
}
