//! Storage location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::{CompassPoint, LocationType};

/// Postal address, every part optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(max = 200, message = "Street cannot exceed 200 characters"))]
    pub street: Option<String>,
    #[validate(length(max = 100, message = "City cannot exceed 100 characters"))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "State cannot exceed 100 characters"))]
    pub state: Option<String>,
    #[validate(length(max = 100, message = "Country cannot exceed 100 characters"))]
    pub country: Option<String>,
    #[validate(length(max = 20, message = "Postal code cannot exceed 20 characters"))]
    pub postal_code: Option<String>,
}

/// WGS84 coordinates; bounds are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
}

/// Typical wind at a spot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindConditions {
    #[validate(range(min = 0.0, max = 200.0, message = "Wind speed must be between 0 and 200"))]
    pub average_speed: Option<f64>,
    pub direction: Option<CompassPoint>,
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postal_code: Option<String>,
    latitude: f64,
    longitude: f64,
    location_type: Option<LocationType>,
    wind_average_speed: Option<f64>,
    wind_direction: Option<CompassPoint>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        let wind_conditions = if row.wind_average_speed.is_some() || row.wind_direction.is_some() {
            Some(WindConditions {
                average_speed: row.wind_average_speed,
                direction: row.wind_direction,
            })
        } else {
            None
        };

        Location {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            address: Address {
                street: row.street,
                city: row.city,
                state: row.state,
                country: row.country,
                postal_code: row.postal_code,
            },
            coordinates: Coordinates {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            location_type: row.location_type,
            wind_conditions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Location where gear is stored or used
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Address,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub wind_conditions: Option<WindConditions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create location request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocation {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub address: Option<Address>,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub wind_conditions: Option<WindConditions>,
}

/// Update location request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocation {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub address: Option<Address>,
    pub coordinates: Option<Coordinates>,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub wind_conditions: Option<WindConditions>,
}

impl Location {
    /// Fold an update into the current state
    pub fn apply(&self, update: &UpdateLocation) -> Location {
        let mut merged = self.clone();
        if let Some(ref name) = update.name {
            merged.name = name.trim().to_string();
        }
        if update.description.is_some() {
            merged.description = update.description.clone();
        }
        if let Some(ref address) = update.address {
            merged.address = address.clone();
        }
        if let Some(coordinates) = update.coordinates {
            merged.coordinates = coordinates;
        }
        if update.location_type.is_some() {
            merged.location_type = update.location_type;
        }
        if update.wind_conditions.is_some() {
            merged.wind_conditions = update.wind_conditions;
        }
        merged
    }
}
