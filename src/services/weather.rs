//! Current weather lookups by coordinates

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::WeatherConfig, models::item::WeatherSnapshot};

const DIRECTIONS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Map a bearing in degrees to a 16-point compass label
pub fn wind_direction(degrees: f64) -> &'static str {
    let normalised = degrees.rem_euclid(360.0);
    let index = (normalised / 22.5).round() as usize % 16;
    DIRECTIONS[index]
}

/// Current conditions at a point. Lookups never fail: when no data is
/// available, `available` is false and every measurement is null.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Metres per second
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
    pub conditions: String,
    pub description: String,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub available: bool,
}

impl CurrentWeather {
    pub fn unavailable(conditions: &str, description: &str) -> Self {
        Self {
            temperature: None,
            wind_speed: None,
            wind_direction: None,
            conditions: conditions.to_string(),
            description: description.to_string(),
            humidity: None,
            pressure: None,
            timestamp: Utc::now(),
            available: false,
        }
    }

    /// Snapshot stored on a usage record; measurements stay null when the
    /// lookup failed.
    pub fn snapshot(&self) -> WeatherSnapshot {
        if !self.available {
            return WeatherSnapshot::default();
        }
        WeatherSnapshot {
            wind_speed: self.wind_speed,
            wind_direction: self.wind_direction.clone(),
            temperature: self.temperature,
            conditions: Some(self.conditions.clone()),
        }
    }
}

/// Source of current weather data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> CurrentWeather;
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    wind: Option<OwmWind>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    description: String,
}

impl From<OwmResponse> for CurrentWeather {
    fn from(data: OwmResponse) -> Self {
        let (conditions, description) = data
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new()));
        let wind = data.wind;

        CurrentWeather {
            temperature: Some(data.main.temp),
            wind_speed: wind.as_ref().and_then(|w| w.speed),
            wind_direction: wind
                .as_ref()
                .and_then(|w| w.deg)
                .map(|deg| wind_direction(deg).to_string()),
            conditions,
            description,
            humidity: data.main.humidity,
            pressure: data.main.pressure,
            timestamp: Utc::now(),
            available: true,
        }
    }
}

/// OpenWeatherMap client (current weather endpoint, metric units)
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build weather HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, api_key: &str, latitude: f64, longitude: f64) -> Result<CurrentWeather, reqwest::Error> {
        let response: OwmResponse = self
            .http
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.into())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, latitude: f64, longitude: f64) -> CurrentWeather {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("Weather API key not configured, weather service disabled");
            return CurrentWeather::unavailable("Weather service not configured", "Weather data unavailable");
        };

        match self.fetch(api_key, latitude, longitude).await {
            Ok(weather) => weather,
            Err(e) => {
                tracing::warn!(latitude, longitude, "Weather lookup failed: {}", e);
                CurrentWeather::unavailable("Error", "Weather data temporarily unavailable")
            }
        }
    }
}
