//! Gear item model and its sub-records (images, maintenance, usage).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{Condition, LocationType, MaintenanceFrequency, MaintenanceType};
use super::query::PageRequest;

// ---------------------------------------------------------------------------
// Maintenance schedule
// ---------------------------------------------------------------------------

/// Recurring service metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSchedule {
    pub frequency: Option<MaintenanceFrequency>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance: Option<DateTime<Utc>>,
}

impl MaintenanceSchedule {
    /// Next due date derived from the frequency, anchored at the last
    /// maintenance (or `now` when none was recorded). `None` for custom or
    /// unset frequencies.
    pub fn compute_next(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let anchor = self.last_maintenance.unwrap_or(now);
        match self.frequency? {
            MaintenanceFrequency::Weekly => anchor.checked_add_signed(Duration::days(7)),
            MaintenanceFrequency::Monthly => anchor.checked_add_months(Months::new(1)),
            MaintenanceFrequency::Quarterly => anchor.checked_add_months(Months::new(3)),
            MaintenanceFrequency::Yearly => anchor.checked_add_months(Months::new(12)),
            MaintenanceFrequency::Custom => None,
        }
    }

    /// Whether the frequency is one the server can recompute
    pub fn is_recurring(&self) -> bool {
        matches!(
            self.frequency,
            Some(
                MaintenanceFrequency::Weekly
                    | MaintenanceFrequency::Monthly
                    | MaintenanceFrequency::Quarterly
                    | MaintenanceFrequency::Yearly
            )
        )
    }

    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.next_maintenance.map_or(false, |next| next <= now)
    }

    /// Record a maintenance performed at `performed_at` and roll the
    /// schedule forward.
    pub fn record_maintenance(&mut self, performed_at: DateTime<Utc>, now: DateTime<Utc>) {
        if !self.is_recurring() {
            return;
        }
        self.last_maintenance = Some(performed_at);
        self.next_maintenance = self.compute_next(now);
    }
}

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

/// Image attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemImage {
    #[validate(length(min = 1, message = "Image url is required"))]
    pub url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Internal row structure for maintenance records
#[derive(Debug, Clone, FromRow)]
pub struct MaintenanceRecordRow {
    id: Uuid,
    record_type: MaintenanceType,
    performed_on: DateTime<Utc>,
    description: Option<String>,
    cost: Option<f64>,
    performed_by: Option<String>,
    attachments: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl From<MaintenanceRecordRow> for MaintenanceRecord {
    fn from(row: MaintenanceRecordRow) -> Self {
        MaintenanceRecord {
            id: row.id,
            record_type: row.record_type,
            date: row.performed_on,
            description: row.description,
            cost: row.cost,
            performed_by: row.performed_by,
            attachments: row.attachments.0,
            created_at: row.created_at,
        }
    }
}

/// Maintenance performed on an item
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub record_type: MaintenanceType,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub performed_by: Option<String>,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Add maintenance record request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenanceRecord {
    #[serde(rename = "type")]
    pub record_type: MaintenanceType,
    /// Defaults to the current time
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Cost cannot be negative"))]
    pub cost: Option<f64>,
    pub performed_by: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Weather captured when a usage record is logged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
    pub temperature: Option<f64>,
    pub conditions: Option<String>,
}

/// Internal row structure for usage records
#[derive(Debug, Clone, FromRow)]
pub struct UsageRecordRow {
    id: Uuid,
    used_on: DateTime<Utc>,
    duration_minutes: i64,
    location_id: Option<Uuid>,
    weather_captured: bool,
    wind_speed: Option<f64>,
    wind_direction: Option<String>,
    temperature: Option<f64>,
    conditions: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UsageRecordRow> for UsageRecord {
    fn from(row: UsageRecordRow) -> Self {
        // A snapshot is only taken when the session referenced a location
        let weather_conditions = row.weather_captured.then(|| WeatherSnapshot {
            wind_speed: row.wind_speed,
            wind_direction: row.wind_direction,
            temperature: row.temperature,
            conditions: row.conditions,
        });

        UsageRecord {
            id: row.id,
            date: row.used_on,
            duration: row.duration_minutes,
            location_id: row.location_id,
            weather_conditions,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// A session on the water with an item
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Duration in minutes
    pub duration: i64,
    pub location_id: Option<Uuid>,
    pub weather_conditions: Option<WeatherSnapshot>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Add usage record request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUsageRecord {
    /// Defaults to the current time
    pub date: Option<DateTime<Utc>>,
    /// Duration in minutes
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration: i64,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Category summary embedded in an item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// Location summary embedded in an item
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Internal row structure for item queries (joined with category/location)
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<f64>,
    pub condition: Condition,
    pub description: Option<String>,
    pub specifications: Json<BTreeMap<String, String>>,
    pub qr_code: Option<String>,
    pub maintenance_frequency: Option<MaintenanceFrequency>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub location_name: Option<String>,
    pub location_type: Option<LocationType>,
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
}

/// Gear item with all sub-records and derived totals
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub category: Option<CategoryRef>,
    pub location_id: Option<Uuid>,
    pub location: Option<LocationRef>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<f64>,
    pub condition: Condition,
    pub description: Option<String>,
    pub specifications: BTreeMap<String, String>,
    pub images: Vec<ItemImage>,
    /// `data:` URI holding the QR payload
    pub qr_code: Option<String>,
    pub maintenance_schedule: MaintenanceSchedule,
    pub maintenance_records: Vec<MaintenanceRecord>,
    pub usage_records: Vec<UsageRecord>,
    pub total_usage_hours: f64,
    pub total_maintenance_cost: f64,
    pub maintenance_due: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Build an item from its row and sub-records, computing derived fields
    pub fn assemble(
        row: ItemRow,
        images: Vec<ItemImage>,
        maintenance_records: Vec<MaintenanceRecord>,
        usage_records: Vec<UsageRecord>,
    ) -> Item {
        let category = match (row.category_id, row.category_name, row.category_color) {
            (Some(id), Some(name), Some(color)) => Some(CategoryRef { id, name, color }),
            _ => None,
        };
        let location = match (
            row.location_id,
            row.location_name,
            row.location_latitude,
            row.location_longitude,
        ) {
            (Some(id), Some(name), Some(latitude), Some(longitude)) => Some(LocationRef {
                id,
                name,
                location_type: row.location_type,
                latitude,
                longitude,
            }),
            _ => None,
        };

        let mut item = Item {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            brand: row.brand,
            model: row.model,
            serial_number: row.serial_number,
            category_id: row.category_id,
            category,
            location_id: row.location_id,
            location,
            purchase_date: row.purchase_date,
            purchase_price: row.purchase_price,
            condition: row.condition,
            description: row.description,
            specifications: row.specifications.0,
            images,
            qr_code: row.qr_code,
            maintenance_schedule: MaintenanceSchedule {
                frequency: row.maintenance_frequency,
                last_maintenance: row.last_maintenance,
                next_maintenance: row.next_maintenance,
            },
            maintenance_records,
            usage_records,
            total_usage_hours: 0.0,
            total_maintenance_cost: 0.0,
            maintenance_due: false,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        item.refresh_derived(Utc::now());
        item
    }

    /// Sum of usage durations, in hours
    pub fn total_usage_hours(&self) -> f64 {
        self.usage_records
            .iter()
            .map(|r| r.duration as f64 / 60.0)
            .sum()
    }

    /// Sum of maintenance costs, absent costs counting as zero
    pub fn total_maintenance_cost(&self) -> f64 {
        self.maintenance_records
            .iter()
            .map(|r| r.cost.unwrap_or(0.0))
            .sum()
    }

    pub fn is_maintenance_due(&self) -> bool {
        self.maintenance_schedule.is_due_at(Utc::now())
    }

    pub fn refresh_derived(&mut self, now: DateTime<Utc>) {
        self.total_usage_hours = self.total_usage_hours();
        self.total_maintenance_cost = self.total_maintenance_cost();
        self.maintenance_due = self.maintenance_schedule.is_due_at(now);
    }
}

/// Maintenance schedule as supplied by clients
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub frequency: Option<MaintenanceFrequency>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance: Option<DateTime<Utc>>,
}

impl ScheduleInput {
    /// Resolve into a schedule; a missing next date is derived from the
    /// frequency.
    pub fn into_schedule(self, now: DateTime<Utc>) -> MaintenanceSchedule {
        let mut schedule = MaintenanceSchedule {
            frequency: self.frequency,
            last_maintenance: self.last_maintenance,
            next_maintenance: self.next_maintenance,
        };
        if schedule.next_maintenance.is_none() {
            schedule.next_maintenance = schedule.compute_next(now);
        }
        schedule
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Item name is required (max 200 characters)"))]
    pub name: String,
    #[validate(length(max = 100, message = "Brand cannot exceed 100 characters"))]
    pub brand: Option<String>,
    #[validate(length(max = 100, message = "Model cannot exceed 100 characters"))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Serial number must be between 1 and 100 characters"))]
    pub serial_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, message = "Purchase price cannot be negative"))]
    pub purchase_price: Option<f64>,
    pub condition: Option<Condition>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    /// Already hosted images to attach
    #[serde(default)]
    pub images: Vec<ItemImage>,
    pub maintenance_schedule: Option<ScheduleInput>,
}

/// Update item request; absent fields are left unchanged and images are
/// appended to the existing list
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200, message = "Item name cannot be empty (max 200 characters)"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "Brand cannot exceed 100 characters"))]
    pub brand: Option<String>,
    #[validate(length(max = 100, message = "Model cannot exceed 100 characters"))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Serial number must be between 1 and 100 characters"))]
    pub serial_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, message = "Purchase price cannot be negative"))]
    pub purchase_price: Option<f64>,
    pub condition: Option<Condition>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub images: Vec<ItemImage>,
    pub maintenance_schedule: Option<ScheduleInput>,
}

/// Column values written for an item row
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<f64>,
    pub condition: Condition,
    pub description: Option<String>,
    pub specifications: BTreeMap<String, String>,
    pub qr_code: Option<String>,
    pub maintenance_schedule: MaintenanceSchedule,
}

impl ItemRecord {
    /// Current column values of a stored item
    pub fn from_item(item: &Item) -> Self {
        ItemRecord {
            id: item.id,
            owner_id: item.owner_id,
            name: item.name.clone(),
            brand: item.brand.clone(),
            model: item.model.clone(),
            serial_number: item.serial_number.clone(),
            category_id: item.category_id,
            location_id: item.location_id,
            purchase_date: item.purchase_date,
            purchase_price: item.purchase_price,
            condition: item.condition,
            description: item.description.clone(),
            specifications: item.specifications.clone(),
            qr_code: item.qr_code.clone(),
            maintenance_schedule: item.maintenance_schedule.clone(),
        }
    }

    /// Fold an update into the current column values
    pub fn apply(&mut self, update: &UpdateItem, now: DateTime<Utc>) {
        if let Some(ref name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.brand.is_some() {
            self.brand = update.brand.clone();
        }
        if update.model.is_some() {
            self.model = update.model.clone();
        }
        if update.serial_number.is_some() {
            self.serial_number = update.serial_number.clone();
        }
        if update.category_id.is_some() {
            self.category_id = update.category_id;
        }
        if update.location_id.is_some() {
            self.location_id = update.location_id;
        }
        if update.purchase_date.is_some() {
            self.purchase_date = update.purchase_date;
        }
        if update.purchase_price.is_some() {
            self.purchase_price = update.purchase_price;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if update.description.is_some() {
            self.description = update.description.clone();
        }
        if let Some(ref specifications) = update.specifications {
            self.specifications = specifications.clone();
        }
        if let Some(ref schedule) = update.maintenance_schedule {
            self.maintenance_schedule = schedule.clone().into_schedule(now);
        }
    }
}

/// Item list query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    pub category: Option<Uuid>,
    pub location: Option<Uuid>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ItemQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// New image received in an upload, before it is stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}
