//! Category model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_COLOR: &str = "#1976d2";

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("Invalid regex"));

/// Gear category, with the number of the owner's items filed under it
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create category request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100, message = "Category name is required (max 100 characters)"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a hex value such as #1976d2"))]
    pub color: Option<String>,
}

/// Update category request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100, message = "Category name cannot be empty (max 100 characters)"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a hex value such as #1976d2"))]
    pub color: Option<String>,
}

/// Bulk delete request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteCategories {
    #[validate(length(min = 1, message = "Please provide an array of category IDs"))]
    pub category_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(color: Option<&str>) -> CreateCategory {
        CreateCategory {
            name: "Sails".into(),
            description: None,
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn accepts_short_and_long_hex_colors() {
        assert!(create(Some("#FF5733")).validate().is_ok());
        assert!(create(Some("#abc")).validate().is_ok());
        assert!(create(None).validate().is_ok());
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(create(Some("FF5733")).validate().is_err());
        assert!(create(Some("#GG5733")).validate().is_err());
        assert!(create(Some("#12345")).validate().is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        let req = CreateCategory { name: String::new(), description: None, color: None };
        assert!(req.validate().is_err());
    }
}
