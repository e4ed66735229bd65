//! Shared domain enums stored as text columns

use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode, Encode, Sqlite,
};
use utoipa::ToSchema;

/// Implements `as_str`, `FromStr`, `Display` and SQLite text conversions
/// for a unit enum from a single variant/label table.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Sqlite> for $name {
            fn type_info() -> SqliteTypeInfo {
                <String as sqlx::Type<Sqlite>>::type_info()
            }

            fn compatible(ty: &SqliteTypeInfo) -> bool {
                <String as sqlx::Type<Sqlite>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Sqlite> for $name {
            fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <String as Decode<Sqlite>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl<'q> Encode<'q, Sqlite> for $name {
            fn encode_by_ref(&self, buf: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
                <&str as Encode<Sqlite>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

text_enum!(Role { Admin => "admin", User => "user" });

/// Client colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Kind of water body a location sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LocationType {
    Lake,
    Ocean,
    River,
    Bay,
    Other,
}

text_enum!(LocationType {
    Lake => "Lake",
    Ocean => "Ocean",
    River => "River",
    Bay => "Bay",
    Other => "Other",
});

/// Eight-point compass direction for prevailing wind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

text_enum!(CompassPoint {
    N => "N",
    NE => "NE",
    E => "E",
    SE => "SE",
    S => "S",
    SW => "SW",
    W => "W",
    NW => "NW",
});

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Physical condition of a gear item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

text_enum!(Condition {
    New => "new",
    Excellent => "excellent",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
});

/// Kind of maintenance performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Repair,
    Inspection,
    Cleaning,
    Upgrade,
    Other,
}

text_enum!(MaintenanceType {
    Repair => "repair",
    Inspection => "inspection",
    Cleaning => "cleaning",
    Upgrade => "upgrade",
    Other => "other",
});

/// Recurrence of scheduled maintenance. `Custom` schedules are managed
/// by hand and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceFrequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Custom,
}

text_enum!(MaintenanceFrequency {
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
    Custom => "custom",
});
