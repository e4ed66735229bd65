//! Data models for the gear tracker

pub mod category;
pub mod enums;
pub mod gear_box;
pub mod item;
pub mod location;
pub mod query;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use enums::{CompassPoint, Condition, LocationType, MaintenanceFrequency, MaintenanceType, Role};
pub use gear_box::GearBox;
pub use item::Item;
pub use location::Location;
pub use query::{ListQuery, Pagination};
pub use user::{CurrentUser, User, UserSummary};
