//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, boxes, categories, health, items, locations};

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Windsurf Gear Tracker API",
        version = "1.0.0",
        description = "Multi-tenant inventory of windsurf gear, spots, maintenance and usage",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::verify_email,
        auth::forgot_password,
        auth::reset_password,
        auth::get_profile,
        auth::update_profile,
        auth::change_password,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::bulk_delete_categories,
        // Locations
        locations::list_locations,
        locations::get_location,
        locations::create_location,
        locations::update_location,
        locations::delete_location,
        locations::location_weather,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::add_maintenance,
        items::remove_maintenance,
        items::add_usage,
        items::regenerate_qr,
        // Boxes
        boxes::list_boxes,
        boxes::create_box,
        boxes::delete_box,
    ),
    components(
        schemas(
            // Auth
            auth::SessionResponse,
            auth::ProfileResponse,
            crate::models::user::User,
            crate::models::user::UserSummary,
            crate::models::user::Preferences,
            crate::models::user::NotificationPreferences,
            crate::models::user::UpdatePreferences,
            crate::models::user::UpdateNotificationPreferences,
            crate::models::user::LoginEntry,
            crate::models::user::RegisterRequest,
            crate::models::user::LoginRequest,
            crate::models::user::VerifyEmailRequest,
            crate::models::user::ForgotPasswordRequest,
            crate::models::user::ResetPasswordRequest,
            crate::models::user::UpdateProfile,
            crate::models::user::ChangePasswordRequest,
            // Categories
            categories::CategoryList,
            categories::CategoryResponse,
            categories::BulkDeleteResponse,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            crate::models::category::BulkDeleteCategories,
            // Locations
            locations::LocationList,
            locations::LocationResponse,
            locations::WeatherResponse,
            crate::models::location::Location,
            crate::models::location::Address,
            crate::models::location::Coordinates,
            crate::models::location::WindConditions,
            crate::models::location::CreateLocation,
            crate::models::location::UpdateLocation,
            crate::services::weather::CurrentWeather,
            // Items
            items::ItemList,
            items::ItemResponse,
            items::ItemDetail,
            items::QrResponse,
            crate::models::item::Item,
            crate::models::item::CategoryRef,
            crate::models::item::LocationRef,
            crate::models::item::ItemImage,
            crate::models::item::MaintenanceSchedule,
            crate::models::item::ScheduleInput,
            crate::models::item::MaintenanceRecord,
            crate::models::item::NewMaintenanceRecord,
            crate::models::item::UsageRecord,
            crate::models::item::NewUsageRecord,
            crate::models::item::WeatherSnapshot,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            // Boxes
            boxes::BoxList,
            boxes::BoxResponse,
            crate::models::gear_box::GearBox,
            crate::models::gear_box::CreateGearBox,
            // Enums
            crate::models::enums::Role,
            crate::models::enums::Theme,
            crate::models::enums::LocationType,
            crate::models::enums::CompassPoint,
            crate::models::enums::Condition,
            crate::models::enums::MaintenanceType,
            crate::models::enums::MaintenanceFrequency,
            // Shared
            crate::models::query::Pagination,
            health::HealthResponse,
            crate::error::ErrorResponse,
            crate::error::ErrorCode,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Accounts, sessions and profile"),
        (name = "categories", description = "Gear categories"),
        (name = "locations", description = "Spots and storage places"),
        (name = "items", description = "Gear items, maintenance and usage"),
        (name = "boxes", description = "Boxes within an item")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
