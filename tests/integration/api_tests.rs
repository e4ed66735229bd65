//! API integration tests
//!
//! The full router is driven in-process against an in-memory SQLite
//! database, with a canned weather provider and a temporary upload dir.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;

use gear_tracker_server::{
    api,
    config::{
        AppConfig, AuthConfig, DatabaseConfig, EmailConfig, LoggingConfig, ServerConfig, UploadsConfig,
        WeatherConfig,
    },
    repository::Repository,
    services::{
        images::LocalImageStore,
        weather::{CurrentWeather, WeatherProvider},
    },
    AppState,
};

const SECRET: &str = "integration-test-secret-0123456789abcdef";
const PASSWORD: &str = "Secret123!";

/// Weather provider answering every lookup with the same reading
struct FixedWeather(CurrentWeather);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current(&self, _latitude: f64, _longitude: f64) -> CurrentWeather {
        self.0.clone()
    }
}

fn outage() -> CurrentWeather {
    CurrentWeather::unavailable("Error", "Weather data temporarily unavailable")
}

fn breezy() -> CurrentWeather {
    CurrentWeather {
        temperature: Some(18.5),
        wind_speed: Some(9.0),
        wind_direction: Some("WSW".to_string()),
        conditions: "Clouds".to_string(),
        description: "scattered clouds".to_string(),
        humidity: Some(70.0),
        pressure: Some(1012.0),
        timestamp: chrono::Utc::now(),
        available: true,
    }
}

struct TestApp {
    router: Router,
    pool: SqlitePool,
    uploads: TempDir,
}

async fn app(auto_verify: bool, weather: CurrentWeather) -> TestApp {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let uploads = tempfile::tempdir().unwrap();
    let config = AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        auth: AuthConfig {
            jwt_secret: SECRET.to_string(),
            session_ttl_hours: 168,
            verification_ttl_hours: 24,
            reset_ttl_minutes: 60,
            auto_verify,
        },
        logging: LoggingConfig::default(),
        email: EmailConfig::default(),
        weather: WeatherConfig::default(),
        uploads: UploadsConfig {
            dir: uploads.path().to_string_lossy().to_string(),
            ..UploadsConfig::default()
        },
    };

    let images = Arc::new(LocalImageStore::new(&config.uploads));
    let state = AppState::new(
        config,
        Repository::new(pool.clone()),
        Arc::new(FixedWeather(weather)),
        images,
    );

    TestApp {
        router: api::router(state),
        pool,
        uploads,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Register an account and return its session token
    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": PASSWORD, "firstName": "Alice" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_location(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/locations",
                token,
                json!({
                    "name": name,
                    "coordinates": { "latitude": 43.9, "longitude": -86.4 },
                    "type": "Lake"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["location"]["id"].as_str().unwrap().to_string()
    }

    async fn create_item(&self, token: &str, body: Value) -> Value {
        let (status, body) = self.post("/api/items", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["item"].clone()
    }
}

#[tokio::test]
async fn health_reports_uptime() {
    let app = app(true, outage()).await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].is_number());

    let (status, _) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn alice_end_to_end() {
    let app = app(true, breezy()).await;
    let token = app.register("alice@example.com").await;

    let location = app.create_location(&token, "Lake Michigan").await;

    let (status, body) = app
        .post("/api/categories", &token, json!({ "name": "Sails", "color": "#FF5733" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let category = body["category"]["id"].as_str().unwrap().to_string();

    let item = app
        .create_item(
            &token,
            json!({ "name": "Freeride 6.5", "categoryId": category, "locationId": location }),
        )
        .await;
    assert!(item["qrCode"].as_str().unwrap().starts_with("data:application/json;base64,"));
    assert_eq!(item["category"]["name"], "Sails");
    assert_eq!(item["location"]["name"], "Lake Michigan");
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/locations",
            &token,
            json!({ "name": "Lake Michigan", "coordinates": { "latitude": 1.0, "longitude": 1.0 } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_NAME");
    assert_eq!(body["success"], false);

    let (status, body) = app.delete(&format!("/api/categories/{}", category), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "HAS_DEPENDENTS");

    let (status, body) = app.get(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weather"]["windDirection"], "WSW");

    let (status, _) = app.delete(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.delete(&format!("/api/categories/{}", category), &token).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn owners_cannot_see_each_other() {
    let app = app(true, outage()).await;
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;

    let location = app.create_location(&alice, "Garage").await;
    let item = app.create_item(&alice, json!({ "name": "Boom" })).await;
    let item_id = item["id"].as_str().unwrap();
    let (status, body) = app.post("/api/categories", &alice, json!({ "name": "Sails" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let category = body["category"]["id"].as_str().unwrap().to_string();

    let paths = [
        format!("/api/locations/{}", location),
        format!("/api/items/{}", item_id),
        format!("/api/categories/{}", category),
    ];
    for path in &paths {
        let (status, body) = app.get(path, &bob).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {}", path);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = app.put(path, &bob, json!({ "name": "Taken over" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "PUT {}", path);

        let (status, _) = app.delete(path, &bob).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "DELETE {}", path);
    }

    // Alice's records are untouched
    let (_, body) = app.get(&paths[0], &alice).await;
    assert_eq!(body["location"]["name"], "Garage");
    let (_, body) = app.get(&paths[1], &alice).await;
    assert_eq!(body["item"]["name"], "Boom");
    let (_, body) = app.get(&paths[2], &alice).await;
    assert_eq!(body["category"]["name"], "Sails");

    let (status, body) = app.get("/api/items", &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);

    // Bob may reuse Alice's names, and may not reference her location
    app.create_location(&bob, "Garage").await;
    let (status, body) = app
        .post("/api/items", &bob, json!({ "name": "Board", "locationId": location }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REFERENCE");
}

#[tokio::test]
async fn names_are_unique_per_owner_ignoring_case() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;

    let (status, _) = app.post("/api/categories", &token, json!({ "name": "Sails" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.post("/api/categories", &token, json!({ "name": "SAILS" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_NAME");

    app.create_location(&token, "Garage").await;
    let (status, body) = app
        .post(
            "/api/locations",
            &token,
            json!({ "name": "garage", "coordinates": { "latitude": 0.0, "longitude": 0.0 } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_NAME");
}

#[tokio::test]
async fn coordinates_are_bounded_inclusively() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;

    let location = |name: &str, latitude: f64, longitude: f64| {
        json!({ "name": name, "coordinates": { "latitude": latitude, "longitude": longitude } })
    };

    let (status, _) = app.post("/api/locations", &token, location("Pole", 90.0, -180.0)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/locations", &token, location("Beyond", 90.5, 0.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["errors"].is_array());

    let (status, _) = app.post("/api/locations", &token, location("Beyond", 0.0, 180.1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_delete_refuses_categories_with_items() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;

    let mut ids = Vec::new();
    for name in ["Sails", "Boards"] {
        let (_, body) = app.post("/api/categories", &token, json!({ "name": name })).await;
        ids.push(body["category"]["id"].as_str().unwrap().to_string());
    }
    app.create_item(&token, json!({ "name": "Wave 5.0", "categoryId": ids[0] })).await;

    let (status, body) = app
        .post("/api/categories/bulk-delete", &token, json!({ "categoryIds": ids }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "HAS_DEPENDENTS");

    let (_, body) = app.get("/api/categories", &token).await;
    assert_eq!(body["categories"].as_array().unwrap().len(), 2);
    let sails = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Sails")
        .unwrap();
    assert_eq!(sails["itemCount"], 1);

    let (status, body) = app
        .post("/api/categories/bulk-delete", &token, json!({ "categoryIds": [ids[1]] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 1);
}

#[tokio::test]
async fn maintenance_costs_and_due_dates() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;

    let overdue = (chrono::Utc::now() - chrono::Duration::days(2)).to_rfc3339();
    let item = app
        .create_item(
            &token,
            json!({
                "name": "Mast 430",
                "maintenanceSchedule": { "frequency": "monthly", "nextMaintenance": overdue }
            }),
        )
        .await;
    assert_eq!(item["maintenanceDue"], true);
    let uri = format!("/api/items/{}/maintenance", item["id"].as_str().unwrap());

    let (status, body) = app
        .post(&uri, &token, json!({ "type": "repair", "cost": 40.0, "description": "Base cup" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["item"]["maintenanceDue"], false);
    assert!(body["item"]["maintenanceSchedule"]["lastMaintenance"].is_string());

    let (_, body) = app.post(&uri, &token, json!({ "type": "cleaning" })).await;
    let (_, body2) = app.post(&uri, &token, json!({ "type": "inspection", "cost": 12.5 })).await;
    assert_eq!(body["item"]["totalMaintenanceCost"], 40.0);
    assert_eq!(body2["item"]["totalMaintenanceCost"], 52.5);

    let (status, body) = app.post(&uri, &token, json!({ "type": "repair", "cost": -5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let record = body2["item"]["maintenanceRecords"][0]["id"].as_str().unwrap().to_string();
    let (status, body) = app.delete(&format!("{}/{}", uri, record), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["totalMaintenanceCost"], 12.5);
}

#[tokio::test]
async fn usage_is_logged_when_weather_is_down() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;
    let location = app.create_location(&token, "Lake Michigan").await;
    let item = app.create_item(&token, json!({ "name": "Freeride 6.5" })).await;
    let uri = format!("/api/items/{}/usage", item["id"].as_str().unwrap());

    let (status, body) = app
        .post(&uri, &token, json!({ "duration": 120, "locationId": location, "notes": "Gusty" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["item"]["totalUsageHours"], 2.0);
    let weather = &body["item"]["usageRecords"][0]["weatherConditions"];
    assert!(weather.is_object());
    assert!(weather["windSpeed"].is_null());

    let (status, body) = app.get(&format!("/api/locations/{}/weather", location), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weather"]["available"], false);

    let (status, _) = app.post(&uri, &token, json!({ "duration": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_location_clears_references() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;
    let location = app.create_location(&token, "Van").await;
    let item = app.create_item(&token, json!({ "name": "Board", "locationId": location })).await;
    let item_uri = format!("/api/items/{}", item["id"].as_str().unwrap());

    let (status, _) = app.delete(&format!("/api/locations/{}", location), &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&item_uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["item"]["locationId"].is_null());
    assert!(body["weather"].is_null());
}

#[tokio::test]
async fn gates_reject_missing_tokens_and_unverified_users() {
    let app = app(false, outage()).await;

    let (status, body) = app.call(Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = app.get("/api/items", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.register("alice@example.com").await;
    let (status, _) = app.get("/api/items", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/categories", &token, json!({ "name": "Sails" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn verify_email_unlocks_writes() {
    let app = app(false, outage()).await;
    let token = app.register("alice@example.com").await;

    let verification: Option<String> =
        sqlx::query_scalar("SELECT verification_token FROM users WHERE email = ?")
            .bind("alice@example.com")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    let verification = verification.unwrap();

    let (status, _) = app
        .call(Method::POST, "/api/auth/verify-email", None, Some(json!({ "token": "bogus" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/api/auth/verify-email", None, Some(json!({ "token": verification })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = app.post("/api/categories", &token, json!({ "name": "Sails" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/auth/profile", &token).await;
    assert_eq!(body["user"]["isVerified"], true);
}

#[tokio::test]
async fn login_records_history_and_rejects_bad_passwords() {
    let app = app(true, outage()).await;
    app.register("alice@example.com").await;

    let login = |password: &str| json!({ "email": "ALICE@example.com", "password": password });

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .header("user-agent", "gear-tests/1.0")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::from(login(PASSWORD).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    let (_, body) = app.get("/api/auth/profile", &token).await;
    let history = body["user"]["loginHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["ip"], "203.0.113.7");
    assert_eq!(history[0]["userAgent"], "gear-tests/1.0");

    let (status, body) = app
        .call(Method::POST, "/api/auth/login", None, Some(login("wrong-password")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = app
        .put(
            "/api/auth/change-password",
            &token,
            json!({ "currentPassword": "nope", "newPassword": "Another123!" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn multipart_upload_stores_images() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;

    let boundary = "gear-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{data}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"caption0\"\r\n\r\nFront\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"sail.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary,
            data = json!({ "name": "Sail" }),
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[0x89, b'P', b'N', b'G']);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/items")
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let image = &body["item"]["images"][0];
    assert_eq!(image["caption"], "Front");
    assert_eq!(image["isPrimary"], true);
    let url = image["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 1);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn boxes_live_under_items() {
    let app = app(true, outage()).await;
    let token = app.register("alice@example.com").await;
    let item = app.create_item(&token, json!({ "name": "Quiver bag" })).await;
    let uri = format!("/api/items/{}/boxes", item["id"].as_str().unwrap());

    let (status, body) = app.post(&uri, &token, json!({ "name": "Fins" })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let box_id = body["box"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["boxes"].as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("{}/{}", uri, box_id), &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("{}/{}", uri, box_id), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
