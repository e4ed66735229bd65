//! Items service: gear CRUD, images, maintenance and usage logs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult},
    models::{
        item::{
            CreateItem, ImageUpload, Item, ItemImage, ItemQuery, ItemRecord, MaintenanceRecord,
            NewMaintenanceRecord, NewUsageRecord, UpdateItem, UsageRecord,
        },
        query::Pagination,
    },
    repository::Repository,
};

use super::{
    images::{validate_uploads, ImageStore},
    qr,
    validate_all,
    weather::{CurrentWeather, WeatherProvider},
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
    weather: Arc<dyn WeatherProvider>,
    images: Arc<dyn ImageStore>,
    uploads: UploadsConfig,
}

impl ItemsService {
    pub fn new(
        repository: Repository,
        weather: Arc<dyn WeatherProvider>,
        images: Arc<dyn ImageStore>,
        uploads: UploadsConfig,
    ) -> Self {
        Self {
            repository,
            weather,
            images,
            uploads,
        }
    }

    pub async fn list(&self, owner_id: Uuid, query: &ItemQuery) -> AppResult<(Vec<Item>, Pagination)> {
        let (items, total) = self.repository.items.list(owner_id, query).await?;
        Ok((items, query.page_request().pagination(total)))
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Item> {
        self.repository.items.get(owner_id, id).await
    }

    /// Item detail with the current weather at its location, if it has one
    pub async fn get_with_weather(&self, owner_id: Uuid, id: Uuid) -> AppResult<(Item, Option<CurrentWeather>)> {
        let item = self.repository.items.get(owner_id, id).await?;
        let weather = match item.location {
            Some(ref location) => Some(self.weather.current(location.latitude, location.longitude).await),
            None => None,
        };
        Ok((item, weather))
    }

    /// Category and location must belong to the owner when given
    async fn check_references(
        &self,
        owner_id: Uuid,
        category_id: Option<Uuid>,
        location_id: Option<Uuid>,
    ) -> AppResult<()> {
        if let Some(category_id) = category_id {
            if self.repository.categories.find(owner_id, category_id).await?.is_none() {
                return Err(AppError::InvalidReference("Category not found".to_string()));
            }
        }
        if let Some(location_id) = location_id {
            if self.repository.locations.find(owner_id, location_id).await?.is_none() {
                return Err(AppError::InvalidReference("Location not found".to_string()));
            }
        }
        Ok(())
    }

    async fn check_serial(&self, serial_number: Option<&str>, exclude: Option<Uuid>) -> AppResult<()> {
        if let Some(serial) = serial_number {
            if self.repository.items.serial_in_use(serial, exclude).await? {
                return Err(AppError::Validation("Serial number already in use".to_string()));
            }
        }
        Ok(())
    }

    /// Images given by URL must point outside the upload area; files there
    /// are only attached through uploads.
    fn check_linked_images(&self, images: &[ItemImage]) -> AppResult<()> {
        let public_path = self.uploads.public_path.trim_end_matches('/');
        let managed = images.iter().any(|image| {
            image
                .url
                .strip_prefix(public_path)
                .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
        });
        if managed {
            return Err(AppError::Validation(format!(
                "Image URLs under {} can only be added by uploading the file",
                public_path
            )));
        }
        Ok(())
    }

    /// Store uploaded files. The first one becomes primary when the item
    /// has no primary image yet. Files already written are removed if a
    /// later one fails.
    async fn store_uploads(&self, uploads: Vec<ImageUpload>, has_primary: bool) -> AppResult<Vec<ItemImage>> {
        let mut stored = Vec::with_capacity(uploads.len());
        for (index, upload) in uploads.into_iter().enumerate() {
            match self.images.save(&upload).await {
                Ok(url) => stored.push(ItemImage {
                    url,
                    caption: upload.caption.filter(|c| !c.trim().is_empty()),
                    is_primary: !has_primary && index == 0,
                }),
                Err(e) => {
                    self.discard(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort removal of stored images
    async fn discard(&self, images: &[ItemImage]) {
        for image in images {
            if let Err(e) = self.images.remove(&image.url).await {
                tracing::warn!(url = %image.url, "Failed to remove image: {}", e);
            }
        }
    }

    pub async fn create(&self, owner_id: Uuid, data: &CreateItem, uploads: Vec<ImageUpload>) -> AppResult<Item> {
        {
            let mut parts: Vec<&dyn Validate> = vec![data];
            parts.extend(data.images.iter().map(|i| i as &dyn Validate));
            validate_all(&parts)?;
        }
        validate_uploads(&uploads, &self.uploads)?;
        self.check_linked_images(&data.images)?;

        let name = data.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Item name is required".to_string()));
        }
        self.check_references(owner_id, data.category_id, data.location_id).await?;
        self.check_serial(data.serial_number.as_deref(), None).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let record = ItemRecord {
            id,
            owner_id,
            name: name.to_string(),
            brand: data.brand.clone(),
            model: data.model.clone(),
            serial_number: data.serial_number.clone(),
            category_id: data.category_id,
            location_id: data.location_id,
            purchase_date: data.purchase_date,
            purchase_price: data.purchase_price,
            condition: data.condition.unwrap_or_default(),
            description: data.description.clone(),
            specifications: data.specifications.clone(),
            qr_code: Some(qr::encode_payload(
                id,
                name,
                data.brand.as_deref(),
                data.serial_number.as_deref(),
            )?),
            maintenance_schedule: data
                .maintenance_schedule
                .clone()
                .unwrap_or_default()
                .into_schedule(now),
        };

        let has_primary = data.images.iter().any(|i| i.is_primary);
        let stored = self.store_uploads(uploads, has_primary).await?;

        match self.repository.items.create(&record, &data.images, &stored).await {
            Ok(item) => {
                tracing::info!(item_id = %item.id, "Item created");
                Ok(item)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: &UpdateItem,
        uploads: Vec<ImageUpload>,
    ) -> AppResult<Item> {
        let current = self.repository.items.get(owner_id, id).await?;

        {
            let mut parts: Vec<&dyn Validate> = vec![data];
            parts.extend(data.images.iter().map(|i| i as &dyn Validate));
            validate_all(&parts)?;
        }
        validate_uploads(&uploads, &self.uploads)?;
        self.check_linked_images(&data.images)?;
        if data.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err(AppError::Validation("Item name cannot be empty".to_string()));
        }

        self.check_references(owner_id, data.category_id, data.location_id).await?;
        if data.serial_number.is_some() && data.serial_number != current.serial_number {
            self.check_serial(data.serial_number.as_deref(), Some(id)).await?;
        }

        let mut record = ItemRecord::from_item(&current);
        record.apply(data, Utc::now());

        let has_primary = current.images.iter().chain(data.images.iter()).any(|i| i.is_primary);
        let stored = self.store_uploads(uploads, has_primary).await?;

        match self.repository.items.update(&record, &data.images, &stored).await {
            Ok(item) => Ok(item),
            Err(e) => {
                self.discard(&stored).await;
                Err(e)
            }
        }
    }

    /// Delete an item, then purge the files uploaded for it best-effort
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        let images = self.repository.items.delete(owner_id, id).await?;
        self.discard(&images).await;
        tracing::info!(item_id = %id, "Item deleted");
        Ok(())
    }

    /// Rebuild the QR payload from the item's current fields
    pub async fn regenerate_qr(&self, owner_id: Uuid, id: Uuid) -> AppResult<String> {
        let item = self.repository.items.get(owner_id, id).await?;
        let qr_code = qr::encode_payload(
            item.id,
            &item.name,
            item.brand.as_deref(),
            item.serial_number.as_deref(),
        )?;
        self.repository.items.set_qr_code(owner_id, id, &qr_code).await?;
        Ok(qr_code)
    }

    /// Log a maintenance record; recurring schedules roll forward from its date
    pub async fn add_maintenance(&self, owner_id: Uuid, id: Uuid, data: &NewMaintenanceRecord) -> AppResult<Item> {
        let item = self.repository.items.get(owner_id, id).await?;
        data.validate()?;

        let now = Utc::now();
        let record = MaintenanceRecord {
            id: Uuid::new_v4(),
            record_type: data.record_type,
            date: data.date.unwrap_or(now),
            description: data.description.clone(),
            cost: data.cost,
            performed_by: data.performed_by.clone(),
            attachments: data.attachments.clone(),
            created_at: now,
        };

        let mut schedule = item.maintenance_schedule.clone();
        schedule.record_maintenance(record.date, now);

        self.repository.items.add_maintenance(&item, &record, &schedule).await
    }

    pub async fn remove_maintenance(&self, owner_id: Uuid, id: Uuid, record_id: Uuid) -> AppResult<Item> {
        self.repository.items.delete_maintenance(owner_id, id, record_id).await
    }

    /// Log a session on the water, snapshotting the weather at the location
    pub async fn add_usage(&self, owner_id: Uuid, id: Uuid, data: &NewUsageRecord) -> AppResult<Item> {
        let item = self.repository.items.get(owner_id, id).await?;
        data.validate()?;

        let weather_conditions = match data.location_id {
            Some(location_id) => {
                let location = self
                    .repository
                    .locations
                    .find(owner_id, location_id)
                    .await?
                    .ok_or_else(|| AppError::InvalidReference("Location not found".to_string()))?;
                let current = self
                    .weather
                    .current(location.coordinates.latitude, location.coordinates.longitude)
                    .await;
                if !current.available {
                    tracing::warn!(item_id = %id, "Weather unavailable for usage record: {}", current.conditions);
                }
                Some(current.snapshot())
            }
            None => None,
        };

        let now = Utc::now();
        let record = UsageRecord {
            id: Uuid::new_v4(),
            date: data.date.unwrap_or(now),
            duration: data.duration,
            location_id: data.location_id,
            weather_conditions,
            notes: data.notes.clone(),
            created_at: now,
        };

        self.repository.items.add_usage(&item, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        enums::{MaintenanceFrequency, MaintenanceType},
        item::{ScheduleInput, WeatherSnapshot},
        location::{Coordinates, CreateLocation},
    };
    use crate::repository::test_support::{insert_user, memory_pool};
    use crate::services::{images::LocalImageStore, weather::MockWeatherProvider};
    use chrono::Duration;

    struct Fixture {
        service: ItemsService,
        repository: Repository,
        alice: Uuid,
        bob: Uuid,
        _uploads: tempfile::TempDir,
    }

    async fn fixture(weather: MockWeatherProvider) -> Fixture {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;
        let repository = Repository::new(pool);
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadsConfig {
            dir: dir.path().to_string_lossy().to_string(),
            ..UploadsConfig::default()
        };
        let service = ItemsService::new(
            repository.clone(),
            Arc::new(weather),
            Arc::new(LocalImageStore::new(&uploads)),
            uploads,
        );
        Fixture { service, repository, alice, bob, _uploads: dir }
    }

    fn create(name: &str) -> CreateItem {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    fn maintenance(kind: MaintenanceType, cost: Option<f64>) -> NewMaintenanceRecord {
        NewMaintenanceRecord {
            record_type: kind,
            date: None,
            description: None,
            cost,
            performed_by: None,
            attachments: vec![],
        }
    }

    async fn location(repository: &Repository, owner: Uuid) -> Uuid {
        let data = CreateLocation {
            name: "Lake Michigan".into(),
            description: None,
            address: None,
            coordinates: Coordinates { latitude: 43.9, longitude: -86.4 },
            location_type: None,
            wind_conditions: None,
        };
        repository.locations.create(owner, &data).await.unwrap().id
    }

    #[tokio::test]
    async fn create_generates_qr_once() {
        let f = fixture(MockWeatherProvider::new()).await;
        let item = f.service.create(f.alice, &create("Freeride 6.5"), vec![]).await.unwrap();
        let qr_code = item.qr_code.clone().unwrap();
        let payload = qr::decode_payload(&qr_code).unwrap();
        assert_eq!(payload["id"], item.id.to_string());

        let update = UpdateItem { name: Some("Freeride 7.0".into()), ..Default::default() };
        let updated = f.service.update(f.alice, item.id, &update, vec![]).await.unwrap();
        assert_eq!(updated.qr_code.as_deref(), Some(qr_code.as_str()));

        let regenerated = f.service.regenerate_qr(f.alice, item.id).await.unwrap();
        assert_eq!(qr::decode_payload(&regenerated).unwrap()["name"], "Freeride 7.0");
    }

    #[tokio::test]
    async fn write_futures_can_cross_threads() {
        fn assert_send<T: Send>(_: &T) {}
        let f = fixture(MockWeatherProvider::new()).await;

        let data = create("Board");
        let creating = f.service.create(f.alice, &data, vec![]);
        assert_send(&creating);
        let item = creating.await.unwrap();

        let update = UpdateItem { name: Some("Board 2".into()), ..Default::default() };
        let updating = f.service.update(f.alice, item.id, &update, vec![]);
        assert_send(&updating);
        assert_eq!(updating.await.unwrap().name, "Board 2");
    }

    #[tokio::test]
    async fn foreign_references_are_rejected() {
        let f = fixture(MockWeatherProvider::new()).await;
        let bobs_spot = location(&f.repository, f.bob).await;

        let mut data = create("Board");
        data.location_id = Some(bobs_spot);
        let err = f.service.create(f.alice, &data, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));

        let mut data = create("Board");
        data.category_id = Some(Uuid::new_v4());
        let err = f.service.create(f.alice, &data, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn maintenance_rolls_schedule_and_sums_costs() {
        let f = fixture(MockWeatherProvider::new()).await;
        let mut data = create("Mast");
        data.maintenance_schedule = Some(ScheduleInput {
            frequency: Some(MaintenanceFrequency::Monthly),
            last_maintenance: None,
            next_maintenance: Some(Utc::now() - Duration::days(1)),
        });
        let item = f.service.create(f.alice, &data, vec![]).await.unwrap();
        assert!(item.maintenance_due);

        let item = f
            .service
            .add_maintenance(f.alice, item.id, &maintenance(MaintenanceType::Repair, Some(40.0)))
            .await
            .unwrap();
        assert!(!item.maintenance_due);
        let last = item.maintenance_schedule.last_maintenance.unwrap();
        let next = item.maintenance_schedule.next_maintenance.unwrap();
        assert!(next > last + Duration::days(27));

        let item = f
            .service
            .add_maintenance(f.alice, item.id, &maintenance(MaintenanceType::Cleaning, None))
            .await
            .unwrap();
        assert_eq!(item.maintenance_records.len(), 2);
        assert_eq!(item.total_maintenance_cost, 40.0);

        let negative = maintenance(MaintenanceType::Repair, Some(-1.0));
        assert!(f.service.add_maintenance(f.alice, item.id, &negative).await.is_err());
        assert!(matches!(
            f.service.add_maintenance(f.bob, item.id, &maintenance(MaintenanceType::Repair, None)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn usage_survives_weather_outage() {
        let mut weather = MockWeatherProvider::new();
        weather
            .expect_current()
            .times(1)
            .returning(|_, _| CurrentWeather::unavailable("Error", "Weather data temporarily unavailable"));
        let f = fixture(weather).await;
        let spot = location(&f.repository, f.alice).await;
        let item = f.service.create(f.alice, &create("Board"), vec![]).await.unwrap();

        let usage = NewUsageRecord { date: None, duration: 90, location_id: Some(spot), notes: None };
        let item = f.service.add_usage(f.alice, item.id, &usage).await.unwrap();

        assert_eq!(item.usage_records.len(), 1);
        assert_eq!(item.total_usage_hours, 1.5);
        assert_eq!(item.usage_records[0].weather_conditions, Some(WeatherSnapshot::default()));
    }

    #[tokio::test]
    async fn usage_without_location_has_no_weather() {
        let f = fixture(MockWeatherProvider::new()).await;
        let item = f.service.create(f.alice, &create("Board"), vec![]).await.unwrap();

        let usage = NewUsageRecord { date: None, duration: 30, location_id: None, notes: None };
        let item = f.service.add_usage(f.alice, item.id, &usage).await.unwrap();
        assert!(item.usage_records[0].weather_conditions.is_none());

        let zero = NewUsageRecord { date: None, duration: 0, location_id: None, notes: None };
        assert!(f.service.add_usage(f.alice, item.id, &zero).await.is_err());

        let foreign = location(&f.repository, f.bob).await;
        let usage = NewUsageRecord { date: None, duration: 30, location_id: Some(foreign), notes: None };
        assert!(matches!(
            f.service.add_usage(f.alice, item.id, &usage).await,
            Err(AppError::InvalidReference(_))
        ));
    }

    #[tokio::test]
    async fn uploaded_images_are_stored_and_purged() {
        let f = fixture(MockWeatherProvider::new()).await;
        let upload = ImageUpload {
            file_name: Some("sail.png".into()),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
            caption: Some("Front".into()),
        };
        let item = f.service.create(f.alice, &create("Sail"), vec![upload.clone()]).await.unwrap();
        assert_eq!(item.images.len(), 1);
        assert!(item.images[0].is_primary);

        let item = f
            .service
            .update(f.alice, item.id, &UpdateItem::default(), vec![upload])
            .await
            .unwrap();
        assert_eq!(item.images.len(), 2);
        assert!(!item.images[1].is_primary);

        let files = |dir: &std::path::Path| std::fs::read_dir(dir).unwrap().count();
        assert_eq!(files(f._uploads.path()), 2);
        f.service.delete(f.alice, item.id).await.unwrap();
        assert_eq!(files(f._uploads.path()), 0);
    }

    #[tokio::test]
    async fn another_items_upload_cannot_be_linked_or_purged() {
        let f = fixture(MockWeatherProvider::new()).await;
        let upload = ImageUpload {
            file_name: Some("sail.png".into()),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
            caption: None,
        };
        let sail = f.service.create(f.alice, &create("Sail"), vec![upload]).await.unwrap();
        let url = sail.images[0].url.clone();
        let linked = ItemImage { url: url.clone(), caption: None, is_primary: false };

        let mut data = create("Borrowed");
        data.images = vec![linked.clone()];
        assert!(matches!(
            f.service.create(f.bob, &data, vec![]).await,
            Err(AppError::Validation(_))
        ));

        let board = f.service.create(f.bob, &create("Board"), vec![]).await.unwrap();
        let update = UpdateItem { images: vec![linked], ..Default::default() };
        assert!(matches!(
            f.service.update(f.bob, board.id, &update, vec![]).await,
            Err(AppError::Validation(_))
        ));

        // External links are kept as given and never touch the upload directory
        let mut data = create("Boom");
        data.images = vec![ItemImage {
            url: "https://cdn.example.com/boom.jpg".into(),
            caption: None,
            is_primary: true,
        }];
        let boom = f.service.create(f.bob, &data, vec![]).await.unwrap();
        f.service.delete(f.bob, boom.id).await.unwrap();
        f.service.delete(f.bob, board.id).await.unwrap();

        let files = std::fs::read_dir(f._uploads.path()).unwrap().count();
        assert_eq!(files, 1);
        let sail = f.service.get(f.alice, sail.id).await.unwrap();
        assert_eq!(sail.images[0].url, url);
    }
}
