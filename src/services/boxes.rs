//! Boxes service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::gear_box::{CreateGearBox, GearBox},
    repository::Repository,
};

#[derive(Clone)]
pub struct BoxesService {
    repository: Repository,
}

impl BoxesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<Vec<GearBox>> {
        self.repository.items.get(owner_id, item_id).await?;
        self.repository.boxes.list(owner_id, item_id).await
    }

    pub async fn create(&self, owner_id: Uuid, item_id: Uuid, data: &CreateGearBox) -> AppResult<GearBox> {
        data.validate()?;
        if data.name.trim().is_empty() {
            return Err(AppError::Validation("Box name is required".to_string()));
        }
        self.repository.items.get(owner_id, item_id).await?;
        self.repository.boxes.create(item_id, data).await
    }

    pub async fn delete(&self, owner_id: Uuid, item_id: Uuid, box_id: Uuid) -> AppResult<()> {
        self.repository.boxes.delete(owner_id, item_id, box_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::ItemRecord;
    use crate::repository::test_support::{insert_user, memory_pool};

    #[tokio::test]
    async fn boxes_follow_item_ownership() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;
        let repository = Repository::new(pool);
        let service = BoxesService::new(repository.clone());

        let item = insert_item(&repository, alice).await;
        let data = CreateGearBox { name: "Fins".into(), description: None };

        assert!(matches!(service.create(bob, item, &data).await, Err(AppError::NotFound(_))));
        let gear_box = service.create(alice, item, &data).await.unwrap();
        assert_eq!(service.list(alice, item).await.unwrap().len(), 1);
        assert!(matches!(service.list(bob, item).await, Err(AppError::NotFound(_))));

        assert!(matches!(
            service.delete(bob, item, gear_box.id).await,
            Err(AppError::NotFound(_))
        ));
        service.delete(alice, item, gear_box.id).await.unwrap();
        assert!(service.list(alice, item).await.unwrap().is_empty());
    }

    async fn insert_item(repository: &Repository, owner: Uuid) -> Uuid {
        let record = ItemRecord {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: "Board".into(),
            brand: None,
            model: None,
            serial_number: None,
            category_id: None,
            location_id: None,
            purchase_date: None,
            purchase_price: None,
            condition: Default::default(),
            description: None,
            specifications: Default::default(),
            qr_code: None,
            maintenance_schedule: Default::default(),
        };
        repository.items.create(&record, &[], &[]).await.unwrap().id
    }
}
