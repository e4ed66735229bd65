//! Categories service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{BulkDeleteCategories, Category, CreateCategory, UpdateCategory, DEFAULT_COLOR},
        query::{ListQuery, Pagination},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, owner_id: Uuid, query: &ListQuery) -> AppResult<(Vec<Category>, Pagination)> {
        let (categories, total) = self.repository.categories.list(owner_id, query).await?;
        Ok((categories, query.page_request().pagination(total)))
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Category> {
        self.repository.categories.get(owner_id, id).await
    }

    pub async fn create(&self, owner_id: Uuid, data: &CreateCategory) -> AppResult<Category> {
        data.validate()?;
        let name = data.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is required".to_string()));
        }

        if self.repository.categories.name_exists(owner_id, name, None).await? {
            return Err(AppError::DuplicateName("Category with this name already exists".to_string()));
        }

        let category = self
            .repository
            .categories
            .create(
                owner_id,
                name,
                data.description.as_deref(),
                data.color.as_deref().unwrap_or(DEFAULT_COLOR),
            )
            .await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn update(&self, owner_id: Uuid, id: Uuid, data: &UpdateCategory) -> AppResult<Category> {
        data.validate()?;
        let mut category = self.repository.categories.get(owner_id, id).await?;

        if let Some(ref name) = data.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("Category name cannot be empty".to_string()));
            }
            if self.repository.categories.name_exists(owner_id, name, Some(id)).await? {
                return Err(AppError::DuplicateName("Category with this name already exists".to_string()));
            }
            category.name = name.to_string();
        }
        if data.description.is_some() {
            category.description = data.description.clone();
        }
        if let Some(ref color) = data.color {
            category.color = color.clone();
        }

        self.repository.categories.update(&category).await
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        self.repository.categories.delete(owner_id, id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Delete several categories; refused as a whole if any still has items
    pub async fn bulk_delete(&self, owner_id: Uuid, data: &BulkDeleteCategories) -> AppResult<u64> {
        data.validate()?;
        let deleted = self
            .repository
            .categories
            .delete_many(owner_id, &data.category_ids)
            .await?;
        tracing::info!(deleted, "Categories deleted");
        Ok(deleted)
    }
}
