use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        accessory, category, costume,
        status::ItemType,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryDraft {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub category_type: ItemType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        category_type: Option<ItemType>,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = category::Entity::find();
        if let Some(category_type) = category_type {
            query = query.filter(category::Column::CategoryType.eq(category_type));
        }

        query
            .order_by_asc(category::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list categories");
                ServiceError::DatabaseError(e)
            })
    }

    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn get_category(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_category(
        &self,
        draft: CategoryDraft,
    ) -> Result<category::Model, ServiceError> {
        draft.validate()?;

        let created = category::ActiveModel {
            name: Set(draft.name),
            description: Set(draft.description),
            category_type: Set(draft.category_type),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert category");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %created.id, "Category created");
        Ok(created)
    }

    /// Renames or re-describes a category. The type is fixed once items may reference it.
    #[instrument(skip(self, update), fields(category_id = %category_id))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        update: CategoryUpdate,
    ) -> Result<category::Model, ServiceError> {
        update.validate()?;

        let existing = self.get_category(category_id).await?;
        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }

        active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to update category");
            ServiceError::DatabaseError(e)
        })
    }

    /// Deletes a category that no costume or accessory references.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get_category(category_id).await?;

        let in_use = match existing.category_type {
            ItemType::Costume => {
                costume::Entity::find()
                    .filter(costume::Column::CategoryId.eq(category_id))
                    .count(db)
                    .await?
            }
            ItemType::Accessory => {
                accessory::Entity::find()
                    .filter(accessory::Column::CategoryId.eq(category_id))
                    .count(db)
                    .await?
            }
        };

        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} is used by {} item(s)",
                existing.name, in_use
            )));
        }

        category::Entity::delete_by_id(category_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete category");
                ServiceError::DatabaseError(e)
            })?;

        info!("Category deleted");
        Ok(())
    }
}
