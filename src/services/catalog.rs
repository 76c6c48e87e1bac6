use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        accessory, booking, booking_item, category, costume,
        status::{BookingStatus, ItemStatus, ItemType},
        Labels,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::rental_rules::validate_amount,
};

/// Runs `$body` against the costume or accessory tables, binding the entity,
/// column and active model names for the chosen catalog.
macro_rules! with_catalog {
    ($item_type:expr, |$entity:ident, $column:ident, $active:ident| $body:expr) => {
        match $item_type {
            ItemType::Costume => {
                #[allow(unused_imports)]
                use crate::entities::costume::{
                    ActiveModel as $active, Column as $column, Entity as $entity,
                };
                $body
            }
            ItemType::Accessory => {
                #[allow(unused_imports)]
                use crate::entities::accessory::{
                    ActiveModel as $active, Column as $column, Entity as $entity,
                };
                $body
            }
        }
    };
}

/// Copies the fields shared by both catalogs from an [`ItemUpdate`].
macro_rules! apply_common {
    ($active:ident, $update:ident) => {
        if let Some(name) = $update.name.clone() {
            $active.name = Set(name);
        }
        if let Some(description) = $update.description.clone() {
            $active.description = Set(Some(description));
        }
        if let Some(category_id) = $update.category_id {
            $active.category_id = Set(category_id);
        }
        if let Some(price) = $update.price_per_day {
            $active.price_per_day = Set(price);
        }
        if let Some(deposit) = $update.security_deposit {
            $active.security_deposit = Set(deposit);
        }
        if let Some(sizes) = $update.sizes.clone() {
            $active.sizes = Set(Labels(sizes));
        }
        if let Some(image_url) = $update.image_url.clone() {
            $active.image_url = Set(Some(image_url));
        }
    };
}

/// A costume or accessory, seen through the fields both catalogs share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_type: ItemType,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    #[schema(value_type = String, example = "25.00")]
    pub price_per_day: Decimal,
    #[schema(value_type = String, example = "50.00")]
    pub security_deposit: Decimal,
    pub sizes: Vec<String>,
    /// Costumes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<String>>,
    /// Accessories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_characters: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    /// Whether `size` is one this item is offered in. Items without sizes accept none.
    pub fn offers_size(&self, size: Option<&str>) -> bool {
        match size {
            None => true,
            Some(size) => self.sizes.iter().any(|s| s == size),
        }
    }
}

impl From<costume::Model> for InventoryItem {
    fn from(model: costume::Model) -> Self {
        Self {
            id: model.id,
            item_type: ItemType::Costume,
            name: model.name,
            description: model.description,
            category_id: model.category_id,
            price_per_day: model.price_per_day,
            security_deposit: model.security_deposit,
            sizes: model.sizes.0,
            themes: Some(model.themes.0),
            linked_characters: None,
            image_url: model.image_url,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<accessory::Model> for InventoryItem {
    fn from(model: accessory::Model) -> Self {
        Self {
            id: model.id,
            item_type: ItemType::Accessory,
            name: model.name,
            description: model.description,
            category_id: model.category_id,
            price_per_day: model.price_per_day,
            security_deposit: model.security_deposit,
            sizes: model.sizes.0,
            themes: None,
            linked_characters: Some(model.linked_characters.0),
            image_url: model.image_url,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Loads one item from the catalog matching `item_type`.
pub async fn find_item<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
) -> Result<Option<InventoryItem>, DbErr>
where
    C: ConnectionTrait,
{
    with_catalog!(item_type, |Items, Col, Active| {
        Ok(Items::find_by_id(item_id)
            .one(conn)
            .await?
            .map(InventoryItem::from))
    })
}

/// Loads one item and holds an exclusive lock on its row (`SELECT ... FOR UPDATE`)
/// until the surrounding transaction ends. SQLite has no row locks and relies on
/// its database-level write lock instead.
pub async fn lock_item<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
) -> Result<Option<InventoryItem>, DbErr>
where
    C: ConnectionTrait,
{
    with_catalog!(item_type, |Items, Col, Active| {
        Ok(Items::find_by_id(item_id)
            .lock_exclusive()
            .one(conn)
            .await?
            .map(InventoryItem::from))
    })
}

/// Sets an item's status, returning its previous status, or `None` when the item
/// does not exist. Writing the current status again is a no-op.
pub async fn update_item_status<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
    status: ItemStatus,
) -> Result<Option<ItemStatus>, DbErr>
where
    C: ConnectionTrait,
{
    with_catalog!(item_type, |Items, Col, Active| {
        let Some(model) = Items::find_by_id(item_id).one(conn).await? else {
            return Ok(None);
        };
        let previous = model.status;
        if previous != status {
            let mut active: Active = model.into();
            active.status = Set(status);
            active.update(conn).await?;
        }
        Ok(Some(previous))
    })
}

/// Active bookings that reference `(item_type, item_id)`.
pub async fn active_bookings_for_item<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
) -> Result<Vec<booking::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let booking_ids: Vec<Uuid> = booking_item::Entity::find()
        .filter(booking_item::Column::ItemId.eq(item_id))
        .filter(booking_item::Column::ItemType.eq(item_type))
        .all(conn)
        .await?
        .into_iter()
        .map(|line| line.booking_id)
        .collect();

    if booking_ids.is_empty() {
        return Ok(Vec::new());
    }

    booking::Entity::find()
        .filter(booking::Column::Id.is_in(booking_ids))
        .filter(booking::Column::Status.eq(BookingStatus::Active))
        .all(conn)
        .await
}

/// Input for a new costume or accessory.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ItemDraft {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub category_id: Uuid,
    #[validate(custom = "validate_amount")]
    #[schema(value_type = String, example = "25.00")]
    pub price_per_day: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    #[schema(value_type = String, example = "50.00")]
    pub security_deposit: Decimal,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Costumes only
    #[serde(default)]
    pub themes: Vec<String>,
    /// Accessories only
    #[serde(default)]
    pub linked_characters: Vec<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Partial update for a catalog item. Status has its own endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ItemUpdate {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(custom = "validate_amount")]
    #[schema(value_type = Option<String>)]
    pub price_per_day: Option<Decimal>,
    #[validate(custom = "validate_amount")]
    #[schema(value_type = Option<String>)]
    pub security_deposit: Option<Decimal>,
    pub sizes: Option<Vec<String>>,
    pub themes: Option<Vec<String>>,
    pub linked_characters: Option<Vec<String>>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category_id: Option<Uuid>,
    pub status: Option<ItemStatus>,
    pub search: Option<String>,
}

/// Costume and accessory CRUD plus direct status edits.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self), fields(item_id = %item_id, item_type = %item_type))]
    pub async fn get_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<InventoryItem, ServiceError> {
        find_item(&*self.db_pool, item_type, item_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load catalog item");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| not_found(item_type, item_id))
    }

    /// Lists one catalog ordered by name. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        item_type: ItemType,
        filter: ItemFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<InventoryItem>, u64), ServiceError> {
        let db = &*self.db_pool;
        let page = page.max(1);
        let per_page = per_page.max(1);

        let result: Result<(Vec<InventoryItem>, u64), DbErr> =
            with_catalog!(item_type, |Items, Col, Active| {
                let mut query = Items::find();
                if let Some(category_id) = filter.category_id {
                    query = query.filter(Col::CategoryId.eq(category_id));
                }
                if let Some(status) = filter.status {
                    query = query.filter(Col::Status.eq(status));
                }
                if let Some(search) = filter.search.as_deref().map(str::trim) {
                    if !search.is_empty() {
                        query = query.filter(Col::Name.contains(search));
                    }
                }

                let paginator = query.order_by_asc(Col::Name).paginate(db, per_page);
                match paginator.num_items().await {
                    Ok(total) => paginator
                        .fetch_page(page - 1)
                        .await
                        .map(|rows| (rows.into_iter().map(InventoryItem::from).collect(), total)),
                    Err(e) => Err(e),
                }
            });

        result.map_err(|e| {
            error!(error = %e, "Failed to list catalog items");
            ServiceError::DatabaseError(e)
        })
    }

    #[instrument(skip(self, draft), fields(item_type = %item_type, name = %draft.name))]
    pub async fn create_item(
        &self,
        item_type: ItemType,
        draft: ItemDraft,
    ) -> Result<InventoryItem, ServiceError> {
        draft.validate()?;
        check_tags_match(
            item_type,
            !draft.themes.is_empty(),
            !draft.linked_characters.is_empty(),
        )?;

        let db = &*self.db_pool;
        ensure_category(db, draft.category_id, item_type).await?;

        let created: InventoryItem = match item_type {
            ItemType::Costume => costume::ActiveModel {
                name: Set(draft.name),
                description: Set(draft.description),
                category_id: Set(draft.category_id),
                price_per_day: Set(draft.price_per_day),
                security_deposit: Set(draft.security_deposit),
                sizes: Set(Labels(draft.sizes)),
                themes: Set(Labels(draft.themes)),
                image_url: Set(draft.image_url),
                ..Default::default()
            }
            .insert(db)
            .await
            .map(InventoryItem::from),
            ItemType::Accessory => accessory::ActiveModel {
                name: Set(draft.name),
                description: Set(draft.description),
                category_id: Set(draft.category_id),
                price_per_day: Set(draft.price_per_day),
                security_deposit: Set(draft.security_deposit),
                sizes: Set(Labels(draft.sizes)),
                linked_characters: Set(Labels(draft.linked_characters)),
                image_url: Set(draft.image_url),
                ..Default::default()
            }
            .insert(db)
            .await
            .map(InventoryItem::from),
        }
        .map_err(|e| {
            error!(error = %e, "Failed to insert catalog item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id = %created.id, item_type = %item_type, "Catalog item created");
        Ok(created)
    }

    #[instrument(skip(self, update), fields(item_id = %item_id, item_type = %item_type))]
    pub async fn update_item(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        update: ItemUpdate,
    ) -> Result<InventoryItem, ServiceError> {
        update.validate()?;
        check_tags_match(
            item_type,
            update.themes.is_some(),
            update.linked_characters.is_some(),
        )?;

        let db = &*self.db_pool;
        if let Some(category_id) = update.category_id {
            ensure_category(db, category_id, item_type).await?;
        }

        let updated: Result<Option<InventoryItem>, DbErr> = match item_type {
            ItemType::Costume => match costume::Entity::find_by_id(item_id).one(db).await {
                Ok(Some(model)) => {
                    let mut active: costume::ActiveModel = model.into();
                    apply_common!(active, update);
                    if let Some(themes) = update.themes {
                        active.themes = Set(Labels(themes));
                    }
                    active.update(db).await.map(|m| Some(InventoryItem::from(m)))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            },
            ItemType::Accessory => match accessory::Entity::find_by_id(item_id).one(db).await {
                Ok(Some(model)) => {
                    let mut active: accessory::ActiveModel = model.into();
                    apply_common!(active, update);
                    if let Some(characters) = update.linked_characters {
                        active.linked_characters = Set(Labels(characters));
                    }
                    active.update(db).await.map(|m| Some(InventoryItem::from(m)))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            },
        };

        let item = updated
            .map_err(|e| {
                error!(error = %e, "Failed to update catalog item");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| not_found(item_type, item_id))?;

        info!("Catalog item updated");
        Ok(item)
    }

    /// Admin edit of an item's physical status (e.g. back from cleaning).
    #[instrument(skip(self), fields(item_id = %item_id, item_type = %item_type, status = %status))]
    pub async fn set_status(
        &self,
        item_type: ItemType,
        item_id: Uuid,
        status: ItemStatus,
    ) -> Result<InventoryItem, ServiceError> {
        let db = &*self.db_pool;
        let previous = update_item_status(db, item_type, item_id, status)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update item status");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| not_found(item_type, item_id))?;

        if previous != status {
            info!(old_status = %previous, "Item status changed");
            if let Some(event_sender) = &self.event_sender {
                event_sender
                    .send_or_log(Event::ItemStatusChanged {
                        item_id,
                        item_type,
                        old_status: previous,
                        new_status: status,
                    })
                    .await;
            }
        }

        self.get_item(item_type, item_id).await
    }

    /// Deletes an item unless an active booking still references it.
    #[instrument(skip(self), fields(item_id = %item_id, item_type = %item_type))]
    pub async fn delete_item(&self, item_type: ItemType, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            ServiceError::DatabaseError(e)
        })?;

        let item = find_item(&txn, item_type, item_id)
            .await?
            .ok_or_else(|| not_found(item_type, item_id))?;

        let active = active_bookings_for_item(&txn, item_type, item_id).await?;
        if !active.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "{} is referenced by {} active booking(s)",
                item.name,
                active.len()
            )));
        }

        let result = with_catalog!(item_type, |Items, Col, Active| {
            Items::delete_by_id(item_id).exec(&txn).await
        });
        result.map_err(|e| {
            error!(error = %e, "Failed to delete catalog item");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit item deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!("Catalog item deleted");
        Ok(())
    }
}

fn not_found(item_type: ItemType, item_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{} {} not found", item_type, item_id))
}

fn check_tags_match(
    item_type: ItemType,
    has_themes: bool,
    has_characters: bool,
) -> Result<(), ServiceError> {
    match item_type {
        ItemType::Costume if has_characters => Err(ServiceError::ValidationError(
            "linked_characters: only applies to accessories".to_string(),
        )),
        ItemType::Accessory if has_themes => Err(ServiceError::ValidationError(
            "themes: only applies to costumes".to_string(),
        )),
        _ => Ok(()),
    }
}

/// The category must exist and be of the same type as the item.
async fn ensure_category<C>(
    conn: &C,
    category_id: Uuid,
    item_type: ItemType,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let category = category::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "category_id: category {} does not exist",
                category_id
            ))
        })?;

    if category.category_type != item_type {
        return Err(ServiceError::ValidationError(format!(
            "category_id: {} is a {} category, expected {}",
            category.name, category.category_type, item_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_item(sizes: &[&str]) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            item_type: ItemType::Costume,
            name: "Vampire Cape".into(),
            description: None,
            category_id: Uuid::new_v4(),
            price_per_day: dec!(15),
            security_deposit: dec!(40),
            sizes: sizes.iter().map(|s| s.to_string()).collect(),
            themes: Some(vec!["halloween".into()]),
            linked_characters: None,
            image_url: None,
            status: ItemStatus::Available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn size_must_be_one_the_item_offers() {
        let item = sample_item(&["S", "M"]);
        assert!(item.offers_size(None));
        assert!(item.offers_size(Some("M")));
        assert!(!item.offers_size(Some("XL")));
        assert!(!sample_item(&[]).offers_size(Some("M")));
    }

    #[test]
    fn tag_lists_must_match_the_catalog() {
        assert!(check_tags_match(ItemType::Costume, true, false).is_ok());
        assert!(check_tags_match(ItemType::Costume, false, true).is_err());
        assert!(check_tags_match(ItemType::Accessory, false, true).is_ok());
        assert!(check_tags_match(ItemType::Accessory, true, false).is_err());
    }

    #[test]
    fn draft_rejects_negative_prices() {
        let draft = ItemDraft {
            name: "Witch Hat".into(),
            description: None,
            category_id: Uuid::new_v4(),
            price_per_day: dec!(-1),
            security_deposit: dec!(0),
            sizes: vec![],
            themes: vec![],
            linked_characters: vec![],
            image_url: None,
        };
        let err = ServiceError::from(draft.validate().unwrap_err());
        assert!(err.to_string().contains("price_per_day"));
    }

    #[test]
    fn serialized_item_only_carries_its_own_tag_list() {
        let json = serde_json::to_value(sample_item(&["M"])).unwrap();
        assert!(json.get("themes").is_some());
        assert!(json.get("linked_characters").is_none());
        assert_eq!(json["item_type"], "costume");
    }
}
