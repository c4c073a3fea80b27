use crate::{
    auth::AuthUser,
    entities::{listing, Listing, ListingKind, ListingModel, Role},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Search filters for the public browse endpoint. Values are normalized at
/// the handler boundary; an absent field applies no constraint.
#[derive(Debug, Default)]
pub struct ListingFilters {
    pub kind: Option<ListingKind>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
}

/// Fields for a new listing.
#[derive(Debug)]
pub struct CreateListingInput {
    pub title: String,
    pub kind: ListingKind,
    pub description: String,
    pub state: String,
    pub country: String,
    pub location: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqm: i32,
    pub price: Decimal,
    pub is_published: bool,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Default)]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub kind: Option<ListingKind>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub location: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqm: Option<i32>,
    pub price: Option<Decimal>,
    pub is_published: Option<bool>,
}

#[derive(Clone)]
pub struct ListingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ListingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Browse listings. Staff see everything; everyone else sees only
    /// active, published listings.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.user_id))]
    pub async fn search(
        &self,
        viewer: &AuthUser,
        filters: ListingFilters,
    ) -> Result<Vec<ListingModel>, ServiceError> {
        let mut query = Listing::find();

        if !viewer.is_staff {
            query = query
                .filter(listing::Column::IsActive.eq(true))
                .filter(listing::Column::IsPublished.eq(true));
        }

        if let Some(kind) = filters.kind {
            query = query.filter(listing::Column::Kind.eq(kind));
        }
        if let Some(country) = filters.country {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(listing::Column::Country)))
                    .eq(country.to_lowercase()),
            );
        }
        if let Some(state) = filters.state {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(listing::Column::State)))
                    .eq(state.to_lowercase()),
            );
        }
        if let Some(location) = filters.location {
            query = query.filter(listing::Column::Location.contains(&location));
        }
        if let Some(min_price) = filters.min_price {
            query = query.filter(listing::Column::Price.gte(min_price));
        }
        if let Some(max_price) = filters.max_price {
            query = query.filter(listing::Column::Price.lte(max_price));
        }
        if let Some(search) = filters.search {
            query = query.filter(
                Condition::any()
                    .add(listing::Column::Title.contains(&search))
                    .add(listing::Column::Description.contains(&search)),
            );
        }

        Ok(query
            .order_by_desc(listing::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Active listings assigned to the calling agent, newest first.
    pub async fn my_listings(&self, caller: &AuthUser) -> Result<Vec<ListingModel>, ServiceError> {
        caller.require_role(Role::Agent, "view their listings")?;

        Ok(Listing::find()
            .filter(listing::Column::AgentId.eq(caller.user_id))
            .filter(listing::Column::IsActive.eq(true))
            .order_by_desc(listing::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// One of the calling agent's active listings.
    pub async fn my_listing(
        &self,
        caller: &AuthUser,
        listing_id: Uuid,
    ) -> Result<ListingModel, ServiceError> {
        Listing::find_by_id(listing_id)
            .filter(listing::Column::AgentId.eq(caller.user_id))
            .filter(listing::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))
    }

    /// Creates a listing owned by and assigned to the calling agent.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create(
        &self,
        caller: &AuthUser,
        input: CreateListingInput,
    ) -> Result<ListingModel, ServiceError> {
        caller.require_role(Role::Agent, "post listings")?;

        let row = listing::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(caller.user_id),
            agent_id: Set(caller.user_id),
            title: Set(input.title),
            kind: Set(input.kind),
            description: Set(input.description),
            state: Set(input.state),
            country: Set(input.country),
            location: Set(input.location),
            bedrooms: Set(input.bedrooms),
            bathrooms: Set(input.bathrooms),
            area_sqm: Set(input.area_sqm),
            price: Set(input.price),
            is_published: Set(input.is_published),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };
        let created = row.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ListingCreated(created.id))
            .await;

        info!("Created listing {}", created.id);
        Ok(created)
    }

    /// Partial update by the listing's agent.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn update(
        &self,
        caller: &AuthUser,
        listing_id: Uuid,
        input: UpdateListingInput,
    ) -> Result<ListingModel, ServiceError> {
        let found = Listing::find_by_id(listing_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        if found.agent_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "You can only update your own listings".to_string(),
            ));
        }

        let mut active: listing::ActiveModel = found.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(kind) = input.kind {
            active.kind = Set(kind);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(state) = input.state {
            active.state = Set(state);
        }
        if let Some(country) = input.country {
            active.country = Set(country);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        if let Some(bedrooms) = input.bedrooms {
            active.bedrooms = Set(bedrooms);
        }
        if let Some(bathrooms) = input.bathrooms {
            active.bathrooms = Set(bathrooms);
        }
        if let Some(area_sqm) = input.area_sqm {
            active.area_sqm = Set(area_sqm);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(is_published) = input.is_published {
            active.is_published = Set(is_published);
        }

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ListingUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Soft delete by the listing's agent: the row stays, unpublished and
    /// inactive.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn soft_delete(
        &self,
        caller: &AuthUser,
        listing_id: Uuid,
    ) -> Result<(), ServiceError> {
        let found = Listing::find_by_id(listing_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        if found.agent_id != caller.user_id {
            return Err(ServiceError::Forbidden(
                "You can only delete your own listings".to_string(),
            ));
        }

        let mut active: listing::ActiveModel = found.into();
        active.is_active = Set(false);
        active.is_published = Set(false);
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ListingDeactivated(listing_id))
            .await;

        Ok(())
    }

    /// Staff-only: reactivate and republish a soft-deleted listing.
    pub async fn restore(&self, listing_id: Uuid) -> Result<ListingModel, ServiceError> {
        let found = Listing::find_by_id(listing_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        if found.is_active {
            return Err(ServiceError::ValidationError(
                "Listing is already active".to_string(),
            ));
        }

        let mut active: listing::ActiveModel = found.into();
        active.is_active = Set(true);
        active.is_published = Set(true);
        let restored = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ListingRestored(listing_id))
            .await;

        Ok(restored)
    }

    /// Staff-only: remove the row permanently.
    pub async fn purge(&self, listing_id: Uuid) -> Result<(), ServiceError> {
        let found = Listing::find_by_id(listing_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Listing not found".to_string()))?;

        found.delete(&*self.db).await?;
        Ok(())
    }
}
