use crate::handlers::common::{created_response, message_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::ListingKind,
    errors::ServiceError,
    services::listings::{CreateListingInput, ListingFilters, UpdateListingInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn listings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(browse_listings))
        .route("/", post(create_listing))
        .route("/mine", get(my_listings))
        .route("/mine/:id", get(my_listing))
        .route("/:id", put(update_listing))
        .route("/:id", delete(delete_listing))
}

pub fn admin_listings_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/restore", patch(restore_listing))
        .route("/:id/purge", delete(purge_listing))
}

// Request DTOs

/// Browse filters. Raw strings are normalized here: blanks are dropped and
/// an unparsable kind or price bound is ignored rather than rejected.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListingFilterParams {
    pub kind: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
}

impl ListingFilterParams {
    fn into_filters(self) -> ListingFilters {
        ListingFilters {
            kind: self
                .kind
                .as_deref()
                .map(str::trim)
                .and_then(|raw| ListingKind::from_str(raw).ok()),
            country: normalize(self.country),
            state: normalize(self.state),
            location: normalize(self.location),
            min_price: parse_price(self.min_price),
            max_price: parse_price(self.max_price),
            search: normalize(self.search),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_price(value: Option<String>) -> Option<Decimal> {
    value.and_then(|raw| Decimal::from_str(raw.trim()).ok())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 50))]
    pub title: String,
    pub kind: ListingKind,
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub country: String,
    #[validate(length(min = 1, max = 300))]
    pub location: String,
    #[validate(range(min = 0))]
    pub bedrooms: i32,
    #[validate(range(min = 0))]
    pub bathrooms: i32,
    /// Size in square meters
    #[validate(range(min = 1))]
    pub area_sqm: i32,
    pub price: Decimal,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
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

// Handlers

/// Browse listings with optional filters
#[utoipa::path(
    get,
    path = "/api/v1/listings",
    params(ListingFilterParams),
    responses(
        (status = 200, description = "Matching listings"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn browse_listings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListingFilterParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let listings = state
        .services
        .listings
        .search(&user, params.into_filters())
        .await?;

    Ok(success_response(listings))
}

/// Create a listing (agents only)
#[utoipa::path(
    post,
    path = "/api/v1/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created"),
        (status = 403, description = "Caller is not an agent", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let listing = state
        .services
        .listings
        .create(
            &user,
            CreateListingInput {
                title: payload.title,
                kind: payload.kind,
                description: payload.description,
                state: payload.state,
                country: payload.country,
                location: payload.location,
                bedrooms: payload.bedrooms,
                bathrooms: payload.bathrooms,
                area_sqm: payload.area_sqm,
                price: payload.price,
                is_published: payload.is_published,
            },
        )
        .await?;

    Ok(created_response(listing))
}

async fn my_listings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let listings = state.services.listings.my_listings(&user).await?;
    Ok(success_response(
        serde_json::json!({ "listings": listings }),
    ))
}

async fn my_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let listing = state.services.listings.my_listing(&user, id).await?;
    Ok(success_response(serde_json::json!({ "listing": listing })))
}

async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let listing = state
        .services
        .listings
        .update(
            &user,
            id,
            UpdateListingInput {
                title: payload.title,
                kind: payload.kind,
                description: payload.description,
                state: payload.state,
                country: payload.country,
                location: payload.location,
                bedrooms: payload.bedrooms,
                bathrooms: payload.bathrooms,
                area_sqm: payload.area_sqm,
                price: payload.price,
                is_published: payload.is_published,
            },
        )
        .await?;

    Ok(success_response(serde_json::json!({
        "message": "Listing updated",
        "listing": listing,
    })))
}

async fn delete_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.listings.soft_delete(&user, id).await?;
    Ok(no_content_response())
}

async fn restore_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.listings.restore(id).await?;
    Ok(message_response("Listing restored successfully"))
}

async fn purge_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.listings.purge(id).await?;
    Ok(no_content_response())
}
