use crate::handlers::common::{created_response, message_response, success_response};
use crate::{auth::AuthUser, errors::ServiceError, services::carts::RemoveOutcome, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items/:listing_id", post(add_to_cart))
        .route("/items/:listing_id", delete(remove_from_cart))
}

/// Get the caller's cart with items and total
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart with items and total"),
        (status = 404, description = "Caller has no cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

/// Add a listing to the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/items/{listing_id}",
    params(("listing_id" = Uuid, Path, description = "Listing to add")),
    responses(
        (status = 201, description = "Listing added to cart"),
        (status = 404, description = "Listing not active and published", body = crate::errors::ErrorResponse),
        (status = 409, description = "Listing already in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .carts
        .add_item(user.user_id, listing_id)
        .await?;

    Ok(created_response(serde_json::json!({
        "message": "Listing added to cart"
    })))
}

/// Remove a listing from the caller's cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{listing_id}",
    params(("listing_id" = Uuid, Path, description = "Listing to remove")),
    responses(
        (status = 200, description = "Listing removed; the cart is deleted when it empties"),
        (status = 404, description = "No cart or listing not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state
        .services
        .carts
        .remove_item(user.user_id, listing_id)
        .await?;

    match outcome {
        RemoveOutcome::RemovedAndCartDeleted => Ok(message_response(
            "Listing removed. Cart is now empty and deleted.",
        )),
        RemoveOutcome::Removed => Ok(message_response("Listing removed from cart")),
    }
}
