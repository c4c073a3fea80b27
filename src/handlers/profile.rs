use crate::handlers::common::{message_response, success_response, validate_input};
use crate::{
    auth::AuthUser, errors::ServiceError, services::accounts::UpdateProfileInput, AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/", put(update_profile))
        .route("/change-password", post(change_password))
}

/// Editable profile fields. Names and role are not changeable here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub phone: Option<String>,
    pub country_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub new_password: String,
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.accounts.get_profile(&user).await?;
    Ok(success_response(view))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state
        .services
        .accounts
        .update_profile(
            &user,
            UpdateProfileInput {
                phone: payload.phone,
                country_id: payload.country_id,
            },
        )
        .await?;

    Ok(success_response(view))
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .change_password(&user, &payload.new_password)
        .await?;

    Ok(message_response("Password changed successfully"))
}
