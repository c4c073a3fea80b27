use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{auth::AuthUser, errors::ServiceError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub fn enquiries_routes() -> Router<AppState> {
    Router::new()
        .route("/received", get(received_enquiries))
        .route("/sent", get(sent_enquiries))
        .route("/:id", post(make_enquiry))
        .route("/:id/reply", post(reply_to_enquiry))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MakeEnquiryRequest {
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplyRequest {
    #[validate(length(min = 1, message = "Reply message is required"))]
    pub reply: String,
}

async fn make_enquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listing_id): Path<Uuid>,
    Json(payload): Json<MakeEnquiryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let enquiry = state
        .services
        .enquiries
        .make_enquiry(&user, listing_id, payload.message)
        .await?;

    Ok(created_response(serde_json::json!({
        "message": "Enquiry submitted successfully",
        "enquiry": enquiry,
    })))
}

async fn reply_to_enquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(enquiry_id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let enquiry = state
        .services
        .enquiries
        .reply(&user, enquiry_id, payload.reply)
        .await?;

    Ok(success_response(serde_json::json!({
        "message": "Reply sent and saved successfully",
        "enquiry": enquiry,
    })))
}

async fn received_enquiries(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let enquiries = state.services.enquiries.received(&user).await?;
    Ok(success_response(
        serde_json::json!({ "enquiries": enquiries }),
    ))
}

async fn sent_enquiries(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let enquiries = state.services.enquiries.sent(&user).await?;
    Ok(success_response(
        serde_json::json!({ "enquiries": enquiries }),
    ))
}
