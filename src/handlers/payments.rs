use crate::handlers::common::success_response;
use crate::{auth::AuthUser, errors::ServiceError, AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Authenticated payment routes.
pub fn payments_routes() -> Router<AppState> {
    Router::new().route("/initialize", post(initialize_payment))
}

/// Verify is deliberately outside the auth layer: the gateway redirects the
/// buyer's browser here with only the reference, and the reference is not
/// bound to a caller.
pub fn payment_verify_routes() -> Router<AppState> {
    Router::new().route("/verify", get(verify_payment))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyParams {
    pub reference: Option<String>,
}

/// Start checkout for the caller's unpaid cart
#[utoipa::path(
    post,
    path = "/api/v1/payments/initialize",
    responses(
        (status = 200, description = "Hosted checkout session created"),
        (status = 400, description = "Gateway declined; body passed through verbatim"),
        (status = 404, description = "Cart not found or already paid", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unreachable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initialize_payment(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let initialized = state.services.payments.initialize(&user).await?;
    Ok(success_response(initialized))
}

/// Confirm a transaction by reference
#[utoipa::path(
    get,
    path = "/api/v1/payments/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Payment verified; cart paid and listings deactivated"),
        (status = 400, description = "Verification failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "No payment for this reference", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let reference = params
        .reference
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ServiceError::ValidationError("Reference not provided".to_string()))?;

    state.services.payments.verify(reference.trim()).await?;

    Ok(success_response(serde_json::json!({
        "message": "Payment verified successfully"
    })))
}
