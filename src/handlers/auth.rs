use crate::handlers::common::{created_response, message_response, validate_input};
use crate::{
    auth::TokenPair,
    entities::Role,
    errors::ServiceError,
    services::accounts::RegisterInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Routes that need no bearer token: registration, verification, login and
/// the password reset flow.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-reset-otp", post(verify_reset_otp))
        .route("/reset-password", post(reset_password))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    /// "agent" or "renter/buyer" (historical spellings accepted)
    pub role: String,
    pub phone: Option<String>,
    pub country_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailOnlyRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyResetOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub new_password: String,
}

// Handlers

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    // Historical role spellings are normalized exactly once, here.
    let role = Role::parse(&payload.role)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown role: {}", payload.role)))?;

    state
        .services
        .accounts
        .register(RegisterInput {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role,
            phone: payload.phone,
            country_id: payload.country_id,
        })
        .await?;

    Ok(created_response(serde_json::json!({
        "message": "User created. Check your email for the verification code."
    })))
}

async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .verify_email(&payload.email, &payload.token)
        .await?;

    Ok(message_response("Email verified successfully"))
}

async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailOnlyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let resent = state
        .services
        .accounts
        .resend_verification(&payload.email)
        .await?;

    if resent {
        Ok(message_response(
            "Verification email resent. Please check your inbox.",
        ))
    } else {
        Ok(message_response("Email already verified"))
    }
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    validate_input(&payload)?;

    let tokens = state
        .services
        .accounts
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(tokens))
}

async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    let tokens = state.services.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .auth
        .revoke_refresh_token(&payload.refresh_token)
        .await?;

    Ok(message_response("Logout successful"))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailOnlyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .forgot_password(&payload.email)
        .await?;

    // Same answer whether or not the address is registered.
    Ok(message_response("If the email exists, an OTP has been sent"))
}

async fn verify_reset_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyResetOtpRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .verify_reset_otp(&payload.email, &payload.otp)
        .await?;

    Ok(message_response("OTP verified successfully"))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .accounts
        .reset_password(&payload.email, &payload.new_password)
        .await?;

    Ok(message_response("Password reset successful"))
}
