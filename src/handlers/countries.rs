use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{
    errors::ServiceError,
    services::countries::{CreateCountryInput, UpdateCountryInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Public country listing.
pub fn countries_routes() -> Router<AppState> {
    Router::new().route("/", get(list_countries))
}

/// Staff-only country maintenance.
pub fn admin_countries_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_country))
        .route("/:id", put(update_country))
        .route("/:id", patch(update_country))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCountryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 10))]
    pub code: String,
    #[validate(length(min = 1, max = 10))]
    pub currency_code: String,
    #[validate(length(min = 1, max = 5))]
    pub currency_symbol: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCountryRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
}

async fn list_countries(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let countries = state.services.countries.list().await?;
    Ok(success_response(countries))
}

async fn create_country(
    State(state): State<AppState>,
    Json(payload): Json<CreateCountryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let country = state
        .services
        .countries
        .create(CreateCountryInput {
            name: payload.name,
            code: payload.code,
            currency_code: payload.currency_code,
            currency_symbol: payload.currency_symbol,
        })
        .await?;

    Ok(created_response(country))
}

async fn update_country(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCountryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let country = state
        .services
        .countries
        .update(
            id,
            UpdateCountryInput {
                name: payload.name,
                code: payload.code,
                currency_code: payload.currency_code,
                currency_symbol: payload.currency_symbol,
            },
        )
        .await?;

    Ok(success_response(country))
}
