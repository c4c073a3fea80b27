//! realty-api library
//!
//! Marketplace backend: listings, enquiries, per-user carts and a
//! gateway-backed checkout.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod notifications;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;

use auth::AuthRouterExt;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
}

/// Full v1 API surface.
///
/// Bearer auth everywhere except the account flows, the public country
/// listing and payment verify (the gateway redirect carries no token).
pub fn api_v1_routes() -> Router<AppState> {
    let open = Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/countries", handlers::countries::countries_routes())
        .nest("/payments", handlers::payments::payment_verify_routes());

    let authenticated = Router::new()
        .nest("/profile", handlers::profile::profile_routes())
        .nest("/listings", handlers::listings::listings_routes())
        .nest("/cart", handlers::carts::carts_routes())
        .nest("/payments", handlers::payments::payments_routes())
        .with_auth();

    let renter_buyer = Router::new()
        .nest("/enquiries", handlers::enquiries::enquiries_routes())
        .with_auth();

    let staff = Router::new()
        .nest("/listings", handlers::listings::admin_listings_routes())
        .nest("/countries", handlers::countries::admin_countries_routes())
        .with_staff();

    // Role checks inside the enquiry/listing services are finer-grained than
    // the router layer (agents reply, renters/buyers ask), so those routers
    // only require authentication here.
    open.merge(authenticated).merge(renter_buyer).merge(staff)
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "status": "ok",
        "service": "realty-api",
        "version": version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
