//! Shared integration-test harness: application state over an in-memory
//! SQLite database, a wiremock payment gateway and an in-memory mailer.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseBackend as DbBackend, Set, Statement};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use realty_api::{
    auth::{AuthConfig, AuthService, Claims},
    config::{AppConfig, GatewayConfig, MailConfig},
    db::{self, DbConfig},
    entities::{listing, profile, user, ListingKind, ListingModel, Role, UserModel},
    events::{self, EventSender},
    gateway::{PaymentGateway, PaystackGateway},
    notifications::{InMemoryMailer, Mailer},
    services::AppServices,
    AppState,
};

pub const GATEWAY_SECRET: &str = "sk_test_harness";

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database. Each instance is fully isolated, so tests can run in
/// parallel.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway_server: MockServer,
    pub mailer: Arc<InMemoryMailer>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let gateway_server = MockServer::start().await;

        let cfg = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            jwt_expiration: 3600,
            refresh_token_expiration: 86_400,
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "warn".to_string(),
            log_json: false,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
            gateway: GatewayConfig {
                secret_key: GATEWAY_SECRET.to_string(),
                base_url: gateway_server.uri(),
                callback_url: "https://app.example.com/checkout/complete".to_string(),
            },
            mail: MailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 1025,
                smtp_username: "test".to_string(),
                smtp_password: "test".to_string(),
                from_email: "no-reply@example.com".to_string(),
                from_name: "Realty Team".to_string(),
            },
        };

        // A single pooled connection keeps every query on the same
        // in-memory database.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        create_schema(&pool).await;

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig {
            jwt_secret: cfg.jwt_secret.clone(),
            issuer: "realty-auth".to_string(),
            audience: "realty-api".to_string(),
            access_token_ttl: Duration::from_secs(cfg.jwt_expiration),
            refresh_token_ttl: Duration::from_secs(cfg.refresh_token_expiration),
        };
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let gateway: Arc<dyn PaymentGateway> = Arc::new(PaystackGateway::new(&cfg.gateway));
        let mailer = Arc::new(InMemoryMailer::new());
        let mailer_dyn: Arc<dyn Mailer> = mailer.clone();

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
            gateway,
            mailer_dyn,
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let api_router = realty_api::api_v1_routes().layer(middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: Request<Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ));

        let router = Router::new()
            .nest("/api/v1", api_router)
            .with_state(state.clone());

        Self {
            router,
            state,
            gateway_server,
            mailer,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Inserts a verified user (and profile when a role is given) and mints
    /// an access token for it.
    pub async fn seed_user(
        &self,
        email: &str,
        role: Option<Role>,
        is_staff: bool,
    ) -> (UserModel, String) {
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(String::new()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            is_staff: Set(is_staff),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };
        let account = account
            .insert(&*self.state.db)
            .await
            .expect("seed user for tests");

        if let Some(role) = role {
            let row = profile::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(account.id),
                role: Set(role),
                phone: Set(None),
                country_id: Set(None),
                is_email_verified: Set(true),
                created_at: Set(Utc::now()),
            };
            row.insert(&*self.state.db)
                .await
                .expect("seed profile for tests");
        }

        let token = self.token_for(&account, role);
        (account, token)
    }

    pub async fn seed_agent(&self, email: &str) -> (UserModel, String) {
        self.seed_user(email, Some(Role::Agent), false).await
    }

    pub async fn seed_buyer(&self, email: &str) -> (UserModel, String) {
        self.seed_user(email, Some(Role::RenterBuyer), false).await
    }

    pub async fn seed_staff(&self, email: &str) -> (UserModel, String) {
        self.seed_user(email, None, true).await
    }

    /// Mints an access token the way the auth service does.
    pub fn token_for(&self, account: &UserModel, role: Option<Role>) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role,
            staff: account.is_staff,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iss: "realty-auth".to_string(),
            aud: "realty-api".to_string(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.state.config.jwt_secret.as_bytes()),
        )
        .expect("encode access token")
    }

    /// Inserts an active, published sale listing for the agent.
    pub async fn seed_listing(
        &self,
        agent: &UserModel,
        title: &str,
        price: Decimal,
    ) -> ListingModel {
        self.seed_listing_with_flags(agent, title, price, true, true)
            .await
    }

    pub async fn seed_listing_with_flags(
        &self,
        agent: &UserModel,
        title: &str,
        price: Decimal,
        is_published: bool,
        is_active: bool,
    ) -> ListingModel {
        let row = listing::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(agent.id),
            agent_id: Set(agent.id),
            title: Set(title.to_string()),
            kind: Set(ListingKind::Sale),
            description: Set(format!("Seeded listing: {}", title)),
            state: Set("Lagos".to_string()),
            country: Set("Nigeria".to_string()),
            location: Set("Lekki Phase 1".to_string()),
            bedrooms: Set(3),
            bathrooms: Set(2),
            area_sqm: Set(120),
            price: Set(price),
            is_published: Set(is_published),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
        };

        row.insert(&*self.state.db)
            .await
            .expect("seed listing for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Parse a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Migration mechanics are out of scope; tests create the schema directly.
async fn create_schema(pool: &sea_orm::DatabaseConnection) {
    let ddl = [
        r#"CREATE TABLE users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            is_staff INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE profiles (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE REFERENCES users (id),
            role TEXT NOT NULL,
            phone TEXT,
            country_id TEXT,
            is_email_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE countries (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL UNIQUE,
            code TEXT NOT NULL UNIQUE,
            currency_code TEXT NOT NULL,
            currency_symbol TEXT NOT NULL
        );"#,
        r#"CREATE TABLE listings (
            id TEXT PRIMARY KEY NOT NULL,
            owner_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            state TEXT NOT NULL,
            country TEXT NOT NULL,
            location TEXT NOT NULL,
            bedrooms INTEGER NOT NULL,
            bathrooms INTEGER NOT NULL,
            area_sqm INTEGER NOT NULL,
            price REAL NOT NULL,
            is_published INTEGER NOT NULL,
            is_active INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE enquiries (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES users (id),
            listing_id TEXT NOT NULL REFERENCES listings (id),
            message TEXT NOT NULL,
            reply TEXT,
            created_at TEXT NOT NULL,
            replied_at TEXT
        );"#,
        r#"CREATE TABLE carts (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE REFERENCES users (id),
            is_paid INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE cart_items (
            id TEXT PRIMARY KEY NOT NULL,
            cart_id TEXT NOT NULL REFERENCES carts (id),
            listing_id TEXT NOT NULL REFERENCES listings (id),
            added_at TEXT NOT NULL,
            UNIQUE (cart_id, listing_id)
        );"#,
        r#"CREATE TABLE payments (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES users (id),
            cart_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            reference TEXT NOT NULL UNIQUE,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE email_verification_tokens (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE REFERENCES users (id),
            token TEXT NOT NULL,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE password_reset_otps (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES users (id),
            otp TEXT NOT NULL,
            is_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );"#,
        r#"CREATE TABLE refresh_tokens (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES users (id),
            token_hash TEXT NOT NULL UNIQUE,
            revoked INTEGER NOT NULL DEFAULT 0,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );"#,
    ];

    for sql in ddl {
        pool.execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("create test schema");
    }
}
