use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Realty API",
        version = "0.1.0",
        description = r#"
# Realty Marketplace API

Backend for a real-estate marketplace: property listings, enquiries, per-user
shopping carts and a gateway-backed checkout.

## Authentication

Most endpoints require a JWT bearer token obtained from `/api/v1/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

`GET /api/v1/payments/verify` is the one deliberate exception: the payment
gateway redirects the buyer's browser there carrying only the transaction
reference.

## Errors

Failed requests return a consistent JSON body:

```json
{
  "error": "Not Found",
  "message": "Cart not found",
  "timestamp": "2025-06-01T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Listings", description = "Property listing endpoints"),
        (name = "Cart", description = "Shopping cart endpoints"),
        (name = "Payments", description = "Checkout and verification endpoints")
    ),
    paths(
        // Listings
        crate::handlers::listings::browse_listings,
        crate::handlers::listings::create_listing,

        // Cart
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_to_cart,
        crate::handlers::carts::remove_from_cart,

        // Payments
        crate::handlers::payments::initialize_payment,
        crate::handlers::payments::verify_payment,

        // Auth, profile, enquiry and country paths intentionally omitted
    ),
    components(
        schemas(
            crate::handlers::listings::CreateListingRequest,
            crate::handlers::listings::UpdateListingRequest,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
