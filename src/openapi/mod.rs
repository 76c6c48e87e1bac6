use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    entities::{
        category,
        status::{BookingStatus, DisplayStatus, ItemStatus, ItemType, PaymentStatus},
    },
    handlers::{bookings, catalog, categories},
    services::{
        bookings::{BookingDraft, BookingItemDraft, BookingItemResponse, BookingResponse, BookingStatusFilter},
        catalog::{InventoryItem, ItemDraft, ItemUpdate},
        categories::{CategoryDraft, CategoryUpdate},
    },
};

/// Registers the `Bearer` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rental API",
        version = "1.0.0",
        description = r#"
# Costume and Accessory Rental API

Catalog management and the booking engine of a costume rental shop.

## Authentication

Browsing the catalog and creating bookings works without a token. Everything
else needs a JWT in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Catalog and category changes, booking lists and payment labels are admin-only.
Customers can read and cancel their own bookings.

## Errors

Failures share one body shape:

```json
{
  "error": "Conflict",
  "message": "Item unavailable: Vampire Cape is not available for the requested dates",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
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
        (name = "categories", description = "Costume and accessory categories"),
        (name = "costumes", description = "Costume catalog"),
        (name = "accessories", description = "Accessory catalog"),
        (name = "bookings", description = "Availability, bookings and their lifecycle")
    ),
    paths(
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,

        catalog::list_costumes,
        catalog::get_costume,
        catalog::create_costume,
        catalog::update_costume,
        catalog::set_costume_status,
        catalog::delete_costume,
        catalog::list_accessories,
        catalog::get_accessory,
        catalog::create_accessory,
        catalog::update_accessory,
        catalog::set_accessory_status,
        catalog::delete_accessory,

        bookings::check_availability,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::set_booking_status,
        bookings::set_payment_status,
        bookings::list_my_bookings,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Enums
            ItemType,
            ItemStatus,
            BookingStatus,
            PaymentStatus,
            DisplayStatus,
            BookingStatusFilter,

            // Catalog
            category::Model,
            CategoryDraft,
            CategoryUpdate,
            InventoryItem,
            ItemDraft,
            ItemUpdate,
            catalog::ItemStatusRequest,

            // Bookings
            BookingDraft,
            BookingItemDraft,
            BookingItemResponse,
            BookingResponse,
            bookings::AvailabilityRequest,
            bookings::AvailabilityResponse,
            bookings::CreateBookingRequest,
            bookings::BookingStatusRequest,
            bookings::PaymentStatusRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
