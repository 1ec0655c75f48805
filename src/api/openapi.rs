//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, loans, notifications};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lendshelf API",
        version = "0.3.0",
        description = "Peer-to-peer item lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::get_item,
        items::create_item,
        items::get_availability,
        // Loans
        loans::create_loan,
        loans::list_loans,
        loans::get_loan,
        loans::respond_to_loan,
        loans::ratify_loan,
        loans::signal_return,
        loans::confirm_return,
        // Notifications
        notifications::list_notifications,
        notifications::mark_notification_read,
    ),
    components(
        schemas(
            // Items
            crate::models::ItemRecord,
            crate::models::item::OwnerCopyRecord,
            crate::models::ItemType,
            crate::models::CreateItem,
            items::AvailabilityResponse,
            items::CopyAvailability,
            crate::lending::CopyStatus,
            // Loans
            crate::models::LoanRecord,
            crate::models::LoanStatus,
            crate::models::CreateLoan,
            crate::models::loan::RespondLoan,
            crate::models::LoanDirection,
            crate::models::LoansPage,
            // Notifications
            crate::models::Notification,
            crate::models::NotificationKind,
            crate::models::NotificationsPage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::lending::LoanErrorKind,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Items and availability"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "notifications", description = "User notifications")
    )
)]
pub struct ApiDoc;

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

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
