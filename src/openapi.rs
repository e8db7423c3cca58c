use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Alami Gestion API",
        version = "1.0.0",
        description = r#"
# Alami Gestion

Retail management backend for small businesses: product catalog, stock
ledger, sales with a paid/credit split, quotes, invoicing, supplier
accounts, credit collection and dashboards.

## Authentication

All endpoints except `/api/v1/auth/login` and `/health` require a JWT.
Include it in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Owner-only endpoints (stock adjustments, supplier mutations, settings,
staff accounts) additionally require the OWNER role.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "error": "Insufficient Stock",
  "message": "Stock insuffisant pour Savon noir",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 50,
max 200) query parameters.
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
        (name = "auth", description = "Login and token issuance"),
        (name = "products", description = "Product catalog"),
        (name = "sales", description = "Sales with paid/credit split"),
        (name = "quotes", description = "Quotes and conversion to sales"),
        (name = "stock", description = "Stock ledger and alerts"),
        (name = "credit", description = "Credit payments and checks"),
        (name = "invoices", description = "Invoices and credit notes")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::products::create_product,
        crate::handlers::sales::create_sale,
        crate::handlers::quotes::convert_quote,
        crate::handlers::stock::record_movement,
        crate::handlers::credit::record_payment,
        crate::handlers::invoices::next_number,
    ),
    components(
        schemas(
            // Auth
            crate::auth::LoginRequest,
            crate::auth::TokenResponse,

            // Catalog
            crate::entities::product::Model,
            crate::entities::category::Model,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::ProductPage,

            // Customers
            crate::entities::customer::Model,
            crate::services::customers::CreateCustomerRequest,
            crate::services::customers::UpdateCustomerRequest,
            crate::services::customers::CreditSummary,
            crate::services::customers::CustomerPage,

            // Sales
            crate::entities::sale::Model,
            crate::entities::sale::SaleStatus,
            crate::entities::sale::PaymentMethod,
            crate::entities::sale_item::Model,
            crate::services::sales::SaleLineRequest,
            crate::services::sales::CreateSaleRequest,
            crate::services::sales::SaleWithItems,
            crate::services::sales::SalePage,

            // Quotes
            crate::entities::quote::Model,
            crate::entities::quote::QuoteStatus,
            crate::entities::quote_item::Model,
            crate::services::quotes::CreateQuoteRequest,
            crate::services::quotes::ConvertQuoteRequest,
            crate::services::quotes::QuoteWithItems,
            crate::services::quotes::QuotePage,

            // Stock
            crate::entities::stock_movement::Model,
            crate::entities::stock_movement::MovementType,
            crate::services::stock::RecordMovementRequest,
            crate::services::stock::AlertLevel,
            crate::services::stock::StockAlert,
            crate::services::stock::MovementPage,

            // Credit
            crate::entities::credit_payment::Model,
            crate::entities::bank_check::Model,
            crate::entities::bank_check::CheckStatus,
            crate::services::credit::RecordCreditPaymentRequest,
            crate::services::credit::CreditPaymentResult,

            // Invoices
            crate::entities::invoice::Model,
            crate::entities::invoice::InvoiceType,
            crate::entities::invoice_item::Model,
            crate::services::invoices::InvoiceLineRequest,
            crate::services::invoices::CreateInvoiceRequest,
            crate::services::invoices::InvoiceWithItems,
            crate::services::invoices::NextNumberPreview,
            crate::services::invoices::InvoicePage,

            // Suppliers
            crate::entities::supplier::Model,
            crate::entities::supplier_transaction::Model,
            crate::entities::supplier_transaction::SupplierTransactionType,
            crate::services::suppliers::CreateSupplierRequest,
            crate::services::suppliers::UpdateSupplierRequest,
            crate::services::suppliers::RecordSupplierTransactionRequest,
            crate::services::suppliers::SupplierTransactionResult,

            // Reports & settings
            crate::services::reports::DashboardSummary,
            crate::services::reports::ProfitStats,
            crate::entities::company_settings::Model,
            crate::services::settings::UpdateSettingsRequest,

            // Users
            crate::entities::user::Model,
            crate::entities::user::UserRole,
            crate::services::users::CreateUserRequest,

            // Errors
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Alami Gestion API"));
        assert!(json.contains("/api/v1/sales"));
        assert!(json.contains("bearer_auth"));
    }
}
