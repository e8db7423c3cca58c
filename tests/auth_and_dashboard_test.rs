mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;

use alami_gestion_api::{
    entities::{sale::PaymentMethod, user::UserRole},
    errors::ServiceError,
    services::reports::ProfitParams,
    services::sales::{CreateSaleRequest, SaleLineRequest},
    services::users::CreateUserRequest,
};

use common::TestApp;

const TEST_JWT_SECRET: &str =
    "test_only_secret_key_that_is_at_least_64_characters_long_for_signing";

#[tokio::test]
async fn login_issues_a_token_that_validates_round_trip() {
    let app = TestApp::new().await;
    let auth = alami_gestion_api::auth::AuthService::new(app.db.clone(), TEST_JWT_SECRET, 3600);

    let user = app
        .services
        .users
        .create_user(CreateUserRequest {
            name: "Rachid".to_string(),
            email: "rachid@example.com".to_string(),
            password: "correct horse battery".to_string(),
            role: UserRole::Owner,
        })
        .await
        .expect("user should be created");

    let token = auth
        .login("rachid@example.com", "correct horse battery")
        .await
        .expect("login should succeed");
    let claims = auth
        .validate_token(&token.access_token)
        .expect("token should validate");
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.role, UserRole::Owner);

    let err = auth
        .login("rachid@example.com", "wrong password")
        .await
        .expect_err("wrong password must fail");
    assert_matches!(err, ServiceError::AuthError(_));
}

#[tokio::test]
async fn deactivated_users_cannot_log_in() {
    let app = TestApp::new().await;
    let auth = alami_gestion_api::auth::AuthService::new(app.db.clone(), TEST_JWT_SECRET, 3600);

    let user = app
        .services
        .users
        .create_user(CreateUserRequest {
            name: "Sofia".to_string(),
            email: "sofia@example.com".to_string(),
            password: "a strong password".to_string(),
            role: UserRole::Seller,
        })
        .await
        .expect("user should be created");

    app.services
        .users
        .set_active(user.id, false)
        .await
        .expect("deactivation should succeed");

    let err = auth
        .login("sofia@example.com", "a strong password")
        .await
        .expect_err("deactivated user must not log in");
    assert_matches!(err, ServiceError::AuthError(_));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;

    let request = || CreateUserRequest {
        name: "Dup".to_string(),
        email: "dup@example.com".to_string(),
        password: "password123".to_string(),
        role: UserRole::Seller,
    };
    app.services
        .users
        .create_user(request())
        .await
        .expect("first account should succeed");
    let err = app
        .services
        .users
        .create_user(request())
        .await
        .expect_err("second account with the same email must fail");
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn dashboard_counts_todays_sales_and_outstanding_credit() {
    let app = TestApp::new().await;
    let product = app
        .seed_product_full("SKU-DASH", Decimal::from(100), Decimal::from(60), 20, 5)
        .await;
    let customer = app.seed_customer("Meriem", Decimal::from(1000)).await;

    app.services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: Some(customer.id),
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 3,
                    unit_price: None,
                }],
                paid_amount: Some(Decimal::from(200)),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("sale should succeed");

    let summary = app.services.reports.dashboard().await.unwrap();
    assert_eq!(summary.today_sales_count, 1);
    assert_eq!(summary.today_revenue, Decimal::from(300));
    assert_eq!(summary.outstanding_credit, Decimal::from(100));
    assert_eq!(summary.recent_sales.len(), 1);

    // Margin over the same window: (100 - 60) * 3.
    let stats = app
        .services
        .reports
        .profit_stats(ProfitParams {
            from: chrono::Utc::now() - chrono::Duration::days(1),
            to: chrono::Utc::now() + chrono::Duration::days(1),
        })
        .await
        .unwrap();
    assert_eq!(stats.revenue, Decimal::from(300));
    assert_eq!(stats.cost, Decimal::from(180));
    assert_eq!(stats.margin, Decimal::from(120));
}

#[tokio::test]
async fn cancelled_sales_are_excluded_from_the_dashboard() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-DASH2", Decimal::from(50), 10).await;

    let sale = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: None,
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                }],
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("sale should succeed");
    app.services
        .sales
        .cancel_sale(sale.sale.id)
        .await
        .expect("cancel should succeed");

    let summary = app.services.reports.dashboard().await.unwrap();
    assert_eq!(summary.today_sales_count, 0);
    assert_eq!(summary.today_revenue, Decimal::ZERO);
}
