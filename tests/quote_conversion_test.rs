mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use alami_gestion_api::{
    entities::{
        product,
        quote::{self, QuoteStatus},
        sale::{PaymentMethod, SaleStatus},
    },
    errors::ServiceError,
    services::quotes::{ConvertQuoteRequest, CreateQuoteRequest},
    services::sales::SaleLineRequest,
};

use common::TestApp;

#[tokio::test]
async fn quotes_lock_prices_and_never_touch_stock() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-Q1", Decimal::from(80), 6).await;

    let created = app
        .services
        .quotes
        .create_quote(CreateQuoteRequest {
            customer_id: None,
            items: vec![SaleLineRequest {
                product_id: item.id,
                quantity: 2,
                unit_price: None,
            }],
            valid_until: None,
            notes: None,
        })
        .await
        .expect("quote should be created");

    assert_eq!(created.quote.quote_number, "DEV-000001");
    assert_eq!(created.quote.status, QuoteStatus::Draft);
    assert_eq!(created.quote.total_amount, Decimal::from(160));
    assert_eq!(created.items[0].unit_price, Decimal::from(80));

    let product_after = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product_after.stock, 6);
}

#[tokio::test]
async fn conversion_uses_quoted_prices_even_after_a_price_change() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-Q2", Decimal::from(80), 6).await;

    let created = app
        .services
        .quotes
        .create_quote(CreateQuoteRequest {
            customer_id: None,
            items: vec![SaleLineRequest {
                product_id: item.id,
                quantity: 2,
                unit_price: None,
            }],
            valid_until: None,
            notes: None,
        })
        .await
        .expect("quote should be created");

    // Raise the catalog price after the quote was issued.
    let mut active: product::ActiveModel = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.price = Set(Decimal::from(120));
    active.update(&app.db).await.unwrap();

    let sale = app
        .services
        .quotes
        .convert_to_sale(
            created.quote.id,
            app.seller_id,
            ConvertQuoteRequest {
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .await
        .expect("conversion should succeed");

    assert_eq!(sale.sale.total_amount, Decimal::from(160));
    assert_eq!(sale.sale.status, SaleStatus::Completed);
    assert_eq!(sale.items[0].unit_price, Decimal::from(80));

    let quote_after = quote::Entity::find_by_id(created.quote.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quote_after.status, QuoteStatus::Converted);
    assert_eq!(quote_after.converted_to_sale_id, Some(sale.sale.id));

    let product_after = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product_after.stock, 4);
}

#[tokio::test]
async fn a_quote_converts_at_most_once() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-Q3", Decimal::from(15), 10).await;

    let created = app
        .services
        .quotes
        .create_quote(CreateQuoteRequest {
            customer_id: None,
            items: vec![SaleLineRequest {
                product_id: item.id,
                quantity: 1,
                unit_price: None,
            }],
            valid_until: None,
            notes: None,
        })
        .await
        .expect("quote should be created");

    app.services
        .quotes
        .convert_to_sale(
            created.quote.id,
            app.seller_id,
            ConvertQuoteRequest {
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .await
        .expect("first conversion should succeed");

    let err = app
        .services
        .quotes
        .convert_to_sale(
            created.quote.id,
            app.seller_id,
            ConvertQuoteRequest {
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .await
        .expect_err("second conversion must fail");
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // The failed attempt must not move stock again.
    let product_after = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product_after.stock, 9);
}

#[tokio::test]
async fn expired_quotes_cannot_be_converted() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-Q4", Decimal::from(15), 10).await;

    let created = app
        .services
        .quotes
        .create_quote(CreateQuoteRequest {
            customer_id: None,
            items: vec![SaleLineRequest {
                product_id: item.id,
                quantity: 1,
                unit_price: None,
            }],
            valid_until: Some(chrono::Utc::now() - chrono::Duration::days(1)),
            notes: None,
        })
        .await
        .expect("quote should be created");

    let err = app
        .services
        .quotes
        .convert_to_sale(
            created.quote.id,
            app.seller_id,
            ConvertQuoteRequest {
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .await
        .expect_err("expired quote must not convert");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn rejected_quotes_cannot_be_converted() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-Q5", Decimal::from(15), 10).await;

    let created = app
        .services
        .quotes
        .create_quote(CreateQuoteRequest {
            customer_id: None,
            items: vec![SaleLineRequest {
                product_id: item.id,
                quantity: 1,
                unit_price: None,
            }],
            valid_until: None,
            notes: None,
        })
        .await
        .expect("quote should be created");

    app.services
        .quotes
        .reject_quote(created.quote.id)
        .await
        .expect("rejection should succeed");

    let err = app
        .services
        .quotes
        .convert_to_sale(
            created.quote.id,
            app.seller_id,
            ConvertQuoteRequest {
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .await
        .expect_err("rejected quote must not convert");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
