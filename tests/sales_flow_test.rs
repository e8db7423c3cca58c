mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, QueryFilter};

use alami_gestion_api::{
    entities::{
        customer,
        sale::{PaymentMethod, SaleStatus},
        stock_movement::{self, MovementType},
        user,
    },
    errors::ServiceError,
    services::sales::{CreateSaleRequest, SaleLineRequest},
};

use common::TestApp;

#[tokio::test]
async fn partial_payment_creates_pending_sale_with_credit_split() {
    let app = TestApp::new().await;
    let a = app.seed_product("SKU-A", Decimal::from(50), 10).await;
    let b = app.seed_product("SKU-B", Decimal::from(30), 10).await;
    let customer = app.seed_customer("Fatima", Decimal::from(500)).await;

    let sale = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: Some(customer.id),
                items: vec![
                    SaleLineRequest {
                        product_id: a.id,
                        quantity: 2,
                        unit_price: None,
                    },
                    SaleLineRequest {
                        product_id: b.id,
                        quantity: 1,
                        unit_price: None,
                    },
                ],
                paid_amount: Some(Decimal::from(100)),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("sale should succeed");

    assert_eq!(sale.sale.total_amount, Decimal::from(130));
    assert_eq!(sale.sale.paid_amount, Decimal::from(100));
    assert_eq!(sale.sale.credit_amount, Decimal::from(30));
    assert_eq!(sale.sale.status, SaleStatus::Pending);
    assert_eq!(sale.sale.sale_number, "VNT-000001");
    assert_eq!(sale.items.len(), 2);

    // Stock decremented and ledger rows written for both lines.
    let a_after = alami_gestion_api::entities::product::Entity::find_by_id(a.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a_after.stock, 8);
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::Reference.eq("VNT-000001"))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 2);
    assert!(movements
        .iter()
        .all(|m| m.movement_type == MovementType::Out && m.reason == "Vente"));

    // Credit booked against the customer.
    let customer_after = customer::Entity::find_by_id(customer.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer_after.credit_used, Decimal::from(30));
}

#[tokio::test]
async fn full_payment_defaults_complete_the_sale() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-CASH", Decimal::from(25), 4).await;

    let sale = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: None,
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 2,
                    unit_price: None,
                }],
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("cash sale should succeed");

    assert_eq!(sale.sale.paid_amount, Decimal::from(50));
    assert_eq!(sale.sale.credit_amount, Decimal::ZERO);
    assert_eq!(sale.sale.status, SaleStatus::Completed);
}

#[tokio::test]
async fn insufficient_stock_on_any_line_leaves_nothing_behind() {
    let app = TestApp::new().await;
    let ok = app.seed_product("SKU-OK", Decimal::from(10), 10).await;
    let scarce = app.seed_product("SKU-SCARCE", Decimal::from(10), 1).await;

    let err = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: None,
                items: vec![
                    SaleLineRequest {
                        product_id: ok.id,
                        quantity: 5,
                        unit_price: None,
                    },
                    SaleLineRequest {
                        product_id: scarce.id,
                        quantity: 3,
                        unit_price: None,
                    },
                ],
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect_err("should reject over-requested line");

    assert_matches!(err, ServiceError::InsufficientStock(msg) => {
        assert!(msg.contains("SKU-SCARCE"));
    });

    // No sale, no stock change, no movements.
    let sales = alami_gestion_api::entities::sale::Entity::find()
        .all(&app.db)
        .await
        .unwrap();
    assert!(sales.is_empty());
    let ok_after = alami_gestion_api::entities::product::Entity::find_by_id(ok.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ok_after.stock, 10);
    let movements = stock_movement::Entity::find().all(&app.db).await.unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
async fn zero_quantity_line_fails_validation_before_any_write() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-ZERO", Decimal::from(15), 5).await;

    let err = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: None,
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 0,
                    unit_price: None,
                }],
                paid_amount: None,
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect_err("zero-quantity line must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    let sales = alami_gestion_api::entities::sale::Entity::find()
        .all(&app.db)
        .await
        .unwrap();
    assert!(sales.is_empty());
}

#[tokio::test]
async fn sales_are_reachable_from_their_seller() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-SELLER", Decimal::from(10), 5).await;

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

    let seller = user::Entity::find_by_id(app.seller_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let sold = seller
        .find_related(alami_gestion_api::entities::Sale)
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].id, sale.sale.id);
}

#[tokio::test]
async fn credit_sale_without_customer_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-WALKIN", Decimal::from(40), 5).await;

    let err = app
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
                paid_amount: Some(Decimal::from(10)),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect_err("walk-in credit should be rejected");

    assert_matches!(err, ServiceError::CreditError(_));
}

#[tokio::test]
async fn blocked_customer_cannot_take_new_credit() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-BLOCKED", Decimal::from(40), 5).await;
    let customer = app.seed_customer("Blocked", Decimal::from(100)).await;
    app.services
        .customers
        .set_blocked(customer.id, true)
        .await
        .expect("block customer");

    let err = app
        .services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: Some(customer.id),
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                }],
                paid_amount: Some(Decimal::ZERO),
                payment_method: PaymentMethod::Credit,
                notes: None,
            },
        )
        .await
        .expect_err("blocked customer must not take credit");

    assert_matches!(err, ServiceError::CreditError(_));
}

#[tokio::test]
async fn cancelling_a_sale_restores_stock_and_releases_credit() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-CANCEL", Decimal::from(20), 10).await;
    let customer = app.seed_customer("Karim", Decimal::from(200)).await;

    let sale = app
        .services
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
                paid_amount: Some(Decimal::from(20)),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("sale should succeed");

    let cancelled = app
        .services
        .sales
        .cancel_sale(sale.sale.id)
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);

    let product_after = alami_gestion_api::entities::product::Entity::find_by_id(product.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product_after.stock, 10);

    let restock = stock_movement::Entity::find()
        .filter(stock_movement::Column::Reason.eq("Annulation vente"))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(restock.len(), 1);
    assert_eq!(restock[0].movement_type, MovementType::In);

    let customer_after = customer::Entity::find_by_id(customer.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer_after.credit_used, Decimal::ZERO);

    // Cancelling twice is refused.
    let err = app
        .services
        .sales
        .cancel_sale(sale.sale.id)
        .await
        .expect_err("second cancel should fail");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn sale_numbers_increment_within_the_family() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-NUM", Decimal::from(5), 100).await;

    for expected in ["VNT-000001", "VNT-000002", "VNT-000003"] {
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
        assert_eq!(sale.sale.sale_number, expected);
    }
}
