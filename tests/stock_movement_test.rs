mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;

use alami_gestion_api::{
    entities::{product, stock_movement::MovementType},
    errors::ServiceError,
    services::stock::{AlertLevel, RecordMovementRequest},
};

use common::TestApp;

#[tokio::test]
async fn inbound_movement_raises_stock_and_writes_the_ledger_row() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-IN", Decimal::from(10), 5).await;

    let movement = app
        .services
        .stock
        .record_movement(RecordMovementRequest {
            product_id: item.id,
            quantity: 7,
            movement_type: MovementType::In,
            reason: Some("Réception fournisseur".to_string()),
            reference: Some("BL-000001".to_string()),
        })
        .await
        .expect("inbound movement should succeed");

    assert_eq!(movement.quantity, 7);
    assert_eq!(movement.movement_type, MovementType::In);
    assert_eq!(movement.reference.as_deref(), Some("BL-000001"));

    let after = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 12);
}

#[tokio::test]
async fn outbound_movement_beyond_stock_is_rejected_atomically() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-OUT", Decimal::from(10), 5).await;

    let err = app
        .services
        .stock
        .record_movement(RecordMovementRequest {
            product_id: item.id,
            quantity: 10,
            movement_type: MovementType::Out,
            reason: None,
            reference: None,
        })
        .await
        .expect_err("overdraw must be rejected");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let after = product::Entity::find_by_id(item.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 5);

    let page = app
        .services
        .stock
        .list_movements(Some(item.id), 1, 50)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn missing_reason_defaults_to_manual_adjustment() {
    let app = TestApp::new().await;
    let item = app.seed_product("SKU-REASON", Decimal::from(10), 5).await;

    let movement = app
        .services
        .stock
        .record_movement(RecordMovementRequest {
            product_id: item.id,
            quantity: 1,
            movement_type: MovementType::Out,
            reason: None,
            reference: None,
        })
        .await
        .expect("movement should succeed");

    assert_eq!(movement.reason, "Ajustement manuel");
}

#[tokio::test]
async fn alerts_partition_by_severity_and_ignore_healthy_products() {
    let app = TestApp::new().await;
    app.seed_product_full("SKU-EMPTY", Decimal::ONE, Decimal::ZERO, 0, 10)
        .await;
    app.seed_product_full("SKU-CRIT", Decimal::ONE, Decimal::ZERO, 3, 10)
        .await;
    app.seed_product_full("SKU-WARN", Decimal::ONE, Decimal::ZERO, 9, 10)
        .await;
    app.seed_product_full("SKU-FINE", Decimal::ONE, Decimal::ZERO, 50, 10)
        .await;

    let alerts = app.services.stock.stock_alerts().await.unwrap();
    assert_eq!(alerts.len(), 3);

    let level_of = |sku: &str| {
        alerts
            .iter()
            .find(|a| a.sku == sku)
            .map(|a| a.level)
            .expect("alert expected")
    };
    assert_eq!(level_of("SKU-EMPTY"), AlertLevel::OutOfStock);
    assert_eq!(level_of("SKU-CRIT"), AlertLevel::Critical);
    assert_eq!(level_of("SKU-WARN"), AlertLevel::Warning);

    // Worst first.
    assert_eq!(alerts[0].sku, "SKU-EMPTY");
}
