mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;

use alami_gestion_api::{
    entities::{
        bank_check::CheckStatus,
        sale::PaymentMethod,
        supplier_transaction::SupplierTransactionType,
    },
    errors::ServiceError,
    services::suppliers::{CreateSupplierRequest, RecordSupplierTransactionRequest},
};

use common::TestApp;

#[tokio::test]
async fn purchases_raise_the_balance_and_payments_lower_it() {
    let app = TestApp::new().await;
    let supplier = app
        .services
        .suppliers
        .create_supplier(CreateSupplierRequest {
            name: "Grossiste Atlas".to_string(),
            phone: None,
            email: None,
        })
        .await
        .expect("supplier should be created");
    assert_eq!(supplier.balance, Decimal::ZERO);

    let purchase = app
        .services
        .suppliers
        .record_transaction(
            supplier.id,
            RecordSupplierTransactionRequest {
                transaction_type: SupplierTransactionType::Purchase,
                amount: Decimal::from(800),
                payment_method: None,
                check_number: None,
                description: Some("Réassort savons".to_string()),
            },
        )
        .await
        .expect("purchase should be recorded");
    assert_eq!(purchase.balance, Decimal::from(800));
    assert_eq!(purchase.transaction.transaction_number, "TRN-000001");

    let payment = app
        .services
        .suppliers
        .record_transaction(
            supplier.id,
            RecordSupplierTransactionRequest {
                transaction_type: SupplierTransactionType::Payment,
                amount: Decimal::from(300),
                payment_method: Some(PaymentMethod::Cash),
                check_number: None,
                description: None,
            },
        )
        .await
        .expect("payment should be recorded");
    assert_eq!(payment.balance, Decimal::from(500));
    assert_eq!(payment.transaction.transaction_number, "TRN-000002");

    let transactions = app
        .services
        .suppliers
        .list_transactions(supplier.id, 1, 50)
        .await
        .expect("listing should work");
    assert_eq!(transactions.len(), 2);
}

#[tokio::test]
async fn supplier_check_payments_create_an_issued_check() {
    let app = TestApp::new().await;
    let supplier = app
        .services
        .suppliers
        .create_supplier(CreateSupplierRequest {
            name: "Droguerie Centrale".to_string(),
            phone: None,
            email: None,
        })
        .await
        .expect("supplier should be created");

    let payment = app
        .services
        .suppliers
        .record_transaction(
            supplier.id,
            RecordSupplierTransactionRequest {
                transaction_type: SupplierTransactionType::Payment,
                amount: Decimal::from(250),
                payment_method: Some(PaymentMethod::Check),
                check_number: Some("CHQ-9001".to_string()),
                description: None,
            },
        )
        .await
        .expect("check payment should be recorded");

    let check_id = payment.transaction.check_id.expect("check should exist");
    let checks = app
        .services
        .credit
        .list_checks(Some(CheckStatus::Issued))
        .await
        .expect("listing checks should work");
    assert!(checks.iter().any(|c| c.id == check_id
        && c.supplier_id == Some(supplier.id)
        && c.check_number == "CHQ-9001"));
}

#[tokio::test]
async fn check_payment_without_a_number_is_rejected() {
    let app = TestApp::new().await;
    let supplier = app
        .services
        .suppliers
        .create_supplier(CreateSupplierRequest {
            name: "Maison Berrada".to_string(),
            phone: None,
            email: None,
        })
        .await
        .expect("supplier should be created");

    let err = app
        .services
        .suppliers
        .record_transaction(
            supplier.id,
            RecordSupplierTransactionRequest {
                transaction_type: SupplierTransactionType::Payment,
                amount: Decimal::from(100),
                payment_method: Some(PaymentMethod::Check),
                check_number: None,
                description: None,
            },
        )
        .await
        .expect_err("check payment needs a number");
    assert_matches!(err, ServiceError::ValidationError(_));
}
