mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use uuid::Uuid;

use alami_gestion_api::{
    entities::{
        bank_check::CheckStatus,
        customer,
        sale::{self, PaymentMethod, SaleStatus},
    },
    errors::ServiceError,
    services::credit::RecordCreditPaymentRequest,
    services::sales::{CreateSaleRequest, SaleLineRequest},
};

use common::TestApp;

async fn credit_sale(app: &TestApp, customer_id: Uuid, total: i64, paid: i64) -> sale::Model {
    let product = app
        .seed_product(
            &format!("SKU-{}", Uuid::new_v4()),
            Decimal::from(total),
            10,
        )
        .await;
    app.services
        .sales
        .create_sale(
            app.seller_id,
            CreateSaleRequest {
                customer_id: Some(customer_id),
                items: vec![SaleLineRequest {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                }],
                paid_amount: Some(Decimal::from(paid)),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await
        .expect("credit sale should succeed")
        .sale
}

#[tokio::test]
async fn payment_reduces_customer_and_sale_balances_together() {
    let app = TestApp::new().await;
    let cust = app.seed_customer("Amina", Decimal::from(1000)).await;
    let sale = credit_sale(&app, cust.id, 200, 50).await;
    assert_eq!(sale.credit_amount, Decimal::from(150));

    let result = app
        .services
        .credit
        .record_payment(RecordCreditPaymentRequest {
            customer_id: cust.id,
            sale_id: Some(sale.id),
            amount: Decimal::from(100),
            payment_method: PaymentMethod::Cash,
            check_number: None,
            notes: None,
        })
        .await
        .expect("payment should succeed");

    assert_eq!(result.credit_used, Decimal::from(50));
    assert!(result.check.is_none());

    let sale_after = sale::Entity::find_by_id(sale.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sale_after.paid_amount, Decimal::from(150));
    assert_eq!(sale_after.credit_amount, Decimal::from(50));
    assert_eq!(sale_after.status, SaleStatus::Pending);
    assert_eq!(
        sale_after.total_amount,
        sale_after.paid_amount + sale_after.credit_amount
    );
}

#[tokio::test]
async fn settling_the_remaining_credit_completes_the_sale() {
    let app = TestApp::new().await;
    let cust = app.seed_customer("Youssef", Decimal::from(1000)).await;
    let sale = credit_sale(&app, cust.id, 120, 20).await;

    app.services
        .credit
        .record_payment(RecordCreditPaymentRequest {
            customer_id: cust.id,
            sale_id: Some(sale.id),
            amount: Decimal::from(100),
            payment_method: PaymentMethod::Cash,
            check_number: None,
            notes: None,
        })
        .await
        .expect("payment should succeed");

    let sale_after = sale::Entity::find_by_id(sale.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sale_after.credit_amount, Decimal::ZERO);
    assert_eq!(sale_after.status, SaleStatus::Completed);

    let cust_after = customer::Entity::find_by_id(cust.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cust_after.credit_used, Decimal::ZERO);
}

#[tokio::test]
async fn overpayment_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let cust = app.seed_customer("Leila", Decimal::from(1000)).await;
    let sale = credit_sale(&app, cust.id, 100, 70).await;

    let err = app
        .services
        .credit
        .record_payment(RecordCreditPaymentRequest {
            customer_id: cust.id,
            sale_id: Some(sale.id),
            amount: Decimal::from(50),
            payment_method: PaymentMethod::Cash,
            check_number: None,
            notes: None,
        })
        .await
        .expect_err("paying more than the outstanding credit must fail");
    assert_matches!(err, ServiceError::CreditError(_));

    let cust_after = customer::Entity::find_by_id(cust.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cust_after.credit_used, Decimal::from(30));

    let payments = app.services.credit.list_payments(cust.id).await.unwrap();
    assert!(payments.is_empty());
}

#[tokio::test]
async fn check_payments_create_an_issued_check_and_cash_once() {
    let app = TestApp::new().await;
    let cust = app.seed_customer("Hassan", Decimal::from(1000)).await;
    credit_sale(&app, cust.id, 300, 100).await;

    let result = app
        .services
        .credit
        .record_payment(RecordCreditPaymentRequest {
            customer_id: cust.id,
            sale_id: None,
            amount: Decimal::from(200),
            payment_method: PaymentMethod::Check,
            check_number: Some("CHQ-4411".to_string()),
            notes: None,
        })
        .await
        .expect("check payment should succeed");

    let check = result.check.expect("check should be created");
    assert_eq!(check.status, CheckStatus::Issued);
    assert_eq!(check.check_number, "CHQ-4411");
    assert_eq!(result.payment.check_id, Some(check.id));

    let cashed = app
        .services
        .credit
        .cash_check(check.id)
        .await
        .expect("cashing should succeed");
    assert_eq!(cashed.status, CheckStatus::Cashed);
    assert!(cashed.cashed_at.is_some());

    let err = app
        .services
        .credit
        .cash_check(check.id)
        .await
        .expect_err("cashing twice must fail");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn check_payments_require_a_check_number() {
    let app = TestApp::new().await;
    let cust = app.seed_customer("Nadia", Decimal::from(1000)).await;
    credit_sale(&app, cust.id, 100, 0).await;

    let err = app
        .services
        .credit
        .record_payment(RecordCreditPaymentRequest {
            customer_id: cust.id,
            sale_id: None,
            amount: Decimal::from(50),
            payment_method: PaymentMethod::Check,
            check_number: None,
            notes: None,
        })
        .await
        .expect_err("check payment without a number must fail");
    assert_matches!(err, ServiceError::ValidationError(_));
}
