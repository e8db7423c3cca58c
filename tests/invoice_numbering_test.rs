mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;

use alami_gestion_api::{
    entities::invoice::InvoiceType,
    errors::ServiceError,
    services::invoices::{CreateInvoiceRequest, InvoiceLineRequest},
};

use common::TestApp;

fn line(description: &str, quantity: i32, unit_price: i64) -> InvoiceLineRequest {
    InvoiceLineRequest {
        description: description.to_string(),
        quantity,
        unit_price: Decimal::from(unit_price),
    }
}

#[tokio::test]
async fn invoice_families_number_independently() {
    let app = TestApp::new().await;

    let first = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::Invoice,
            customer_id: None,
            original_invoice_id: None,
            items: vec![line("Prestation", 1, 500)],
            notes: None,
        })
        .await
        .expect("invoice should be issued");
    assert_eq!(first.invoice.invoice_number, "FAC-00000001");
    assert_eq!(first.invoice.total_amount, Decimal::from(500));

    let second = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::Invoice,
            customer_id: None,
            original_invoice_id: None,
            items: vec![line("Prestation", 2, 100)],
            notes: None,
        })
        .await
        .expect("invoice should be issued");
    assert_eq!(second.invoice.invoice_number, "FAC-00000002");

    let credit_note = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::CreditNote,
            customer_id: None,
            original_invoice_id: Some(first.invoice.id),
            items: vec![line("Retour", 1, 100)],
            notes: None,
        })
        .await
        .expect("credit note should be issued");
    // Credit notes start their own sequence.
    assert_eq!(credit_note.invoice.invoice_number, "FAV-00000001");
}

#[tokio::test]
async fn next_number_preview_does_not_allocate() {
    let app = TestApp::new().await;

    let preview = app
        .services
        .invoices
        .next_number(InvoiceType::Invoice)
        .await
        .expect("preview should work");
    assert_eq!(preview.next_number, "FAC-00000001");

    // Previewing again returns the same number; nothing was consumed.
    let again = app
        .services
        .invoices
        .next_number(InvoiceType::Invoice)
        .await
        .expect("preview should work");
    assert_eq!(again.next_number, "FAC-00000001");

    let issued = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::Invoice,
            customer_id: None,
            original_invoice_id: None,
            items: vec![line("Prestation", 1, 50)],
            notes: None,
        })
        .await
        .expect("invoice should be issued");
    assert_eq!(issued.invoice.invoice_number, "FAC-00000001");

    let after = app
        .services
        .invoices
        .next_number(InvoiceType::Invoice)
        .await
        .expect("preview should work");
    assert_eq!(after.next_number, "FAC-00000002");
}

#[tokio::test]
async fn credit_note_requires_an_original_invoice() {
    let app = TestApp::new().await;

    let err = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::CreditNote,
            customer_id: None,
            original_invoice_id: None,
            items: vec![line("Retour", 1, 100)],
            notes: None,
        })
        .await
        .expect_err("credit note without original must fail");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn credit_note_cannot_reference_another_credit_note() {
    let app = TestApp::new().await;

    let invoice = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::Invoice,
            customer_id: None,
            original_invoice_id: None,
            items: vec![line("Prestation", 1, 200)],
            notes: None,
        })
        .await
        .expect("invoice should be issued");

    let note = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::CreditNote,
            customer_id: None,
            original_invoice_id: Some(invoice.invoice.id),
            items: vec![line("Retour", 1, 50)],
            notes: None,
        })
        .await
        .expect("credit note should be issued");

    let err = app
        .services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            invoice_type: InvoiceType::CreditNote,
            customer_id: None,
            original_invoice_id: Some(note.invoice.id),
            items: vec![line("Retour", 1, 10)],
            notes: None,
        })
        .await
        .expect_err("chaining credit notes must fail");
    assert_matches!(err, ServiceError::InvalidOperation(_));
}
