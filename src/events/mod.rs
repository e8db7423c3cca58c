use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a mutation commits. Consumers run outside the
/// request transaction, so an event is only ever observed for durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SaleCreated {
        sale_id: Uuid,
        sale_number: String,
        total_amount: Decimal,
        credit_amount: Decimal,
    },
    SaleCancelled {
        sale_id: Uuid,
        sale_number: String,
    },
    QuoteConverted {
        quote_id: Uuid,
        sale_id: Uuid,
    },
    StockAdjusted {
        product_id: Uuid,
        old_stock: i32,
        new_stock: i32,
        reason: String,
        reference: Option<String>,
    },
    LowStock {
        product_id: Uuid,
        stock: i32,
        min_stock: i32,
    },
    CreditPaymentRecorded {
        customer_id: Uuid,
        amount: Decimal,
    },
    CheckCashed {
        check_id: Uuid,
    },
    InvoiceIssued {
        invoice_id: Uuid,
        invoice_number: String,
    },
    SupplierTransactionRecorded {
        supplier_id: Uuid,
        transaction_number: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging instead of failing the request when the
    /// channel is closed. Events are best-effort notifications.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("event channel closed, dropping event: {}", e);
        }
    }
}

/// Background consumer for domain events. Currently logs them; integrations
/// (notifications, webhooks) subscribe here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                product_id,
                stock,
                min_stock,
            } => {
                warn!(%product_id, stock, min_stock, "product below reorder threshold");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }
    info!("event channel closed, stopping event processor");
}
