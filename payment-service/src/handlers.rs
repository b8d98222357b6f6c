use crate::models::{Payment, PaymentStatus};
use crate::store::PaymentStore;
use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::Utc;
use contracts::{Envelope, Message, PaymentMethod, PaymentProcessed};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const GATEWAY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ProcessPayment {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub payment_method: String,
}

#[derive(Debug, Clone)]
pub struct ProcessPaymentResponse {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

pub struct PaymentCommands {
    store: Arc<dyn PaymentStore>,
    gateway_delay: Duration,
}

impl PaymentCommands {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self {
            store,
            gateway_delay: GATEWAY_DELAY,
        }
    }

    pub fn with_gateway_delay(store: Arc<dyn PaymentStore>, gateway_delay: Duration) -> Self {
        Self {
            store,
            gateway_delay,
        }
    }

    /// Processing -> Completed runs to completion inside this handler; the
    /// PaymentProcessed announcement is enqueued in the same transaction as
    /// the terminal status write and always reports that terminal status.
    pub async fn process_payment(&self, command: ProcessPayment) -> Result<ProcessPaymentResponse> {
        let method: PaymentMethod = command.payment_method.parse()?;

        let now = Utc::now();
        let mut payment = Payment {
            id: Uuid::new_v4(),
            booking_id: command.booking_id,
            user_id: command.user_id,
            amount: command.amount,
            currency: command.currency,
            payment_method: method,
            status: PaymentStatus::Processing,
            transaction_id: Some(generate_transaction_id()),
            gateway_response: None,
            payment_date: now,
            created_at: now,
            updated_at: None,
        };

        self.store.create(payment.clone()).await?;

        // Simulated gateway step. The real gateway is an external
        // collaborator; only the state-machine contract matters here.
        tokio::time::sleep(self.gateway_delay).await;

        payment.status = PaymentStatus::Completed;
        payment.updated_at = Some(Utc::now());

        let event = PaymentProcessed {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount.clone(),
            payment_status: payment.status.to_string(),
            transaction_id: payment.transaction_id.clone(),
            payment_date: payment.payment_date,
        };
        let envelope = Envelope::new(Message::PaymentProcessed(event));

        let response = ProcessPaymentResponse {
            payment_id: payment.id,
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
        };

        self.store.finalize_with_outbox(payment, envelope).await?;
        info!(payment_id = %response.payment_id, "payment processed");

        Ok(response)
    }

    pub async fn get_payment_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        self.store.get_by_booking(booking_id).await
    }
}

fn generate_transaction_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(10000..=99999);
    format!("TXN{}{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}
