//! Outbound payment initiation and verification.
//!
//! A donation makes at most one call through [`PaymentGateway`]; there are no
//! retries and no webhook reconciliation.

mod khalti;

pub use khalti::{KhaltiClient, KhaltiEndpoints};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider-neutral description of a payment to initiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub purchase_order_id: String,
    pub purchase_order_name: String,
    pub amount_paisa: u64,
    pub customer_name: String,
    pub customer_email: String,
}

/// Where to send the donor to complete the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub payment_url: String,
    pub pidx: String,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider not configured")]
    NotConfigured,
    #[error("Failed to initiate Khalti payment")]
    Initiation(String),
    #[error("Payment verification failed")]
    Verification(String),
}

impl PaymentError {
    /// Provider detail kept for logs only; the display text is what donors see.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NotConfigured => None,
            Self::Initiation(detail) | Self::Verification(detail) => Some(detail),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError>;
    async fn verify(&self, token: &str, amount_paisa: u64)
        -> Result<serde_json::Value, PaymentError>;
}
