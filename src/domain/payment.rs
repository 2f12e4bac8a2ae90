use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per order id. Created on first webhook receipt (or as a
/// pending record), mutated in place on later status transitions,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub method: Option<PaymentMethod>,
    pub gateway: Option<PaymentGateway>,
    pub status: PaymentStatus,
    /// Gateway notification retained verbatim for audit.
    pub raw_payload: Option<serde_json::Value>,
    pub gateway_transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub registration_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A payment that settled before it could be tied to a registration
    /// or member still needs that linking when the next COMPLETED
    /// notification arrives.
    pub fn is_linked(&self) -> bool {
        self.registration_id.is_some() || self.member_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Qris,
    Va,
    BankTransfer,
    Ewallet,
}

impl PaymentMethod {
    /// Best-effort mapping of a gateway `via`/`payment_type` token.
    pub fn from_gateway_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "qris" => Some(Self::Qris),
            "va" => Some(Self::Va),
            "bank_transfer" | "banktransfer" => Some(Self::BankTransfer),
            "gopay" | "ewallet" | "shopeepay" => Some(Self::Ewallet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateway {
    Midtrans,
    Ipaymu,
}
