pub mod ipaymu;
pub mod midtrans;
pub mod signature;

pub use ipaymu::IpaymuClient;
pub use midtrans::MidtransClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{PaymentGateway, PaymentMethod};
use crate::error::Result;

/// Outbound HTTP calls share one bounded timeout; neither gateway
/// documents long-polling behavior and the order id makes retries safe.
pub(crate) const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Seam between the checkout orchestrator and a concrete gateway.
/// Opening a transaction is the only operation checkout needs; webhook
/// authenticity checks are pure functions over credentials (see
/// [`signature`]) and never touch the network.
#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    fn gateway(&self) -> PaymentGateway;

    async fn create_checkout(&self, req: &GatewayCheckoutRequest) -> Result<GatewayCheckout>;
}

#[derive(Debug, Clone)]
pub struct GatewayCheckoutRequest {
    pub order_id: String,
    pub amount: i64,
    pub item_id: String,
    pub item_name: String,
    pub description: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
    pub method: PaymentMethod,
}

/// What the frontend renders: a QR string, a redirect URL, a VA number —
/// whatever the gateway handed back.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCheckout {
    pub gateway: PaymentGateway,
    pub payload: serde_json::Value,
}

/// Gateways are inconsistent about whether money fields arrive as JSON
/// strings ("150000.00") or numbers; floor either into whole rupiah.
pub(crate) fn rupiah_from_json(value: Option<&serde_json::Value>) -> i64 {
    match value {
        Some(serde_json::Value::String(s)) => s.parse::<f64>().map(|f| f.floor() as i64).unwrap_or(0),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f.floor() as i64).unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rupiah_parses_strings_and_numbers() {
        assert_eq!(rupiah_from_json(Some(&json!("150000.00"))), 150000);
        assert_eq!(rupiah_from_json(Some(&json!(60000))), 60000);
        assert_eq!(rupiah_from_json(Some(&json!("garbage"))), 0);
        assert_eq!(rupiah_from_json(None), 0);
    }
}
