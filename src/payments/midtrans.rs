use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::{PaymentGateway, PaymentMethod, PaymentStatus},
    error::{AppError, Result},
    payments::{
        signature, GatewayCheckout, GatewayCheckoutRequest, PaymentGatewayClient, REQUEST_TIMEOUT,
    },
};

/// Midtrans Core API client. Charges are opened with the order id as the
/// transaction reference; settlement arrives later on the webhook.
pub struct MidtransClient {
    http: reqwest::Client,
    api_url: String,
    server_key: String,
    /// Where e-wallet flows bounce the buyer back to after approval.
    callback_url: String,
}

impl MidtransClient {
    pub fn new(server_key: String, api_url: String, callback_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url,
            server_key,
            callback_url,
        })
    }

    // Core API authenticates with the server key as a Basic username and
    // an empty password.
    fn auth_header(&self) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:", self.server_key)))
    }

    async fn post_charge(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/charge", self.api_url))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway {
                status: status.as_u16(),
                message: format!("Midtrans charge failed: {}", message),
            });
        }

        Ok(response.json().await?)
    }

    /// Live transaction status lookup, keyed by our order id.
    pub async fn transaction_status(&self, order_id: &str) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/{}/status", self.api_url, order_id))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway {
                status: status.as_u16(),
                message: format!("Midtrans status failed: {}", message),
            });
        }

        Ok(response.json().await?)
    }

    /// Authenticity check for an inbound notification.
    pub fn verify_notification(&self, notif: &MidtransNotification) -> bool {
        signature::verify_midtrans_signature(
            &self.server_key,
            &notif.order_id,
            &notif.status_code,
            &notif.gross_amount,
            &notif.signature_key,
        )
    }
}

#[async_trait]
impl PaymentGatewayClient for MidtransClient {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Midtrans
    }

    async fn create_checkout(&self, req: &GatewayCheckoutRequest) -> Result<GatewayCheckout> {
        let transaction_details = json!({
            "order_id": req.order_id,
            "gross_amount": req.amount,
        });
        let customer_details = json!({
            "email": req.buyer_email,
            "first_name": req.buyer_name,
            "phone": req.buyer_phone,
        });
        let item_details = json!([{
            "id": req.item_id,
            "name": req.item_name,
            "price": req.amount,
            "quantity": 1,
        }]);

        let body = match req.method {
            PaymentMethod::Qris => json!({
                "payment_type": "qris",
                "transaction_details": transaction_details,
                "customer_details": customer_details,
                "item_details": item_details,
            }),
            PaymentMethod::Ewallet => json!({
                "payment_type": "gopay",
                "transaction_details": transaction_details,
                "customer_details": customer_details,
                "item_details": item_details,
                "gopay": {
                    "enable_callback": true,
                    "callback_url": self.callback_url,
                },
            }),
            PaymentMethod::Va | PaymentMethod::BankTransfer => json!({
                "payment_type": "bank_transfer",
                "transaction_details": transaction_details,
                "customer_details": customer_details,
                "item_details": item_details,
                "bank_transfer": { "bank": "bca" },
            }),
        };

        let payload = self.post_charge(body).await?;
        Ok(GatewayCheckout {
            gateway: PaymentGateway::Midtrans,
            payload,
        })
    }
}

/// Asynchronous payment notification as Midtrans posts it.
#[derive(Debug, Clone, Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub transaction_status: String,
    /// String-encoded decimal, e.g. "60000.00".
    pub gross_amount: String,
    pub status_code: String,
    pub signature_key: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
}

impl MidtransNotification {
    pub fn gross_amount_rupiah(&self) -> i64 {
        self.gross_amount
            .parse::<f64>()
            .map(|f| f.floor() as i64)
            .unwrap_or(0)
    }
}

/// Normalize Midtrans' transaction_status vocabulary. Unknown tokens are
/// treated as failures rather than ignored.
pub fn map_transaction_status(token: &str) -> PaymentStatus {
    match token {
        "settlement" | "capture" | "success" => PaymentStatus::Completed,
        "pending" => PaymentStatus::Pending,
        "deny" | "cancel" | "failure" | "expire" => PaymentStatus::Failed,
        "refund" => PaymentStatus::Refunded,
        _ => PaymentStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_maps_to_internal_statuses() {
        assert_eq!(map_transaction_status("settlement"), PaymentStatus::Completed);
        assert_eq!(map_transaction_status("capture"), PaymentStatus::Completed);
        assert_eq!(map_transaction_status("success"), PaymentStatus::Completed);
        assert_eq!(map_transaction_status("pending"), PaymentStatus::Pending);
        assert_eq!(map_transaction_status("deny"), PaymentStatus::Failed);
        assert_eq!(map_transaction_status("cancel"), PaymentStatus::Failed);
        assert_eq!(map_transaction_status("expire"), PaymentStatus::Failed);
        assert_eq!(map_transaction_status("refund"), PaymentStatus::Refunded);
        assert_eq!(map_transaction_status("mystery"), PaymentStatus::Failed);
    }

    #[test]
    fn gross_amount_floors_to_whole_rupiah() {
        let notif = MidtransNotification {
            order_id: "PRG-X-1".into(),
            transaction_status: "settlement".into(),
            gross_amount: "60000.75".into(),
            status_code: "200".into(),
            signature_key: String::new(),
            transaction_id: None,
            payment_type: None,
            transaction_time: None,
            fraud_status: None,
        };
        assert_eq!(notif.gross_amount_rupiah(), 60000);
    }
}
