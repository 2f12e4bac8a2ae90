use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::{PaymentGateway, PaymentMethod, PaymentStatus},
    error::{AppError, Result},
    payments::{
        rupiah_from_json, signature, GatewayCheckout, GatewayCheckoutRequest, PaymentGatewayClient,
        REQUEST_TIMEOUT,
    },
};

/// iPaymu v2 client. Every request is signed over the exact body bytes
/// sent on the wire, so the body is serialized once and reused for both
/// the signature and the request.
pub struct IpaymuClient {
    http: reqwest::Client,
    api_url: String,
    va: String,
    api_key: String,
    return_url: String,
    notify_url: String,
    cancel_url: String,
}

impl IpaymuClient {
    pub fn new(
        va: String,
        api_key: String,
        api_url: String,
        return_url: String,
        notify_url: String,
        cancel_url: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url,
            va,
            api_key,
            return_url,
            notify_url,
            cancel_url,
        })
    }

    async fn post_signed(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let body_string = serde_json::to_string(body)
            .map_err(|e| AppError::Internal(format!("Failed to encode request body: {}", e)))?;
        let sig = signature::ipaymu_signature("POST", &self.va, &self.api_key, body_string.as_bytes());

        let response = self
            .http
            .post(format!("{}{}", self.api_url, path))
            .header("va", &self.va)
            .header("signature", sig)
            .header("Content-Type", "application/json")
            .body(body_string)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway {
                status: status.as_u16(),
                message: format!("iPaymu request failed: {}", message),
            });
        }

        Ok(response.json().await?)
    }

    /// Authenticity check for an inbound webhook, over the raw body and
    /// the `signature` header. Same scheme as outbound signing.
    pub fn verify_webhook(&self, raw_body: &[u8], supplied_signature: &str) -> bool {
        signature::verify_ipaymu_signature(&self.va, &self.api_key, raw_body, supplied_signature)
    }
}

#[async_trait]
impl PaymentGatewayClient for IpaymuClient {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Ipaymu
    }

    async fn create_checkout(&self, req: &GatewayCheckoutRequest) -> Result<GatewayCheckout> {
        let (payment_method, payment_channel) = match req.method {
            PaymentMethod::Qris | PaymentMethod::Ewallet => ("qris", None),
            PaymentMethod::Va | PaymentMethod::BankTransfer => ("va", Some("bca")),
        };

        let mut body = json!({
            "product": [req.item_name],
            "qty": ["1"],
            "price": [req.amount.to_string()],
            "description": [req.description],
            "returnUrl": self.return_url,
            "notifyUrl": self.notify_url,
            "cancelUrl": self.cancel_url,
            "referenceId": req.order_id,
            "buyerName": req.buyer_name,
            "buyerEmail": req.buyer_email,
            "buyerPhone": req.buyer_phone.clone().unwrap_or_default(),
            "paymentMethod": payment_method,
        });
        if let Some(channel) = payment_channel {
            body["paymentChannel"] = json!(channel);
        }

        let response = self.post_signed("/payment", &body).await?;
        // The renderable part (redirect url, session id) sits under "Data".
        let payload = response.get("Data").cloned().unwrap_or(response);

        Ok(GatewayCheckout {
            gateway: PaymentGateway::Ipaymu,
            payload,
        })
    }
}

/// Webhook notification as iPaymu posts it. `reference_id` carries our
/// order id back to us.
#[derive(Debug, Clone, Deserialize)]
pub struct IpaymuNotification {
    pub reference_id: String,
    pub status: String,
    #[serde(default)]
    pub trx_id: Option<serde_json::Value>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub status_code: Option<String>,
}

impl IpaymuNotification {
    pub fn amount_rupiah(&self) -> i64 {
        rupiah_from_json(self.amount.as_ref())
    }

    pub fn transaction_id(&self) -> Option<String> {
        self.trx_id.as_ref().map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Payment method as reported by the gateway ("qris", "va", ...).
    pub fn method(&self) -> Option<PaymentMethod> {
        self.via
            .as_deref()
            .and_then(PaymentMethod::from_gateway_token)
    }
}

/// Normalize iPaymu's status vocabulary (a mix of Indonesian and English
/// tokens). Unknown tokens are treated as failures.
pub fn map_status(token: &str) -> PaymentStatus {
    match token.to_ascii_lowercase().as_str() {
        "berhasil" | "sukses" | "success" | "completed" => PaymentStatus::Completed,
        "pending" => PaymentStatus::Pending,
        "gagal" | "failed" | "cancel" | "expired" => PaymentStatus::Failed,
        _ => PaymentStatus::Failed,
    }
}
