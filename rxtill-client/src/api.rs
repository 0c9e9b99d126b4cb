use async_trait::async_trait;
use rxtill_core::catalog::{CatalogClient, CatalogQuery, Medicine, MedicineListResponse};
use rxtill_core::identity::{StaticTokenProvider, TokenProvider};
use rxtill_core::payment::{InvoiceRequest, PaymentClient, ReceiptConfirmation};
use rxtill_core::pricing::{PricedBasket, PrescriptionItem, PricingClient};
use rxtill_core::BoxError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::client_config::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Inventory service unavailable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inventory service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not obtain bearer token: {0}")]
    Auth(String),
}

/// Typed HTTP client for the backend's `/inventory` endpoints: the
/// medicine catalog, the prescription pricing service and the payment
/// recorder.
pub struct InventoryApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Option<Arc<dyn TokenProvider>>,
}

/// Body of the pricing call. The discount travels as a formatted
/// percentage string (`"12%"`) and is omitted entirely when absent.
#[derive(Debug, Serialize)]
struct PrescriptionRequest<'a> {
    appointment_id: u64,
    prescription_items: &'a [PrescriptionItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    discount: Option<String>,
}

impl InventoryApi {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .build()?;
        let tokens: Option<Arc<dyn TokenProvider>> = config
            .auth
            .bearer_token
            .as_ref()
            .map(|t| Arc::new(StaticTokenProvider::new(t.clone())) as Arc<dyn TokenProvider>);
        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Use a live token source (e.g. a refreshing session) instead of a
    /// static configured token.
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// List medicines, optionally filtered. The endpoint is public; no
    /// bearer token is attached.
    pub async fn list_medicines(&self, query: &CatalogQuery) -> Result<Vec<Medicine>, ApiError> {
        let url = format!("{}/inventory/medicines/", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(search) = &query.search {
            request = request.query(&[("search", search.trim())]);
        }
        if let Some(category_id) = query.category_id {
            request = request.query(&[("category_id", category_id.to_string())]);
        }

        let resp = check_status(request.send().await?).await?;
        let body: MedicineListResponse = resp.json().await?;
        Ok(body.into_results())
    }

    /// Fetch a single medicine by id.
    pub async fn get_medicine(&self, medicine_id: u64) -> Result<Medicine, ApiError> {
        let url = format!("{}/inventory/medicines/", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("medicine_id", medicine_id.to_string())])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Submit a prescription for authoritative pricing.
    pub async fn process_prescription(
        &self,
        appointment_id: u64,
        items: &[PrescriptionItem],
        discount: Option<u32>,
    ) -> Result<PricedBasket, ApiError> {
        let url = format!("{}/inventory/process_prescription/", self.base_url);
        let body = PrescriptionRequest {
            appointment_id,
            prescription_items: items,
            discount: discount.map(|d| format!("{d}%")),
        };

        tracing::debug!(appointment_id, lines = items.len(), "POST process_prescription");

        let mut request = self.http.post(&url).json(&body);
        request = self.authorize(request).await?;
        let resp = check_status(request.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Record the payment for an invoice and trigger receipt generation.
    pub async fn submit_payment(&self, invoice: &InvoiceRequest) -> Result<ReceiptConfirmation, ApiError> {
        let url = format!("{}/inventory/payment/", self.base_url);

        tracing::debug!(appointment_id = invoice.appointment_id, "POST payment");

        let mut request = self.http.post(&url).json(invoice);
        request = self.authorize(request).await?;
        let resp = check_status(request.send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match &self.tokens {
            Some(provider) => {
                let token = provider
                    .bearer_token()
                    .await
                    .map_err(|e| ApiError::Auth(e.to_string()))?;
                Ok(request.bearer_auth(token))
            }
            None => Ok(request),
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.text().await {
        Ok(body) => error_detail(&body),
        Err(_) => status.to_string(),
    };
    tracing::warn!(status = status.as_u16(), %message, "inventory service rejected request");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Pull the most specific human-readable detail out of an error body.
/// The backend variously uses `error`, `message`, `non_field_errors`
/// and a bare `status` marker (e.g. `insufficient_stock`).
fn error_detail(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.trim().to_string(),
    };

    if let Some(s) = value.get("error").and_then(|v| v.as_str()) {
        return s.to_string();
    }
    if let Some(s) = value.get("message").and_then(|v| v.as_str()) {
        return s.to_string();
    }
    if let Some(s) = value
        .get("non_field_errors")
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_str())
    {
        return s.to_string();
    }
    if let Some(s) = value.get("status").and_then(|v| v.as_str()) {
        // Stock rejections carry the offending medicine alongside a
        // bare status marker.
        if let Some(name) = value.get("name").and_then(|v| v.as_str()) {
            return format!("{s}: {name}");
        }
        return s.to_string();
    }
    body.trim().to_string()
}

#[async_trait]
impl CatalogClient for InventoryApi {
    async fn list_medicines(&self, query: &CatalogQuery) -> Result<Vec<Medicine>, BoxError> {
        Ok(InventoryApi::list_medicines(self, query).await?)
    }

    async fn get_medicine(&self, medicine_id: u64) -> Result<Medicine, BoxError> {
        Ok(InventoryApi::get_medicine(self, medicine_id).await?)
    }
}

#[async_trait]
impl PricingClient for InventoryApi {
    async fn price_prescription(
        &self,
        appointment_id: u64,
        items: &[PrescriptionItem],
        discount: Option<u32>,
    ) -> Result<PricedBasket, BoxError> {
        Ok(self.process_prescription(appointment_id, items, discount).await?)
    }
}

#[async_trait]
impl PaymentClient for InventoryApi {
    async fn submit_payment(&self, invoice: &InvoiceRequest) -> Result<ReceiptConfirmation, BoxError> {
        Ok(InventoryApi::submit_payment(self, invoice).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_is_formatted_as_percentage() {
        let items = vec![PrescriptionItem {
            id: 4,
            quantity_requested: 3,
        }];
        let body = PrescriptionRequest {
            appointment_id: 31,
            prescription_items: &items,
            discount: Some("10%".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["discount"], "10%");
        assert_eq!(json["prescription_items"][0]["quantity_requested"], 3);
    }

    #[test]
    fn absent_discount_is_omitted_from_the_body() {
        let items = vec![PrescriptionItem {
            id: 4,
            quantity_requested: 3,
        }];
        let body = PrescriptionRequest {
            appointment_id: 31,
            prescription_items: &items,
            discount: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("discount").is_none());
    }

    #[test]
    fn error_detail_prefers_the_error_field() {
        let body = r#"{"error": "Appointment not found."}"#;
        assert_eq!(error_detail(body), "Appointment not found.");
    }

    #[test]
    fn error_detail_reads_stock_rejections() {
        let body = r#"{"id": 4, "name": "Dolo 650", "quantity_requested": 9,
                       "quantity_in_stock": 2, "status": "insufficient_stock"}"#;
        assert_eq!(error_detail(body), "insufficient_stock: Dolo 650");
    }

    #[test]
    fn error_detail_reads_non_field_errors() {
        let body = r#"{"non_field_errors": ["Payment already recorded."]}"#;
        assert_eq!(error_detail(body), "Payment already recorded.");
    }

    #[test]
    fn error_detail_falls_back_to_raw_body() {
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
    }
}
