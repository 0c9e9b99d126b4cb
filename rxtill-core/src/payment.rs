use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::pricing::PricedBasket;
use crate::{BoxError, CoreError};

/// Payment methods accepted at the pharmacy counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    PhonePe,
    Paytm,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
}

impl PaymentMethod {
    /// Cash settles at the counter; everything else goes through a
    /// payment rail and counts as an online payment.
    pub fn is_online(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }

    /// Non-cash methods require a UTR / transaction reference.
    pub fn requires_reference(&self) -> bool {
        self.is_online()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::PhonePe => "PhonePe",
            PaymentMethod::Paytm => "Paytm",
            PaymentMethod::BankTransfer => "Bank Transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(PaymentMethod::Cash),
            "PhonePe" => Ok(PaymentMethod::PhonePe),
            "Paytm" => Ok(PaymentMethod::Paytm),
            "Bank Transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(CoreError::ValidationError(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

/// Payment selection made by the cashier before finalizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    /// UTR / transaction reference, required for non-cash methods.
    pub reference: Option<String>,
}

impl PaymentDetails {
    pub fn cash() -> Self {
        Self {
            method: PaymentMethod::Cash,
            reference: None,
        }
    }

    pub fn online(method: PaymentMethod, reference: impl Into<String>) -> Self {
        Self {
            method,
            reference: Some(reference.into()),
        }
    }
}

/// One line of the invoice sent to the payment endpoint. Field names
/// differ from the priced response on purpose; the backend's payment
/// serializer expects this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: u64,
    pub quantity_requested: u32,
    pub price_per_unit: f64,
    pub total: f64,
}

/// Body of the finalize/payment call. All monetary figures are copied
/// from the server's own cost summary, never recomputed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub appointment_id: u64,
    pub prescription_items: Vec<InvoiceItem>,
    pub subtotal: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub discount: f64,
    pub total_amount: String,
    pub transaction_number: Option<String>,
    pub is_online: bool,
}

impl InvoiceRequest {
    /// Build the invoice from the authoritative priced basket and the
    /// cashier's payment selection.
    pub fn from_priced(basket: &PricedBasket, details: &PaymentDetails) -> Self {
        let items = basket
            .prescription_items
            .iter()
            .map(|item| InvoiceItem {
                id: item.id,
                quantity_requested: item.quantity_requested,
                price_per_unit: item.unit_price,
                total: item.amount_for_item,
            })
            .collect();

        Self {
            appointment_id: basket.appointment_id,
            prescription_items: items,
            subtotal: basket.cost_summary.subtotal,
            cgst: basket.cost_summary.cgst.tax_amount,
            sgst: basket.cost_summary.sgst.tax_amount,
            discount: basket.cost_summary.discount_amount,
            total_amount: basket.cost_summary.total_amount.clone(),
            transaction_number: details.reference.clone(),
            is_online: details.method.is_online(),
        }
    }
}

/// Acknowledgement returned by the payment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfirmation {
    pub message: String,
    #[serde(default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

/// Remote payment/receipt service.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Record the payment and generate the receipt for an invoice.
    async fn submit_payment(&self, invoice: &InvoiceRequest) -> Result<ReceiptConfirmation, BoxError>;
}
