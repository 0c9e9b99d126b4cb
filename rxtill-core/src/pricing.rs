use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::BoxError;

/// One requested line in a prescription, as sent to the pricing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrescriptionItem {
    pub id: u64,
    pub quantity_requested: u32,
}

/// A priced line item echoed back by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedItem {
    pub id: u64,
    pub name: String,
    pub quantity_requested: u32,
    pub quantity_in_stock: u32,
    pub unit_price: f64,
    pub amount_for_item: f64,
}

/// A single tax component (CGST or SGST).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxLine {
    pub tax_percentage: String,
    pub tax_amount: f64,
}

/// Server-computed totals. The grand total arrives as a formatted string
/// and is passed back verbatim on payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub subtotal: f64,
    pub discount_amount: f64,
    #[serde(default)]
    pub subtotal_after_discount: Option<f64>,
    #[serde(rename = "CGST")]
    pub cgst: TaxLine,
    #[serde(rename = "SGST")]
    pub sgst: TaxLine,
    #[serde(rename = "Total_amount")]
    pub total_amount: String,
}

/// The authoritative priced basket produced by the pricing service.
/// The client never computes prices or taxes itself; this structure is
/// adopted wholesale on every successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedBasket {
    pub appointment_id: u64,
    #[serde(default)]
    pub patient: serde_json::Value,
    #[serde(default)]
    pub organization: serde_json::Value,
    pub prescription_items: Vec<PricedItem>,
    pub cost_summary: CostSummary,
}

/// Remote pricing service for prescription baskets.
#[async_trait]
pub trait PricingClient: Send + Sync {
    /// Price a set of requested items for an appointment. `discount` is a
    /// whole percentage; `None` means no discount.
    async fn price_prescription(
        &self,
        appointment_id: u64,
        items: &[PrescriptionItem],
        discount: Option<u32>,
    ) -> Result<PricedBasket, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pricing_response() {
        let body = r#"{
            "appointment_id": 31,
            "patient": {"id": 9, "name": "A. Rao"},
            "organization": {"name": "City Clinic"},
            "prescription_items": [
                {"id": 4, "name": "Dolo 650", "quantity_requested": 3,
                 "quantity_in_stock": 40, "unit_price": 2.5, "amount_for_item": 8.0}
            ],
            "cost_summary": {
                "subtotal": 8.0,
                "discount_amount": 0.0,
                "subtotal_after_discount": 8.0,
                "CGST": {"tax_percentage": "6.0%", "tax_amount": 0.48},
                "SGST": {"tax_percentage": "6.0%", "tax_amount": 0.48},
                "Total_amount": "9.00"
            }
        }"#;
        let basket: PricedBasket = serde_json::from_str(body).unwrap();
        assert_eq!(basket.appointment_id, 31);
        assert_eq!(basket.prescription_items[0].quantity_in_stock, 40);
        assert_eq!(basket.cost_summary.cgst.tax_percentage, "6.0%");
        assert_eq!(basket.cost_summary.total_amount, "9.00");
    }
}
