use rxtill_core::payment::{InvoiceRequest, PaymentClient, PaymentDetails, ReceiptConfirmation};
use rxtill_core::pricing::{PricedBasket, PricingClient};
use std::sync::Arc;

use crate::session::{BasketError, BasketSession, BasketStatus};

/// Drives a basket session through submission, discounting and
/// finalization against the remote pricing and payment services.
///
/// All remote failures leave the session exactly as it was, so the
/// caller can retry without re-entering quantities. Submissions are
/// serialized by construction: each call holds the exclusive borrow of
/// the session for its full duration.
pub struct CheckoutOrchestrator {
    pricing: Arc<dyn PricingClient>,
    payments: Arc<dyn PaymentClient>,
}

impl CheckoutOrchestrator {
    pub fn new(pricing: Arc<dyn PricingClient>, payments: Arc<dyn PaymentClient>) -> Self {
        Self { pricing, payments }
    }

    /// Send the current selection to the pricing service and adopt the
    /// authoritative priced basket it returns.
    pub async fn submit(&self, session: &mut BasketSession) -> Result<(), BasketError> {
        session.ensure_open("SUBMITTED")?;

        let items = session.selected_items();
        if items.is_empty() {
            return Err(BasketError::EmptySelection);
        }

        tracing::debug!(
            appointment_id = session.appointment_id,
            lines = items.len(),
            "submitting basket for pricing"
        );

        let basket = self
            .pricing
            .price_prescription(session.appointment_id, &items, None)
            .await
            .map_err(|err| {
                tracing::warn!(appointment_id = session.appointment_id, error = %err, "pricing call failed");
                BasketError::Remote(err)
            })?;

        session.adopt_priced(basket, BasketStatus::Submitted);
        Ok(())
    }

    /// Re-price the submitted basket with a whole-percent discount
    /// attached. Only meaningful once a priced basket exists.
    pub async fn apply_discount(
        &self,
        session: &mut BasketSession,
        percent: u32,
    ) -> Result<(), BasketError> {
        session.ensure_open("DISCOUNT_APPLIED")?;
        if session.priced_basket().is_none() {
            return Err(BasketError::InvalidTransition {
                from: session.status().as_str(),
                to: "DISCOUNT_APPLIED",
            });
        }

        let items = session.selected_items();
        if items.is_empty() {
            return Err(BasketError::EmptySelection);
        }

        tracing::debug!(
            appointment_id = session.appointment_id,
            percent,
            "re-pricing basket with discount"
        );

        let basket = self
            .pricing
            .price_prescription(session.appointment_id, &items, Some(percent))
            .await
            .map_err(BasketError::Remote)?;

        session.adopt_priced(basket, BasketStatus::DiscountApplied);
        Ok(())
    }

    /// Record the payment and close the session. Requires a submitted
    /// basket; non-cash methods must carry a transaction reference.
    pub async fn finalize(
        &self,
        session: &mut BasketSession,
        details: &PaymentDetails,
    ) -> Result<ReceiptConfirmation, BasketError> {
        let priced = match session.status() {
            BasketStatus::Submitted | BasketStatus::DiscountApplied => session.priced_basket(),
            _ => None,
        }
        .cloned()
        .ok_or(BasketError::InvalidTransition {
            from: session.status().as_str(),
            to: "FINALIZED",
        })?;

        if details.method.requires_reference()
            && details
                .reference
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(BasketError::MissingReference {
                method: details.method.as_str(),
            });
        }

        let invoice = InvoiceRequest::from_priced(&priced, details);

        tracing::debug!(
            appointment_id = session.appointment_id,
            method = details.method.as_str(),
            "submitting payment"
        );

        let receipt = self
            .payments
            .submit_payment(&invoice)
            .await
            .map_err(|err| {
                tracing::warn!(appointment_id = session.appointment_id, error = %err, "payment call failed");
                BasketError::Remote(err)
            })?;

        session.mark_finalized(receipt.clone());
        Ok(receipt)
    }
}

/// Validate a raw discount field: digits only, whole percent.
pub fn parse_discount_percent(raw: &str) -> Result<u32, BasketError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BasketError::InvalidInput(raw.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| BasketError::InvalidInput(raw.to_string()))
}

pub mod mock {
    //! In-memory collaborators that mimic the backend's pricing and
    //! payment behavior, for tests and local wiring.

    use async_trait::async_trait;
    use rxtill_core::payment::{InvoiceRequest, PaymentClient, ReceiptConfirmation};
    use rxtill_core::pricing::{
        CostSummary, PricedBasket, PricedItem, PrescriptionItem, PricingClient, TaxLine,
    };
    use rxtill_core::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MOCK_UNIT_PRICE: f64 = 2.5;
    const MOCK_STOCK: u32 = 50;
    const TAX_RATE: f64 = 0.06;

    /// Prices every item at a fixed unit price with the backend's 6%
    /// CGST/SGST split. Counts calls so tests can assert that local
    /// validation short-circuits before the network.
    pub struct MockPricingClient {
        pub calls: AtomicUsize,
        fail: bool,
    }

    impl MockPricingClient {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Default for MockPricingClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl PricingClient for MockPricingClient {
        async fn price_prescription(
            &self,
            appointment_id: u64,
            items: &[PrescriptionItem],
            discount: Option<u32>,
        ) -> Result<PricedBasket, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("Simulated pricing service failure".into());
            }

            let priced_items: Vec<PricedItem> = items
                .iter()
                .map(|item| PricedItem {
                    id: item.id,
                    name: format!("Medicine {}", item.id),
                    quantity_requested: item.quantity_requested,
                    quantity_in_stock: MOCK_STOCK,
                    unit_price: MOCK_UNIT_PRICE,
                    amount_for_item: MOCK_UNIT_PRICE * item.quantity_requested as f64,
                })
                .collect();

            let subtotal: f64 = priced_items.iter().map(|i| i.amount_for_item).sum();
            let discount_amount = subtotal * discount.unwrap_or(0) as f64 / 100.0;
            let after_discount = subtotal - discount_amount;
            let cgst = after_discount * TAX_RATE;
            let sgst = after_discount * TAX_RATE;
            let total = (after_discount + cgst + sgst).round() as i64;

            Ok(PricedBasket {
                appointment_id,
                patient: serde_json::Value::Null,
                organization: serde_json::Value::Null,
                prescription_items: priced_items,
                cost_summary: CostSummary {
                    subtotal,
                    discount_amount,
                    subtotal_after_discount: Some(after_discount),
                    cgst: TaxLine {
                        tax_percentage: "6.0%".to_string(),
                        tax_amount: cgst,
                    },
                    sgst: TaxLine {
                        tax_percentage: "6.0%".to_string(),
                        tax_amount: sgst,
                    },
                    total_amount: format!("{total}.00"),
                },
            })
        }
    }

    /// Accepts every invoice and acknowledges with the backend's
    /// success message.
    pub struct MockPaymentClient {
        pub calls: AtomicUsize,
        fail: bool,
    }

    impl MockPaymentClient {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Default for MockPaymentClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl PaymentClient for MockPaymentClient {
        async fn submit_payment(
            &self,
            _invoice: &InvoiceRequest,
        ) -> Result<ReceiptConfirmation, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("Simulated payment service failure".into());
            }
            Ok(ReceiptConfirmation {
                message: "Invoice generated successfully.".to_string(),
                issued_at: chrono::Utc::now(),
            })
        }
    }
}
