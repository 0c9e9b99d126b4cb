use chrono::{DateTime, Utc};
use rxtill_core::payment::ReceiptConfirmation;
use rxtill_core::pricing::{PricedBasket, PrescriptionItem};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::StockLedger;
use crate::reservation::{ReservationEngine, ReservationError};

/// Where a basket session stands in its lifecycle.
///
/// `Reserving` and `Submitted` cycle: editing the reservation after a
/// submission drops back to `Reserving`, and re-submitting produces a
/// fresh priced basket. `Finalized` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasketStatus {
    Empty,
    Reserving,
    Submitted,
    DiscountApplied,
    Finalized,
}

impl BasketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketStatus::Empty => "EMPTY",
            BasketStatus::Reserving => "RESERVING",
            BasketStatus::Submitted => "SUBMITTED",
            BasketStatus::DiscountApplied => "DISCOUNT_APPLIED",
            BasketStatus::Finalized => "FINALIZED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BasketError {
    #[error("No stock available for medicine {id}")]
    OutOfStock { id: u64 },

    #[error("Requested quantity exceeds available stock: requested {requested}, available {available}")]
    ExceedsStock { requested: u32, available: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No medicines selected to add to basket")]
    EmptySelection,

    #[error("A reference ID is required for {method} payments")]
    MissingReference { method: &'static str },

    #[error("Invalid basket transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Pricing/payment service call failed: {0}")]
    Remote(#[source] rxtill_core::BoxError),
}

impl From<ReservationError> for BasketError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::OutOfStock { id } => BasketError::OutOfStock { id },
            ReservationError::ExceedsStock {
                requested,
                available,
            } => BasketError::ExceedsStock {
                requested,
                available,
            },
            ReservationError::InvalidInput(raw) => BasketError::InvalidInput(raw),
        }
    }
}

/// One appointment's basket: the reservation engine plus whatever the
/// pricing service last confirmed. Owned by a single caller; nothing in
/// here is shared across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketSession {
    pub id: Uuid,
    pub appointment_id: u64,
    engine: ReservationEngine,
    status: BasketStatus,
    priced: Option<PricedBasket>,
    receipt: Option<ReceiptConfirmation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BasketSession {
    /// Open a session over a freshly fetched stock snapshot.
    pub fn new(appointment_id: u64, ledger: StockLedger) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            appointment_id,
            engine: ReservationEngine::new(ledger),
            status: BasketStatus::Empty,
            priced: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> BasketStatus {
        self.status
    }

    /// The last server-confirmed priced basket, if any.
    pub fn priced_basket(&self) -> Option<&PricedBasket> {
        self.priced.as_ref()
    }

    pub fn receipt(&self) -> Option<&ReceiptConfirmation> {
        self.receipt.as_ref()
    }

    /// Read access to the reservation state.
    pub fn engine(&self) -> &ReservationEngine {
        &self.engine
    }

    pub fn increment(&mut self, medicine_id: u64) -> Result<(), BasketError> {
        self.ensure_open("RESERVING")?;
        self.engine.increment(medicine_id)?;
        self.enter_reserving();
        Ok(())
    }

    pub fn decrement(&mut self, medicine_id: u64) -> Result<(), BasketError> {
        self.ensure_open("RESERVING")?;
        if self.engine.requested(medicine_id) > 0 {
            self.engine.decrement(medicine_id);
            self.enter_reserving();
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, medicine_id: u64, quantity: u32) -> Result<(), BasketError> {
        self.ensure_open("RESERVING")?;
        self.engine.set_quantity(medicine_id, quantity)?;
        self.enter_reserving();
        Ok(())
    }

    pub fn set_quantity_input(&mut self, medicine_id: u64, raw: &str) -> Result<(), BasketError> {
        self.ensure_open("RESERVING")?;
        self.engine.set_quantity_input(medicine_id, raw)?;
        self.enter_reserving();
        Ok(())
    }

    /// Start the session over on a fresh snapshot: selection, priced
    /// basket and receipt are dropped and the ledger is replaced rather
    /// than patched, so stale stock cannot drift in.
    pub fn reset(&mut self, ledger: StockLedger) {
        self.engine = ReservationEngine::new(ledger);
        self.priced = None;
        self.receipt = None;
        self.status = BasketStatus::Empty;
        self.touch();
    }

    /// Lines with positive quantity, ready for the pricing call.
    pub fn selected_items(&self) -> Vec<PrescriptionItem> {
        self.engine.selected_items()
    }

    /// Replace local reservation state with the server's authoritative
    /// answer and move to the given post-submission status.
    pub(crate) fn adopt_priced(&mut self, basket: PricedBasket, status: BasketStatus) {
        self.engine.adopt(&basket.prescription_items);
        self.priced = Some(basket);
        self.status = status;
        self.touch();
    }

    pub(crate) fn mark_finalized(&mut self, receipt: ReceiptConfirmation) {
        self.receipt = Some(receipt);
        self.status = BasketStatus::Finalized;
        self.touch();
    }

    pub(crate) fn ensure_open(&self, to: &'static str) -> Result<(), BasketError> {
        if self.status == BasketStatus::Finalized {
            return Err(BasketError::InvalidTransition {
                from: self.status.as_str(),
                to,
            });
        }
        Ok(())
    }

    fn enter_reserving(&mut self) {
        self.status = BasketStatus::Reserving;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> BasketSession {
        BasketSession::new(31, StockLedger::from_quantities([(1, 5), (2, 3)]))
    }

    #[test]
    fn edits_move_empty_to_reserving() {
        let mut s = session();
        assert_eq!(s.status(), BasketStatus::Empty);
        s.increment(1).unwrap();
        assert_eq!(s.status(), BasketStatus::Reserving);
    }

    #[test]
    fn noop_decrement_keeps_empty_status() {
        let mut s = session();
        s.decrement(1).unwrap();
        assert_eq!(s.status(), BasketStatus::Empty);
    }

    #[test]
    fn reservation_errors_surface_through_session() {
        let mut s = session();
        let err = s.set_quantity(2, 9).unwrap_err();
        assert!(matches!(
            err,
            BasketError::ExceedsStock {
                requested: 9,
                available: 3
            }
        ));
    }

    #[test]
    fn reset_drops_selection_and_replaces_ledger() {
        let mut s = session();
        s.set_quantity(1, 4).unwrap();
        s.reset(StockLedger::from_quantities([(1, 7)]));
        assert_eq!(s.status(), BasketStatus::Empty);
        assert!(s.selected_items().is_empty());
        assert_eq!(s.engine().available(1), 7);
        assert!(s.priced_basket().is_none());
    }
}
