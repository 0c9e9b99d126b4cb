use rxtill_core::pricing::{PricedItem, PrescriptionItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ledger::StockLedger;

/// Keeps the stock ledger and the requested counts in lockstep. Every
/// operation moves units between the two maps, so for any id touched,
/// `available(id) + requested(id)` equals the seeded snapshot quantity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationEngine {
    ledger: StockLedger,
    requested: HashMap<u64, u32>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("No stock available for medicine {id}")]
    OutOfStock { id: u64 },

    #[error("Requested quantity exceeds available stock: requested {requested}, available {available}")]
    ExceedsStock { requested: u32, available: u32 },

    #[error("Invalid quantity input: {0}")]
    InvalidInput(String),
}

impl ReservationEngine {
    /// Start a reservation session over a freshly fetched ledger. Any
    /// prior reservation is discarded with it.
    pub fn new(ledger: StockLedger) -> Self {
        Self {
            ledger,
            requested: HashMap::new(),
        }
    }

    /// Remaining purchasable quantity for a medicine.
    pub fn available(&self, medicine_id: u64) -> u32 {
        self.ledger.get(medicine_id)
    }

    /// Currently requested quantity for a medicine.
    pub fn requested(&self, medicine_id: u64) -> u32 {
        self.requested.get(&medicine_id).copied().unwrap_or(0)
    }

    /// The conserved pool for a medicine: what was in the ledger when the
    /// session started.
    pub fn pool_total(&self, medicine_id: u64) -> u32 {
        self.available(medicine_id) + self.requested(medicine_id)
    }

    /// Move one unit from the ledger into the reservation.
    pub fn increment(&mut self, medicine_id: u64) -> Result<(), ReservationError> {
        let available = self.ledger.get(medicine_id);
        if available == 0 {
            return Err(ReservationError::OutOfStock { id: medicine_id });
        }
        self.ledger.set(medicine_id, available - 1);
        *self.requested.entry(medicine_id).or_insert(0) += 1;
        Ok(())
    }

    /// Move one unit back from the reservation into the ledger. A no-op
    /// when nothing is reserved for the id.
    pub fn decrement(&mut self, medicine_id: u64) {
        let count = self.requested(medicine_id);
        if count == 0 {
            return;
        }
        self.requested.insert(medicine_id, count - 1);
        self.ledger
            .set(medicine_id, self.ledger.get(medicine_id) + 1);
    }

    /// Set an absolute requested quantity, splitting the conserved pool.
    pub fn set_quantity(&mut self, medicine_id: u64, quantity: u32) -> Result<(), ReservationError> {
        let total = self.pool_total(medicine_id);
        if quantity > total {
            return Err(ReservationError::ExceedsStock {
                requested: quantity,
                available: total,
            });
        }
        self.requested.insert(medicine_id, quantity);
        self.ledger.set(medicine_id, total - quantity);
        Ok(())
    }

    /// Raw text entry from a quantity field. An empty field resets the
    /// selection for the id; anything that is not a non-negative integer
    /// is rejected without touching state.
    pub fn set_quantity_input(&mut self, medicine_id: u64, raw: &str) -> Result<(), ReservationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return self.set_quantity(medicine_id, 0);
        }
        let quantity: u32 = trimmed
            .parse()
            .map_err(|_| ReservationError::InvalidInput(raw.to_string()))?;
        self.set_quantity(medicine_id, quantity)
    }

    /// Drop every requested count. The ledger is intentionally left
    /// as-is; a session reset re-fetches the catalog rather than patching
    /// quantities back, so stale local stock never survives a reset.
    pub fn clear_all(&mut self) {
        self.requested.clear();
    }

    /// True when no medicine has a positive requested quantity.
    pub fn is_selection_empty(&self) -> bool {
        self.requested.values().all(|&q| q == 0)
    }

    /// Requested lines with positive quantity, ordered by id, ready to be
    /// sent to the pricing service.
    pub fn selected_items(&self) -> Vec<PrescriptionItem> {
        let mut items: Vec<PrescriptionItem> = self
            .requested
            .iter()
            .filter(|(_, &q)| q > 0)
            .map(|(&id, &q)| PrescriptionItem {
                id,
                quantity_requested: q,
            })
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    /// Adopt the server's echoed line items as the authoritative
    /// reservation. The ledger is realigned to the server's stock figure
    /// minus what is now reserved, so conservation holds against the
    /// server's own snapshot.
    pub fn adopt(&mut self, items: &[PricedItem]) {
        self.requested.clear();
        for item in items {
            self.requested.insert(item.id, item.quantity_requested);
            self.ledger.set(
                item.id,
                item.quantity_in_stock.saturating_sub(item.quantity_requested),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(id: u64, quantity: u32) -> ReservationEngine {
        ReservationEngine::new(StockLedger::from_quantities([(id, quantity)]))
    }

    fn assert_conserved(engine: &ReservationEngine, id: u64, original: u32) {
        assert_eq!(engine.available(id) + engine.requested(id), original);
    }

    #[test]
    fn increment_moves_units_and_conserves() {
        let mut engine = engine_with(1, 5);
        for _ in 0..3 {
            engine.increment(1).unwrap();
            assert_conserved(&engine, 1, 5);
        }
        assert_eq!(engine.available(1), 2);
        assert_eq!(engine.requested(1), 3);
    }

    #[test]
    fn increment_on_exhausted_stock_fails_without_mutation() {
        let mut engine = engine_with(1, 1);
        engine.increment(1).unwrap();
        let err = engine.increment(1).unwrap_err();
        assert_eq!(err, ReservationError::OutOfStock { id: 1 });
        assert_eq!(engine.available(1), 0);
        assert_eq!(engine.requested(1), 1);
    }

    #[test]
    fn increment_on_unknown_id_is_out_of_stock() {
        let mut engine = ReservationEngine::new(StockLedger::new());
        assert_eq!(
            engine.increment(42),
            Err(ReservationError::OutOfStock { id: 42 })
        );
    }

    #[test]
    fn decrement_with_zero_selection_is_a_noop() {
        let mut engine = engine_with(1, 5);
        engine.decrement(1);
        assert_eq!(engine.available(1), 5);
        assert_eq!(engine.requested(1), 0);
    }

    #[test]
    fn set_quantity_splits_the_pool() {
        let mut engine = engine_with(1, 5);
        engine.set_quantity(1, 4).unwrap();
        assert_eq!(engine.requested(1), 4);
        assert_eq!(engine.available(1), 1);
        assert_conserved(&engine, 1, 5);

        // Lowering the target restores the ledger.
        engine.set_quantity(1, 2).unwrap();
        assert_eq!(engine.requested(1), 2);
        assert_eq!(engine.available(1), 3);
    }

    #[test]
    fn set_quantity_beyond_pool_is_rejected_unchanged() {
        let mut engine = engine_with(1, 5);
        let err = engine.set_quantity(1, 10).unwrap_err();
        assert_eq!(
            err,
            ReservationError::ExceedsStock {
                requested: 10,
                available: 5
            }
        );
        assert_eq!(engine.available(1), 5);
        assert_eq!(engine.requested(1), 0);
    }

    #[test]
    fn empty_input_resets_selection() {
        let mut engine = engine_with(1, 5);
        engine.set_quantity(1, 3).unwrap();
        engine.set_quantity_input(1, "").unwrap();
        assert_eq!(engine.requested(1), 0);
        assert_eq!(engine.available(1), 5);
    }

    #[test]
    fn garbage_input_is_rejected_unchanged() {
        let mut engine = engine_with(1, 5);
        engine.set_quantity(1, 2).unwrap();
        let err = engine.set_quantity_input(1, "2x").unwrap_err();
        assert!(matches!(err, ReservationError::InvalidInput(_)));
        let err = engine.set_quantity_input(1, "-3").unwrap_err();
        assert!(matches!(err, ReservationError::InvalidInput(_)));
        assert_eq!(engine.requested(1), 2);
        assert_eq!(engine.available(1), 3);
    }

    #[test]
    fn worked_scenario_from_counter_flow() {
        // ledger {A:5}; +1 x3; -1; set 0
        let mut engine = engine_with(1, 5);
        for _ in 0..3 {
            engine.increment(1).unwrap();
        }
        assert_eq!((engine.available(1), engine.requested(1)), (2, 3));

        engine.decrement(1);
        assert_eq!((engine.available(1), engine.requested(1)), (3, 2));

        engine.set_quantity(1, 0).unwrap();
        assert_eq!((engine.available(1), engine.requested(1)), (5, 0));
    }

    #[test]
    fn conservation_holds_across_mixed_operations() {
        let mut engine = ReservationEngine::new(StockLedger::from_quantities([(1, 5), (2, 8)]));
        engine.increment(1).unwrap();
        engine.increment(2).unwrap();
        engine.set_quantity(2, 7).unwrap();
        engine.decrement(1);
        engine.decrement(2);
        let _ = engine.set_quantity(1, 99); // rejected
        engine.set_quantity_input(1, "4").unwrap();

        assert_conserved(&engine, 1, 5);
        assert_conserved(&engine, 2, 8);
    }

    #[test]
    fn selected_items_skips_zero_entries() {
        let mut engine = ReservationEngine::new(StockLedger::from_quantities([(1, 5), (2, 8), (3, 2)]));
        engine.set_quantity(2, 3).unwrap();
        engine.set_quantity(3, 1).unwrap();
        engine.set_quantity(3, 0).unwrap();

        let items = engine.selected_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 2);
        assert_eq!(items[0].quantity_requested, 3);
    }

    #[test]
    fn clear_all_empties_selection_only() {
        let mut engine = engine_with(1, 5);
        engine.set_quantity(1, 3).unwrap();
        engine.clear_all();
        assert!(engine.is_selection_empty());
        // Ledger deliberately untouched; the session re-fetches on reset.
        assert_eq!(engine.available(1), 2);
    }
}
