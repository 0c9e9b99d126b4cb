use rxtill_core::catalog::Medicine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local mirror of remaining purchasable stock per medicine, seeded once
/// per session from a catalog fetch. Mutation goes through the
/// reservation engine only, so that every unit removed here reappears in
/// the reservation and vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockLedger {
    stock: HashMap<u64, u32>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self {
            stock: HashMap::new(),
        }
    }

    /// Build the ledger from a catalog snapshot. Medicines without a
    /// stock block count as zero.
    pub fn from_catalog(catalog: &[Medicine]) -> Self {
        let stock = catalog
            .iter()
            .map(|m| (m.id, m.available_quantity()))
            .collect();
        Self { stock }
    }

    /// Build the ledger from raw (id, quantity) pairs.
    pub fn from_quantities<I>(quantities: I) -> Self
    where
        I: IntoIterator<Item = (u64, u32)>,
    {
        Self {
            stock: quantities.into_iter().collect(),
        }
    }

    /// Remaining quantity for a medicine; unknown ids read as zero.
    pub fn get(&self, medicine_id: u64) -> u32 {
        self.stock.get(&medicine_id).copied().unwrap_or(0)
    }

    pub(crate) fn set(&mut self, medicine_id: u64, quantity: u32) {
        self.stock.insert(medicine_id, quantity);
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stock.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxtill_core::catalog::MedicineStock;

    #[test]
    fn seeds_from_catalog_snapshot() {
        let catalog = vec![
            Medicine {
                id: 1,
                name: "Dolo 650".to_string(),
                unit_price: 2.5,
                stock: Some(MedicineStock {
                    quantity: 40,
                    reorder_level: Some(10),
                }),
            },
            Medicine {
                id: 2,
                name: "Azithral".to_string(),
                unit_price: 11.0,
                stock: None,
            },
        ];

        let ledger = StockLedger::from_catalog(&catalog);
        assert_eq!(ledger.get(1), 40);
        assert_eq!(ledger.get(2), 0);
    }

    #[test]
    fn unknown_ids_read_as_zero() {
        let ledger = StockLedger::new();
        assert_eq!(ledger.get(999), 0);
    }
}
