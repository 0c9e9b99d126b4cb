pub mod checkout;
pub mod ledger;
pub mod reservation;
pub mod session;

pub use checkout::CheckoutOrchestrator;
pub use ledger::StockLedger;
pub use reservation::ReservationEngine;
pub use session::{BasketError, BasketSession, BasketStatus};
