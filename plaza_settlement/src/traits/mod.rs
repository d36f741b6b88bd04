//! Interface contracts for settlement-core storage backends.
//!
//! * [`CartPersistence`] is the narrow durability interface the cart store needs: save, load and
//!   delete one opaque blob per buyer session. Its futures are `Send` because the cart store
//!   fires saves off onto background tasks.
//! * [`SettlementDatabase`] is the full backend contract for the settlement orchestrator:
//!   orders, invoices, and the monotonic invoice status transitions.

mod cart_persistence;
mod settlement_database;

pub use cart_persistence::CartPersistence;
pub use settlement_database::{SettlementDatabase, SettlementDatabaseError};
