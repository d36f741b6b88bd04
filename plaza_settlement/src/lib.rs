//! # Plaza Settlement Engine
//!
//! The settlement core for the Plaza peer-to-peer marketplace client. Buyers assemble a cart of
//! goods from multiple independent sellers and settle payment over a decentralized messaging
//! network using Bitcoin-denominated rails (on-chain, Lightning invoices, and bearer-token
//! e-cash). This crate owns the part of that flow that has to be exactly right:
//!
//! 1. The [`cart`] store: per-seller grouped line items with invariant-preserving mutations and
//!    durable persistence across restarts.
//! 2. The [`splitter`]: partitions a multi-seller cart into one order per seller, and fans each
//!    order's total out into one payable invoice per payment recipient (the merchant plus any
//!    value-share recipients), summing exactly with no rounding leakage.
//! 3. The [`receipts`] subsystem: time-windowed, single-shot listeners against the public
//!    receipt stream, fanned out over one explicitly-owned connection pool.
//! 4. The [`resolution`] engine: races receipt evidence against the wallet's own result under a
//!    fixed timeout and classifies the outcome through a strict proof-priority cascade.
//! 5. The [`settlement`] orchestrator: drives invoices through their monotonic status state
//!    machine and exposes each order's computed aggregate status, with async event hooks for
//!    the surrounding application.
//!
//! Wallet transports, catalog data, authentication and UI are all external collaborators with
//! narrow contracts; the core consumes their results and nothing more. Storage backends
//! implement the traits in [`traits`]; a SQLite backend ships behind the `sqlite` feature
//! (default).

pub mod cart;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod receipts;
pub mod resolution;
pub mod settlement;
pub mod splitter;
mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{CartPersistence, SettlementDatabase, SettlementDatabaseError};
