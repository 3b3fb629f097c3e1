//! In-memory host ledger for escrow swaps.
//!
//! The swap protocol relies on its host for three things: exclusive
//! ownership of objects, a way to hand objects to other parties, and
//! all-or-nothing transactions. This crate provides all three:
//!
//! - [`InMemoryLedger`]: owner-checked object store with atomic
//!   [`execute`](InMemoryLedger::execute)
//! - [`Transaction`]: taking owned objects by value and reaching the
//!   [`TxContext`](escrow_types::TxContext) for protocol calls
//! - [`TransactionEffects`]: what a committed transaction created,
//!   transferred, and removed
//! - [`ObjectReader`]: read boundary for committed state
//!
//! # Design Rules
//!
//! 1. Only the owner of an object can take it into a transaction.
//! 2. A transaction either commits every transfer it made or none of them.
//! 3. Objects taken and not handed to anyone are removed from the ledger.
//! 4. An object can be taken at most once per transaction, and never after it
//!    was removed.
//! 5. A transaction can only place an id it took, allocated, or released from
//!    a wrapper it took. Destroyed and wrapped ids cannot be claimed by
//!    anyone else.

pub mod config;
pub mod effects;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use config::LedgerConfig;
pub use effects::TransactionEffects;
pub use error::{LedgerError, LedgerResult};
pub use memory::{InMemoryLedger, Transaction};
pub use object::ObjectInfo;
pub use traits::ObjectReader;
