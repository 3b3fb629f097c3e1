//! Foundation types for escrow swaps.
//!
//! This crate provides the identity and execution-context types shared by the
//! swap protocol and the ledger that hosts it. Every other crate in the
//! workspace depends on `escrow-types`.
//!
//! # Key Types
//!
//! - [`Address`]: Opaque identity of a party (owner, sender, custodian)
//! - [`ObjectId`]: Globally unique identity of an owned object
//! - [`TxDigest`]: Identity of a single transaction
//! - [`TxContext`]: Sender, id allocator, and pending transfers of a transaction
//! - [`Object`]: Anything the ledger can own, move, and store
//! - [`Asset`]: An object with a public serde form, which locks and escrows hold
//! - [`Sealed`]: The stored form of an object, restorable only as its own type

pub mod address;
pub mod context;
pub mod error;
pub mod object;
pub mod sealed;

pub use address::Address;
pub use context::{Asset, ErasedObject, Object, PendingTransfer, TxContext, TxDigest};
pub use error::TypeError;
pub use object::ObjectId;
pub use sealed::{Image, Sealed};
