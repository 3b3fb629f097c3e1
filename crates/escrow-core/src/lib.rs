//! Two-party atomic swaps through a custodian that cannot keep the assets.
//!
//! The protocol is built from three pieces:
//!
//! 1. [`lock`]: seal an asset behind a single-use [`Key`]; the key's id is a
//!    commitment that can be shared before the asset moves.
//! 2. [`escrow::create`]: unlock the asset into an [`Escrow`] record owned
//!    by the custodian, naming the counterparty and the key id the
//!    counterparty is expected to have spent.
//! 3. [`escrow::swap`]: settle two records that name each other, or
//!    [`escrow::return_to_sender`] to cancel one.
//!
//! Every operation is a single state transition inside one host
//! transaction. A failed operation returns a [`SwapError`] and the host
//! discards the whole transaction.
//!
//! ```rust
//! use escrow_core::{escrow, lock};
//! use escrow_types::{Address, Image, Object, ObjectId, TxContext, TxDigest, TypeError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Token { id: ObjectId }
//!
//! impl Object for Token {
//!     fn id(&self) -> ObjectId { self.id }
//!
//!     fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
//!         image.decode()
//!     }
//! }
//!
//! let alice = Address::from_label("alice");
//! let bob = Address::from_label("bob");
//! let carol = Address::from_label("carol");
//! let mut ctx = TxContext::new(alice, TxDigest::derive(&alice, 0, 1));
//!
//! let token = Token { id: ctx.fresh_id() };
//! let (locked, key) = lock::lock(token, &mut ctx);
//! let wanted = ObjectId::from_hash([7; 32]);
//! escrow::create(key, locked, wanted, bob, carol, &mut ctx).unwrap();
//! assert_eq!(ctx.pending_transfers()[0].recipient, carol);
//! ```

pub mod error;
pub mod escrow;
pub mod lock;

pub use error::SwapError;
pub use escrow::{create, return_to_sender, swap, Escrow};
pub use lock::{unlock, Key, Lock};
