use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::TypeError;
use crate::object::ObjectId;
use crate::sealed::{Image, Sealed};

/// A value that can be owned by an address and moved between owners.
///
/// Objects are uniquely owned and moved by value. Implementors must not be
/// `Clone` if duplicating them would break a protocol invariant (keys, locks,
/// escrow records). Hosts store objects as [`Sealed`] images between
/// transactions and rebuild them with [`restore`](Object::restore), which is
/// the only decoding path: a type that keeps its fields private and does not
/// implement `Deserialize` cannot be rebuilt from bytes a caller made up.
pub trait Object: Serialize + Send + Sync + Sized + 'static {
    /// The object's identity, fixed at creation.
    fn id(&self) -> ObjectId;

    /// Ids of the objects stored inside this one, at any depth.
    fn wrapped_ids(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    /// Rebuild the object from its stored image.
    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError>;
}

/// A plain object with a public serde form.
///
/// Assets are what locks and escrows hold. Anyone can build an asset value,
/// so hosts guard them by id alone.
pub trait Asset: Object + DeserializeOwned {}

impl<T: Object + DeserializeOwned> Asset for T {}

/// Type-erased view of an [`Object`] awaiting transfer.
pub trait ErasedObject: Send {
    fn object_id(&self) -> ObjectId;

    /// Rust name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;

    fn seal(&self) -> Result<Sealed, TypeError>;
}

impl<T: Object> ErasedObject for T {
    fn object_id(&self) -> ObjectId {
        self.id()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn seal(&self) -> Result<Sealed, TypeError> {
        Sealed::seal(self)
    }
}

/// An ownership reassignment recorded by a transaction.
pub struct PendingTransfer {
    pub object: Box<dyn ErasedObject>,
    pub recipient: Address,
}

impl fmt::Debug for PendingTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransfer")
            .field("object", &self.object.object_id())
            .field("type", &self.object.type_name())
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Identity of a single transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxDigest([u8; 32]);

impl TxDigest {
    /// Derive the digest of the `seq`-th transaction executed by `node_id`
    /// on behalf of `sender`.
    pub fn derive(sender: &Address, node_id: u16, seq: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"escrow-tx-v1:");
        hasher.update(sender.as_bytes());
        hasher.update(&node_id.to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxDigest({})", self.short_hex())
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Execution context of one transaction.
///
/// Carries the identity of the caller, allocates ids for objects created by
/// the transaction, and collects the transfers the transaction performs. The
/// host applies the collected transfers only if the transaction succeeds.
pub struct TxContext {
    sender: Address,
    digest: TxDigest,
    ids_created: u64,
    transfers: Vec<PendingTransfer>,
}

impl TxContext {
    pub fn new(sender: Address, digest: TxDigest) -> Self {
        Self {
            sender,
            digest,
            ids_created: 0,
            transfers: Vec::new(),
        }
    }

    /// The address that signed this transaction.
    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn digest(&self) -> &TxDigest {
        &self.digest
    }

    /// Allocate a new, globally unique object id.
    pub fn fresh_id(&mut self) -> ObjectId {
        let id = ObjectId::derive(&self.digest, self.ids_created);
        self.ids_created += 1;
        id
    }

    /// Number of ids allocated so far.
    pub fn ids_created(&self) -> u64 {
        self.ids_created
    }

    /// Every id allocated by this transaction, in allocation order.
    pub fn created_ids(&self) -> Vec<ObjectId> {
        (0..self.ids_created)
            .map(|index| ObjectId::derive(&self.digest, index))
            .collect()
    }

    /// Hand exclusive ownership of `object` to `recipient`.
    pub fn transfer<T: Object>(&mut self, object: T, recipient: Address) {
        self.transfers.push(PendingTransfer {
            object: Box::new(object),
            recipient,
        });
    }

    pub fn pending_transfers(&self) -> &[PendingTransfer] {
        &self.transfers
    }

    /// Consume the context, yielding the transfers in the order they were made.
    pub fn into_transfers(self) -> Vec<PendingTransfer> {
        self.transfers
    }
}

impl fmt::Debug for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("sender", &self.sender)
            .field("digest", &self.digest)
            .field("ids_created", &self.ids_created)
            .field("pending_transfers", &self.transfers.len())
            .finish()
    }
}
