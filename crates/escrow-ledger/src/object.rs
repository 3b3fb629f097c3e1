use escrow_types::{Address, Object, ObjectId, Sealed};

use crate::error::{LedgerError, LedgerResult};

/// An owned object at rest: owner, version and sealed value.
///
/// The ledger never interprets the sealed bytes. Typed access goes through
/// [`Sealed::restore`], which only accepts the type the object was sealed as.
#[derive(Debug)]
pub(crate) struct StoredObject {
    pub owner: Address,
    /// Sequence number of the transaction that last wrote this object.
    pub version: u64,
    pub sealed: Sealed,
}

impl StoredObject {
    pub fn new(owner: Address, version: u64, sealed: Sealed) -> Self {
        Self {
            owner,
            version,
            sealed,
        }
    }

    pub fn info(&self) -> ObjectInfo {
        ObjectInfo {
            owner: self.owner,
            type_name: self.sealed.type_name(),
            version: self.version,
            size: self.sealed.size(),
            wrapped: self.sealed.wrapped_ids().to_vec(),
        }
    }

    /// Rebuild the stored value as `T`.
    pub fn restore<T: Object>(&self, id: ObjectId) -> LedgerResult<T> {
        if !self.sealed.is::<T>() {
            return Err(LedgerError::TypeMismatch {
                id,
                expected: std::any::type_name::<T>(),
                actual: self.sealed.type_name(),
            });
        }
        Ok(self.sealed.restore()?)
    }
}

/// Committed metadata of a top-level object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    /// The address that may use this object in a transaction.
    pub owner: Address,
    /// Rust type name of the stored value, for diagnostics.
    pub type_name: &'static str,
    pub version: u64,
    /// Encoded size in bytes.
    pub size: usize,
    /// Ids held inside this object. They are not top-level objects until a
    /// transaction takes this one and releases them.
    pub wrapped: Vec<ObjectId>,
}
