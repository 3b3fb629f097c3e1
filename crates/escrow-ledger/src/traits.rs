use escrow_types::{Address, Object, ObjectId};

use crate::error::LedgerResult;
use crate::object::ObjectInfo;

/// Read boundary for ledger queries.
///
/// Reads observe committed state only; effects of a transaction that is
/// still executing (or was aborted) are never visible.
pub trait ObjectReader: Send + Sync {
    /// Metadata of an object. Returns `Ok(None)` if it does not exist at top
    /// level.
    fn read(&self, id: &ObjectId) -> LedgerResult<Option<ObjectInfo>>;

    /// Ids of every top-level object owned by `owner`, in id order.
    fn objects_owned_by(&self, owner: &Address) -> LedgerResult<Vec<ObjectId>>;

    /// Borrow a committed object as `T` for the duration of `f`.
    ///
    /// The object stays in place; only its owner can take it by value.
    fn inspect<T, R, F>(&self, id: &ObjectId, f: F) -> LedgerResult<Option<R>>
    where
        Self: Sized,
        T: Object,
        F: FnOnce(&T) -> R;

    fn exists(&self, id: &ObjectId) -> LedgerResult<bool> {
        Ok(self.read(id)?.is_some())
    }

    fn owner_of(&self, id: &ObjectId) -> LedgerResult<Option<Address>> {
        Ok(self.read(id)?.map(|obj| obj.owner))
    }
}
