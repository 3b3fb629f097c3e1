use escrow_types::{Address, ObjectId, TxDigest};
use serde::{Deserialize, Serialize};

/// What a committed transaction changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEffects {
    pub digest: TxDigest,
    /// Sequence number of the transaction (1-based, monotonic).
    pub seq: u64,
    pub sender: Address,
    /// Objects that now exist at top level but were not inputs: newly
    /// created, or released from a wrapper such as a lock or escrow.
    pub created: Vec<(ObjectId, Address)>,
    /// Inputs that were handed (back) to an owner.
    pub transferred: Vec<(ObjectId, Address)>,
    /// Inputs that no longer exist at top level: destroyed, or wrapped
    /// inside another object.
    pub removed: Vec<ObjectId>,
}

impl TransactionEffects {
    /// The owner assigned to `id` by this transaction, if any.
    pub fn recipient_of(&self, id: &ObjectId) -> Option<Address> {
        self.created
            .iter()
            .chain(self.transferred.iter())
            .find(|(object, _)| object == id)
            .map(|(_, owner)| *owner)
    }

    /// Ids of all objects this transaction gave to `owner`.
    pub fn received_by(&self, owner: &Address) -> Vec<ObjectId> {
        self.created
            .iter()
            .chain(self.transferred.iter())
            .filter(|(_, to)| to == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns `true` if the transaction removed `id` from top level.
    pub fn was_removed(&self, id: &ObjectId) -> bool {
        self.removed.contains(id)
    }
}
