use escrow_core::SwapError;
use escrow_types::{Address, ObjectId, TypeError};

/// Errors from ledger transactions and queries.
///
/// Any error returned from a transaction body aborts that transaction: the
/// ledger is left exactly as it was before [`execute`] was called.
///
/// [`execute`]: crate::InMemoryLedger::execute
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The object does not exist, or was consumed by an earlier transaction.
    #[error("object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    /// The sender tried to use an object owned by someone else.
    #[error("object {id:?} is owned by {owner}, not {sender}")]
    NotOwner {
        id: ObjectId,
        owner: Address,
        sender: Address,
    },

    /// The object was read as a different type than it was stored as.
    #[error("object {id:?} has type {actual}, requested {expected}")]
    TypeMismatch {
        id: ObjectId,
        expected: &'static str,
        actual: &'static str,
    },

    /// The same object was taken twice in one transaction.
    #[error("object {0:?} already taken in this transaction")]
    AlreadyTaken(ObjectId),

    /// A transaction transferred an object that already exists without
    /// taking it first.
    #[error("object {0:?} already exists")]
    ObjectAlreadyExists(ObjectId),

    /// A transaction placed an object under an id it did not take, allocate,
    /// or release from a wrapper it took.
    #[error("object {0:?} was not allocated or released by this transaction")]
    UnallocatedId(ObjectId),

    /// The same object was transferred twice in one transaction, or
    /// transferred and also wrapped.
    #[error("object {0:?} transferred more than once")]
    DuplicateTransfer(ObjectId),

    #[error("transaction takes more than {limit} input objects")]
    TooManyInputs { limit: usize },

    #[error("object {id:?} encodes to {size} bytes, limit is {limit}")]
    ObjectTooLarge {
        id: ObjectId,
        size: usize,
        limit: usize,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,

    /// The swap protocol rejected the transaction.
    #[error("transaction aborted: {0}")]
    Aborted(#[from] SwapError),
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl LedgerError {
    /// The protocol error behind an aborted transaction, if any.
    pub fn as_swap_error(&self) -> Option<&SwapError> {
        match self {
            Self::Aborted(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
