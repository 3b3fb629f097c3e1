use escrow_types::{Address, ObjectId};

/// Reasons a swap-protocol operation aborts.
///
/// Every kind is fatal to the enclosing transaction: the host discards all of
/// the transaction's effects, so no record is left half-consumed and no
/// asset moves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    /// The presented key is not the one the lock was created with.
    #[error("key {presented} does not open lock keyed to {expected}")]
    KeyMismatch {
        expected: ObjectId,
        presented: ObjectId,
    },

    /// One escrow's sender is not the other escrow's intended recipient.
    #[error("sender {sender} is not the counterparty's recipient {recipient}")]
    SenderRecipientMismatch { sender: Address, recipient: Address },

    /// One escrow holds an asset released by a key other than the one its
    /// counterparty asked for.
    #[error("escrowed key {escrowed_key} does not match requested exchange key {exchange_key}")]
    ExchangeObjectMismatch {
        escrowed_key: ObjectId,
        exchange_key: ObjectId,
    },
}
