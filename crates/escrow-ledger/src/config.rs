use serde::{Deserialize, Serialize};

/// Configuration for an [`InMemoryLedger`](crate::InMemoryLedger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Identifier of this ledger node, mixed into transaction digests.
    pub node_id: u16,
    /// Maximum number of objects a single transaction may take.
    pub max_inputs_per_transaction: usize,
    /// Maximum encoded size of any object written by a transaction.
    pub max_object_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            max_inputs_per_transaction: 16,
            max_object_size: 256 * 1024,
        }
    }
}
