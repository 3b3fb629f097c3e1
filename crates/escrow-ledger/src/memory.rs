use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use escrow_types::{Address, Object, ObjectId, PendingTransfer, Sealed, TxContext, TxDigest};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::effects::TransactionEffects;
use crate::error::{LedgerError, LedgerResult};
use crate::object::{ObjectInfo, StoredObject};
use crate::traits::ObjectReader;

/// In-memory host ledger for tests, demos, and embedding.
///
/// Holds every top-level object together with its owner and executes
/// transactions atomically: a transaction body sees a consistent view of
/// committed state, and its transfers are applied only if the body (and the
/// commit checks) succeed. Transactions are serialized behind a single
/// `RwLock`; queries may run concurrently with each other.
pub struct InMemoryLedger {
    config: LedgerConfig,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    objects: HashMap<ObjectId, StoredObject>,
    seq: u64,
}

/// A transfer that passed the commit checks, ready to be written.
struct PendingWrite {
    id: ObjectId,
    owner: Address,
    sealed: Sealed,
}

/// A transaction in progress.
///
/// Objects are taken out of the committed view by value; anything taken and
/// not transferred again by the end of the transaction is removed. Values
/// handed out here are rebuilt from committed state, so a transaction that
/// fails leaves every object where it was.
pub struct Transaction<'a> {
    objects: &'a HashMap<ObjectId, StoredObject>,
    max_inputs: usize,
    ctx: TxContext,
    taken: BTreeSet<ObjectId>,
    released: HashSet<ObjectId>,
}

impl Transaction<'_> {
    pub fn sender(&self) -> Address {
        self.ctx.sender()
    }

    pub fn digest(&self) -> TxDigest {
        *self.ctx.digest()
    }

    /// The execution context handed to protocol operations.
    pub fn ctx(&mut self) -> &mut TxContext {
        &mut self.ctx
    }

    /// Take an object owned by the sender as a value of type `T`.
    ///
    /// Everything wrapped inside the object becomes available to place at
    /// top level (or wrap again) in this transaction.
    pub fn take<T: Object>(&mut self, id: ObjectId) -> LedgerResult<T> {
        if self.taken.contains(&id) {
            return Err(LedgerError::AlreadyTaken(id));
        }
        let stored = self.objects.get(&id).ok_or(LedgerError::ObjectNotFound(id))?;
        let sender = self.ctx.sender();
        if stored.owner != sender {
            return Err(LedgerError::NotOwner {
                id,
                owner: stored.owner,
                sender,
            });
        }
        if self.taken.len() >= self.max_inputs {
            return Err(LedgerError::TooManyInputs {
                limit: self.max_inputs,
            });
        }

        let value = stored.restore::<T>(id)?;
        self.taken.insert(id);
        self.released
            .extend(stored.sealed.wrapped_ids().iter().copied());
        Ok(value)
    }

    /// Number of objects taken so far.
    pub fn inputs(&self) -> usize {
        self.taken.len()
    }
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Execute `body` as one atomic transaction signed by `sender`.
    ///
    /// On success the transaction's transfers are committed and its effects
    /// returned. If `body` fails, or a transfer fails the commit checks, the
    /// ledger is left untouched and the error is returned.
    pub fn execute<R, F>(&self, sender: Address, body: F) -> LedgerResult<(R, TransactionEffects)>
    where
        F: FnOnce(&mut Transaction<'_>) -> LedgerResult<R>,
    {
        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        let seq = state.seq + 1;
        let digest = TxDigest::derive(&sender, self.config.node_id, seq);

        let mut tx = Transaction {
            objects: &state.objects,
            max_inputs: self.config.max_inputs_per_transaction,
            ctx: TxContext::new(sender, digest),
            taken: BTreeSet::new(),
            released: HashSet::new(),
        };
        let outcome = body(&mut tx);
        let Transaction {
            ctx,
            taken,
            released,
            ..
        } = tx;

        let prepared = outcome.and_then(|value| {
            let writes = self.prepare_writes(&state.objects, &taken, &released, ctx)?;
            Ok((value, writes))
        });

        match prepared {
            Ok((value, writes)) => {
                let effects = Self::apply(&mut state, seq, digest, sender, taken, writes);
                debug!(
                    digest = %digest.short_hex(),
                    seq,
                    sender = %sender,
                    created = effects.created.len(),
                    transferred = effects.transferred.len(),
                    removed = effects.removed.len(),
                    "transaction committed"
                );
                Ok((value, effects))
            }
            Err(err) => {
                warn!(
                    digest = %digest.short_hex(),
                    sender = %sender,
                    error = %err,
                    "transaction aborted"
                );
                Err(err)
            }
        }
    }

    /// Number of top-level objects.
    pub fn len(&self) -> LedgerResult<usize> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.objects.len())
    }

    /// Returns `true` if the ledger holds no objects.
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> LedgerResult<u64> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.seq)
    }

    /// Check every transfer against committed state and seal it for storage.
    ///
    /// An id may be placed, at top level or inside another object, only if
    /// the transaction took it, allocated it, or released it from a wrapper
    /// it took, and only once.
    fn prepare_writes(
        &self,
        objects: &HashMap<ObjectId, StoredObject>,
        taken: &BTreeSet<ObjectId>,
        released: &HashSet<ObjectId>,
        ctx: TxContext,
    ) -> LedgerResult<Vec<PendingWrite>> {
        let allocated: HashSet<ObjectId> = ctx.created_ids().into_iter().collect();
        let placeable =
            |id: &ObjectId| taken.contains(id) || allocated.contains(id) || released.contains(id);
        let mut placed = HashSet::new();
        let mut writes = Vec::new();

        for PendingTransfer { object, recipient } in ctx.into_transfers() {
            let id = object.object_id();
            if !placed.insert(id) {
                return Err(LedgerError::DuplicateTransfer(id));
            }
            if objects.contains_key(&id) && !taken.contains(&id) {
                return Err(LedgerError::ObjectAlreadyExists(id));
            }
            if !placeable(&id) {
                return Err(LedgerError::UnallocatedId(id));
            }

            let sealed = object.seal()?;
            for inner in sealed.wrapped_ids() {
                if !placed.insert(*inner) {
                    return Err(LedgerError::DuplicateTransfer(*inner));
                }
                if !placeable(inner) {
                    return Err(LedgerError::UnallocatedId(*inner));
                }
            }
            if sealed.size() > self.config.max_object_size {
                return Err(LedgerError::ObjectTooLarge {
                    id,
                    size: sealed.size(),
                    limit: self.config.max_object_size,
                });
            }

            writes.push(PendingWrite {
                id,
                owner: recipient,
                sealed,
            });
        }

        Ok(writes)
    }

    fn apply(
        state: &mut LedgerState,
        seq: u64,
        digest: TxDigest,
        sender: Address,
        taken: BTreeSet<ObjectId>,
        writes: Vec<PendingWrite>,
    ) -> TransactionEffects {
        let written: HashSet<ObjectId> = writes.iter().map(|w| w.id).collect();
        let mut effects = TransactionEffects {
            digest,
            seq,
            sender,
            created: Vec::new(),
            transferred: Vec::new(),
            removed: Vec::new(),
        };

        for id in taken.iter().filter(|id| !written.contains(*id)) {
            state.objects.remove(id);
            effects.removed.push(*id);
        }

        for write in writes {
            if taken.contains(&write.id) {
                effects.transferred.push((write.id, write.owner));
            } else {
                effects.created.push((write.id, write.owner));
            }
            state
                .objects
                .insert(write.id, StoredObject::new(write.owner, seq, write.sealed));
        }

        state.seq = seq;
        effects
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl ObjectReader for InMemoryLedger {
    fn read(&self, id: &ObjectId) -> LedgerResult<Option<ObjectInfo>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.objects.get(id).map(StoredObject::info))
    }

    fn inspect<T, R, F>(&self, id: &ObjectId, f: F) -> LedgerResult<Option<R>>
    where
        T: Object,
        F: FnOnce(&T) -> R,
    {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        match state.objects.get(id) {
            Some(stored) => {
                let value = stored.restore::<T>(*id)?;
                Ok(Some(f(&value)))
            }
            None => Ok(None),
        }
    }

    fn objects_owned_by(&self, owner: &Address) -> LedgerResult<Vec<ObjectId>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let mut ids: Vec<ObjectId> = state
            .objects
            .iter()
            .filter(|(_, obj)| obj.owner == *owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("node_id", &self.config.node_id)
            .field("object_count", &self.len().ok())
            .field("transactions", &self.transaction_count().ok())
            .finish()
    }
}
