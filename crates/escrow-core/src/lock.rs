//! Commitment primitive: an asset sealed behind a single-use key.
//!
//! Locking an asset produces a [`Lock`] and its paired [`Key`]. The key's id
//! can be published as a commitment before the asset moves: getting the asset
//! back out requires consuming that exact key, so swapping in a different
//! asset would mean spending a different key and breaking the commitment.

use std::fmt;

use escrow_types::{Asset, Image, Object, ObjectId, TxContext, TypeError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SwapError;

/// An asset that can only be retrieved with the matching [`Key`].
#[derive(Serialize)]
pub struct Lock<T> {
    id: ObjectId,
    key: ObjectId,
    locked: T,
}

// Stored form of `Lock`. Private, so only `restore` can rebuild a lock.
#[derive(Deserialize)]
struct LockFields<T> {
    id: ObjectId,
    key: ObjectId,
    locked: T,
}

impl<T> Lock<T> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Id of the key that opens this lock.
    pub fn key(&self) -> ObjectId {
        self.key
    }
}

impl<T: Asset> Object for Lock<T> {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn wrapped_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.locked.id()];
        ids.extend(self.locked.wrapped_ids());
        ids
    }

    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
        let LockFields { id, key, locked } = image.decode()?;
        Ok(Self { id, key, locked })
    }
}

// The locked asset is deliberately left out.
impl<T> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Single-use capability that opens exactly one [`Lock`].
///
/// The only way to obtain a key is [`lock`]: keys are not `Clone` and have no
/// public serde form. [`unlock`] consumes the key, so it can never be
/// presented twice.
#[derive(Debug, Serialize)]
pub struct Key {
    id: ObjectId,
}

#[derive(Deserialize)]
struct KeyFields {
    id: ObjectId,
}

impl Key {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Object for Key {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
        let KeyFields { id } = image.decode()?;
        Ok(Self { id })
    }
}

/// Seal `asset` and return the lock together with the only key that opens it.
pub fn lock<T: Asset>(asset: T, ctx: &mut TxContext) -> (Lock<T>, Key) {
    let key = Key { id: ctx.fresh_id() };
    let lock = Lock {
        id: ctx.fresh_id(),
        key: key.id,
        locked: asset,
    };
    debug!(lock = %lock.id.short_hex(), key = %key.id.short_hex(), "asset locked");
    (lock, key)
}

/// Open `lock` with `key`, destroying both and returning the asset.
pub fn unlock<T: Asset>(lock: Lock<T>, key: Key) -> Result<T, SwapError> {
    let Lock {
        id: _,
        key: expected,
        locked,
    } = lock;
    let Key { id: presented } = key;

    if expected != presented {
        return Err(SwapError::KeyMismatch {
            expected,
            presented,
        });
    }
    Ok(locked)
}
