//! Custodian-held swap proposals and their settlement.
//!
//! Each party turns its locked asset into an [`Escrow`] record owned by a
//! custodian. The record remembers which key released the asset and which key
//! the party expects its counterparty to have spent. The custodian can only
//! settle two records against each other with [`swap`], which succeeds when
//! the records name each other, or hand an asset back with
//! [`return_to_sender`]. Neither path lets the custodian keep an asset.

use std::fmt;

use escrow_types::{Address, Asset, Image, Object, ObjectId, TxContext, TypeError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SwapError;
use crate::lock::{self, Key, Lock};

/// One party's half of a swap, held by the custodian.
///
/// Fields are fixed at creation. `escrowed_key` is the id of the key that
/// unlocked `escrowed`; it is the proof of which asset is inside. Records are
/// built only by [`create`], so that proof cannot be made up.
#[derive(Serialize)]
pub struct Escrow<T> {
    id: ObjectId,
    sender: Address,
    recipient: Address,
    exchange_key: ObjectId,
    escrowed_key: ObjectId,
    escrowed: T,
}

#[derive(Deserialize)]
struct EscrowFields<T> {
    id: ObjectId,
    sender: Address,
    recipient: Address,
    exchange_key: ObjectId,
    escrowed_key: ObjectId,
    escrowed: T,
}

impl<T> Escrow<T> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The party that created this record.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// The party meant to receive the escrowed asset.
    pub fn recipient(&self) -> Address {
        self.recipient
    }

    /// Key id the sender expects the counterparty's asset to be released by.
    pub fn exchange_key(&self) -> ObjectId {
        self.exchange_key
    }

    /// Key id that released the asset held here.
    pub fn escrowed_key(&self) -> ObjectId {
        self.escrowed_key
    }
}

impl<T: Asset> Object for Escrow<T> {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn wrapped_ids(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.escrowed.id()];
        ids.extend(self.escrowed.wrapped_ids());
        ids
    }

    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
        let EscrowFields {
            id,
            sender,
            recipient,
            exchange_key,
            escrowed_key,
            escrowed,
        } = image.decode()?;
        Ok(Self {
            id,
            sender,
            recipient,
            exchange_key,
            escrowed_key,
            escrowed,
        })
    }
}

impl<T> fmt::Debug for Escrow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Escrow")
            .field("id", &self.id)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("exchange_key", &self.exchange_key)
            .field("escrowed_key", &self.escrowed_key)
            .finish_non_exhaustive()
    }
}

/// Propose a swap: unlock the asset and hand the resulting record to
/// `custodian`.
///
/// `exchange_key` is the id of the key the counterparty must have spent for
/// the swap to go through, and `recipient` is the counterparty's address.
pub fn create<T: Asset>(
    key: Key,
    lock: Lock<T>,
    exchange_key: ObjectId,
    recipient: Address,
    custodian: Address,
    ctx: &mut TxContext,
) -> Result<(), SwapError> {
    let escrowed_key = key.id();
    let escrowed = lock::unlock(lock, key)?;
    let escrow = Escrow {
        id: ctx.fresh_id(),
        sender: ctx.sender(),
        recipient,
        exchange_key,
        escrowed_key,
        escrowed,
    };

    debug!(
        escrow = %escrow.id.short_hex(),
        sender = %escrow.sender,
        recipient = %recipient,
        custodian = %custodian,
        "escrow created"
    );
    ctx.transfer(escrow, custodian);
    Ok(())
}

/// Settle two matching escrow records, delivering each asset to its
/// recipient.
///
/// Both records are consumed. Every check runs before any transfer is
/// issued, so a failure leaves the transaction without effects.
pub fn swap<T: Asset, U: Asset>(
    obj1: Escrow<T>,
    obj2: Escrow<U>,
    ctx: &mut TxContext,
) -> Result<(), SwapError> {
    let Escrow {
        id: id1,
        sender: sender1,
        recipient: recipient1,
        exchange_key: exchange_key1,
        escrowed_key: escrowed_key1,
        escrowed: escrowed1,
    } = obj1;

    let Escrow {
        id: id2,
        sender: sender2,
        recipient: recipient2,
        exchange_key: exchange_key2,
        escrowed_key: escrowed_key2,
        escrowed: escrowed2,
    } = obj2;

    if sender1 != recipient2 {
        return Err(SwapError::SenderRecipientMismatch {
            sender: sender1,
            recipient: recipient2,
        });
    }
    if sender2 != recipient1 {
        return Err(SwapError::SenderRecipientMismatch {
            sender: sender2,
            recipient: recipient1,
        });
    }
    if escrowed_key1 != exchange_key2 {
        return Err(SwapError::ExchangeObjectMismatch {
            escrowed_key: escrowed_key1,
            exchange_key: exchange_key2,
        });
    }
    if escrowed_key2 != exchange_key1 {
        return Err(SwapError::ExchangeObjectMismatch {
            escrowed_key: escrowed_key2,
            exchange_key: exchange_key1,
        });
    }

    debug!(
        first = %id1.short_hex(),
        second = %id2.short_hex(),
        "escrows swapped"
    );
    ctx.transfer(escrowed1, recipient1);
    ctx.transfer(escrowed2, recipient2);
    Ok(())
}

/// Cancel a proposal, returning the escrowed asset to whoever created it.
pub fn return_to_sender<T: Asset>(obj: Escrow<T>, ctx: &mut TxContext) {
    let Escrow {
        id,
        sender,
        escrowed,
        ..
    } = obj;

    debug!(escrow = %id.short_hex(), sender = %sender, "escrow returned");
    ctx.transfer(escrowed, sender);
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_types::{ErasedObject, Sealed, TxDigest};
    use proptest::prelude::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Card {
        id: ObjectId,
        name: String,
    }

    impl Object for Card {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
            image.decode()
        }
    }

    fn ctx_for(sender: Address, seq: u64) -> TxContext {
        TxContext::new(sender, TxDigest::derive(&sender, 0, seq))
    }

    fn card(ctx: &mut TxContext, name: &str) -> Card {
        Card {
            id: ctx.fresh_id(),
            name: name.into(),
        }
    }

    fn record(
        sender: Address,
        recipient: Address,
        exchange_key: ObjectId,
        escrowed_key: ObjectId,
        escrowed: Card,
    ) -> Escrow<Card> {
        Escrow {
            id: ObjectId::from_hash(*escrowed_key.as_bytes()),
            sender,
            recipient,
            exchange_key,
            escrowed_key,
            escrowed,
        }
    }

    struct Pair {
        alice: Address,
        bob: Address,
        first: Escrow<Card>,
        second: Escrow<Card>,
    }

    fn matching_pair() -> Pair {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut ctx = ctx_for(alice, 1);
        let key_a = ctx.fresh_id();
        let key_b = ctx.fresh_id();
        let first = record(alice, bob, key_b, key_a, card(&mut ctx, "a"));
        let second = record(bob, alice, key_a, key_b, card(&mut ctx, "b"));
        Pair {
            alice,
            bob,
            first,
            second,
        }
    }

    fn recipients_by_name(ctx: TxContext) -> Vec<(String, Address)> {
        ctx.into_transfers()
            .into_iter()
            .map(|t| {
                let card: Card = t.object.seal().unwrap().restore().unwrap();
                (card.name, t.recipient)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    #[test]
    fn create_transfers_record_to_custodian() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let carol = Address::from_label("carol");
        let mut ctx = ctx_for(alice, 1);
        let asset = card(&mut ctx, "a");
        let (lock, key) = lock::lock(asset, &mut ctx);
        let key_id = key.id();
        let wanted = ObjectId::from_hash([9; 32]);

        create(key, lock, wanted, bob, carol, &mut ctx).unwrap();

        let transfers = ctx.into_transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].recipient, carol);
        let escrow: Escrow<Card> = transfers[0].object.seal().unwrap().restore().unwrap();
        assert_eq!(escrow.sender(), alice);
        assert_eq!(escrow.recipient(), bob);
        assert_eq!(escrow.exchange_key(), wanted);
        assert_eq!(escrow.escrowed_key(), key_id);
    }

    #[test]
    fn create_with_wrong_key_transfers_nothing() {
        let alice = Address::from_label("alice");
        let mut ctx = ctx_for(alice, 1);
        let first = card(&mut ctx, "a");
        let second = card(&mut ctx, "b");
        let (lock_a, _key_a) = lock::lock(first, &mut ctx);
        let (_lock_b, key_b) = lock::lock(second, &mut ctx);

        let err = create(
            key_b,
            lock_a,
            ObjectId::from_hash([1; 32]),
            Address::from_label("bob"),
            Address::from_label("carol"),
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, SwapError::KeyMismatch { .. }));
        assert!(ctx.pending_transfers().is_empty());
    }

    #[test]
    fn escrow_reports_the_held_asset() {
        let pair = matching_pair();
        let held = pair.first.escrowed.id;
        assert_eq!(pair.first.wrapped_ids(), vec![held]);
    }

    // Field-for-field copy of `Escrow<Card>` with a made-up key.
    #[derive(Serialize, Deserialize)]
    struct Forgery {
        id: ObjectId,
        sender: Address,
        recipient: Address,
        exchange_key: ObjectId,
        escrowed_key: ObjectId,
        escrowed: Card,
    }

    impl Object for Forgery {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
            image.decode()
        }
    }

    #[test]
    fn escrow_cannot_be_rebuilt_from_a_lookalike() {
        let alice = Address::from_label("alice");
        let mut ctx = ctx_for(alice, 1);
        let forgery = Forgery {
            id: ctx.fresh_id(),
            sender: alice,
            recipient: Address::from_label("bob"),
            exchange_key: ctx.fresh_id(),
            escrowed_key: ctx.fresh_id(),
            escrowed: card(&mut ctx, "junk"),
        };
        let sealed = Sealed::seal(&forgery).unwrap();

        let err = sealed.restore::<Escrow<Card>>().unwrap_err();
        assert!(matches!(err, TypeError::WrongType { .. }));
    }

    // -----------------------------------------------------------------------
    // swap
    // -----------------------------------------------------------------------

    #[test]
    fn swap_delivers_each_asset_to_its_recipient() {
        let Pair {
            alice,
            bob,
            first,
            second,
        } = matching_pair();
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        swap(first, second, &mut ctx).unwrap();

        let delivered = recipients_by_name(ctx);
        assert_eq!(delivered, vec![("a".to_string(), bob), ("b".to_string(), alice)]);
    }

    #[test]
    fn swap_is_symmetric_in_argument_order() {
        let Pair {
            alice,
            bob,
            first,
            second,
        } = matching_pair();
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        swap(second, first, &mut ctx).unwrap();

        let delivered = recipients_by_name(ctx);
        assert_eq!(delivered, vec![("b".to_string(), alice), ("a".to_string(), bob)]);
    }

    #[test]
    fn swap_rejects_wrong_recipient() {
        let mut pair = matching_pair();
        let dave = Address::from_label("dave");
        pair.first.recipient = dave;
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        let err = swap(pair.first, pair.second, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            SwapError::SenderRecipientMismatch {
                sender: pair.bob,
                recipient: dave,
            }
        );
        assert!(ctx.pending_transfers().is_empty());
    }

    #[test]
    fn swap_rejects_unrelated_exchange_key() {
        let mut pair = matching_pair();
        let unrelated = ObjectId::from_hash([0xee; 32]);
        let escrowed_key = pair.first.escrowed_key;
        pair.second.exchange_key = unrelated;
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        let err = swap(pair.first, pair.second, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            SwapError::ExchangeObjectMismatch {
                escrowed_key,
                exchange_key: unrelated,
            }
        );
        assert!(ctx.pending_transfers().is_empty());
    }

    #[test]
    fn sender_checks_run_before_key_checks() {
        let mut pair = matching_pair();
        pair.first.recipient = Address::from_label("dave");
        pair.second.exchange_key = ObjectId::from_hash([0xee; 32]);
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        let err = swap(pair.first, pair.second, &mut ctx).unwrap_err();
        assert!(matches!(err, SwapError::SenderRecipientMismatch { .. }));
    }

    // -----------------------------------------------------------------------
    // return_to_sender
    // -----------------------------------------------------------------------

    #[test]
    fn return_to_sender_ignores_counterparty_fields() {
        let Pair { alice, first, .. } = matching_pair();
        let mut ctx = ctx_for(Address::from_label("carol"), 1);

        return_to_sender(first, &mut ctx);

        assert_eq!(recipients_by_name(ctx), vec![("a".to_string(), alice)]);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_address() -> impl Strategy<Value = Address> {
        any::<[u8; 32]>().prop_map(Address::from_raw)
    }

    fn arb_object_id() -> impl Strategy<Value = ObjectId> {
        any::<[u8; 32]>().prop_map(ObjectId::from_hash)
    }

    proptest! {
        #[test]
        fn any_single_perturbation_is_rejected(
            field in 0usize..4,
            other_address in arb_address(),
            other_key in arb_object_id(),
        ) {
            let mut pair = matching_pair();
            prop_assume!(other_address != pair.alice && other_address != pair.bob);
            prop_assume!(other_key != pair.first.escrowed_key && other_key != pair.second.escrowed_key);

            match field {
                0 => pair.second.recipient = other_address,
                1 => pair.first.recipient = other_address,
                2 => pair.second.exchange_key = other_key,
                _ => pair.first.exchange_key = other_key,
            }

            let mut ctx = ctx_for(Address::from_label("carol"), 1);
            let err = swap(pair.first, pair.second, &mut ctx).unwrap_err();
            match field {
                0 | 1 => prop_assert!(
                    matches!(err, SwapError::SenderRecipientMismatch { .. }),
                    "unexpected error {err:?}"
                ),
                _ => prop_assert!(
                    matches!(err, SwapError::ExchangeObjectMismatch { .. }),
                    "unexpected error {err:?}"
                ),
            }
            prop_assert!(ctx.pending_transfers().is_empty());
        }

        #[test]
        fn return_to_sender_always_reaches_sender(
            sender in arb_address(),
            recipient in arb_address(),
            exchange_key in arb_object_id(),
            escrowed_key in arb_object_id(),
        ) {
            let mut ctx = ctx_for(Address::from_label("carol"), 1);
            let asset = card(&mut ctx, "x");
            let escrow = record(sender, recipient, exchange_key, escrowed_key, asset);

            return_to_sender(escrow, &mut ctx);

            let transfers = ctx.into_transfers();
            prop_assert_eq!(transfers.len(), 1);
            prop_assert_eq!(transfers[0].recipient, sender);
        }
    }
}
