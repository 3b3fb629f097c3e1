use anyhow::Context;
use escrow_core::{escrow, lock, Escrow, Key, Lock};
use escrow_ledger::{InMemoryLedger, LedgerResult, ObjectReader, TransactionEffects};
use escrow_types::{Address, Asset, Image, Object, ObjectId, TypeError};
use serde::{Deserialize, Serialize};

use crate::cli::Scenario;

#[derive(Serialize, Deserialize)]
struct Artwork {
    id: ObjectId,
    title: String,
}

impl Object for Artwork {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
        image.decode()
    }
}

#[derive(Serialize, Deserialize)]
struct Ticket {
    id: ObjectId,
    event: String,
}

impl Object for Ticket {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn restore(image: Image<'_, Self>) -> Result<Self, TypeError> {
        image.decode()
    }
}

#[derive(Clone, Copy)]
struct Party {
    name: &'static str,
    address: Address,
}

impl Party {
    /// A party with a fresh key-backed address.
    fn new(name: &'static str) -> Self {
        Self::at(name, Address::ephemeral())
    }

    fn at(name: &'static str, address: Address) -> Self {
        Self { name, address }
    }
}

/// Outcome of a single transaction in the trade.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Committed { effects: TransactionEffects },
    Aborted { reason: String },
}

#[derive(Debug, Serialize)]
pub struct Step {
    pub actor: String,
    pub action: String,
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
pub struct Holding {
    pub asset: String,
    pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct PartyInfo {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct TradeReport {
    pub scenario: String,
    pub parties: Vec<PartyInfo>,
    pub steps: Vec<Step>,
    pub holdings: Vec<Holding>,
}

/// A locked asset as seen by its owner.
struct LockedAsset {
    asset: ObjectId,
    lock: ObjectId,
    key: ObjectId,
}

/// Record a transaction's outcome as a step and pass its result through.
fn record<R>(
    steps: &mut Vec<Step>,
    actor: Party,
    action: impl Into<String>,
    result: LedgerResult<(R, TransactionEffects)>,
) -> LedgerResult<R> {
    let action = action.into();
    match result {
        Ok((value, effects)) => {
            steps.push(Step {
                actor: actor.name.into(),
                action,
                outcome: Outcome::Committed { effects },
            });
            Ok(value)
        }
        Err(err) => {
            steps.push(Step {
                actor: actor.name.into(),
                action,
                outcome: Outcome::Aborted {
                    reason: err.to_string(),
                },
            });
            Err(err)
        }
    }
}

fn mint_and_lock<T: Asset>(
    ledger: &InMemoryLedger,
    steps: &mut Vec<Step>,
    owner: Party,
    label: &str,
    make: impl FnOnce(ObjectId) -> T,
) -> anyhow::Result<LockedAsset> {
    let result = ledger.execute(owner.address, |tx| {
        let asset = make(tx.ctx().fresh_id());
        let id = asset.id();
        tx.ctx().transfer(asset, owner.address);
        Ok(id)
    });
    let asset = record(steps, owner, format!("mint {label}"), result)
        .with_context(|| format!("minting {label}"))?;

    let result = ledger.execute(owner.address, |tx| {
        let value: T = tx.take(asset)?;
        let (locked, key) = lock::lock(value, tx.ctx());
        let ids = (locked.id(), key.id());
        tx.ctx().transfer(locked, owner.address);
        tx.ctx().transfer(key, owner.address);
        Ok(ids)
    });
    let (lock, key) = record(steps, owner, format!("lock {label}"), result)
        .with_context(|| format!("locking {label}"))?;

    Ok(LockedAsset { asset, lock, key })
}

fn propose<T: Asset>(
    ledger: &InMemoryLedger,
    steps: &mut Vec<Step>,
    owner: Party,
    locked: &LockedAsset,
    exchange_key: ObjectId,
    recipient: Address,
    custodian: Address,
) -> anyhow::Result<ObjectId> {
    let result = ledger.execute(owner.address, |tx| {
        let key: Key = tx.take(locked.key)?;
        let sealed: Lock<T> = tx.take(locked.lock)?;
        escrow::create(key, sealed, exchange_key, recipient, custodian, tx.ctx())?;
        Ok(())
    });
    let escrow_id = result
        .as_ref()
        .ok()
        .and_then(|(_, effects)| effects.received_by(&custodian).first().copied());
    record(steps, owner, "create escrow", result).context("creating escrow")?;
    escrow_id.context("escrow was not delivered to the custodian")
}

/// Run one trade variant against `ledger` and report every transaction.
///
/// Carol acts as custodian from `custodian` if given, otherwise from a fresh
/// address like everyone else.
pub fn run(
    ledger: &InMemoryLedger,
    scenario: Scenario,
    custodian: Option<Address>,
) -> anyhow::Result<TradeReport> {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    let carol = custodian.map_or_else(|| Party::new("carol"), |address| Party::at("carol", address));
    let dave = Party::new("dave");
    let parties = [alice, bob, carol, dave];
    let mut steps = Vec::new();

    let artwork = mint_and_lock(ledger, &mut steps, alice, "artwork", |id| Artwork {
        id,
        title: "Water Lilies".into(),
    })?;
    let ticket = mint_and_lock(ledger, &mut steps, bob, "ticket", |id| Ticket {
        id,
        event: "Opening Night".into(),
    })?;

    let (alice_recipient, alice_wants) = match scenario {
        Scenario::WrongRecipient => (dave.address, ticket.key),
        Scenario::WrongExchangeKey => {
            let decoy = mint_and_lock(ledger, &mut steps, bob, "decoy ticket", |id| Ticket {
                id,
                event: "Matinee".into(),
            })?;
            (bob.address, decoy.key)
        }
        Scenario::Matched | Scenario::Abort => (bob.address, ticket.key),
    };

    let escrow_a = propose::<Artwork>(
        ledger,
        &mut steps,
        alice,
        &artwork,
        alice_wants,
        alice_recipient,
        carol.address,
    )?;
    let escrow_b = propose::<Ticket>(
        ledger,
        &mut steps,
        bob,
        &ticket,
        artwork.key,
        alice.address,
        carol.address,
    )?;

    let settled = if scenario == Scenario::Abort {
        false
    } else {
        let result = ledger.execute(carol.address, |tx| {
            let first: Escrow<Artwork> = tx.take(escrow_a)?;
            let second: Escrow<Ticket> = tx.take(escrow_b)?;
            escrow::swap(first, second, tx.ctx())?;
            Ok(())
        });
        record(&mut steps, carol, "swap", result).is_ok()
    };

    if !settled {
        let result = ledger.execute(carol.address, |tx| {
            let first: Escrow<Artwork> = tx.take(escrow_a)?;
            let second: Escrow<Ticket> = tx.take(escrow_b)?;
            escrow::return_to_sender(first, tx.ctx());
            escrow::return_to_sender(second, tx.ctx());
            Ok(())
        });
        record(&mut steps, carol, "return to senders", result).context("returning escrows")?;
    }

    let name_of = |owner: Option<Address>| match owner {
        Some(address) => parties
            .iter()
            .find(|p| p.address == address)
            .map(|p| p.name.to_string())
            .unwrap_or_else(|| address.to_string()),
        None => "(held in escrow)".to_string(),
    };
    let holdings = vec![
        Holding {
            asset: "artwork".into(),
            owner: name_of(ledger.owner_of(&artwork.asset)?),
        },
        Holding {
            asset: "ticket".into(),
            owner: name_of(ledger.owner_of(&ticket.asset)?),
        },
    ];

    Ok(TradeReport {
        scenario: scenario.to_string(),
        parties: parties
            .iter()
            .map(|p| PartyInfo {
                name: p.name.into(),
                address: p.address.to_hex(),
            })
            .collect(),
        steps,
        holdings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(report: &TradeReport) -> Vec<(&str, &str)> {
        report
            .holdings
            .iter()
            .map(|h| (h.asset.as_str(), h.owner.as_str()))
            .collect()
    }

    fn swap_step(report: &TradeReport) -> Option<&Step> {
        report.steps.iter().find(|s| s.action == "swap")
    }

    #[test]
    fn matched_trade_exchanges_assets() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::Matched, None).unwrap();
        assert_eq!(owners(&report), vec![("artwork", "bob"), ("ticket", "alice")]);
        assert!(matches!(
            swap_step(&report).map(|s| &s.outcome),
            Some(Outcome::Committed { .. })
        ));
    }

    #[test]
    fn wrong_recipient_returns_assets() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::WrongRecipient, None).unwrap();
        assert_eq!(owners(&report), vec![("artwork", "alice"), ("ticket", "bob")]);
        match &swap_step(&report).unwrap().outcome {
            Outcome::Aborted { reason } => assert!(reason.contains("recipient")),
            other => panic!("expected aborted swap, got {other:?}"),
        }
    }

    #[test]
    fn wrong_exchange_key_returns_assets() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::WrongExchangeKey, None).unwrap();
        assert_eq!(owners(&report), vec![("artwork", "alice"), ("ticket", "bob")]);
        match &swap_step(&report).unwrap().outcome {
            Outcome::Aborted { reason } => assert!(reason.contains("exchange key")),
            other => panic!("expected aborted swap, got {other:?}"),
        }
    }

    #[test]
    fn abort_skips_the_swap() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::Abort, None).unwrap();
        assert!(swap_step(&report).is_none());
        assert_eq!(owners(&report), vec![("artwork", "alice"), ("ticket", "bob")]);
    }

    #[test]
    fn report_serializes_to_json() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::Matched, None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenario"], "matched");
        assert_eq!(json["steps"][0]["outcome"]["status"], "committed");
    }

    #[test]
    fn custodian_address_is_used_for_escrows() {
        let ledger = InMemoryLedger::default();
        let custodian = Address::from_label("carol");
        let report = run(&ledger, Scenario::Abort, Some(custodian)).unwrap();

        let carol = report.parties.iter().find(|p| p.name == "carol").unwrap();
        assert_eq!(carol.address, custodian.to_hex());
        let escrows: Vec<_> = report
            .steps
            .iter()
            .filter(|s| s.action == "create escrow")
            .collect();
        assert_eq!(escrows.len(), 2);
        for step in escrows {
            match &step.outcome {
                Outcome::Committed { effects } => {
                    assert_eq!(effects.received_by(&custodian).len(), 1)
                }
                other => panic!("expected committed escrow, got {other:?}"),
            }
        }
    }

    #[test]
    fn parties_get_distinct_addresses() {
        let ledger = InMemoryLedger::default();
        let report = run(&ledger, Scenario::Matched, None).unwrap();
        let mut addresses: Vec<_> = report.parties.iter().map(|p| &p.address).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 4);
    }
}
