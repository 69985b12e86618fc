// Resource ledger: the settlement's named stockpile counters.
//
// `ResourceLedger` maps each `Resource` to a non-negative amount. Amounts are
// `f64` because production multipliers (trade boost, events, auras) produce
// fractional yields; UIs floor them for display.
//
// `Bundle` is a small list of `(Resource, amount)` pairs used for building
// costs, production yields and payouts. Most bundles have one to three
// entries, so they live inline in a `SmallVec`.
//
// The ledger is only ever mutated through `credit`, `try_debit` and
// `try_spend`. Debits check the whole bundle before touching any counter, so
// a rejected purchase leaves every count unchanged and no count can go
// negative.
//
// See also: `config.rs` for the cost/yield tables, `sim/construction.rs` for
// placement and upgrades, `sim/harvest.rs` for extraction.

use crate::types::Resource;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// A set of resource amounts, e.g. a building cost or a per-tick yield.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(pub SmallVec<[(Resource, f64); 3]>);

impl Bundle {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Build a bundle from `(resource, amount)` pairs.
    pub fn of(pairs: &[(Resource, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&(_, amount)| amount <= 0.0)
    }

    pub fn amount(&self, resource: Resource) -> f64 {
        self.0
            .iter()
            .filter(|(r, _)| *r == resource)
            .map(|&(_, a)| a)
            .sum()
    }

    /// Every amount multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Bundle {
        Bundle(self.0.iter().map(|&(r, a)| (r, a * factor)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        self.0.iter().copied()
    }
}

/// The first resource a debit could not cover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shortfall {
    pub resource: Resource,
    pub needed: f64,
    pub available: f64,
}

/// Named, non-negative resource counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLedger {
    counts: BTreeMap<Resource, f64>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger pre-filled from a bundle (starting stock).
    pub fn from_bundle(bundle: &Bundle) -> Self {
        let mut ledger = Self::new();
        ledger.credit_bundle(bundle);
        ledger
    }

    pub fn get(&self, resource: Resource) -> f64 {
        self.counts.get(&resource).copied().unwrap_or(0.0)
    }

    /// Add `amount` of a resource. Negative and NaN amounts are ignored;
    /// removal must go through a checked debit.
    pub fn credit(&mut self, resource: Resource, amount: f64) {
        if amount > 0.0 {
            *self.counts.entry(resource).or_insert(0.0) += amount;
        }
    }

    pub fn credit_bundle(&mut self, bundle: &Bundle) {
        for (resource, amount) in bundle.iter() {
            self.credit(resource, amount);
        }
    }

    /// Check a bundle against the current stock without changing anything.
    pub fn check(&self, cost: &Bundle) -> Result<(), Shortfall> {
        for resource in Resource::ALL {
            let needed = cost.amount(resource);
            if needed <= 0.0 {
                continue;
            }
            let available = self.get(resource);
            if available < needed {
                return Err(Shortfall {
                    resource,
                    needed,
                    available,
                });
            }
        }
        Ok(())
    }

    pub fn can_afford(&self, cost: &Bundle) -> bool {
        self.check(cost).is_ok()
    }

    /// Remove a whole bundle, or nothing at all.
    pub fn try_debit(&mut self, cost: &Bundle) -> Result<(), Shortfall> {
        self.check(cost)?;
        for (resource, amount) in cost.iter() {
            if amount > 0.0 {
                let entry = self.counts.entry(resource).or_insert(0.0);
                *entry = (*entry - amount).max(0.0);
            }
        }
        Ok(())
    }

    /// Remove a single amount, or nothing at all.
    pub fn try_spend(&mut self, resource: Resource, amount: f64) -> Result<(), Shortfall> {
        self.try_debit(&Bundle::of(&[(resource, amount)]))
    }

    /// All counters, including zeroes, in `Resource` order.
    pub fn entries(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        Resource::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

impl fmt::Display for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (resource, amount) in self.entries() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{resource}: {}", amount.floor())?;
        }
        Ok(())
    }
}
