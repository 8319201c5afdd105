//! [`OrderedPool`]: the five-index pool (spec §3, §4.3).
//!
//! The primary index is a `BTreeMap<WeightedId, UnconfirmedTransaction>`
//! ordered so the highest-weight entry sorts first (see
//! [`super::weighted_id::WeightedId`]'s `Ord` impl) — this gives `O(log n)`
//! first/last/insert/remove for free, which is exactly what `take`,
//! eviction, and the capacity check in `can_accept` need. `registry`,
//! `inputs`, and `outputs` are secondary hash indices kept in lockstep.
//!
//! The spec presents `OrderedPool` as value-semantics (every method
//! "produces a new generation"). This implementation mutates in place
//! behind `MemPool`'s single write-lock instead, which is observationally
//! equivalent under the single-writer contract (spec §5, §9) and avoids
//! cloning the whole pool on every `put`.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::config::InvalidCacheSettings;
use crate::domain::{BoxId, Clock, Transaction, TxId, UnconfirmedTransaction};
use crate::telemetry::logging::log_invariant_breach;

use super::approx_cache::ApproxCache;
use super::weighted_id::WeightedId;

pub struct OrderedPool {
    ordered: std::collections::BTreeMap<WeightedId, UnconfirmedTransaction>,
    registry: HashMap<TxId, WeightedId>,
    inputs: HashMap<BoxId, WeightedId>,
    outputs: HashMap<BoxId, WeightedId>,
    invalidated: ApproxCache,
    capacity: usize,
    fee_proposition: Vec<u8>,
}

impl OrderedPool {
    pub fn new(capacity: usize, fee_proposition: Vec<u8>, invalid_cache_cfg: &InvalidCacheSettings) -> Self {
        Self {
            ordered: std::collections::BTreeMap::new(),
            registry: HashMap::new(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            invalidated: ApproxCache::new(invalid_cache_cfg),
            capacity,
            fee_proposition,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.ordered.len()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.registry.contains_key(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&UnconfirmedTransaction> {
        let wtx = self.registry.get(id)?;
        self.ordered.get(wtx)
    }

    /// Weight of the current eviction candidate (lowest weight in the
    /// pool), or `None` if empty.
    pub fn tail_weight(&self) -> Option<i64> {
        self.ordered.keys().next_back().map(|w| w.weight)
    }

    /// Weight of a `WeightedId` already resolved for `inp.box_id`, used by
    /// `MemPool`'s double-spend arbitration to collect conflicting weights.
    pub fn weight_of_spender(&self, box_id: &BoxId) -> Option<i64> {
        self.inputs.get(box_id).map(|w| w.weight)
    }

    pub fn spender_of(&self, box_id: &BoxId) -> Option<&UnconfirmedTransaction> {
        let wtx = self.inputs.get(box_id)?;
        self.ordered.get(wtx)
    }

    /// Inserts `utx`, recomputes its ancestors' weight, and — if the pool
    /// now exceeds capacity — evicts the lowest-weight entry. The
    /// insert-then-evict order is mandatory (spec §4.3): the arriving tx may
    /// raise an ancestor's weight above the would-be victim, so the victim
    /// must be chosen *after* propagation.
    pub fn put(&mut self, utx: UnconfirmedTransaction, clock: &dyn Clock) -> Option<(WeightedId, UnconfirmedTransaction)> {
        let fee_per_kb = utx.tx.fee_per_kb(&self.fee_proposition);
        let wtx = WeightedId::new(utx.tx.id, fee_per_kb, clock.now_millis());
        self.insert_indices(wtx, &utx);
        self.update_family(&utx.tx, wtx.weight);
        if self.ordered.len() > self.capacity {
            self.evict_tail()
        } else {
            None
        }
    }

    /// Like [`Self::put`] but does not run `can_accept` first — used for
    /// re-admitting a previously invalidated transaction (spec §8).
    pub fn put_without_check(
        &mut self,
        utx: UnconfirmedTransaction,
        clock: &dyn Clock,
    ) -> Option<(WeightedId, UnconfirmedTransaction)> {
        self.put(utx, clock)
    }

    /// Removes `tx.id` from the pool if present and reduces ancestors'
    /// weight by the removed entry's weight. No-op if absent.
    pub fn remove(&mut self, utx: &UnconfirmedTransaction) -> bool {
        self.remove_by_id(&utx.tx.id).is_some()
    }

    pub fn remove_by_id(&mut self, tx_id: &TxId) -> Option<(WeightedId, UnconfirmedTransaction)> {
        let wtx = self.registry.get(tx_id).copied()?;
        match self.ordered.remove(&wtx) {
            Some(stored) => {
                self.drop_indices(&stored);
                self.update_family(&stored.tx, -wtx.weight);
                Some((wtx, stored))
            }
            None => {
                log_invariant_breach(&format!(
                    "registry held {tx_id} but orderedTxs did not contain its weighted entry"
                ));
                self.registry.remove(tx_id);
                None
            }
        }
    }

    /// Like [`Self::remove`], but also records `tx.id` in the invalidated
    /// cache, even if the tx was not present in the pool.
    pub fn invalidate(&mut self, utx: &UnconfirmedTransaction, clock: &dyn Clock) -> Option<(WeightedId, UnconfirmedTransaction)> {
        let removed = self.remove_by_id(&utx.tx.id);
        self.invalidated.put(utx.tx.id, clock);
        removed
    }

    /// True iff `tx.id` is admissible: not (approximately) invalidated, not
    /// already present, and either there is room or it would out-rank the
    /// current tail. The capacity branch is computed analytically — a
    /// candidate not yet in the pool has no descendants of its own, so its
    /// post-family weight is simply its `feePerKb` — rather than by mutating
    /// a hypothetical pool, per the "must not mutate state" requirement.
    pub fn can_accept(&self, utx: &UnconfirmedTransaction, clock: &dyn Clock) -> bool {
        let tx_id = utx.tx.id;
        if self.invalidated.might_contain(&tx_id, clock) {
            return false;
        }
        if self.registry.contains_key(&tx_id) {
            return false;
        }
        if self.ordered.len() < self.capacity {
            return true;
        }
        let candidate_weight = utx.tx.fee_per_kb(&self.fee_proposition);
        match self.tail_weight() {
            Some(tail) => candidate_weight > tail,
            None => true,
        }
    }

    fn insert_indices(&mut self, wtx: WeightedId, utx: &UnconfirmedTransaction) {
        self.ordered.insert(wtx, utx.clone());
        self.registry.insert(utx.tx.id, wtx);
        for inp in &utx.tx.inputs {
            self.inputs.insert(inp.box_id, wtx);
        }
        for out in &utx.tx.outputs {
            self.outputs.insert(out.box_id, wtx);
        }
    }

    fn drop_indices(&mut self, utx: &UnconfirmedTransaction) {
        self.registry.remove(&utx.tx.id);
        for inp in &utx.tx.inputs {
            self.inputs.remove(&inp.box_id);
        }
        for out in &utx.tx.outputs {
            self.outputs.remove(&out.box_id);
        }
    }

    fn evict_tail(&mut self) -> Option<(WeightedId, UnconfirmedTransaction)> {
        let (wtx, utx) = self.ordered.pop_last()?;
        self.drop_indices(&utx);
        Some((wtx, utx))
    }

    /// Rebuilds `old_wtx`'s entry across all five indices with `new_weight`.
    /// Returns the new key and the (unchanged) transaction on success, or
    /// `None` if `old_wtx` was not actually present — the invariant breach
    /// spec §4.3/§7 describe.
    fn rebuild_entry(&mut self, old_wtx: WeightedId, new_weight: i64) -> Option<(WeightedId, UnconfirmedTransaction)> {
        let utx = self.ordered.remove(&old_wtx)?;
        let new_wtx = old_wtx.with_weight(new_weight);
        self.ordered.insert(new_wtx, utx.clone());
        self.registry.insert(utx.tx.id, new_wtx);
        for inp in &utx.tx.inputs {
            self.inputs.insert(inp.box_id, new_wtx);
        }
        for out in &utx.tx.outputs {
            self.outputs.insert(out.box_id, new_wtx);
        }
        Some((new_wtx, utx))
    }

    /// Walks `tx`'s inputs and bumps each stored parent's weight by `delta`,
    /// recursing up the spend chain. Implemented as an explicit work-list
    /// (spec §9) with a visited-set so propagation stays linear in the
    /// ancestor set even though the DAG walk is logically recursive.
    /// Acyclicity of the UTXO-spend DAG guarantees termination.
    fn update_family(&mut self, tx: &Transaction, delta: i64) {
        let mut visited: HashSet<TxId> = HashSet::new();
        let mut frontier: Vec<Transaction> = vec![tx.clone()];
        while let Some(current) = frontier.pop() {
            for inp in &current.inputs {
                let Some(parent_wtx) = self.outputs.get(&inp.box_id).copied() else {
                    continue;
                };
                if !visited.insert(parent_wtx.id) {
                    continue;
                }
                match self.rebuild_entry(parent_wtx, parent_wtx.weight + delta) {
                    Some((_, parent_utx)) => frontier.push(parent_utx.tx),
                    None => log_invariant_breach(&format!(
                        "outputs index pointed at {} for box {} but orderedTxs had no such entry",
                        parent_wtx.id, inp.box_id
                    )),
                }
            }
        }
    }

    pub fn take(&self, n: usize) -> Vec<UnconfirmedTransaction> {
        self.ordered.values().take(n).cloned().collect()
    }

    pub fn get_all_prioritized(&self) -> Vec<UnconfirmedTransaction> {
        self.ordered.values().cloned().collect()
    }

    /// Uniformly choose a start index in `[0, max(0, total-n))]` and return
    /// the contiguous slice from there. This is a deliberately cheap
    /// "random sample from the priority region" (spec §9): it biases away
    /// from the tail of the pool, which is accepted as intentional.
    pub fn random(&self, n: usize, rng: &mut impl Rng) -> Vec<UnconfirmedTransaction> {
        let total = self.ordered.len();
        if total == 0 || n == 0 {
            return Vec::new();
        }
        let take_n = n.min(total);
        let max_start = total - take_n;
        let start = if max_start == 0 { 0 } else { rng.gen_range(0..=max_start) };
        self.ordered.values().skip(start).take(take_n).cloned().collect()
    }

    pub fn spent_inputs(&self) -> impl Iterator<Item = &BoxId> {
        self.inputs.keys()
    }

    pub fn weighted_transaction_ids(&self, limit: usize) -> Vec<TxId> {
        self.ordered.keys().take(limit).map(|w| w.id).collect()
    }

    /// Stored post-family-propagation weight of every pooled entry, in
    /// priority order. Used to count how many entries sort strictly before a
    /// hypothetical candidate without recomputing anyone's raw `feePerKb`,
    /// which would ignore any family-weight boost they picked up.
    pub fn weights(&self) -> impl Iterator<Item = i64> + '_ {
        self.ordered.keys().map(|w| w.weight)
    }
}
