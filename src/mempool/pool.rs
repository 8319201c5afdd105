//! [`MemPool`]: orchestrates fee checks, capacity, state-validation
//! call-outs, and double-spend arbitration around one [`OrderedPool`] and
//! one [`Stats`] (spec §4.5).

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;

use crate::config::MempoolSettings;
use crate::domain::{BoxId, Clock, SystemClock, TxId, UnconfirmedTransaction};
use crate::telemetry::logging::{log_capacity_pressure, log_eviction};
use crate::telemetry::METRICS;
use crate::validator::StateKind;

use super::ordered_pool::OrderedPool;
use super::stats::Stats;
use super::weighted_id::WeightedId;

/// Every value `process` can report (spec §4.5, §7). No other outcome is
/// ever emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Accepted,
    DoubleSpendingLoser { winners: Vec<TxId> },
    Declined { reason: String },
    Invalidated { reason: String },
}

impl ProcessingOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProcessingOutcome::Accepted)
    }
}

pub struct MemPool {
    settings: MempoolSettings,
    pool: RwLock<OrderedPool>,
    stats: RwLock<Stats>,
    clock: Arc<dyn Clock>,
}

impl MemPool {
    pub fn new(settings: MempoolSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: MempoolSettings, clock: Arc<dyn Clock>) -> Self {
        let pool = OrderedPool::new(
            settings.mempool_capacity as usize,
            settings.fee_proposition_bytes.clone(),
            &settings.invalid_cache,
        );
        let stats = Stats::new(clock.now_millis());
        Self { settings, pool: RwLock::new(pool), stats: RwLock::new(stats), clock }
    }

    /// Runs the full acceptance state machine for one transaction (spec
    /// §4.5). All mutating work happens under the pool's single write lock,
    /// so two concurrent callers serialize as if arriving at a single-writer
    /// owner in whichever order they acquire the lock (spec §5).
    pub async fn process(&self, utx: UnconfirmedTransaction, state: &StateKind) -> ProcessingOutcome {
        // 1. Blacklist.
        if self.settings.is_blacklisted(&utx.tx.id) {
            self.invalidate(&utx);
            return ProcessingOutcome::Invalidated { reason: "blacklisted".to_string() };
        }

        // 2. Fee floor.
        let fee = utx.tx.fee(&self.settings.fee_proposition_bytes);
        if fee < self.settings.minimal_fee_amount {
            return ProcessingOutcome::Declined { reason: "min fee not met".to_string() };
        }

        // 3. Acceptance gate.
        {
            let pool = self.pool.read();
            if !pool.can_accept(&utx, self.clock.as_ref()) {
                if pool.size() as u32 >= self.settings.mempool_capacity {
                    log_capacity_pressure(pool.size() as u32, self.settings.mempool_capacity);
                }
                return ProcessingOutcome::Declined { reason: "pool full or invalidated".to_string() };
            }
        }

        // 4. Validation dispatch.
        match state {
            StateKind::Utxo { view, validator } => {
                // Shadow the confirmed view with pooled outputs first, so a
                // tx spending a box a still-unconfirmed parent produced
                // resolves instead of being declined for a "missing" input
                // that is merely sitting in the pool (spec §4.5 step 4).
                let pooled = self.pool.read().get_all_prioritized();
                let combined = view.with_unconfirmed_transactions(&pooled);
                let missing = StateKind::missing_inputs(combined.as_ref(), &utx);
                if !missing.is_empty() {
                    return ProcessingOutcome::Declined {
                        reason: "not all utxos in place yet".to_string(),
                    };
                }
                if let Some(outcome) = self
                    .run_validation(validator.as_ref(), &utx, Some(combined.as_ref()))
                    .await
                {
                    return outcome;
                }
            }
            StateKind::Generic(validator) => {
                if let Some(outcome) = self.run_validation(validator.as_ref(), &utx, None).await {
                    return outcome;
                }
            }
            StateKind::DigestOnly => {}
        }

        // 5. Double-spend arbitration.
        self.accept_if_no_double_spend(utx)
    }

    async fn run_validation(
        &self,
        validator: &dyn crate::validator::StateValidator,
        utx: &UnconfirmedTransaction,
        ctx: Option<&dyn crate::validator::UtxoView>,
    ) -> Option<ProcessingOutcome> {
        match validator.validate_with_cost(&utx.tx, ctx, self.settings.max_transaction_cost).await {
            Ok(_) => None,
            Err(e) => {
                self.invalidate(utx);
                Some(ProcessingOutcome::Invalidated { reason: e.to_string() })
            }
        }
    }

    fn accept_if_no_double_spend(&self, utx: UnconfirmedTransaction) -> ProcessingOutcome {
        let mut pool = self.pool.write();

        let mut conflict_ids: Vec<TxId> = Vec::new();
        let mut conflict_weights: Vec<i64> = Vec::new();
        let mut seen: HashSet<TxId> = HashSet::new();
        let conflicting_boxes: Vec<BoxId> = utx.tx.inputs.iter().map(|i| i.box_id).collect();
        for box_id in &conflicting_boxes {
            if let Some(spender) = pool.spender_of(box_id) {
                if seen.insert(spender.tx.id) {
                    conflict_ids.push(spender.tx.id);
                    if let Some(w) = pool.weight_of_spender(box_id) {
                        conflict_weights.push(w);
                    }
                }
            }
        }

        if conflict_ids.is_empty() {
            let evicted = pool.put(utx, self.clock.as_ref());
            drop(pool);
            self.record_eviction(evicted);
            METRICS.inc_counter("mempool_accepted_total");
            return ProcessingOutcome::Accepted;
        }

        let avg: f64 = conflict_weights.iter().sum::<i64>() as f64 / conflict_weights.len() as f64;
        let candidate_weight = utx.tx.fee_per_kb(&self.settings.fee_proposition_bytes) as f64;

        if candidate_weight > avg {
            for id in &conflict_ids {
                let removed = pool.remove_by_id(id);
                self.record_removed(removed);
            }
            let evicted = pool.put(utx, self.clock.as_ref());
            drop(pool);
            self.record_eviction(evicted);
            METRICS.inc_counter("mempool_double_spend_wins_total");
            ProcessingOutcome::Accepted
        } else {
            drop(pool);
            METRICS.inc_counter("mempool_double_spend_losses_total");
            ProcessingOutcome::DoubleSpendingLoser { winners: conflict_ids }
        }
    }

    pub fn invalidate(&self, utx: &UnconfirmedTransaction) {
        let mut pool = self.pool.write();
        let removed = pool.invalidate(utx, self.clock.as_ref());
        drop(pool);
        self.record_removed(removed);
        METRICS.inc_counter("mempool_invalidations_total");
    }

    /// Admits `utx` if `can_accept` passes. Returns whether it was
    /// installed (spec §6: `put(utx)`).
    pub fn put(&self, utx: UnconfirmedTransaction) -> bool {
        let mut pool = self.pool.write();
        if !pool.can_accept(&utx, self.clock.as_ref()) {
            return false;
        }
        let evicted = pool.put(utx, self.clock.as_ref());
        drop(pool);
        self.record_eviction(evicted);
        true
    }

    /// `put` over an iterator (spec §6: `put(iter)`). Returns the number
    /// actually installed.
    pub fn put_iter<I: IntoIterator<Item = UnconfirmedTransaction>>(&self, txs: I) -> usize {
        txs.into_iter().filter(|utx| self.put(utx.clone())).count()
    }

    /// Admits every tx in `txs` without running `can_accept` first (spec
    /// §6: `putWithoutCheck(iter)`), used to re-admit previously
    /// invalidated transactions.
    pub fn put_without_check_iter<I: IntoIterator<Item = UnconfirmedTransaction>>(&self, txs: I) {
        let mut evictions = Vec::new();
        {
            let mut pool = self.pool.write();
            for utx in txs {
                evictions.push(pool.put_without_check(utx, self.clock.as_ref()));
            }
        }
        for evicted in evictions {
            self.record_eviction(evicted);
        }
    }

    /// Removes `utx` if present. No-op (and `false`) if absent (spec §6:
    /// `remove(utx)`).
    pub fn remove(&self, utx: &UnconfirmedTransaction) -> bool {
        self.pool.write().remove(utx)
    }

    /// Retains only pooled transactions for which `predicate` holds (spec
    /// §6: `filter(predicate)`).
    pub fn filter<F: Fn(&UnconfirmedTransaction) -> bool>(&self, predicate: F) {
        let mut pool = self.pool.write();
        let to_drop: Vec<TxId> = pool
            .get_all_prioritized()
            .iter()
            .filter(|u| !predicate(u))
            .map(|u| u.tx.id)
            .collect();
        for id in to_drop {
            pool.remove_by_id(&id);
        }
    }

    /// Removes every pooled transaction whose id is in `exclude` (spec §6:
    /// `filter(excludeSet)` — typically the ids a just-mined block
    /// confirmed).
    pub fn filter_excluding(&self, exclude: &HashSet<TxId>) {
        self.filter(|u| !exclude.contains(&u.tx.id))
    }

    fn record_eviction(&self, removed: Option<(WeightedId, UnconfirmedTransaction)>) {
        if let Some((wtx, _)) = &removed {
            METRICS.inc_counter("mempool_evictions_total");
            log_eviction(&wtx.id.to_hex(), wtx.weight);
        }
        self.record_removed(removed);
    }

    fn record_removed(&self, removed: Option<(WeightedId, UnconfirmedTransaction)>) {
        if let Some((wtx, _)) = removed {
            let now = self.clock.now_millis();
            self.stats.write().add(now, &wtx);
        }
    }

    // -- queries (spec §4.5, §6) -------------------------------------------------

    pub fn size(&self) -> usize {
        self.pool.read().size()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.pool.read().contains(id)
    }

    pub fn get(&self, id: &TxId) -> Option<UnconfirmedTransaction> {
        self.pool.read().get(id).cloned()
    }

    pub fn take(&self, n: usize) -> Vec<UnconfirmedTransaction> {
        self.pool.read().take(n)
    }

    pub fn get_all_prioritized(&self) -> Vec<UnconfirmedTransaction> {
        self.pool.read().get_all_prioritized()
    }

    pub fn random(&self, n: usize, rng: &mut impl Rng) -> Vec<UnconfirmedTransaction> {
        self.pool.read().random(n, rng)
    }

    pub fn spent_inputs(&self) -> Vec<BoxId> {
        self.pool.read().spent_inputs().copied().collect()
    }

    pub fn weighted_transaction_ids(&self, limit: usize) -> Vec<TxId> {
        self.pool.read().weighted_transaction_ids(limit)
    }

    /// Smallest `m <= max_wait_min` with observed removals, scaled to
    /// `size`, or `minimal_fee_amount` if the histogram has nothing to go
    /// on (spec §4.5).
    pub fn get_recommended_fee(&self, max_wait_min: usize, size: u64) -> u64 {
        self.stats
            .read()
            .recommended_fee(max_wait_min, size)
            .unwrap_or(self.settings.minimal_fee_amount)
    }

    /// Estimated wait, in milliseconds, for a transaction paying `fee` at
    /// `size` bytes: how many pooled entries currently outrank it, scaled by
    /// observed throughput (spec §4.5).
    pub fn get_expected_wait_time(&self, fee: i64, size: u64) -> u64 {
        let stats = self.stats.read();
        if stats.taken_txns() == 0 {
            return 0;
        }
        let fee_per_kb = (fee * 1024) / (size.max(1) as i64);
        let synthetic = WeightedId::new(TxId::from_bytes([0xffu8; 32]), fee_per_kb, self.clock.now_millis());
        let pool = self.pool.read();
        // Count entries that sort strictly before the candidate, i.e. have a
        // higher *stored* weight — not a recomputed feePerKb, which would
        // ignore any family-propagation boost a parent has picked up.
        let pos = pool.weights().filter(|&w| w > synthetic.weight).count() as u64;
        let now = self.clock.now_millis();
        let elapsed = now.saturating_sub(stats.start_measurement());
        elapsed * pos / stats.taken_txns()
    }

    pub fn get_reader(&self) -> MemPoolReader<'_> {
        MemPoolReader { inner: self }
    }

    pub fn settings(&self) -> &MempoolSettings {
        &self.settings
    }
}

/// Read-only facade handed to API layers (spec §6). Exposes only the
/// queries, never `process`/`put`/`remove`/`invalidate`.
pub struct MemPoolReader<'a> {
    inner: &'a MemPool,
}

impl<'a> MemPoolReader<'a> {
    pub fn size(&self) -> usize {
        self.inner.size()
    }
    pub fn contains(&self, id: &TxId) -> bool {
        self.inner.contains(id)
    }
    pub fn get(&self, id: &TxId) -> Option<UnconfirmedTransaction> {
        self.inner.get(id)
    }
    pub fn take(&self, n: usize) -> Vec<UnconfirmedTransaction> {
        self.inner.take(n)
    }
    pub fn get_all_prioritized(&self) -> Vec<UnconfirmedTransaction> {
        self.inner.get_all_prioritized()
    }
    pub fn get_recommended_fee(&self, max_wait_min: usize, size: u64) -> u64 {
        self.inner.get_recommended_fee(max_wait_min, size)
    }
    pub fn get_expected_wait_time(&self, fee: i64, size: u64) -> u64 {
        self.inner.get_expected_wait_time(fee, size)
    }
}
