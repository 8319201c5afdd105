//! [`ApproxCache`]: bounded probabilistic set of recently invalidated
//! transaction ids (spec §4.1).
//!
//! Two tiers: an exact, bounded front cache (evicts least-recently-inserted,
//! entries expire after `front_ttl`), and a bloom-filter back store that
//! rotates every `rotation_interval` inserts so old entries fade out rather
//! than accumulating forever. False positives are allowed (bounded by the
//! configured false-positive rate); false negatives are forbidden for ids
//! still within the front TTL.

use std::collections::{HashMap, VecDeque};

use bloomfilter::Bloom;

use crate::config::InvalidCacheSettings;
use crate::domain::{Clock, Millis, TxId};

struct FrontCache {
    capacity: usize,
    ttl: Millis,
    order: VecDeque<TxId>,
    inserted_at: HashMap<TxId, Millis>,
}

impl FrontCache {
    fn new(capacity: usize, ttl: Millis) -> Self {
        Self { capacity, ttl, order: VecDeque::new(), inserted_at: HashMap::new() }
    }

    fn put(&mut self, id: TxId, now: Millis) {
        if self.inserted_at.contains_key(&id) {
            self.inserted_at.insert(id, now);
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.inserted_at.remove(&oldest);
            }
        }
        self.order.push_back(id);
        self.inserted_at.insert(id, now);
    }

    fn contains(&self, id: &TxId, now: Millis) -> bool {
        match self.inserted_at.get(id) {
            Some(&at) => now.saturating_sub(at) <= self.ttl,
            None => false,
        }
    }
}

struct BackFilter {
    capacity: usize,
    fpr: f64,
    active: Bloom<TxId>,
    standby: Bloom<TxId>,
    inserts_since_rotation: usize,
    rotate_after: usize,
}

impl BackFilter {
    fn new(capacity: usize, fpr: f64, rotate_after: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            fpr,
            active: Bloom::new_for_fp_rate(capacity, fpr),
            standby: Bloom::new_for_fp_rate(capacity, fpr),
            inserts_since_rotation: 0,
            rotate_after: rotate_after.max(1),
        }
    }

    fn put(&mut self, id: &TxId) {
        self.active.set(id);
        self.standby.set(id);
        self.inserts_since_rotation += 1;
        if self.inserts_since_rotation >= self.rotate_after {
            // Rotate: the standby filter (which only ever saw the most
            // recent `rotate_after` inserts) becomes active, and a fresh
            // filter becomes the new standby. This lets old entries fade
            // out instead of accumulating forever.
            std::mem::swap(&mut self.active, &mut self.standby);
            self.standby = Bloom::new_for_fp_rate(self.capacity, self.fpr);
            self.inserts_since_rotation = 0;
        }
    }

    fn might_contain(&self, id: &TxId) -> bool {
        self.active.check(id)
    }
}

/// Bounded, approximate record of recently invalidated transaction ids.
pub struct ApproxCache {
    front: FrontCache,
    back: BackFilter,
}

impl ApproxCache {
    pub fn new(cfg: &InvalidCacheSettings) -> Self {
        let rotate_after =
            ((cfg.filter_capacity as f64) * cfg.rotation_fraction.clamp(0.0, 1.0)).max(1.0) as usize;
        Self {
            front: FrontCache::new(cfg.front_size, cfg.front_ttl_ms),
            back: BackFilter::new(cfg.filter_capacity, cfg.filter_fpr, rotate_after),
        }
    }

    /// Record `id` as invalidated.
    pub fn put(&mut self, id: TxId, clock: &dyn Clock) {
        let now = clock.now_millis();
        self.front.put(id, now);
        self.back.put(&id);
    }

    /// True if `id` is present in the front cache (not expired) or the back
    /// filter reports a positive. May return true for ids never inserted
    /// (bounded false-positive rate); never returns false for an id still
    /// within its front TTL.
    pub fn might_contain(&self, id: &TxId, clock: &dyn Clock) -> bool {
        let now = clock.now_millis();
        self.front.contains(id, now) || self.back.might_contain(id)
    }
}
