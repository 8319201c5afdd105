//! [`Stats`]: rolling histogram of wait-time vs. fee, used to recommend
//! fees and estimate wait times (spec §3, §4.4).

use crate::domain::Millis;

use super::weighted_id::WeightedId;

const BINS: usize = 60;

#[derive(Debug, Default, Clone, Copy)]
pub struct Bin {
    pub count: u64,
    pub total_fee: u64,
}

pub struct Stats {
    start_measurement: Millis,
    taken_txns: u64,
    histogram: [Bin; BINS],
}

impl Stats {
    pub fn new(start_measurement: Millis) -> Self {
        Self { start_measurement, taken_txns: 0, histogram: [Bin::default(); BINS] }
    }

    pub fn start_measurement(&self) -> Millis {
        self.start_measurement
    }

    pub fn taken_txns(&self) -> u64 {
        self.taken_txns
    }

    /// Records that `wtx` left the pool at `now`. `waitMinutes` is clamped
    /// to the last bin (spec §4.4) rather than growing the histogram
    /// unboundedly.
    pub fn add(&mut self, now: Millis, wtx: &WeightedId) {
        let wait_ms = now.saturating_sub(wtx.created_at);
        let wait_minutes = ((wait_ms / 60_000) as usize).min(BINS - 1);
        let bin = &mut self.histogram[wait_minutes];
        bin.count += 1;
        bin.total_fee = bin.total_fee.saturating_add(wtx.fee_per_kb.max(0) as u64);
        self.taken_txns += 1;
    }

    pub fn bin(&self, minute: usize) -> Bin {
        self.histogram.get(minute).copied().unwrap_or_default()
    }

    /// Smallest `m <= max_wait_min` with a non-empty bin, returning the
    /// average fee-per-kb in that bin scaled to `size`, or `None` if every
    /// bin in range is empty (caller falls back to `minimal_fee_amount`).
    pub fn recommended_fee(&self, max_wait_min: usize, size: u64) -> Option<u64> {
        for m in 0..=max_wait_min.min(BINS - 1) {
            let bin = self.histogram[m];
            if bin.count > 0 {
                return Some((bin.total_fee / bin.count) * size / 1024);
            }
        }
        None
    }
}
