use tracing::{debug, error, warn};

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();
}

pub fn log_invariant_breach(what: &str) {
    error!("mempool invariant breach: {}", what);
}

pub fn log_capacity_pressure(size: u32, capacity: u32) {
    warn!("mempool at capacity: {}/{}", size, capacity);
}

pub fn log_eviction(id: &str, weight: i64) {
    debug!("evicted {} (weight {})", id, weight);
}
