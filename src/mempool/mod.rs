//! The ordered priority pool: family-weight propagation, double-spend
//! replace-by-fee arbitration, and the approximate invalidated-id cache.
//!
//! See `SPEC_FULL.md` §2–§4 for the component breakdown this module
//! mirrors one-to-one:
//! - [`approx_cache`] — `ApproxCache`
//! - [`weighted_id`] — `WeightedId`
//! - [`ordered_pool`] — `OrderedPool`
//! - [`stats`] — `Stats`
//! - [`pool`] — `MemPool`, `ProcessingOutcome`, `MemPoolReader`

pub mod approx_cache;
pub mod ordered_pool;
pub mod pool;
pub mod stats;
pub mod weighted_id;

pub use ordered_pool::OrderedPool;
pub use pool::{MemPool, MemPoolReader, ProcessingOutcome};
pub use stats::{Bin, Stats};
pub use weighted_id::WeightedId;
