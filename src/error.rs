//! Crate-wide error taxonomy.
//!
//! Business-logic rejections (fee too low, pool full, double-spend loss,
//! blacklisting) are never modeled as `Err` — they are values of
//! [`crate::mempool::ProcessingOutcome`], returned from `process` alongside
//! the (possibly unchanged) pool. These types are for failures that are not
//! themselves a valid outcome of `process`: a validator that could not reach
//! a verdict, or an invariant breach the pool itself cannot recover from.

use thiserror::Error;

/// Errors surfaced by a [`crate::validator::StateValidator`] implementation.
///
/// A validator returning `Err` here means it could not determine whether the
/// transaction is valid (e.g. the UTXO-backed store errored, or the cost
/// budget was exhausted mid-check) — as opposed to determining that the
/// transaction *is* invalid, which is a normal `Ok` result carrying a
/// rejection reason. `process` treats a validator error as `Invalidated`.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("validation exceeded cost budget of {max_cost}")]
    CostExceeded { max_cost: u64 },

    #[error("referenced box not found: {0}")]
    MissingBox(String),

    #[error("validator backend error: {0}")]
    Backend(String),
}

/// Crate-wide error type for failures outside the `process` outcome model.
#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, MempoolError>;
