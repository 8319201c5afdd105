//! Consumed capabilities: the collaborators the mempool calls out to but
//! does not itself implement (spec §1, §6). Transaction validation against
//! UTXO state, and the state-dependent dispatch in `MemPool::process` step 4,
//! live behind these traits.

use async_trait::async_trait;

use crate::domain::{BoxId, Output, Transaction, UnconfirmedTransaction};
use crate::error::ValidationError;

/// A read-only view over boxes, where boxes produced by pooled transactions
/// shadow the confirmed UTXO set.
pub trait UtxoView: Send + Sync {
    fn box_by_id(&self, box_id: &BoxId) -> Option<Output>;

    /// Shadows this view with the outputs of `txs`, so inputs spending a box
    /// produced by a transaction already sitting in the pool — not yet
    /// confirmed — resolve without waiting for a block (spec §6:
    /// `withUnconfirmedTransactions`). The pooled outputs take priority over
    /// the confirmed view on a conflicting lookup.
    fn with_unconfirmed_transactions<'a>(&'a self, txs: &'a [UnconfirmedTransaction]) -> Box<dyn UtxoView + 'a> {
        Box::new(ShadowedView { base: self, pooled: txs })
    }
}

struct ShadowedView<'a> {
    base: &'a dyn UtxoView,
    pooled: &'a [UnconfirmedTransaction],
}

impl<'a> UtxoView for ShadowedView<'a> {
    fn box_by_id(&self, box_id: &BoxId) -> Option<Output> {
        for utx in self.pooled {
            if let Some(out) = utx.tx.outputs.iter().find(|o| &o.box_id == box_id) {
                return Some(out.clone());
            }
        }
        self.base.box_by_id(box_id)
    }
}

/// Runs a single transaction's scripts/state transition under a cost budget.
/// Implementations may be backed by a full UTXO state, a generic ledger
/// validator, or (see [`StateKind::DigestOnly`]) skipped entirely.
#[async_trait]
pub trait StateValidator: Send + Sync {
    async fn validate_with_cost(
        &self,
        tx: &Transaction,
        ctx: Option<&dyn UtxoView>,
        max_cost: u64,
    ) -> Result<u64, ValidationError>;
}

/// The three capability shapes `process` can dispatch on (spec §4.5 step 4).
/// Rust has no structural way to express "one of these capability shapes is
/// present"; an enum is the idiomatic stand-in for what the source spec
/// describes as dispatch "based on the `state` capability".
pub enum StateKind {
    /// Full UTXO-backed state: missing ancestor boxes are a soft decline,
    /// not a validation failure, since the parent may simply not have
    /// arrived yet.
    Utxo {
        view: Box<dyn UtxoView>,
        validator: Box<dyn StateValidator>,
    },
    /// A generic validator with no box-level view. Reported upstream as
    /// "currently unreachable" but implemented anyway (spec §9(c)).
    Generic(Box<dyn StateValidator>),
    /// Skip validation entirely — the caller (typically the local wallet)
    /// is trusted.
    DigestOnly,
}

impl StateKind {
    /// Checks that every input box referenced by `tx` is resolvable in
    /// `view`, used only by the `Utxo` branch. Returns the ids of any
    /// inputs that could not be resolved.
    pub fn missing_inputs(view: &dyn UtxoView, utx: &UnconfirmedTransaction) -> Vec<BoxId> {
        utx.tx
            .inputs
            .iter()
            .filter_map(|inp| {
                if view.box_by_id(&inp.box_id).is_some() {
                    None
                } else {
                    Some(inp.box_id)
                }
            })
            .collect()
    }
}
