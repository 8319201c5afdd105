//! End-to-end scenarios exercising `MemPool::process` against a full
//! instance (no mocked internals), mirroring the six walkthroughs in
//! `SPEC_FULL.md` §8.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pecunovus_mempool::config::{InvalidCacheSettings, MempoolSettings};
use pecunovus_mempool::mempool::ProcessingOutcome;
use pecunovus_mempool::validator::StateKind;
use pecunovus_mempool::{BoxId, Clock, Input, MemPool, Output, Transaction, TxId, UnconfirmedTransaction};

const FEE_PROP: &[u8] = b"fee-proposition";

struct FakeClock(AtomicU64);
impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
impl FakeClock {
    fn set(&self, v: u64) {
        self.0.store(v, Ordering::SeqCst);
    }
}

fn txid(byte: u8) -> TxId {
    let mut b = [0u8; 32];
    b[31] = byte;
    TxId::from_bytes(b)
}

fn boxid(byte: u8) -> BoxId {
    let mut b = [0u8; 32];
    b[30] = byte;
    BoxId::from_bytes(b)
}

fn tx(id: u8, fee: u64, size: u32, spends: Option<u8>, produces: u8) -> Transaction {
    Transaction {
        id: txid(id),
        inputs: spends.map(|b| vec![Input { box_id: boxid(b) }]).unwrap_or_default(),
        outputs: vec![Output { box_id: boxid(produces), value: fee, proposition: FEE_PROP.to_vec() }],
        size,
    }
}

fn settings(capacity: u32, min_fee: u64) -> MempoolSettings {
    MempoolSettings {
        mempool_capacity: capacity,
        minimal_fee_amount: min_fee,
        max_transaction_cost: 10_000_000,
        blacklisted_transactions: Default::default(),
        fee_proposition_bytes: FEE_PROP.to_vec(),
        invalid_cache: InvalidCacheSettings::default(),
    }
}

fn mempool(capacity: u32, min_fee: u64) -> (MemPool, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock(AtomicU64::new(1)));
    (MemPool::with_clock(settings(capacity, min_fee), clock.clone() as Arc<dyn Clock>), clock)
}

#[tokio::test]
async fn scenario_1_empty_to_accept() {
    let (mp, _clock) = mempool(10, 100_000);
    let a = tx(1, 1_000_000, 200, None, 1);
    let outcome = mp.process(UnconfirmedTransaction::new(a.clone()), &StateKind::DigestOnly).await;
    assert_eq!(outcome, ProcessingOutcome::Accepted);
    assert_eq!(mp.size(), 1);
    assert_eq!(mp.take(10).into_iter().map(|u| u.tx.id).collect::<Vec<_>>(), vec![a.id]);
}

#[tokio::test]
async fn scenario_2_fee_floor() {
    let (mp, _clock) = mempool(10, 100_000);
    let b = tx(2, 50_000, 200, None, 2);
    let outcome = mp.process(UnconfirmedTransaction::new(b), &StateKind::DigestOnly).await;
    assert_eq!(outcome, ProcessingOutcome::Declined { reason: "min fee not met".to_string() });
    assert_eq!(mp.size(), 0);
}

#[tokio::test]
async fn scenario_3_double_spend_loss() {
    let (mp, _clock) = mempool(10, 100_000);
    let a = tx(1, 1_000_000, 200, Some(77), 1); // feePerKb = 1_000_000 * 1024 / 200
    mp.process(UnconfirmedTransaction::new(a.clone()), &StateKind::DigestOnly).await;

    let a_prime = tx(2, 780_000, 200, Some(77), 2); // lower feePerKb, same spent box
    let outcome = mp.process(UnconfirmedTransaction::new(a_prime), &StateKind::DigestOnly).await;
    assert_eq!(outcome, ProcessingOutcome::DoubleSpendingLoser { winners: vec![a.id] });
    assert!(mp.contains(&a.id));
}

#[tokio::test]
async fn scenario_4_double_spend_win_and_eviction() {
    let (mp, clock) = mempool(10, 100_000);
    let a = tx(1, 1_000_000, 200, Some(77), 1);
    mp.process(UnconfirmedTransaction::new(a.clone()), &StateKind::DigestOnly).await;

    clock.set(0); // A'' arrives immediately for a clean 0-minute wait bucket
    let a_double = tx(2, 3_000_000, 200, Some(77), 2); // much higher feePerKb
    let outcome = mp.process(UnconfirmedTransaction::new(a_double.clone()), &StateKind::DigestOnly).await;
    assert_eq!(outcome, ProcessingOutcome::Accepted);
    assert!(!mp.contains(&a.id));
    assert!(mp.contains(&a_double.id));
    // A's removal (wait = 0 minutes, since it was created and evicted in the
    // same tick) lands in histogram bin 0; the recommended fee for a
    // 200-byte tx should reflect A's observed feePerKb rather than falling
    // back to the minimum fee.
    assert_eq!(mp.get_recommended_fee(0, 200), 1_000_000);
}

#[tokio::test]
async fn scenario_5_family_propagation_protects_parent_from_eviction() {
    let (mp, _clock) = mempool(2, 100_000);
    let p = tx(1, 1_000_000, 1024, None, 9); // feePerKb = 1_000_000 (fee*1024/1024)
    mp.process(UnconfirmedTransaction::new(p.clone()), &StateKind::DigestOnly).await;

    let q = tx(2, 2_000_000, 1024, None, 8); // standalone, feePerKb = 2_000_000
    mp.process(UnconfirmedTransaction::new(q.clone()), &StateKind::DigestOnly).await;

    // pool is now at capacity (2). Child C spends P's output, raising P's
    // weight well above Q's — so the next admission must evict Q, not P.
    let c = tx(3, 5_000_000, 1024, Some(9), 10); // feePerKb = 5_000_000
    let outcome = mp.process(UnconfirmedTransaction::new(c.clone()), &StateKind::DigestOnly).await;
    assert_eq!(outcome, ProcessingOutcome::Accepted);

    assert!(mp.contains(&p.id), "parent must survive: its weight was bumped by the child");
    assert!(mp.contains(&c.id));
    assert!(!mp.contains(&q.id), "the standalone tx with no family boost should be evicted instead");
}

#[tokio::test]
async fn scenario_6_invalidated_then_reoffered_is_declined() {
    let (mp, _clock) = mempool(10, 100_000);
    let x = tx(5, 1_000_000, 200, None, 5);
    let utx = UnconfirmedTransaction::new(x.clone());

    mp.invalidate(&utx);

    let outcome = mp.process(utx, &StateKind::DigestOnly).await;
    assert!(matches!(outcome, ProcessingOutcome::Declined { .. }));
    assert!(!mp.contains(&x.id));
}
