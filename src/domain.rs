//! The minimal transaction shape the mempool core compiles against.
//!
//! The real, signed, script-carrying transaction type lives in the node's
//! transaction-construction crate; the mempool only ever needs the shape
//! described here (ids, inputs, outputs, size) so it stays decoupled from
//! signing and script evaluation, per the spec's Non-goals.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Opaque network identity of whichever peer relayed a transaction to us.
/// The mempool never interprets this beyond threading it through for
/// logging/stats; network delivery tracking itself is out of scope.
pub type PeerId = String;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Canonical lowercase-hex encoding, used for ordering the
            /// box-id indices and for log lines.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }
    };
}

id_type!(TxId);
id_type!(BoxId);

/// A single spent box reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub box_id: BoxId,
}

/// A single produced box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub box_id: BoxId,
    pub value: u64,
    pub proposition: Vec<u8>,
}

/// A transaction as the mempool sees it: enough to compute fees, track
/// box-level dependencies, and nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TxId,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Serialized byte size, supplied by the caller. The mempool does not
    /// serialize transactions itself.
    pub size: u32,
}

impl Transaction {
    /// Sum of output values paid to `fee_proposition`.
    pub fn fee(&self, fee_proposition: &[u8]) -> u64 {
        self.outputs
            .iter()
            .filter(|o| o.proposition == fee_proposition)
            .map(|o| o.value)
            .sum()
    }

    /// `fee * 1024 / size`, saturating if size is zero (treated as
    /// maximally dense — callers should reject zero-size transactions
    /// upstream, but the mempool core must not divide by zero).
    pub fn fee_per_kb(&self, fee_proposition: &[u8]) -> i64 {
        let fee = self.fee(fee_proposition) as i64;
        let size = self.size.max(1) as i64;
        (fee * 1024) / size
    }
}

/// A transaction wrapped with arrival metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconfirmedTransaction {
    pub tx: Transaction,
    pub source: Option<PeerId>,
    pub received_at: Millis,
    pub cost_hint: Option<u64>,
}

impl UnconfirmedTransaction {
    pub fn new(tx: Transaction) -> Self {
        Self { tx, source: None, received_at: 0, cost_hint: None }
    }
}

/// Injectable wall-clock source. Exists only so tests can fix time; the
/// behavior it stands in for — `weighted(tx)` re-reading the clock on every
/// `put`, so a removed-then-readmitted tx gets a fresh `createdAt` — is
/// preserved exactly as the spec describes it (see spec §9(b)).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_millis() as Millis
    }
}
