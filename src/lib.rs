//! Transaction mempool for a UTXO-style blockchain node: the in-memory
//! staging area where unconfirmed transactions live between network
//! arrival and block inclusion.
//!
//! The core is [`mempool::OrderedPool`] (five interlocking indices over
//! weighted transaction ids) orchestrated by [`mempool::MemPool`]. Network
//! delivery, persistent storage, and the RPC surface are external
//! collaborators this crate only references by contract — see
//! [`validator`] for the consumed `StateValidator`/`UtxoView` capabilities.

pub mod config;
pub mod domain;
pub mod error;
pub mod mempool;
pub mod telemetry;
pub mod validator;

pub use domain::{BoxId, Clock, Input, Millis, Output, PeerId, SystemClock, Transaction, TxId, UnconfirmedTransaction};
pub use error::{MempoolError, ValidationError};
pub use mempool::{MemPool, MemPoolReader, ProcessingOutcome};
