//! OpenTimestamps detached proofs.
//!
//! Reading, writing and manipulating `.ots` files: the binary codec, the
//! commitment-operation evaluator and proof-tree parser, the attestation
//! model, the remote calendar client and the Bitcoin attestation verifier.

pub mod attestation;
pub mod calendar;
pub mod detached;
pub mod error;
pub mod op;
pub mod ser;
pub mod timestamp;
pub mod verifier;

pub use attestation::Attestation;
pub use detached::DetachedTimestamp;
pub use error::Error;
pub use op::{CryptOp, Op};
pub use timestamp::Timestamp;
