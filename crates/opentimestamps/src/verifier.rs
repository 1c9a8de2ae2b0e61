//! Bitcoin attestation verification.
//!
//! The verifier never talks to the network itself. It is injected with a
//! [`BlockHeaderSource`] exposing the two lookups an attestation check
//! needs, which keeps the verification logic testable against in-memory
//! fakes and leaves transport concerns to the caller.

use bitcoin::block::Header;
use bitcoin::hashes::Hash;
use bitcoin::BlockHash;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::attestation::Attestation;
use crate::timestamp::Timestamp;

/// The two lookups needed to check a Bitcoin attestation.
pub trait BlockHeaderSource {
    /// Hash of the block at `height` on the best chain.
    fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash>;
    /// Full header for a block hash.
    fn block_header(&self, hash: &BlockHash) -> anyhow::Result<Header>;
}

/// Errors from checking Bitcoin attestations.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The attested height does not fit a signed 64-bit integer.
    #[error("block height {0} out of range")]
    HeightOutOfRange(u64),
    /// The message does not equal the block's Merkle root.
    #[error("message does not match the merkle root of block {height}")]
    MerkleRootMismatch { height: u64 },
    /// The header carries a timestamp outside the representable range.
    #[error("block time {0} is not representable")]
    InvalidBlockTime(u32),
    /// The injected header source failed.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Result of checking one Bitcoin attestation in a tree.
#[derive(Debug)]
pub struct BitcoinVerification {
    /// Message of the node carrying the attestation.
    pub message: Vec<u8>,
    /// Attested block height.
    pub height: u64,
    /// Attested UTC time, or why the check failed.
    pub result: Result<DateTime<Utc>, VerifyError>,
}

/// Checks Bitcoin attestations against an injected header source.
pub struct BitcoinVerifier<S> {
    source: S,
}

impl<S: BlockHeaderSource> BitcoinVerifier<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Check a single attestation: the digest must equal the Merkle root of
    /// the block at the attested height. Returns the block's UTC time.
    pub fn verify_attestation(
        &self,
        digest: &[u8],
        height: u64,
    ) -> Result<DateTime<Utc>, VerifyError> {
        if height > i64::MAX as u64 {
            return Err(VerifyError::HeightOutOfRange(height));
        }
        let hash = self.source.block_hash(height)?;
        let header = self.source.block_header(&hash)?;
        if digest != header.merkle_root.to_byte_array().as_slice() {
            return Err(VerifyError::MerkleRootMismatch { height });
        }
        let time = DateTime::from_timestamp(i64::from(header.time), 0)
            .ok_or(VerifyError::InvalidBlockTime(header.time))?;
        debug!(height, %time, "bitcoin attestation verified");
        Ok(time)
    }

    /// Check every Bitcoin attestation in the tree. Pending and unknown
    /// attestations are invisible here.
    pub fn bitcoin_verifications(&self, ts: &Timestamp) -> Vec<BitcoinVerification> {
        let mut results = Vec::new();
        ts.walk(&mut |node| {
            for attestation in node.attestations() {
                if let Attestation::Bitcoin { height } = *attestation {
                    results.push(BitcoinVerification {
                        message: node.message().to_vec(),
                        height,
                        result: self.verify_attestation(node.message(), height),
                    });
                }
            }
        });
        results
    }

    /// The earliest successfully attested time in the tree.
    ///
    /// `Ok(None)` when the tree holds no Bitcoin attestations at all; when
    /// every attestation fails to verify, the last failure is returned.
    pub fn verify_timestamp(
        &self,
        ts: &Timestamp,
    ) -> Result<Option<DateTime<Utc>>, VerifyError> {
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut last_err = None;
        for verification in self.bitcoin_verifications(ts) {
            match verification.result {
                Ok(time) => {
                    if earliest.map_or(true, |t| time < t) {
                        earliest = Some(time);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }
        match (earliest, last_err) {
            (None, Some(e)) => Err(e),
            (found, _) => Ok(found),
        }
    }
}
