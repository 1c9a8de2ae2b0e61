//! Attestation catalog.
//!
//! An attestation is a leaf assertion that a message equals a value known to
//! an external witness. On the wire it is an 8-byte tag followed by a
//! length-prefixed payload; tags outside the catalog are preserved verbatim
//! so that proofs carrying future attestation kinds survive a round trip.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::ser::{Deserializer, Serializer};

pub const TAG_SIZE: usize = 8;
pub const MAX_PAYLOAD_SIZE: usize = 8192;
pub const MAX_URI_LENGTH: usize = 1000;

/// Tag of an attestation anchored in a Bitcoin block header.
pub const BITCOIN_TAG: [u8; TAG_SIZE] = [0x05, 0x88, 0x96, 0x0d, 0x73, 0xd7, 0x19, 0x01];
/// Tag of a placeholder attestation owed by a calendar server.
pub const PENDING_TAG: [u8; TAG_SIZE] = [0x83, 0xdf, 0xe3, 0x0d, 0x2e, 0xf9, 0x0c, 0x8e];

/// A leaf assertion in a proof tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attestation {
    /// The message equals the Merkle root of the Bitcoin block at `height`.
    Bitcoin { height: u64 },
    /// A calendar at `uri` owes a stronger proof for the message.
    Pending { uri: String },
    /// An attestation kind this implementation does not know. Tag and
    /// payload are retained exactly as read.
    Unknown { tag: [u8; TAG_SIZE], payload: Vec<u8> },
}

impl Attestation {
    /// Decode one attestation: 8 tag bytes, then a length-prefixed payload.
    /// Known variants must consume their payload fully.
    pub fn decode<R: Read>(de: &mut Deserializer<R>) -> Result<Self> {
        let tag_bytes = de.read_bytes(TAG_SIZE)?;
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&tag_bytes);

        let payload = de.read_varbytes(0, MAX_PAYLOAD_SIZE)?;
        let mut inner = Deserializer::new(payload.as_slice());
        match tag {
            BITCOIN_TAG => {
                let height = inner.read_varuint()?;
                inner.assert_eof()?;
                Ok(Attestation::Bitcoin { height })
            }
            PENDING_TAG => {
                let uri_bytes = inner.read_varbytes(0, MAX_URI_LENGTH)?;
                inner.assert_eof()?;
                let uri = String::from_utf8(uri_bytes).map_err(|_| Error::InvalidUri)?;
                Ok(Attestation::Pending { uri })
            }
            tag => Ok(Attestation::Unknown { tag, payload }),
        }
    }

    /// Write the 8-byte tag, then the length-prefixed payload.
    pub fn encode<W: Write>(&self, ser: &mut Serializer<W>) -> Result<()> {
        let (tag, payload) = match self {
            Attestation::Bitcoin { height } => {
                let mut inner = Serializer::new(Vec::new());
                inner.write_varuint(*height)?;
                (&BITCOIN_TAG, inner.into_inner())
            }
            Attestation::Pending { uri } => {
                let mut inner = Serializer::new(Vec::new());
                inner.write_varbytes(uri.as_bytes())?;
                (&PENDING_TAG, inner.into_inner())
            }
            Attestation::Unknown { tag, payload } => (tag, payload.clone()),
        };
        ser.write_bytes(tag)?;
        ser.write_varbytes(&payload)
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attestation::Bitcoin { height } => {
                write!(f, "BitcoinAttestation(height={height})")
            }
            Attestation::Pending { uri } => write!(f, "PendingAttestation(uri={uri})"),
            Attestation::Unknown { tag, payload } => write!(
                f,
                "UnknownAttestation(tag={}, payload={})",
                hex::encode(tag),
                hex::encode(payload)
            ),
        }
    }
}
