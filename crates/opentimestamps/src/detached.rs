//! Detached timestamp file framing.
//!
//! A `.ots` file is a fixed magic header, a major version, the hash op used
//! on the stamped file, the file digest, and one proof tree rooted at that
//! digest.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::op::CryptOp;
use crate::ser::{Deserializer, Serializer};
use crate::timestamp::Timestamp;

/// Magic bytes opening every detached timestamp file.
pub const HEADER_MAGIC: &[u8; 31] =
    b"\x00OpenTimestamps\x00\x00Proof\x00\xbf\x89\xe2\xe8\x84\xe8\x92\x94";

const MAJOR_VERSION: u64 = 1;

/// A proof for a file whose content is held separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTimestamp {
    file_hash_op: CryptOp,
    timestamp: Timestamp,
}

impl DetachedTimestamp {
    /// Wrap a proof tree rooted at a file digest. The digest length must
    /// agree with the hash op that produced it.
    pub fn new(file_hash_op: CryptOp, timestamp: Timestamp) -> Result<Self> {
        let digest_len = timestamp.message().len();
        if digest_len != file_hash_op.digest_len() {
            return Err(Error::DigestLengthMismatch {
                op: file_hash_op.name(),
                expected: file_hash_op.digest_len(),
                actual: digest_len,
            });
        }
        Ok(Self {
            file_hash_op,
            timestamp,
        })
    }

    pub fn file_hash_op(&self) -> CryptOp {
        self.file_hash_op
    }

    /// The stamped file's digest; also the root message of the proof tree.
    pub fn file_digest(&self) -> &[u8] {
        self.timestamp.message()
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn timestamp_mut(&mut self) -> &mut Timestamp {
        &mut self.timestamp
    }

    /// Decode a detached timestamp: magic, major version, hash op, digest,
    /// proof tree.
    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        let mut de = Deserializer::new(r);
        de.assert_magic(HEADER_MAGIC)?;
        let major = de.read_varuint()?;
        if major != MAJOR_VERSION {
            return Err(Error::UnexpectedMajorVersion(major));
        }
        let file_hash_op = CryptOp::decode(&mut de)?;
        let file_digest = de.read_bytes(file_hash_op.digest_len())?;
        let timestamp = Timestamp::decode(&mut de, file_digest)?;
        Ok(Self {
            file_hash_op,
            timestamp,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Encode back to the exact byte layout read by [`from_reader`].
    ///
    /// [`from_reader`]: DetachedTimestamp::from_reader
    pub fn to_writer<W: Write>(&self, w: W) -> Result<()> {
        let mut ser = Serializer::new(w);
        ser.write_bytes(HEADER_MAGIC)?;
        ser.write_varuint(MAJOR_VERSION)?;
        ser.write_byte(self.file_hash_op.tag())?;
        ser.write_bytes(self.timestamp.message())?;
        self.timestamp.encode(&mut ser)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.to_writer(&mut out)?;
        Ok(out)
    }

    /// Human-readable rendering: the file hash line, then the tree.
    pub fn dump(&self) -> String {
        let mut out = format!(
            "File {} hash: {}\n",
            self.file_hash_op.name(),
            hex::encode(self.timestamp.message())
        );
        out.push_str(&self.timestamp.dump());
        out
    }
}

/// SHA-256 a file's contents without holding them in memory, as done when
/// stamping.
pub fn file_sha256<R: Read>(mut r: R) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut r, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}
