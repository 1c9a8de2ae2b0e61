//! Error types for decoding and evaluating proofs.

use thiserror::Error;

/// Errors produced while reading, writing or evaluating a proof.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying reader or writer failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A single raw read request exceeded the allocation safety cap.
    #[error("read of {requested} bytes exceeds cap of {cap}")]
    ReadCapExceeded { requested: usize, cap: usize },
    /// A boolean byte was neither `0x00` nor `0xff`.
    #[error("unexpected boolean byte {0:#04x}")]
    InvalidBool(u8),
    /// A varuint did not fit in 64 bits.
    #[error("varuint overflows 64 bits")]
    VaruintOverflow,
    /// A varbytes length fell outside the caller's accepted range.
    #[error("varbytes length {len} outside range ({min}, {max})")]
    VarbytesOutOfRange { len: u64, min: usize, max: usize },
    /// Fixed magic bytes did not match.
    #[error("magic bytes mismatch, expected {expected} got {actual}")]
    MagicMismatch { expected: String, actual: String },
    /// Data remained after a payload that must be fully consumed.
    #[error("trailing bytes after payload")]
    TrailingBytes,
    /// An opcode tag that is not in the catalog.
    #[error("unknown opcode tag {0:#04x}")]
    UnknownOpTag(u8),
    /// A crypto opcode was required but the tag named something else.
    #[error("opcode {0} is not a crypto op")]
    ExpectedCryptOp(&'static str),
    /// A binary opcode carried an empty argument.
    #[error("empty argument for binary op")]
    EmptyBinaryArg,
    /// A unary opcode was applied to an empty message.
    #[error("{0} applied to empty message")]
    EmptyInput(&'static str),
    /// A file digest whose length disagrees with the declared hash op.
    #[error("op {op} expects {expected} byte digest, got {actual}")]
    DigestLengthMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A pending attestation URI that is not valid UTF-8.
    #[error("calendar uri is not valid utf-8")]
    InvalidUri,
    /// The proof tree nests deeper than the recursion limit.
    #[error("timestamp recursion limit exceeded")]
    RecursionLimit,
    /// A timestamp node with neither attestations nor operations.
    #[error("cannot encode empty timestamp node")]
    EmptyTimestamp,
    /// Two timestamps over different messages cannot be merged.
    #[error("cannot merge timestamps over different messages")]
    MergeMessageMismatch,
    /// The detached file declares an unsupported major version.
    #[error("unexpected major version {0}")]
    UnexpectedMajorVersion(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
