//! Commitment operation catalog and evaluator.
//!
//! Each edge of a proof tree carries one of a fixed set of opcodes. The set
//! is closed, so the catalog is a tagged sum dispatched with exhaustive
//! matches rather than a registry of trait objects.

use std::fmt;
use std::io::{Read, Write};

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::ser::{Deserializer, Serializer};

/// Upper bound on a binary op's argument.
pub const MAX_OP_ARG_SIZE: usize = 4096;

const TAG_APPEND: u8 = 0xf0;
const TAG_PREPEND: u8 = 0xf1;
const TAG_REVERSE: u8 = 0xf2;
const TAG_HEXLIFY: u8 = 0xf3;
const TAG_SHA1: u8 = 0x02;
const TAG_RIPEMD160: u8 = 0x03;
const TAG_SHA256: u8 = 0x08;

/// A hash operation. Unlike the other ops it pins the length of its output,
/// which the detached-file framing relies on to size the file digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptOp {
    Sha1,
    Ripemd160,
    Sha256,
}

impl CryptOp {
    pub fn tag(self) -> u8 {
        match self {
            CryptOp::Sha1 => TAG_SHA1,
            CryptOp::Ripemd160 => TAG_RIPEMD160,
            CryptOp::Sha256 => TAG_SHA256,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CryptOp::Sha1 => "SHA1",
            CryptOp::Ripemd160 => "RIPEMD160",
            CryptOp::Sha256 => "SHA256",
        }
    }

    /// Length in bytes of every digest this op produces.
    pub fn digest_len(self) -> usize {
        match self {
            CryptOp::Sha1 | CryptOp::Ripemd160 => 20,
            CryptOp::Sha256 => 32,
        }
    }

    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            CryptOp::Sha1 => Sha1::digest(msg).to_vec(),
            CryptOp::Ripemd160 => Ripemd160::digest(msg).to_vec(),
            CryptOp::Sha256 => Sha256::digest(msg).to_vec(),
        }
    }

    /// Read one opcode tag and fail unless it names a crypto op.
    pub fn decode<R: Read>(de: &mut Deserializer<R>) -> Result<Self> {
        let tag = de.read_byte()?;
        match Op::decode_with_tag(tag, de)? {
            Op::Crypt(op) => Ok(op),
            other => Err(Error::ExpectedCryptOp(other.name())),
        }
    }
}

impl fmt::Display for CryptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A commitment operation: a deterministic transformation of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// Concatenate the argument after the message.
    Append(Vec<u8>),
    /// Concatenate the argument before the message.
    Prepend(Vec<u8>),
    /// Reverse the message. Deprecated upstream but still evaluated.
    Reverse,
    /// Lowercase hex-encode the message.
    Hexlify,
    /// Hash the message.
    Crypt(CryptOp),
}

impl Op {
    pub fn tag(&self) -> u8 {
        match self {
            Op::Append(_) => TAG_APPEND,
            Op::Prepend(_) => TAG_PREPEND,
            Op::Reverse => TAG_REVERSE,
            Op::Hexlify => TAG_HEXLIFY,
            Op::Crypt(op) => op.tag(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Append(_) => "APPEND",
            Op::Prepend(_) => "PREPEND",
            Op::Reverse => "REVERSE",
            Op::Hexlify => "HEXLIFY",
            Op::Crypt(op) => op.name(),
        }
    }

    /// Decode the op whose tag byte has already been read.
    pub fn decode_with_tag<R: Read>(tag: u8, de: &mut Deserializer<R>) -> Result<Self> {
        match tag {
            TAG_APPEND => Ok(Op::Append(Self::decode_arg(de)?)),
            TAG_PREPEND => Ok(Op::Prepend(Self::decode_arg(de)?)),
            TAG_REVERSE => Ok(Op::Reverse),
            TAG_HEXLIFY => Ok(Op::Hexlify),
            TAG_SHA1 => Ok(Op::Crypt(CryptOp::Sha1)),
            TAG_RIPEMD160 => Ok(Op::Crypt(CryptOp::Ripemd160)),
            TAG_SHA256 => Ok(Op::Crypt(CryptOp::Sha256)),
            tag => Err(Error::UnknownOpTag(tag)),
        }
    }

    fn decode_arg<R: Read>(de: &mut Deserializer<R>) -> Result<Vec<u8>> {
        let arg = de.read_varbytes(0, MAX_OP_ARG_SIZE)?;
        if arg.is_empty() {
            return Err(Error::EmptyBinaryArg);
        }
        Ok(arg)
    }

    /// Write the tag byte, plus the argument for binary ops.
    pub fn encode<W: Write>(&self, ser: &mut Serializer<W>) -> Result<()> {
        ser.write_byte(self.tag())?;
        match self {
            Op::Append(arg) | Op::Prepend(arg) => ser.write_varbytes(arg),
            _ => Ok(()),
        }
    }

    /// Execute the operation against a message, producing the next message.
    /// The result never shares storage with the input.
    pub fn apply(&self, msg: &[u8]) -> Result<Vec<u8>> {
        match self {
            Op::Append(arg) => {
                let mut out = Vec::with_capacity(msg.len() + arg.len());
                out.extend_from_slice(msg);
                out.extend_from_slice(arg);
                Ok(out)
            }
            Op::Prepend(arg) => {
                let mut out = Vec::with_capacity(arg.len() + msg.len());
                out.extend_from_slice(arg);
                out.extend_from_slice(msg);
                Ok(out)
            }
            Op::Reverse => {
                if msg.is_empty() {
                    return Err(Error::EmptyInput("REVERSE"));
                }
                Ok(msg.iter().rev().copied().collect())
            }
            Op::Hexlify => {
                if msg.is_empty() {
                    return Err(Error::EmptyInput("HEXLIFY"));
                }
                Ok(hex::encode(msg).into_bytes())
            }
            Op::Crypt(op) => Ok(op.digest(msg)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Append(arg) | Op::Prepend(arg) => {
                write!(f, "{} {}", self.name(), hex::encode(arg))
            }
            _ => f.write_str(self.name()),
        }
    }
}
