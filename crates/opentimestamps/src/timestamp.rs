//! The proof tree.
//!
//! A timestamp node holds the running message plus any number of
//! attestations and outgoing operation edges. The wire encoding is
//! prefix-coded: `0xff` separates the steps of a node, `0x00` introduces an
//! attestation, and any other byte is an opcode tag. Both sentinels are
//! disjoint from the opcode catalog, so the grammar is unambiguous.

use std::fmt::Write as _;
use std::io::{Read, Write};

use crate::attestation::Attestation;
use crate::error::{Error, Result};
use crate::op::Op;
use crate::ser::{Deserializer, Serializer};

/// Maximum nesting depth accepted while parsing a proof tree.
pub const RECURSION_LIMIT: usize = 1000;

const ATTESTATION_TAG: u8 = 0x00;
const STEP_SEPARATOR: u8 = 0xff;

/// A node in the proof tree.
///
/// The message of every child equals its incoming opcode applied to this
/// node's message; the parser establishes that invariant by executing each
/// opcode as it descends, and the only mutating operations ([`append_op`],
/// [`merge`]) preserve it.
///
/// [`append_op`]: Timestamp::append_op
/// [`merge`]: Timestamp::merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub(crate) message: Vec<u8>,
    pub(crate) attestations: Vec<Attestation>,
    pub(crate) ops: Vec<(Op, Timestamp)>,
}

impl Timestamp {
    /// A leaf with no attestations and no outgoing edges.
    pub fn new(message: Vec<u8>) -> Self {
        Self {
            message,
            attestations: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn attestations(&self) -> &[Attestation] {
        &self.attestations
    }

    pub fn ops(&self) -> &[(Op, Timestamp)] {
        &self.ops
    }

    pub fn add_attestation(&mut self, attestation: Attestation) {
        self.attestations.push(attestation);
    }

    /// Add an operation edge, executing `op` to derive the child's message.
    /// Returns the new child so calls can be chained downward.
    pub fn append_op(&mut self, op: Op) -> Result<&mut Timestamp> {
        let next = op.apply(&self.message)?;
        self.ops.push((op, Timestamp::new(next)));
        let (_, child) = self.ops.last_mut().expect("just pushed");
        Ok(child)
    }

    /// Decode a proof tree whose root message is already known.
    pub fn decode<R: Read>(de: &mut Deserializer<R>, message: Vec<u8>) -> Result<Self> {
        let mut ts = Timestamp::new(message);
        ts.parse_into(de, RECURSION_LIMIT)?;
        Ok(ts)
    }

    fn parse_into<R: Read>(&mut self, de: &mut Deserializer<R>, limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(Error::RecursionLimit);
        }
        loop {
            let tag = de.read_byte()?;
            if tag == STEP_SEPARATOR {
                let tag = de.read_byte()?;
                self.parse_step(de, tag, limit)?;
            } else {
                return self.parse_step(de, tag, limit);
            }
        }
    }

    fn parse_step<R: Read>(
        &mut self,
        de: &mut Deserializer<R>,
        tag: u8,
        limit: usize,
    ) -> Result<()> {
        if tag == ATTESTATION_TAG {
            self.attestations.push(Attestation::decode(de)?);
        } else {
            let op = Op::decode_with_tag(tag, de)?;
            let message = op.apply(&self.message)?;
            let mut child = Timestamp::new(message);
            child.parse_into(de, limit - 1)?;
            self.ops.push((op, child));
        }
        Ok(())
    }

    /// Encode the tree. Attestations are written before operation edges,
    /// each list in stored order; this matches the layout real `.ots`
    /// files carry, so decode-then-encode reproduces them byte for byte.
    pub fn encode<W: Write>(&self, ser: &mut Serializer<W>) -> Result<()> {
        let total = self.attestations.len() + self.ops.len();
        if total == 0 {
            return Err(Error::EmptyTimestamp);
        }
        let mut idx = 0usize;
        for attestation in &self.attestations {
            idx += 1;
            if idx < total {
                ser.write_byte(STEP_SEPARATOR)?;
            }
            ser.write_byte(ATTESTATION_TAG)?;
            attestation.encode(ser)?;
        }
        for (op, child) in &self.ops {
            idx += 1;
            if idx < total {
                ser.write_byte(STEP_SEPARATOR)?;
            }
            op.encode(ser)?;
            child.encode(ser)?;
        }
        Ok(())
    }

    /// Post-order traversal over every node of the tree.
    pub fn walk<'a, F: FnMut(&'a Timestamp)>(&'a self, visit: &mut F) {
        for (_, child) in &self.ops {
            child.walk(visit);
        }
        visit(self);
    }

    pub(crate) fn walk_mut<F: FnMut(&mut Timestamp)>(&mut self, visit: &mut F) {
        for (_, child) in &mut self.ops {
            child.walk_mut(visit);
        }
        visit(self);
    }

    /// Merge another proof over the same message into this one.
    ///
    /// Attestations already present are not duplicated. An incoming edge
    /// whose opcode equals an existing edge merges recursively into it;
    /// other edges are appended. Nothing already in `self` is dropped.
    pub fn merge(&mut self, other: Timestamp) -> Result<()> {
        if self.message != other.message {
            return Err(Error::MergeMessageMismatch);
        }
        for attestation in other.attestations {
            if !self.attestations.contains(&attestation) {
                self.attestations.push(attestation);
            }
        }
        for (op, child) in other.ops {
            match self.ops.iter_mut().find(|(existing, _)| *existing == op) {
                Some((_, existing_child)) => existing_child.merge(child)?,
                None => self.ops.push((op, child)),
            }
        }
        Ok(())
    }

    pub(crate) fn dump_indent(&self, out: &mut String, indent: usize) {
        for attestation in &self.attestations {
            let _ = writeln!(out, "{}{attestation}", " ".repeat(indent));
        }
        // when the node forks, indent the branches one step further
        let next_indent = if self.ops.len() > 1 { indent + 1 } else { indent };
        for (op, child) in &self.ops {
            let _ = writeln!(out, "{}{op}", " ".repeat(indent));
            child.dump_indent(out, next_indent);
        }
    }

    /// Human-readable rendering of the tree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_indent(&mut out, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{Attestation, BITCOIN_TAG};
    use crate::op::{CryptOp, Op};

    fn encode(ts: &Timestamp) -> Vec<u8> {
        let mut ser = Serializer::new(Vec::new());
        ts.encode(&mut ser).unwrap();
        ser.into_inner()
    }

    fn decode(data: &[u8], message: &[u8]) -> crate::error::Result<Timestamp> {
        Timestamp::decode(&mut Deserializer::new(data), message.to_vec())
    }

    fn sample_tree() -> Timestamp {
        let mut root = Timestamp::new(b"hello".to_vec());
        let branch = root.append_op(Op::Append(b" world".to_vec())).unwrap();
        let tip = branch.append_op(Op::Crypt(CryptOp::Sha256)).unwrap();
        tip.add_attestation(Attestation::Bitcoin { height: 358391 });
        let other = root.append_op(Op::Prepend(vec![0x42])).unwrap();
        other.add_attestation(Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".into(),
        });
        root
    }

    #[test]
    fn round_trip() {
        let tree = sample_tree();
        let data = encode(&tree);
        let decoded = decode(&data, b"hello").unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(encode(&decoded), data);
    }

    #[test]
    fn child_message_relation() {
        let decoded = decode(&encode(&sample_tree()), b"hello").unwrap();
        decoded.walk(&mut |node| {
            for (op, child) in node.ops() {
                assert_eq!(child.message(), op.apply(node.message()).unwrap());
            }
        });
    }

    #[test]
    fn multiple_attestations_on_one_node() {
        let mut node = Timestamp::new(b"msg".to_vec());
        node.add_attestation(Attestation::Bitcoin { height: 1 });
        node.add_attestation(Attestation::Bitcoin { height: 2 });
        node.add_attestation(Attestation::Pending { uri: "u".into() });
        let data = encode(&node);
        let decoded = decode(&data, b"msg").unwrap();
        assert_eq!(decoded, node);
        assert_eq!(encode(&decoded), data);
    }

    #[test]
    fn empty_node_cannot_encode() {
        let node = Timestamp::new(b"msg".to_vec());
        assert!(matches!(
            node.encode(&mut Serializer::new(Vec::new())),
            Err(Error::EmptyTimestamp)
        ));
    }

    fn deep_proof(levels: usize) -> Vec<u8> {
        // each level is a single SHA256 edge; the deepest node carries one
        // bitcoin attestation
        let mut data = vec![Op::Crypt(CryptOp::Sha256).tag(); levels];
        data.push(ATTESTATION_TAG);
        let mut ser = Serializer::new(Vec::new());
        ser.write_bytes(&BITCOIN_TAG).unwrap();
        ser.write_varbytes(&[0x01]).unwrap();
        data.extend_from_slice(&ser.into_inner());
        data
    }

    #[test]
    fn recursion_bound() {
        assert!(decode(&deep_proof(999), b"seed").is_ok());
        assert!(matches!(
            decode(&deep_proof(1000), b"seed"),
            Err(Error::RecursionLimit)
        ));
    }

    #[test]
    fn walk_visits_every_node() {
        let tree = sample_tree();
        let mut count = 0;
        tree.walk(&mut |_| count += 1);
        // root, append branch, its sha256 child, prepend branch
        assert_eq!(count, 4);
    }

    #[test]
    fn merge_deduplicates_attestations() {
        let mut a = Timestamp::new(b"m".to_vec());
        a.add_attestation(Attestation::Bitcoin { height: 7 });
        let mut b = Timestamp::new(b"m".to_vec());
        b.add_attestation(Attestation::Bitcoin { height: 7 });
        b.add_attestation(Attestation::Bitcoin { height: 8 });
        a.merge(b).unwrap();
        assert_eq!(
            a.attestations(),
            &[
                Attestation::Bitcoin { height: 7 },
                Attestation::Bitcoin { height: 8 },
            ]
        );
    }

    #[test]
    fn merge_joins_equal_edges() {
        let mut a = Timestamp::new(b"m".to_vec());
        a.append_op(Op::Crypt(CryptOp::Sha256))
            .unwrap()
            .add_attestation(Attestation::Pending { uri: "x".into() });

        let mut b = Timestamp::new(b"m".to_vec());
        b.append_op(Op::Crypt(CryptOp::Sha256))
            .unwrap()
            .add_attestation(Attestation::Bitcoin { height: 9 });
        b.append_op(Op::Reverse).unwrap().add_attestation(
            Attestation::Bitcoin { height: 10 },
        );

        a.merge(b).unwrap();
        assert_eq!(a.ops().len(), 2);
        let (_, sha_child) = &a.ops()[0];
        assert_eq!(sha_child.attestations().len(), 2);
    }

    #[test]
    fn merge_rejects_different_messages() {
        let mut a = Timestamp::new(b"m".to_vec());
        let b = Timestamp::new(b"n".to_vec());
        assert!(matches!(a.merge(b), Err(Error::MergeMessageMismatch)));
    }

    #[test]
    fn dump_shape() {
        let dump = sample_tree().dump();
        assert!(dump.contains("APPEND 20776f726c64"));
        assert!(dump.contains("SHA256"));
        assert!(dump.contains("BitcoinAttestation(height=358391)"));
        assert!(dump.contains("PendingAttestation(uri=https://alice.btc.calendar.opentimestamps.org)"));
    }
}
