//! End-to-end exercises over whole detached proofs.

use std::collections::HashMap;

use bitcoin::block::{Header, Version};
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};
use opentimestamps::attestation::{Attestation, BITCOIN_TAG};
use opentimestamps::calendar::pending_timestamps;
use opentimestamps::detached::{file_sha256, DetachedTimestamp, HEADER_MAGIC};
use opentimestamps::op::{CryptOp, Op};
use opentimestamps::ser::Serializer;
use opentimestamps::timestamp::Timestamp;
use opentimestamps::verifier::{BitcoinVerifier, BlockHeaderSource};

struct FakeHeaderSource {
    blocks: HashMap<u64, Header>,
}

impl FakeHeaderSource {
    fn single(height: u64, merkle_root: [u8; 32], time: u32) -> Self {
        let header = Header {
            version: Version::ONE,
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::from_byte_array(merkle_root),
            time,
            bits: CompactTarget::from_consensus(0x1d00ffff),
            nonce: 0,
        };
        Self {
            blocks: HashMap::from([(height, header)]),
        }
    }
}

impl BlockHeaderSource for FakeHeaderSource {
    fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash> {
        self.blocks
            .get(&height)
            .map(|h| h.block_hash())
            .ok_or_else(|| anyhow::anyhow!("no block at height {height}"))
    }

    fn block_header(&self, hash: &BlockHash) -> anyhow::Result<Header> {
        self.blocks
            .values()
            .find(|h| h.block_hash() == *hash)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown block hash"))
    }
}

/// Hand-assemble a `.ots` file byte by byte, without going through the
/// library's encoder, then decode and verify it.
#[test]
fn hand_assembled_proof_decodes_and_verifies() {
    let digest = file_sha256(&b"Hello, World!\n"[..]).unwrap();

    let mut data = Vec::new();
    data.extend_from_slice(HEADER_MAGIC);
    data.push(0x01); // major version
    data.push(0x08); // SHA256 file hash op
    data.extend_from_slice(&digest);
    // root: single APPEND edge
    data.push(0xf0);
    data.extend_from_slice(&[0x02, 0xde, 0xad]); // varbytes arg
    // child: single SHA256 edge
    data.push(0x08);
    // grandchild: one bitcoin attestation at height 358391
    data.push(0x00);
    data.extend_from_slice(&BITCOIN_TAG);
    let payload = {
        let mut ser = Serializer::new(Vec::new());
        ser.write_varuint(358391).unwrap();
        ser.into_inner()
    };
    data.push(payload.len() as u8);
    data.extend_from_slice(&payload);

    let dts = DetachedTimestamp::from_reader(&data[..]).unwrap();
    assert_eq!(dts.file_hash_op(), CryptOp::Sha256);
    assert_eq!(dts.file_digest(), digest);

    // exactly one attestation, on the node derived by APPEND then SHA256
    let mut attested = Vec::new();
    dts.timestamp().walk(&mut |node| {
        for att in node.attestations() {
            attested.push((node.message().to_vec(), att.clone()));
        }
    });
    assert_eq!(attested.len(), 1);
    let (message, attestation) = &attested[0];
    assert_eq!(*attestation, Attestation::Bitcoin { height: 358391 });

    let mut appended = digest.clone();
    appended.extend_from_slice(&[0xde, 0xad]);
    assert_eq!(*message, CryptOp::Sha256.digest(&appended));

    // re-encoding reproduces the input bytes
    assert_eq!(dts.to_vec().unwrap(), data);

    // and the proof verifies against a header source holding that root
    let merkle_root: [u8; 32] = message.as_slice().try_into().unwrap();
    let verifier = BitcoinVerifier::new(FakeHeaderSource::single(
        358391,
        merkle_root,
        1_432_827_678,
    ));
    let time = verifier
        .verify_timestamp(dts.timestamp())
        .unwrap()
        .expect("one verifiable attestation");
    assert_eq!(time.to_rfc3339(), "2015-05-28T15:41:18+00:00");
}

fn two_calendar_proof() -> DetachedTimestamp {
    let digest = file_sha256(&b"two calendars\n"[..]).unwrap();
    let mut root = Timestamp::new(digest);
    root.append_op(Op::Append(vec![0x01]))
        .unwrap()
        .append_op(Op::Crypt(CryptOp::Sha256))
        .unwrap()
        .add_attestation(Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".into(),
        });
    root.append_op(Op::Prepend(vec![0x02]))
        .unwrap()
        .append_op(Op::Crypt(CryptOp::Sha256))
        .unwrap()
        .add_attestation(Attestation::Pending {
            uri: "https://bob.btc.calendar.opentimestamps.org".into(),
        });
    DetachedTimestamp::new(CryptOp::Sha256, root).unwrap()
}

#[test]
fn two_calendar_proof_round_trips() {
    let dts = two_calendar_proof();
    let data = dts.to_vec().unwrap();
    let decoded = DetachedTimestamp::from_reader(&data[..]).unwrap();
    assert_eq!(decoded, dts);
    assert_eq!(decoded.to_vec().unwrap(), data);

    let pending = pending_timestamps(decoded.timestamp());
    assert_eq!(pending.len(), 2);
    assert_ne!(pending[0].uri, pending[1].uri);
}

#[test]
fn unknown_attestation_survives_round_trips() {
    let digest = file_sha256(&b"unknown\n"[..]).unwrap();
    let mut root = Timestamp::new(digest);
    root.add_attestation(Attestation::Unknown {
        tag: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x99],
        payload: vec![0xca, 0xfe, 0xba, 0xbe],
    });
    root.append_op(Op::Crypt(CryptOp::Ripemd160))
        .unwrap()
        .add_attestation(Attestation::Bitcoin { height: 1 });
    let dts = DetachedTimestamp::new(CryptOp::Sha256, root).unwrap();

    let first = dts.to_vec().unwrap();
    let decoded = DetachedTimestamp::from_reader(&first[..]).unwrap();
    assert_eq!(decoded, dts);
    let second = decoded.to_vec().unwrap();
    assert_eq!(second, first);
    // the unknown attestation is still byte-identical after two cycles
    let again = DetachedTimestamp::from_reader(&second[..]).unwrap();
    assert_eq!(again, dts);
}

#[test]
fn generated_proofs_round_trip_byte_exact() {
    let digests: [&[u8]; 3] = [b"a\n", b"hello world\n", b"\x00\x01\x02"];
    for content in digests {
        let digest = file_sha256(content).unwrap();
        let mut root = Timestamp::new(digest);
        root.add_attestation(Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".into(),
        });
        let branch = root.append_op(Op::Append(vec![0x11, 0x22])).unwrap();
        branch
            .append_op(Op::Crypt(CryptOp::Sha256))
            .unwrap()
            .add_attestation(Attestation::Bitcoin { height: 424242 });
        branch
            .append_op(Op::Hexlify)
            .unwrap()
            .append_op(Op::Crypt(CryptOp::Sha1))
            .unwrap()
            .add_attestation(Attestation::Bitcoin { height: 5 });

        let dts = DetachedTimestamp::new(CryptOp::Sha256, root).unwrap();
        let data = dts.to_vec().unwrap();
        let decoded = DetachedTimestamp::from_reader(&data[..]).unwrap();
        assert_eq!(decoded, dts);
        assert_eq!(decoded.to_vec().unwrap(), data);
    }
}
