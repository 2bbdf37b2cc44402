//! Transaction and block header records as they appear on the wire.
//!
//! All fields are little-endian. These are plain values: constructed by a
//! decoder or by the application, transmitted once, and discarded. No
//! validation beyond structure is performed here.

use std::io::{Read, Write};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::script::Script;
use crate::serial::{WireRead, WireWrite};

/// A reference to a specific output of a previous transaction.
///
/// Orders lexicographically by transaction hash, then by output index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutPoint {
    pub tx_hash: [u8; 32],
    pub txout_idx: u32,
}

impl OutPoint {
    pub fn decode<R: Read>(r: &mut R) -> Result<OutPoint> {
        Ok(OutPoint {
            tx_hash: r.read_array("outpoint tx hash")?,
            txout_idx: r.read_u32_le("outpoint index")?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.tx_hash)?;
        w.write_u32_le(self.txout_idx)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script: Script,
    pub seq_num: u32,
}

impl TxIn {
    pub fn decode<R: Read>(r: &mut R) -> Result<TxIn> {
        Ok(TxIn {
            prevout: OutPoint::decode(r)?,
            script: Script::decode(r)?,
            seq_num: r.read_u32_le("txin sequence")?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        self.prevout.encode(w)?;
        self.script.encode(w)?;
        w.write_u32_le(self.seq_num)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxOut {
    /// Output value in satoshis.
    pub amount: i64,
    pub script: Script,
}

impl TxOut {
    pub fn decode<R: Read>(r: &mut R) -> Result<TxOut> {
        Ok(TxOut {
            amount: r.read_i64_le("txout amount")?,
            script: Script::decode(r)?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i64_le(self.amount)?;
        self.script.encode(w)
    }
}

/// A transaction in the original (pre-SegWit) serialization.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tx {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: i32,
}

impl Tx {
    pub fn decode<R: Read>(r: &mut R) -> Result<Tx> {
        let version = r.read_i32_le("tx version")?;
        let n_inputs = r.read_varint_len("tx input count")?;
        let mut inputs = Vec::with_capacity(n_inputs);
        for _ in 0..n_inputs {
            inputs.push(TxIn::decode(r)?);
        }
        let n_outputs = r.read_varint_len("tx output count")?;
        let mut outputs = Vec::with_capacity(n_outputs);
        for _ in 0..n_outputs {
            outputs.push(TxOut::decode(r)?);
        }
        Ok(Tx {
            version,
            inputs,
            outputs,
            lock_time: r.read_i32_le("tx lock time")?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i32_le(self.version)?;
        w.write_varint(self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.encode(w)?;
        }
        w.write_varint(self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.encode(w)?;
        }
        w.write_i32_le(self.lock_time)
    }

    /// Transaction id: SHA256d of the serialized transaction, in wire
    /// byte order.
    pub fn hash(&self) -> [u8; 32] {
        let mut bytes = Vec::new();
        self.encode(&mut bytes).expect("writing to a Vec cannot fail");
        Sha256::digest(Sha256::digest(&bytes)).into()
    }
}

/// The 80-byte block header.
///
/// Decoding rejects any `version` outside `1..=3`; nothing newer exists in
/// the pre-SegWit protocol this crate speaks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockHeader {
    pub version: u32,
    pub parent_block_hash: [u8; 32],
    pub merkle_root_hash: [u8; 32],
    /// Unix timestamp, seconds.
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn decode<R: Read>(r: &mut R) -> Result<BlockHeader> {
        let version = r.read_u32_le("block version")?;
        if !(1..=3).contains(&version) {
            return Err(Error::InvalidFormat("block version not supported"));
        }
        Ok(BlockHeader {
            version,
            parent_block_hash: r.read_array("parent block hash")?,
            merkle_root_hash: r.read_array("merkle root hash")?,
            time: r.read_u32_le("block time")?,
            bits: r.read_u32_le("block bits")?,
            nonce: r.read_u32_le("block nonce")?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.version)?;
        w.write_all(&self.parent_block_hash)?;
        w.write_all(&self.merkle_root_hash)?;
        w.write_u32_le(self.time)?;
        w.write_u32_le(self.bits)?;
        w.write_u32_le(self.nonce)
    }

    /// Block hash: SHA256d of the 80-byte header, in wire byte order.
    /// Block explorers display the bytes reversed.
    pub fn hash(&self) -> [u8; 32] {
        let mut bytes = Vec::with_capacity(80);
        bytes.extend(&self.version.to_le_bytes());
        bytes.extend(&self.parent_block_hash);
        bytes.extend(&self.merkle_root_hash);
        bytes.extend(&self.time.to_le_bytes());
        bytes.extend(&self.bits.to_le_bytes());
        bytes.extend(&self.nonce.to_le_bytes());
        Sha256::digest(Sha256::digest(&bytes)).into()
    }
}

/// Expands a compact difficulty target (`nBits`) to an approximate value:
/// `mantissa * 256^(exponent - 3)`.
pub fn compact_to_double(compact: u32) -> f64 {
    let mantissa = compact & 0x007F_FFFF;
    if mantissa == 0 {
        return 0.0;
    }
    let exponent = (compact >> 24) as i32;
    let value = f64::from(mantissa) * 256f64.powi(exponent - 3);
    if compact & 0x0080_0000 != 0 {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_tx() -> Tx {
        let mut script_sig = Script::new();
        script_sig.push_int(3);
        let mut script_pubkey = Script::new();
        script_pubkey.push_opcode(crate::script::Opcode::OP_DUP);
        script_pubkey.push_opcode(crate::script::Opcode::OP_HASH160);
        script_pubkey.push_data(&[0x11; 20]).unwrap();
        script_pubkey.push_opcode(crate::script::Opcode::OP_EQUALVERIFY);
        script_pubkey.push_opcode(crate::script::Opcode::OP_CHECKSIG);
        Tx {
            version: 1,
            inputs: vec![TxIn {
                prevout: OutPoint {
                    tx_hash: [0xAA; 32],
                    txout_idx: 1,
                },
                script: script_sig,
                seq_num: 0xFFFF_FFFF,
            }],
            outputs: vec![TxOut {
                amount: 50_0000_0000,
                script: script_pubkey,
            }],
            lock_time: 0,
        }
    }

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 2,
            parent_block_hash: [0x11; 32],
            merkle_root_hash: [0x22; 32],
            time: 1_355_317_200,
            bits: 0x1D00_FFFF,
            nonce: 42,
        }
    }

    #[test]
    fn outpoint_orders_by_hash_then_index() {
        let a = OutPoint {
            tx_hash: [1; 32],
            txout_idx: 9,
        };
        let b = OutPoint {
            tx_hash: [2; 32],
            txout_idx: 0,
        };
        let c = OutPoint {
            tx_hash: [2; 32],
            txout_idx: 1,
        };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn tx_roundtrip() {
        let tx = sample_tx();
        let mut buf = Vec::new();
        tx.encode(&mut buf).unwrap();
        let decoded = Tx::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn tx_with_no_inputs_or_outputs_roundtrips() {
        let tx = Tx {
            version: 1,
            inputs: vec![],
            outputs: vec![],
            lock_time: 0,
        };
        let mut buf = Vec::new();
        tx.encode(&mut buf).unwrap();
        // version + two zero counts + lock_time
        assert_eq!(buf.len(), 4 + 1 + 1 + 4);
        assert_eq!(Tx::decode(&mut Cursor::new(&buf)).unwrap(), tx);
    }

    #[test]
    fn header_roundtrip_is_80_bytes() {
        let hdr = sample_header();
        let mut buf = Vec::new();
        hdr.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 80);
        assert_eq!(BlockHeader::decode(&mut Cursor::new(&buf)).unwrap(), hdr);
    }

    #[test]
    fn header_rejects_unsupported_versions() {
        for version in [0u32, 4, 0x2000_0000] {
            let mut hdr = sample_header();
            hdr.version = version;
            let mut buf = Vec::new();
            // Encoding does not police the version; only decoding does.
            hdr.encode(&mut buf).unwrap();
            assert!(matches!(
                BlockHeader::decode(&mut Cursor::new(&buf)),
                Err(Error::InvalidFormat("block version not supported"))
            ));
        }
    }

    #[test]
    fn genesis_header_hashes_to_the_known_block_id() {
        // Mainnet genesis block fields.
        let genesis = BlockHeader {
            version: 1,
            parent_block_hash: [0; 32],
            merkle_root_hash: [
                0x3B, 0xA3, 0xED, 0xFD, 0x7A, 0x7B, 0x12, 0xB2, 0x7A, 0xC7, 0x2C, 0x3E, 0x67,
                0x76, 0x8F, 0x61, 0x7F, 0xC8, 0x1B, 0xC3, 0x88, 0x8A, 0x51, 0x32, 0x3A, 0x9F,
                0xB8, 0xAA, 0x4B, 0x1E, 0x5E, 0x4A,
            ],
            time: 1_231_006_505,
            bits: 0x1D00_FFFF,
            nonce: 2_083_236_893,
        };
        assert_eq!(genesis.hash(), crate::wire::constants::GENESIS_BLOCK_HASH_MAINNET);
    }

    #[test]
    fn compact_expands_difficulty_one_target() {
        // 0x1d00ffff: mantissa 0x00ffff, exponent 0x1d.
        let expected = 65535.0 * 256f64.powi(0x1D - 3);
        assert_eq!(compact_to_double(0x1D00_FFFF), expected);
        assert_eq!(compact_to_double(0x1D00_0000), 0.0);
        assert!(compact_to_double(0x1D80_0001) < 0.0);
    }
}
