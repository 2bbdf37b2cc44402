//! The BIP 37 Bloom filter carried by `filterload`, plus the 32-bit
//! MurmurHash3 it is seeded with.
//!
//! Hash outputs match Bitcoin Core byte for byte; the filter is useless
//! otherwise, since both peers must map the same data to the same bits.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::serial::{WireRead, WireWrite};

/// Largest filter the protocol allows, in bytes.
pub const MAX_FILTER_SIZE: usize = 36_000;
/// Largest hash function count the protocol allows.
pub const MAX_HASH_FUNCS: u32 = 50;

/// Seed multiplier between successive hash functions.
const SEED_STEP: u32 = 0xFBA4_C795;

/// MurmurHash3, 32-bit x86 variant.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xCC9E_2D51;
    const C2: u32 = 0x1B87_3593;

    let mut h1 = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k1 = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h1 = (h1 ^ k1).rotate_left(13).wrapping_mul(5).wrapping_add(0xE654_6B64);
    }

    let tail = chunks.remainder();
    let mut k1 = 0u32;
    for (i, &byte) in tail.iter().enumerate() {
        k1 |= u32::from(byte) << (8 * i);
    }
    if !tail.is_empty() {
        k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85EB_CA6B);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xC2B2_AE35);
    h1 ^= h1 >> 16;
    h1
}

/// A Bloom filter: a bit vector plus a hash function count and a random
/// tweak mixed into every seed.
///
/// `maybe_contains` can report false positives but never false negatives.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BloomFilter {
    bits: Vec<u8>,
    hash_count: u32,
    tweak: u32,
}

impl BloomFilter {
    /// A filter of `size` zeroed bytes.
    pub fn new(size: usize, hash_count: u32, tweak: u32) -> BloomFilter {
        BloomFilter {
            bits: vec![0; size],
            hash_count,
            tweak,
        }
    }

    /// Sizes the filter for `capacity` elements at the given false
    /// positive rate, clamped to the protocol limits of 36,000 bytes and
    /// 50 hash functions.
    pub fn with_fp_rate(capacity: usize, fp_rate: f64, tweak: u32) -> BloomFilter {
        let ln2 = std::f64::consts::LN_2;
        let size = ((capacity as f64 * fp_rate.ln() / -(ln2 * ln2) / 8.0).ceil() as usize)
            .min(MAX_FILTER_SIZE);
        let hash_count = ((ln2 * 8.0 * size as f64 / capacity as f64).round() as u32)
            .min(MAX_HASH_FUNCS);
        BloomFilter {
            bits: vec![0; size],
            hash_count,
            tweak,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn tweak(&self) -> u32 {
        self.tweak
    }

    fn bit_index(&self, data: &[u8], hash_idx: u32) -> usize {
        let seed = self.tweak.wrapping_add(hash_idx.wrapping_mul(SEED_STEP));
        murmur3_32(data, seed) as usize % (self.bits.len() * 8)
    }

    /// Sets the bits for `data`. Inserting into a zero-size filter is a
    /// caller bug.
    pub fn insert(&mut self, data: &[u8]) {
        assert!(!self.bits.is_empty(), "insert into an empty bloom filter");
        for hash_idx in 0..self.hash_count {
            let bit = self.bit_index(data, hash_idx);
            self.bits[bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Tests the bits for `data`. `false` means definitely absent.
    pub fn maybe_contains(&self, data: &[u8]) -> bool {
        assert!(!self.bits.is_empty(), "query of an empty bloom filter");
        (0..self.hash_count).all(|hash_idx| {
            let bit = self.bit_index(data, hash_idx);
            self.bits[bit / 8] & (1 << (bit % 8)) != 0
        })
    }

    /// Reads the `filterload` body: length-prefixed bit vector, hash
    /// count, tweak. Filters beyond the protocol limits are rejected.
    pub fn decode<R: Read>(r: &mut R) -> Result<BloomFilter> {
        let bits = r.read_var_bytes("bloom filter bits")?;
        let hash_count = r.read_u32_le("bloom filter hash count")?;
        let tweak = r.read_u32_le("bloom filter tweak")?;
        if bits.len() > MAX_FILTER_SIZE || hash_count > MAX_HASH_FUNCS {
            return Err(Error::InvalidFormat("bloom filter exceeds protocol limits"));
        }
        Ok(BloomFilter {
            bits,
            hash_count,
            tweak,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_var_bytes(&self.bits)?;
        w.write_u32_le(self.hash_count)?;
        w.write_u32_le(self.tweak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn murmur_matches_core_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 0xFBA4_C795), 0x6A39_6F08);
        assert_eq!(murmur3_32(&[0x00], 0xFBA4_C795), 0xBDD4_C4A4);
    }

    #[test]
    fn murmur_covers_every_tail_length() {
        // Block + tail paths; values only need to be stable and distinct.
        let data = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03];
        let hashes: Vec<u32> = (0..=data.len())
            .map(|n| murmur3_32(&data[..n], 7))
            .collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn inserted_data_is_always_found() {
        let mut filter = BloomFilter::new(32, 5, 0xDEAD_BEEF);
        let items: [&[u8]; 4] = [b"satoshi", b"", &[0x00], &[0xFF; 40]];
        for item in items {
            filter.insert(item);
        }
        for item in items {
            assert!(filter.maybe_contains(item));
        }
    }

    #[test]
    fn fresh_filter_contains_nothing() {
        let filter = BloomFilter::new(32, 5, 0);
        assert!(!filter.maybe_contains(b"anything"));
    }

    #[test]
    fn sizing_respects_protocol_limits() {
        let filter = BloomFilter::with_fp_rate(20, 0.001, 0);
        assert!(filter.len() <= MAX_FILTER_SIZE);
        assert!(filter.hash_count() <= MAX_HASH_FUNCS);
        assert!(filter.len() > 0);

        // A tiny false positive rate over many elements hits both clamps.
        let huge = BloomFilter::with_fp_rate(1_000_000, 1e-9, 0);
        assert_eq!(huge.len(), MAX_FILTER_SIZE);
        assert!(huge.hash_count() <= MAX_HASH_FUNCS);
    }

    #[test]
    fn wire_roundtrip() {
        let mut filter = BloomFilter::new(16, 11, 0xCAFE_F00D);
        filter.insert(b"txid");
        let mut buf = Vec::new();
        filter.encode(&mut buf).unwrap();
        let decoded = BloomFilter::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, filter);
    }

    #[test]
    fn decode_rejects_oversized_filters() {
        let mut buf = Vec::new();
        BloomFilter::new(8, MAX_HASH_FUNCS + 1, 0)
            .encode(&mut buf)
            .unwrap();
        assert!(matches!(
            BloomFilter::decode(&mut Cursor::new(&buf)),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    #[should_panic(expected = "empty bloom filter")]
    fn insert_into_empty_filter_panics() {
        BloomFilter::new(0, 1, 0).insert(b"x");
    }
}
