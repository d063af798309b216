//! Append-only Bloom filter for URL deduplication.
//!
//! Sized from an expected element count `n` and a target false-positive rate `p`:
//! `m = ceil(-n·ln(p) / ln(2)²)` bits and `k = round(m/n · ln(2))` probes (at least
//! one). Every element is hashed twice with seeded 64-bit hashes and probe `i` lands
//! on bit `(h1 + i·h2) mod m`.

use thiserror::Error;

/// Errors raised when sizing a filter
#[derive(Debug, Error, PartialEq)]
pub enum BloomError {
    #[error("expected element count must be greater than zero")]
    ZeroCapacity,

    #[error("false positive rate must be in (0, 1), got {0}")]
    InvalidRate(f64),
}

/// Bit-vector probabilistic set with no false negatives
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: Vec<u64>,
    bit_count: u64,
    hash_count: u32,
}

impl BloomFilter {
    /// Size a filter for `expected_elements` at `false_positive_rate`
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Result<Self, BloomError> {
        if expected_elements == 0 {
            return Err(BloomError::ZeroCapacity);
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(BloomError::InvalidRate(false_positive_rate));
        }

        let n = expected_elements as f64;
        let ln2 = std::f64::consts::LN_2;
        let bit_count = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil().max(1.0) as u64;
        let hash_count = ((bit_count as f64 / n) * ln2).round().max(1.0) as u32;

        let word_count = ((bit_count + 63) / 64) as usize;

        Ok(Self {
            words: vec![0u64; word_count],
            bit_count,
            hash_count,
        })
    }

    /// Set all `k` bits for `data`
    pub fn add(&mut self, data: &[u8]) {
        let (h1, h2) = hash_pair(data);
        for i in 0..self.hash_count {
            let idx = self.probe(h1, h2, i);
            self.words[(idx / 64) as usize] |= 1u64 << (idx % 64);
        }
    }

    /// `true` means "maybe present", `false` means definitely absent
    pub fn test(&self, data: &[u8]) -> bool {
        let (h1, h2) = hash_pair(data);
        (0..self.hash_count).all(|i| {
            let idx = self.probe(h1, h2, i);
            self.words[(idx / 64) as usize] & (1u64 << (idx % 64)) != 0
        })
    }

    /// Expected false-positive rate after `inserted` insertions
    pub fn estimate_false_positive_rate(&self, inserted: usize) -> f64 {
        if inserted == 0 {
            return 0.0;
        }
        let k = self.hash_count as f64;
        let n = inserted as f64;
        let m = self.bit_count as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Number of bits (`m`)
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Number of probes per element (`k`)
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    fn probe(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.bit_count
    }
}

const BLOOM_HASH_SEEDS: [u64; 2] = [0x517c_c1b7_2722_0a95, 0x9e37_79b1_85eb_ca87];

fn hash_pair(data: &[u8]) -> (u64, u64) {
    (
        bloom_hash(data, BLOOM_HASH_SEEDS[0]),
        bloom_hash(data, BLOOM_HASH_SEEDS[1]),
    )
}

fn bloom_hash(data: &[u8], seed: u64) -> u64 {
    let mut hash = seed ^ data.len() as u64;
    for &byte in data {
        hash ^= (byte as u64).wrapping_mul(0x1000_0000_01b3);
        hash = hash.rotate_left(13).wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    // murmur3 finalizer, spreads the last bytes across all 64 bits
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    hash ^ (hash >> 33)
}
