//! Keyed PRF/hash primitives, backed by BLAKE3 in keyed mode.
//!
//! All position, band-pattern, tag and free-column derivations go through
//! this module so that every party reasons about the same domain-separated
//! constants.

use crate::field::Field;

/// Expands a 64-bit seed into a 32-byte BLAKE3 key by splatting it across
/// four big-endian 64-bit words, each XORed with an independent constant.
fn expand_key(seed: u64) -> [u8; 32] {
    const SPLATTER: [u64; 4] = [
        0x243F_6A88_85A3_08D3,
        0x1319_8A2E_0370_7344,
        0xA409_3822_299F_31D0,
        0x082E_FA98_EC4E_6C89,
    ];
    let mut key = [0u8; 32];
    for (word, &c) in SPLATTER.iter().enumerate() {
        let limb = (seed ^ c).to_be_bytes();
        key[word * 8..word * 8 + 8].copy_from_slice(&limb);
    }
    key
}

fn keyed_xof(seed: u64, domain: &[u8], params: &[&[u8]]) -> blake3::OutputReader {
    let key = expand_key(seed);
    let mut hasher = blake3::Hasher::new_keyed(&key);
    hasher.update(domain);
    for p in params {
        hasher.update(p);
    }
    hasher.finalize_xof()
}

/// `H1(key, params) -> [0, m-w]`: keyed hash reduced modulo `m - w + 1`.
///
/// `seed` keys the hash (`seed_r1` in the OKVS parameters); `key_bytes` is
/// the canonical serialization of the OKVS key being positioned.
pub fn h1(seed: u64, key_bytes: &[u8], modulus: u64) -> u64 {
    debug_assert!(modulus > 0);
    let mut reader = keyed_xof(seed, b"mpsi-okvs-h1", &[key_bytes]);
    let mut buf = [0u8; 8];
    reader.fill(&mut buf);
    u64::from_le_bytes(buf) % modulus
}

/// `H2(key, params) -> {0,1}^w`: keyed XOF band pattern of width `w` bits.
///
/// Bit `j` of the pattern is bit `j mod 8` of output byte `j / 8`. If the
/// resulting pattern would be all-zero (probability `2^-w`), bit 0 is forced
/// to 1 -- a documented departure from uniformity that keeps every row's
/// band non-degenerate.
pub fn h2(seed: u64, key_bytes: &[u8], w: usize) -> BandPattern {
    let n_bytes = w.div_ceil(8);
    let mut reader = keyed_xof(seed, b"mpsi-okvs-h2", &[key_bytes]);
    let mut buf = vec![0u8; n_bytes];
    reader.fill(&mut buf);
    let mut pattern = BandPattern { bits: buf, w };
    if pattern.is_all_zero() {
        pattern.set(0, true);
    }
    pattern
}

/// A `w`-bit band pattern, stored as packed bytes (bit `j` is bit `j mod 8`
/// of byte `j / 8`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandPattern {
    bits: Vec<u8>,
    w: usize,
}

impl BandPattern {
    /// The width of this band, in bits.
    pub fn width(&self) -> usize {
        self.w
    }

    /// Returns whether bit `j` is set.
    pub fn get(&self, j: usize) -> bool {
        debug_assert!(j < self.w);
        (self.bits[j / 8] >> (j % 8)) & 1 == 1
    }

    fn set(&mut self, j: usize, value: bool) {
        let byte = &mut self.bits[j / 8];
        if value {
            *byte |= 1 << (j % 8);
        } else {
            *byte &= !(1 << (j % 8));
        }
    }

    /// Flips bit `j` in place. Used by the OKVS row-elimination step to XOR
    /// one row's band pattern into another's.
    pub fn toggle(&mut self, j: usize) {
        debug_assert!(j < self.w);
        self.bits[j / 8] ^= 1 << (j % 8);
    }

    /// Builds a width-`w` pattern with exactly bit `bit` set, bypassing the
    /// keyed hash. Used by the OKVS encoder's tests to pin down specific
    /// row collisions without depending on which real keys happen to
    /// collide under which seed.
    #[cfg(test)]
    pub(crate) fn single_bit(w: usize, bit: usize) -> Self {
        let mut pattern = BandPattern { bits: vec![0u8; w.div_ceil(8)], w };
        pattern.toggle(bit);
        pattern
    }

    fn is_all_zero(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Iterates over the set bit positions, ascending.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.w).filter(move |&j| self.get(j))
    }

    /// Returns the position of the first set bit, or `self.width()` if the
    /// pattern is all-zero (which cannot happen after the degeneracy guard
    /// in [`h2`], but callers may construct zeroed patterns directly, e.g.
    /// for a fully-eliminated row).
    pub fn first_one(&self) -> usize {
        self.set_bits().next().unwrap_or(self.w)
    }
}

/// Derives `count` independent field elements from `(seed, domain, input)`.
///
/// Shared by [`block_prng`], [`tag`], and the polynomial-share coefficient
/// derivation in [`crate::poly`] -- anywhere a variable-length stream of
/// pseudo-random field elements is needed from one keyed XOF.
pub fn derive_fields(seed: u64, domain: &[u8], input: &[u8], count: usize) -> Vec<Field> {
    let mut reader = keyed_xof(seed, domain, &[input]);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut buf = [0u8; 16];
        reader.fill(&mut buf);
        out.push(Field::from_le_bytes(buf));
    }
    out
}

/// `tag(x, salt) -> field`: a keyed hash linking shares derived from the
/// same input element `x` across parties, without revealing `x`.
pub fn tag(x_bytes: &[u8], salt: u64) -> Field {
    let mut reader = keyed_xof(salt, b"mpsi-tag", &[x_bytes]);
    let mut buf = [0u8; 16];
    reader.fill(&mut buf);
    Field::from_le_bytes(buf)
}

/// `block_prng(s1, s2) -> field`: a two-input pseudo-random field element,
/// independent per `(s1, s2)` pair, used to fill free OKVS columns.
pub fn block_prng(s1: u64, s2: u64) -> Field {
    let mut reader = keyed_xof(s1, b"mpsi-okvs-free-column", &[&s2.to_be_bytes()]);
    let mut buf = [0u8; 16];
    reader.fill(&mut buf);
    Field::from_le_bytes(buf)
}
