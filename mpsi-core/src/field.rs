//! Binary-field arithmetic over GF(2^128).
//!
//! Elements are polynomials in GF(2)[x] modulo the irreducible polynomial
//! `p(x) = x^128 + x^7 + x^2 + x + 1`. An element is stored as an ordered
//! pair `(hi, lo)` of 64-bit halves, where bit `i` of `lo` is the coefficient
//! of `x^i` for `i in 0..64` and bit `i` of `hi` is the coefficient of
//! `x^(64+i)`. Addition is bitwise XOR; multiplication is carry-less
//! multiplication followed by reduction modulo `p(x)`.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// A single element of GF(2^128).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Zeroize)]
pub struct Field {
    hi: u64,
    lo: u64,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field({:016x}{:016x})", self.hi, self.lo)
    }
}

impl Field {
    /// The additive identity (the zero polynomial).
    pub const ZERO: Field = Field { hi: 0, lo: 0 };

    /// The multiplicative identity (the constant polynomial `1`).
    pub const ONE: Field = Field { hi: 0, lo: 1 };

    /// Build a field element from its big-endian `(hi, lo)` halves.
    pub const fn new(hi: u64, lo: u64) -> Self {
        Field { hi, lo }
    }

    /// Returns the `(hi, lo)` halves of this element.
    pub const fn halves(&self) -> (u64, u64) {
        (self.hi, self.lo)
    }

    /// Returns `true` if this is the zero element.
    pub const fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Serializes this element as 16 little-endian bytes, `lo` then `hi`.
    pub fn to_le_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.lo.to_le_bytes());
        out[8..].copy_from_slice(&self.hi.to_le_bytes());
        out
    }

    /// Deserializes an element from 16 little-endian bytes, `lo` then `hi`.
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        let lo = u64::from_le_bytes(bytes[..8].try_into().expect("8 bytes"));
        let hi = u64::from_le_bytes(bytes[8..].try_into().expect("8 bytes"));
        Field { hi, lo }
    }

    /// Serializes this element as 16 big-endian bytes, `hi` then `lo` -- the
    /// canonical key encoding used for OKVS position/band hashing and the
    /// section 6 S14 wire request/response.
    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    /// Deserializes an element from 16 big-endian bytes, `hi` then `lo`.
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        let hi = u64::from_be_bytes(bytes[..8].try_into().expect("8 bytes"));
        let lo = u64::from_be_bytes(bytes[8..].try_into().expect("8 bytes"));
        Field { hi, lo }
    }

    /// Addition in GF(2^128): bitwise XOR.
    pub const fn add(self, rhs: Self) -> Self {
        Field {
            hi: self.hi ^ rhs.hi,
            lo: self.lo ^ rhs.lo,
        }
    }

    /// Carry-less 128x128 multiplication followed by reduction modulo `p(x)`.
    pub fn mul(self, rhs: Self) -> Self {
        let (hi, lo) = clmul128(self.hi, self.lo, rhs.hi, rhs.lo);
        reduce(hi, lo)
    }

    /// `square(a) = mul(a, a)`.
    pub fn square(self) -> Self {
        self.mul(self)
    }

    /// Multiplicative inverse via Fermat exponentiation: `a^(2^128 - 2)`.
    ///
    /// Returns [`Field::ZERO`] for `a = 0` (documented sentinel -- callers
    /// must not rely on this to divide by a possibly-zero denominator).
    pub fn inv(self) -> Self {
        if self.is_zero() {
            return Field::ZERO;
        }
        // Realizes the exponent 2^128 - 2, whose binary form is 127 ones
        // followed by a zero. The loop below accumulates a^(2^127 - 1) (127
        // ones); the final `square` appends the trailing zero bit.
        let mut result = Field::ONE;
        let mut base = self;
        for _ in 0..127 {
            result = result.mul(base);
            base = base.square();
        }
        result.square()
    }
}

impl std::ops::Add for Field {
    type Output = Field;
    fn add(self, rhs: Field) -> Field {
        Field::add(self, rhs)
    }
}

impl std::ops::BitXor for Field {
    type Output = Field;
    fn bitxor(self, rhs: Field) -> Field {
        Field::add(self, rhs)
    }
}

/// Carry-less multiply of two 64-bit values, producing a (up to) 127-bit
/// product held in a `u128`.
fn clmul64(a: u64, b: u64) -> u128 {
    let a = a as u128;
    let mut result: u128 = 0;
    for i in 0..64 {
        if (b >> i) & 1 == 1 {
            result ^= a << i;
        }
    }
    result
}

/// Carry-less multiply of two 128-bit values (each given as `(hi, lo)`
/// halves), producing a 256-bit product as `(hi, lo)` 128-bit halves.
fn clmul128(a_hi: u64, a_lo: u64, b_hi: u64, b_lo: u64) -> (u128, u128) {
    let z0 = clmul64(a_lo, b_lo);
    let z2 = clmul64(a_hi, b_hi);
    let cross = clmul64(a_lo, b_hi) ^ clmul64(a_hi, b_lo);

    let lo = z0 ^ (cross << 64);
    let hi = z2 ^ (cross >> 64);
    (hi, lo)
}

/// Reduces a 256-bit carry-less product `(hi, lo)` modulo
/// `p(x) = x^128 + x^7 + x^2 + x + 1` down to a single [`Field`] element.
///
/// For each set bit at local position `k` of `hi` (real degree `128+k`),
/// `x^(128+k) ≡ x^(k+7) + x^(k+2) + x^(k+1) + x^k (mod p)`; folding from the
/// top bit down guarantees any bit re-raised above the 128-bit boundary
/// lands at a strictly lower position that the sweep has not visited yet.
fn reduce(mut hi: u128, mut lo: u128) -> Field {
    for k in (0..128).rev() {
        if (hi >> k) & 1 == 1 {
            hi &= !(1u128 << k);
            for shift in [0u32, 1, 2, 7] {
                let pos = k + shift;
                if pos < 128 {
                    lo ^= 1u128 << pos;
                } else {
                    hi ^= 1u128 << (pos - 128);
                }
            }
        }
    }
    debug_assert_eq!(hi, 0, "reduction must fully fold the high word");
    Field {
        hi: (lo >> 64) as u64,
        lo: lo as u64,
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

const HASH_TO_FIELD_LO_TAG: u64 = 0x4D50_5349_4845_3000; // "MPSIHE0"
const HASH_TO_FIELD_HI_TAG: u64 = 0x4D50_5349_4845_3100; // "MPSIHE1"

/// Deterministic injection from 64-bit integers into GF(2^128), consistent
/// across independent parties evaluating the same index (used for both
/// party evaluation points `alpha_i` and any other small-domain constant
/// that must land on a fixed field element).
pub fn hash_to_field(i: u64) -> Field {
    let lo = splitmix64(i ^ HASH_TO_FIELD_LO_TAG);
    let hi = splitmix64(lo ^ HASH_TO_FIELD_HI_TAG);
    Field::new(hi, lo)
}
