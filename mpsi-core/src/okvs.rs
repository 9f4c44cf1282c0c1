//! Randomized-banded oblivious key-value store (RB-OKVS, C4).
//!
//! Encodes a set of `(key, value)` pairs into a storage vector `S` of length
//! `m` such that any key decodes to its value via XOR of a `w`-wide band
//! starting at a pseudo-random position, while any key outside the encoded
//! set decodes to a value computationally indistinguishable from uniform.

use crate::error::{Error, Result};
use crate::field::Field;
use crate::prf::{self, BandPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default band width, `w >= 192` for ~128-bit statistical security (section
/// 3 recommended default).
pub const DEFAULT_W: usize = 192;

/// Default OKVS load factor `epsilon_okvs` applied on top of the row count
/// to compute `m` (section 6 recommended default).
pub const DEFAULT_EPSILON: f64 = 0.05;

/// Number of fresh-seed retries attempted before [`Okvs::encode`] surfaces
/// [`Error::OkvsUnsolvable`] (section 7: "bounded retries, e.g. 4").
pub const MAX_ENCODE_ATTEMPTS: u32 = 4;

/// OKVS configuration: `{m, w, seed_r1, seed_r2}` (section 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkvsParams {
    /// Storage length.
    pub m: usize,
    /// Band width.
    pub w: usize,
    /// Seed keying the position hash `H1`.
    pub seed_r1: u64,
    /// Seed keying the band-pattern hash `H2`.
    pub seed_r2: u64,
}

impl OkvsParams {
    /// Builds parameters for `n_rows` rows at band width `w` and load factor
    /// `epsilon`, seeded with `(seed_r1, seed_r2)`. Rejects parameters that
    /// violate the section-3 invariant `m > w` and `m - w + 1 > 0` or a
    /// zero band width.
    pub fn new(n_rows: usize, w: usize, epsilon: f64, seed_r1: u64, seed_r2: u64) -> Result<Self> {
        if w == 0 {
            return Err(Error::ParameterInvalid("OKVS band width w must be > 0".into()));
        }
        let m = (((n_rows as f64) * (1.0 + epsilon)).ceil() as usize).max(w + 1);
        Self::from_raw(m, w, seed_r1, seed_r2)
    }

    /// Builds parameters from explicit `m`/`w`, validating the invariant.
    pub fn from_raw(m: usize, w: usize, seed_r1: u64, seed_r2: u64) -> Result<Self> {
        if w == 0 {
            return Err(Error::ParameterInvalid("OKVS band width w must be > 0".into()));
        }
        if m <= w {
            return Err(Error::ParameterInvalid(format!(
                "OKVS storage length m ({m}) must exceed band width w ({w})"
            )));
        }
        Ok(OkvsParams { m, w, seed_r1, seed_r2 })
    }

    /// `[0, m - w]`, the valid range for a band start.
    fn band_start_modulus(&self) -> u64 {
        (self.m - self.w + 1) as u64
    }

    fn position(&self, key_bytes: &[u8]) -> usize {
        prf::h1(self.seed_r1, key_bytes, self.band_start_modulus()) as usize
    }

    fn band(&self, key_bytes: &[u8]) -> BandPattern {
        prf::h2(self.seed_r2, key_bytes, self.w)
    }

    /// Derives fresh, independent `(seed_r1, seed_r2)` for a retry, keeping
    /// `m`/`w` fixed (section 4.4 failure model: "retries with fresh seeds").
    fn respun(&self, attempt: u32) -> Self {
        OkvsParams {
            m: self.m,
            w: self.w,
            seed_r1: self.seed_r1 ^ (0x5EED_5EED_0000_0001u64.wrapping_mul(attempt as u64 + 1)),
            seed_r2: self.seed_r2 ^ (0x5EED_5EED_0000_0002u64.wrapping_mul(attempt as u64 + 1)),
        }
    }
}

/// One input row during encoding: `{a, u, v}`.
struct Row {
    a: usize,
    u: BandPattern,
    v: Field,
}

/// The encoded storage vector, with the parameters needed to decode it.
///
/// This is the section 6 OKVS wire payload: serializing an [`Okvs`] via
/// [`crate::wire`] carries exactly `{m, w, seed_r1, seed_r2}` followed by the
/// `m` storage field elements that a peer needs to reconstruct it with
/// [`Okvs::from_parts`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Okvs {
    params: OkvsParams,
    storage: Vec<Field>,
}

impl Okvs {
    /// Encodes `pairs` (distinct keys, each serialized canonically by the
    /// caller) under `params`, retrying with fresh seeds up to
    /// [`MAX_ENCODE_ATTEMPTS`] times if the banded system is inconsistent.
    pub fn encode(params: OkvsParams, pairs: &[(Vec<u8>, Field)]) -> Result<Self> {
        Self::encode_with_rows(params, |p| Self::build_rows(p, pairs))
    }

    /// Builds one [`Row`] per input pair under `params` (section 4.4 step 1):
    /// the hashing half of an encoding attempt.
    fn build_rows(params: OkvsParams, pairs: &[(Vec<u8>, Field)]) -> Vec<Row> {
        pairs
            .iter()
            .map(|(key, value)| Row {
                a: params.position(key),
                u: params.band(key),
                v: *value,
            })
            .collect()
    }

    /// The retry loop shared by [`encode`](Self::encode): rebuilds rows from
    /// `build_rows` under fresh seeds on each reseed (section 4.4's failure
    /// model). Parameterized over the row builder so tests can pin down an
    /// encoding attempt that is genuinely inconsistent followed by one that
    /// is consistent, without depending on which real key set happens to
    /// collide under which seed.
    fn encode_with_rows(
        params: OkvsParams,
        mut build_rows: impl FnMut(OkvsParams) -> Vec<Row>,
    ) -> Result<Self> {
        let mut attempt_params = params;
        for attempt in 0..MAX_ENCODE_ATTEMPTS {
            let rows = build_rows(attempt_params);
            match Self::eliminate(attempt_params, rows) {
                Some(okvs) => {
                    if attempt > 0 {
                        tracing::debug!(attempt, "OKVS encode succeeded after reseeding");
                    }
                    return Ok(okvs);
                }
                None => {
                    tracing::warn!(attempt, "OKVS encode hit an inconsistent banded system, reseeding");
                    attempt_params = attempt_params.respun(attempt);
                }
            }
        }
        Err(Error::OkvsUnsolvable { attempts: MAX_ENCODE_ATTEMPTS })
    }

    /// The pure banded-elimination core of an encoding attempt (section 4.4
    /// steps 2-5). Returns `None` if the system is inconsistent, in which
    /// case the caller should retry with fresh seeds.
    fn eliminate(params: OkvsParams, mut rows: Vec<Row>) -> Option<Self> {
        // Sort by band-start `a` alone (not `a + first_one(u)`): this is what
        // guarantees every pivot XORed into a row has `pivot.a <= row.a`. A
        // pivot row's only nonzero bits lie at or after its own pivot column
        // `c` (everything before `c` was already eliminated when the pivot
        // row was itself reduced), so `pivot.a <= row.a` puts the pivot's
        // entire nonzero range inside `[row.a, row.a + w)` -- `xor_row_into`
        // can then fold every one of the pivot's set bits into `row` without
        // silently dropping any that would otherwise fall outside `row`'s
        // window. Sorting by `a + first_one(u)` instead (the literal ordering
        // the RB-OKVS description suggests) does not guarantee this: a pivot
        // with a larger `a` but a smaller `first_one` can still share a
        // leading column with an earlier-`a` row, and XORing it in would
        // drop any of its bits past `row.a + w`, corrupting the basis.
        rows.sort_by_key(|r| r.a);

        let mut pivot_col: HashMap<usize, usize> = HashMap::new();
        let mut basis: Vec<Row> = Vec::with_capacity(rows.len());

        for mut row in rows {
            loop {
                let Some(j) = row.u.set_bits().next() else {
                    break;
                };
                let c = row.a + j;
                let Some(&basis_idx) = pivot_col.get(&c) else {
                    break;
                };
                xor_row_into(&mut row, &basis[basis_idx]);
            }

            match row.u.set_bits().next() {
                None => {
                    if !row.v.is_zero() {
                        // Inconsistent key set: an all-zero band cannot
                        // produce a nonzero target value.
                        return None;
                    }
                    // Redundant row: drop it.
                }
                Some(j_star) => {
                    pivot_col.insert(row.a + j_star, basis.len());
                    basis.push(row);
                }
            }
        }

        let mut storage = vec![Field::ZERO; params.m];
        let pivot_columns: std::collections::HashSet<usize> = pivot_col.keys().copied().collect();
        for col in 0..params.m {
            if !pivot_columns.contains(&col) {
                storage[col] = prf::block_prng(params.seed_r1 ^ params.seed_r2, col as u64);
            }
        }

        // Back-substitute pivot columns in descending order so that later
        // (already-resolved) columns feed earlier ones.
        let mut order: Vec<(usize, usize)> = pivot_col.into_iter().collect();
        order.sort_by_key(|&(col, _)| std::cmp::Reverse(col));
        for (col, basis_idx) in order {
            let row = &basis[basis_idx];
            let j_star = col - row.a;
            let mut acc = row.v;
            for j in row.u.set_bits() {
                if j != j_star {
                    acc = acc.add(storage[row.a + j]);
                }
            }
            storage[col] = acc;
        }

        Some(Okvs { params, storage })
    }

    /// Decodes `key`: XORs the `w`-wide band starting at `H1(key)` selected
    /// by `H2(key)`. `O(w)` XORs, unconditional on whether `key` was ever
    /// encoded.
    pub fn decode(&self, key_bytes: &[u8]) -> Field {
        let a = self.params.position(key_bytes);
        let u = self.params.band(key_bytes);
        let mut acc = Field::ZERO;
        for j in u.set_bits() {
            acc = acc.add(self.storage[a + j]);
        }
        acc
    }

    /// The parameters this OKVS was encoded under (needed by peers to decode
    /// it, per the section 6 wire format).
    pub fn params(&self) -> OkvsParams {
        self.params
    }

    /// The raw storage vector, `S`.
    pub fn storage(&self) -> &[Field] {
        &self.storage
    }

    /// Reconstructs an [`Okvs`] from its wire-format parameters and storage
    /// vector (section 6), e.g. after receiving a peer's publication.
    pub fn from_parts(params: OkvsParams, storage: Vec<Field>) -> Self {
        debug_assert_eq!(storage.len(), params.m);
        Okvs { params, storage }
    }
}

/// XORs `basis` into `row` in place: both the band pattern and the target
/// value. Requires `basis.a <= row.a` (the band-start sort in [`Okvs::eliminate`]
/// guarantees this for every pivot used here); the bounds check below is then
/// never false -- it documents the invariant rather than silently discarding
/// bits that would otherwise fall outside `row`'s window.
fn xor_row_into(row: &mut Row, basis: &Row) {
    row.v = row.v.add(basis.v);
    for j in basis.u.set_bits() {
        let global = basis.a + j;
        debug_assert!(global >= row.a && global - row.a < row.u.width());
        if global >= row.a && global - row.a < row.u.width() {
            row.u.toggle(global - row.a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::hash_to_field;

    fn sample_pairs(n: usize) -> Vec<(Vec<u8>, Field)> {
        (0..n as u64)
            .map(|i| (hash_to_field(i).to_be_bytes().to_vec(), hash_to_field(1_000_000 + i)))
            .collect()
    }

    #[test]
    fn round_trips_every_encoded_key() {
        let pairs = sample_pairs(64);
        let params = OkvsParams::new(pairs.len(), DEFAULT_W, DEFAULT_EPSILON, 1, 2).unwrap();
        let okvs = Okvs::encode(params, &pairs).unwrap();
        for (key, value) in &pairs {
            assert_eq!(okvs.decode(key), *value);
        }
    }

    #[test]
    fn decodes_non_keys_without_panicking() {
        let pairs = sample_pairs(32);
        let params = OkvsParams::new(pairs.len(), DEFAULT_W, DEFAULT_EPSILON, 3, 4).unwrap();
        let okvs = Okvs::encode(params, &pairs).unwrap();
        let probe = hash_to_field(999_999).to_be_bytes();
        // No crash and no special-casing: just another band XOR.
        let _ = okvs.decode(&probe);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(OkvsParams::from_raw(10, 0, 1, 2).is_err());
        assert!(OkvsParams::from_raw(10, 10, 1, 2).is_err());
        assert!(OkvsParams::from_raw(5, 10, 1, 2).is_err());
    }

    #[test]
    fn empty_pair_set_decodes_to_pseudo_random_noise() {
        let params = OkvsParams::from_raw(256, 192, 7, 8).unwrap();
        let okvs = Okvs::encode(params, &[]).unwrap();
        assert_eq!(okvs.storage().len(), 256);
    }

    #[test]
    fn encode_exhausts_retries_and_surfaces_unsolvable_on_a_duplicate_key_conflict() {
        // Encoding the same key twice with different values is inconsistent
        // under every reseed: (a, u) depends only on the key bytes and the
        // seed, so the duplicate row always lands on the same band as its
        // twin and XORs away to an all-zero pattern with a nonzero residual
        // value -- section 4.4 step 3's unsolvable case, on every attempt.
        let key = hash_to_field(1).to_be_bytes().to_vec();
        let pairs = vec![
            (key.clone(), hash_to_field(2)),
            (key, hash_to_field(3)),
        ];
        let params = OkvsParams::new(pairs.len(), DEFAULT_W, DEFAULT_EPSILON, 11, 12).unwrap();
        let err = Okvs::encode(params, &pairs).unwrap_err();
        assert!(matches!(
            err,
            Error::OkvsUnsolvable { attempts } if attempts == MAX_ENCODE_ATTEMPTS
        ));
    }

    #[test]
    fn encode_succeeds_after_exactly_one_retry_when_first_attempt_is_inconsistent() {
        // Drives `encode_with_rows` with a row builder that is genuinely
        // inconsistent on the first attempt (two distinct rows banding to
        // the same single column with different residual values -- an
        // all-zero pattern with nonzero `v`, section 4.4 step 3's
        // unsolvable case) and consistent from the second attempt on (the
        // same two rows, now on disjoint columns). This pins down the
        // `encode` retry path deterministically instead of hoping a real
        // key set collides under the first seed and not the second.
        let params = OkvsParams::from_raw(8, 4, 1, 2).unwrap();
        let calls = std::cell::Cell::new(0u32);
        let v1 = hash_to_field(10);
        let v2 = hash_to_field(20);

        let okvs = Okvs::encode_with_rows(params, |_attempt_params| {
            let attempt = calls.get();
            calls.set(attempt + 1);
            if attempt == 0 {
                vec![
                    Row { a: 0, u: BandPattern::single_bit(4, 0), v: v1 },
                    Row { a: 0, u: BandPattern::single_bit(4, 0), v: v2 },
                ]
            } else {
                vec![
                    Row { a: 0, u: BandPattern::single_bit(4, 0), v: v1 },
                    Row { a: 1, u: BandPattern::single_bit(4, 1), v: v2 },
                ]
            }
        })
        .unwrap();

        assert_eq!(calls.get(), 2, "expected exactly one retry before success");
        assert_eq!(okvs.storage()[0], v1);
        assert_eq!(okvs.storage()[2], v2);
    }

    #[test]
    fn wire_round_trip_via_cbor_preserves_params_and_storage() {
        let pairs = sample_pairs(16);
        let params = OkvsParams::new(pairs.len(), DEFAULT_W, DEFAULT_EPSILON, 21, 22).unwrap();
        let okvs = Okvs::encode(params, &pairs).unwrap();

        let bytes = crate::wire::to_binary(&okvs).unwrap();
        let decoded: Okvs = crate::wire::from_binary(&bytes).unwrap();

        assert_eq!(decoded.params(), okvs.params());
        for (key, value) in &pairs {
            assert_eq!(decoded.decode(key), *value);
        }
    }
}
