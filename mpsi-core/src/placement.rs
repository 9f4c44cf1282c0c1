//! Placement table (C5): per-party cuckoo-style bucket assignment for every
//! share of every element, so the aggregator can rediscover them without
//! coordination.

use crate::field::Field;
use serde::{Deserialize, Serialize};

/// Recommended load factor `epsilon_hash` for sizing the bucket count
/// (section 3 recommended default).
pub const DEFAULT_EPSILON_HASH: f64 = 1.3;

/// One share as placed into a bucket: `{party_id, fx_i, tag}` (section 3,
/// section 6 wire format).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// The party whose evaluation this is (`1..=n`).
    pub party_id: u32,
    /// `f_x(alpha_party_id)`.
    pub fx_i: Field,
    /// `tag(x, salt_tag)`, linking this share to its siblings across
    /// parties without revealing `x`.
    pub tag: Field,
}

/// Computes `B = ceil(epsilon_hash * m) + 1` bucket count for a placement
/// table sized against `m`, the largest input set among all parties
/// (section 3).
pub fn bucket_count(max_set_size: usize, epsilon_hash: f64) -> usize {
    ((max_set_size as f64) * epsilon_hash).ceil() as usize + 1
}

/// The `n` candidate slots for element `x`, `I(x) = sort(h(x,1), ..., h(x,n))`,
/// each mapped into `[0, bucket_count)` via a keyed hash (section 4.5).
fn candidate_slots(x: Field, n: u32, bucket_count: usize, seed: u64) -> Vec<usize> {
    let mut slots: Vec<usize> = (1..=n)
        .map(|g| {
            let input = [x.to_be_bytes().as_slice(), &g.to_be_bytes()].concat();
            crate::prf::h1(seed, &input, bucket_count as u64) as usize
        })
        .collect();
    slots.sort_unstable();
    slots
}

/// Party `i`'s local placement table: `B` append-only-until-built buckets.
///
/// This is the section 6 placement-table wire payload: an ordered sequence
/// of `B` buckets, each a list of shares, serializable via [`crate::wire`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementTable {
    buckets: Vec<Vec<Share>>,
    n: u32,
    seed: u64,
}

impl PlacementTable {
    /// Builds an empty table with `bucket_count` buckets for an `n`-party
    /// run, keyed by `seed` (the protocol-wide slot salt).
    pub fn new(bucket_count: usize, n: u32, seed: u64) -> Self {
        PlacementTable {
            buckets: vec![Vec::new(); bucket_count],
            n,
            seed,
        }
    }

    /// The number of buckets, `B`.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Inserts party `i`'s own share of `x` into its own table, at slot
    /// `I(x)[(i + i - 1) mod n]` (section 4.5).
    pub fn insert_own(&mut self, own_party: u32, x: Field, share: Share) {
        let slots = candidate_slots(x, self.n, self.bucket_count(), self.seed);
        let idx = ((own_party + own_party - 1) % self.n) as usize;
        self.buckets[slots[idx]].push(share);
    }

    /// Inserts a cross-share decoded for peer `gamma` into party `own_party`'s
    /// table, at slot `I(x)[(gamma + i - 1) mod n]` (section 4.5). The
    /// `(gamma + i - 1) mod n` rotation load-balances only; correctness is
    /// driven by tag matching at the aggregator, not by slot alignment.
    pub fn insert_cross(&mut self, own_party: u32, peer: u32, x: Field, share: Share) {
        let slots = candidate_slots(x, self.n, self.bucket_count(), self.seed);
        let idx = ((peer + own_party - 1) % self.n) as usize;
        self.buckets[slots[idx]].push(share);
    }

    /// All shares placed in bucket `eta`.
    pub fn bucket(&self, eta: usize) -> &[Share] {
        &self.buckets[eta]
    }

    /// Iterates over all buckets in order.
    pub fn buckets(&self) -> impl Iterator<Item = &[Share]> {
        self.buckets.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::hash_to_field;

    #[test]
    fn bucket_count_matches_formula() {
        assert_eq!(bucket_count(10, 1.3), 14);
        assert_eq!(bucket_count(0, 1.3), 1);
    }

    #[test]
    fn insertions_land_within_bounds_and_are_retrievable() {
        let n = 4;
        let bc = bucket_count(8, DEFAULT_EPSILON_HASH);
        let mut table = PlacementTable::new(bc, n, 42);
        let x = hash_to_field(7);
        let own = Share {
            party_id: 2,
            fx_i: hash_to_field(100),
            tag: hash_to_field(200),
        };
        table.insert_own(2, x, own);
        let cross = Share {
            party_id: 3,
            fx_i: hash_to_field(101),
            tag: hash_to_field(200),
        };
        table.insert_cross(2, 3, x, cross);

        let total: usize = table.buckets().map(<[Share]>::len).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn candidate_slots_are_deterministic() {
        let x = hash_to_field(9);
        let a = candidate_slots(x, 5, 32, 1);
        let b = candidate_slots(x, 5, 32, 1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }
}
