//! Aggregator (C6): bucket scan, tag-grouping, Lagrange recovery, and
//! consistency verification over every party's placement table.

use crate::field::Field;
use crate::lagrange;
use crate::placement::{PlacementTable, Share};
use crate::poly;
use crate::prf;
use itertools::Itertools as _;
use std::collections::{HashMap, HashSet};

/// Scans every bucket across every table in `tables`, pools shares globally
/// by tag, and recovers any tag group with at least `k` distinct
/// contributing parties whose shares lie on one common degree-`(k-1)`
/// polynomial (section 4.6).
///
/// The pool is global, not bucket-local. Per section 4.5 a single element's
/// shares land in up to `n` different buckets depending on which party
/// inserted them (the `(gamma + i - 1) mod n` rotation is keyed on both the
/// inserting party and the target peer), and every peer this party does
/// *not* hold `x` for still contributes a share -- an RB-OKVS decode of a
/// non-member key, which the obliviousness property (section 4.4) guarantees
/// is indistinguishable from uniform noise. Grouping bucket by bucket instead
/// of globally relies on some bucket collecting every one of a holder set
/// `H`'s rotations with no noise mixed in, which only happens when `H` is
/// symmetric under that rotation (some constant `c` with `c - H = H mod n`);
/// for an asymmetric `H` (e.g. `n=7`, `H={1,2,4}`) no bucket ever does, so a
/// bucket-local scan silently drops genuinely-intersecting elements. Section
/// 9 already settles this: "correctness derives from tag matching, not slot
/// alignment" -- the bucket/slot rotation is a load-balancing aid, not a
/// correctness mechanism, so grouping must not depend on it. Pooling
/// globally and letting [`recover_tag_group`]'s combinatorial search plus tag
/// re-check separate genuine recoveries from noise is what that sentence
/// requires.
///
/// Returns the recovered elements (the emitted witnesses) as a set --
/// ordering is unspecified, matching the section 8 determinism property
/// ("identical witness sets, as sets").
pub fn recover_witnesses(tables: &[PlacementTable], k: usize, salt_tag: u64) -> Vec<Field> {
    let by_tag: HashMap<Field, Vec<Share>> = tables
        .iter()
        .flat_map(|table| table.buckets().flat_map(|bucket| bucket.iter().copied()))
        .map(|share| (share.tag, share))
        .into_group_map();

    let mut witnesses: HashSet<Field> = HashSet::new();
    for (tag, shares) in by_tag {
        if let Some(x) = recover_tag_group(&shares, k, tag, salt_tag) {
            witnesses.insert(x);
        }
    }

    witnesses.into_iter().collect()
}

/// Recovers the constant term of one tag group's shares, or `None` if no
/// combination of `k` of them recovers this group's tag (section 7's
/// non-fatal `ThresholdNotMet`/`ConsistencyCheckFailed`, both "silently omit
/// from output", never a raised error).
///
/// A global tag group mixes genuine holder shares with OKVS-decode noise
/// from parties that don't hold `x` (this module's doc comment), so there is
/// no fixed subset of the group that is safe to interpolate and no fixed set
/// of "the rest" that is safe to demand agreement from -- which of the
/// deduplicated points are genuine depends on `x`'s actual holder set, not on
/// anything observable ahead of time. Instead this searches every `k`-subset
/// of the deduplicated points for one whose Lagrange-recovered constant term
/// re-hashes to the group's tag under [`prf::tag`]. [`prf::tag`] is a keyed
/// hash, so a subset mixing in even one noise or tampered point recovers a
/// value that fails the re-hash with overwhelming probability; only a subset
/// drawn entirely from `x`'s true holders reconstructs `x` itself. This is
/// exactly section 9's "correctness derives from tag matching, not slot
/// alignment" applied to share selection as well as bucket placement.
///
/// This accepts a result as soon as *any* `k` honest points exist, which
/// means a single tampered share among more than `k` contributors is simply
/// outvoted rather than poisoning the whole group -- the element is still
/// genuinely held by at least `k` parties, so it is still recovered.
/// Tampering only causes rejection when it drops the number of mutually
/// consistent points below `k`.
fn recover_tag_group(shares: &[Share], k: usize, tag: Field, salt_tag: u64) -> Option<Field> {
    if k == 0 {
        return None;
    }

    // Deduplicate by party_id: at most one share per party.
    let mut by_party: HashMap<u32, Field> = HashMap::new();
    for share in shares {
        by_party.entry(share.party_id).or_insert(share.fx_i);
    }
    if by_party.len() < k {
        return None;
    }

    let mut points: Vec<(u32, Field)> = by_party.into_iter().collect();
    points.sort_by_key(|&(party_id, _)| party_id);

    points.into_iter().combinations(k).find_map(|subset| {
        let chosen: Vec<(Field, Field)> = subset
            .iter()
            .map(|&(party_id, fx_i)| (poly::evaluation_point(party_id as u64), fx_i))
            .collect();
        let candidate = lagrange::lagrange_at(&chosen, Field::ZERO);
        (prf::tag(&candidate.to_be_bytes(), salt_tag) == tag).then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::hash_to_field;
    use crate::placement::{DEFAULT_EPSILON_HASH, bucket_count};
    use crate::poly::ElementPolynomial;

    const SALT_TAG: u64 = 7;

    fn shares_for(x: Field, k: usize, parties: &[u32]) -> (Vec<Share>, Field) {
        let poly = ElementPolynomial::for_element(x, k);
        let tag = prf::tag(&x.to_be_bytes(), SALT_TAG);
        let shares = parties
            .iter()
            .map(|&p| Share {
                party_id: p,
                fx_i: poly.eval(poly::evaluation_point(p as u64)),
                tag,
            })
            .collect();
        (shares, tag)
    }

    #[test]
    fn recovers_when_threshold_met() {
        let x = hash_to_field(42);
        let (shares, tag) = shares_for(x, 3, &[1, 2, 3]);
        assert_eq!(recover_tag_group(&shares, 3, tag, SALT_TAG), Some(x));
    }

    #[test]
    fn skips_below_threshold() {
        let x = hash_to_field(42);
        let (shares, tag) = shares_for(x, 3, &[1, 2]);
        assert_eq!(recover_tag_group(&shares, 3, tag, SALT_TAG), None);
    }

    #[test]
    fn dedupes_duplicate_party_shares() {
        let x = hash_to_field(42);
        let (mut shares, tag) = shares_for(x, 3, &[1, 2, 3]);
        // Duplicate party 1 appears again -- must still count as one party.
        shares.push(shares[0]);
        assert_eq!(shares.len(), 4);
        assert_eq!(recover_tag_group(&shares, 3, tag, SALT_TAG), Some(x));
    }

    #[test]
    fn recovers_true_element_despite_one_tampered_extra_share() {
        let x = hash_to_field(42);
        let (mut shares, tag) = shares_for(x, 3, &[1, 2, 3, 4]);
        // Tamper with party 4's share -- the honest subset {1,2,3} still
        // recovers x and re-hashes to the group tag, so the element is
        // still emitted; party 4's bad point is simply outvoted.
        shares[3].fx_i = shares[3].fx_i.add(Field::ONE);
        assert_eq!(recover_tag_group(&shares, 3, tag, SALT_TAG), Some(x));
    }

    #[test]
    fn rejects_when_tampering_leaves_fewer_than_k_honest_shares() {
        let x = hash_to_field(42);
        let (mut shares, tag) = shares_for(x, 3, &[1, 2, 3]);
        // Exactly k shares, one tampered -- no k-subset of honest points
        // remains, so no candidate re-hashes to the group tag.
        shares[2].fx_i = shares[2].fx_i.add(Field::ONE);
        assert_eq!(recover_tag_group(&shares, 3, tag, SALT_TAG), None);
    }

    #[test]
    fn recovers_asymmetric_holder_set_with_no_aligned_bucket() {
        // n=7, k=3, H={1,2,4}: no bucket-rotation symmetry point exists for
        // this holder set (no `c` with `c - H = H mod 7`), so a bucket-local
        // scan would never collect all three genuine shares together. The
        // global tag pool recovers it regardless of bucket alignment.
        let n = 7u32;
        let k = 3usize;
        let x = hash_to_field(123);
        let bc = bucket_count(3, DEFAULT_EPSILON_HASH);
        let holders = [1u32, 2, 4];

        let mut tables = Vec::new();
        for &party in &holders {
            let mut table = PlacementTable::new(bc, n, 99);
            let tag = prf::tag(&x.to_be_bytes(), SALT_TAG);
            for g in 1..=n {
                let fx_g = poly::share(x, g as u64, k);
                let share = Share { party_id: g, fx_i: fx_g, tag };
                if g == party {
                    table.insert_own(party, x, share);
                } else {
                    table.insert_cross(party, g, x, share);
                }
            }
            tables.push(table);
        }

        let witnesses = recover_witnesses(&tables, k, SALT_TAG);
        assert_eq!(witnesses, vec![x]);
    }

    #[test]
    fn rejects_candidate_whose_tag_does_not_match() {
        // Three points that don't actually lie on any element's real
        // polynomial still interpolate to *some* field element, but that
        // element's own tag won't match the group's.
        let shares = vec![
            Share { party_id: 1, fx_i: hash_to_field(1), tag: hash_to_field(999) },
            Share { party_id: 2, fx_i: hash_to_field(2), tag: hash_to_field(999) },
            Share { party_id: 3, fx_i: hash_to_field(3), tag: hash_to_field(999) },
        ];
        assert_eq!(recover_tag_group(&shares, 3, hash_to_field(999), SALT_TAG), None);
    }

    #[test]
    fn end_to_end_bucket_scan_recovers_full_intersection() {
        let n = 3u32;
        let k = 2usize;
        let elements: Vec<Field> = [10u64, 20, 30].iter().map(|&v| hash_to_field(v)).collect();
        let bc = bucket_count(elements.len(), DEFAULT_EPSILON_HASH);

        let mut tables = Vec::new();
        for party in 1..=n {
            let mut table = PlacementTable::new(bc, n, 99);
            for &x in &elements {
                let tag = prf::tag(&x.to_be_bytes(), SALT_TAG);
                for g in 1..=n {
                    let fx_g = poly::share(x, g as u64, k);
                    let share = Share {
                        party_id: g,
                        fx_i: fx_g,
                        tag,
                    };
                    if g == party {
                        table.insert_own(party, x, share);
                    } else {
                        table.insert_cross(party, g, x, share);
                    }
                }
            }
            tables.push(table);
        }

        let mut witnesses = recover_witnesses(&tables, k, SALT_TAG);
        witnesses.sort_by_key(Field::halves);
        let mut expected = elements.clone();
        expected.sort_by_key(Field::halves);
        assert_eq!(witnesses, expected);
    }
}
