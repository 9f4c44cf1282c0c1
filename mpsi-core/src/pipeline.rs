//! Party pipeline (C7): orchestrates a single party through phases
//! S12 -> S13 -> S14, and a free function that drives the full in-process
//! `n`-party demonstration (S12 through S3x) for the CLI and test suites.
//!
//! Phase barriers (section 5): S12 completes before S13; S13 completes
//! before S14 (decoding requires every peer's OKVS); S14 completes before
//! S3x (the aggregator needs every party's placement table). Within a
//! phase, work partitions cleanly over elements (S12) or parties (S13) with
//! no shared-mutable state.

use crate::config::ProtocolConfig;
use crate::error::Result;
use crate::field::Field;
use crate::okvs::{Okvs, OkvsParams};
use crate::placement::{self, PlacementTable, Share};
use crate::poly;

/// One party's state machine, owning its input set and threshold
/// configuration from S12 through S14.
pub struct Party {
    id: u32,
    config: ProtocolConfig,
    elements: Vec<Field>,
    okvs: Option<Okvs>,
}

impl Party {
    /// Creates party `id` (1-indexed) holding `elements`, under `config`.
    pub fn new(id: u32, config: ProtocolConfig, elements: Vec<Field>) -> Self {
        Party {
            id,
            config,
            elements,
            okvs: None,
        }
    }

    /// This party's id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Phase S12 + S13: maps every element to `(x, f_x(i))`, encodes the
    /// pairs into an RB-OKVS, and returns the publication (storage vector
    /// plus parameters) to broadcast to peers. Embarrassingly parallel per
    /// element (S12) then per the single OKVS encode (S13); this method
    /// owns both because S13's input is exactly S12's output.
    pub fn publish_okvs(&mut self) -> Result<Okvs> {
        let pairs: Vec<(Vec<u8>, Field)> = self
            .elements
            .iter()
            .map(|&x| {
                let share = poly::share(x, self.id as u64, self.config.k as usize);
                (x.to_be_bytes().to_vec(), share)
            })
            .collect();

        let seed_r1 = self.config.salt_tag ^ (0x5EED_0001u64.wrapping_mul(self.id as u64));
        let seed_r2 = self.config.salt_tag ^ (0x5EED_0002u64.wrapping_mul(self.id as u64));
        let params = OkvsParams::new(pairs.len().max(1), self.config.w, self.config.epsilon_okvs, seed_r1, seed_r2)?;
        let okvs = Okvs::encode(params, &pairs)?;
        self.okvs = Some(okvs.clone());
        tracing::info!(party = self.id, m = params.m, w = params.w, "published OKVS");
        Ok(okvs)
    }

    /// Phase S14: given every peer's published OKVS (including this
    /// party's own, at index `self.id`), decodes every one of this party's
    /// elements against every peer's OKVS to obtain the cross-shares
    /// `sigma_{i,x,g}`, and places all `n` resulting shares (one self-share,
    /// `n-1` cross-shares) into a freshly built local placement table.
    /// Requires all peer OKVSes to have already been received -- the
    /// section 5 happens-before barrier between S13 and S14.
    pub fn build_placement_table(&self, peer_okvses: &[(u32, Okvs)], bucket_count: usize) -> PlacementTable {
        let mut table = PlacementTable::new(bucket_count, self.config.n, self.config.salt_slot);
        for &x in &self.elements {
            let tag = crate::prf::tag(&x.to_be_bytes(), self.config.salt_tag);
            for &(peer, ref okvs) in peer_okvses {
                let fx = okvs.decode(&x.to_be_bytes());
                let share = Share {
                    party_id: peer,
                    fx_i: fx,
                    tag,
                };
                if peer == self.id {
                    table.insert_own(self.id, x, share);
                } else {
                    table.insert_cross(self.id, peer, x, share);
                }
            }
        }
        tracing::info!(party = self.id, elements = self.elements.len(), "built placement table");
        table
    }
}

/// Runs the full `n`-party protocol in-process (phases S12 through S3x)
/// over an abstract in-memory transport, per section 1's "external
/// collaborators" note that a real network transport is out of scope for
/// the core. `sets[i]` is party `i+1`'s input set (1-indexed party ids).
///
/// Returns the recovered intersection witnesses.
pub fn run_in_memory(config: ProtocolConfig, sets: &[Vec<Field>]) -> Result<Vec<Field>> {
    config.validate()?;
    let mut parties: Vec<Party> = sets
        .iter()
        .enumerate()
        .map(|(idx, set)| Party::new((idx + 1) as u32, config, set.clone()))
        .collect();

    // S12 + S13: embarrassingly parallel per party; only the OKVS encode
    // result (not any mutable shared state) crosses the phase boundary.
    let mut publications: Vec<(u32, Okvs)> = Vec::with_capacity(parties.len());
    for party in &mut parties {
        let okvs = party.publish_okvs()?;
        publications.push((party.id(), okvs));
    }

    // S14: requires every peer's publication, hence collected fully above
    // before any party decodes.
    let max_set_size = sets.iter().map(Vec::len).max().unwrap_or(0);
    let bucket_count = placement::bucket_count(max_set_size, config.epsilon_hash);
    let tables: Vec<PlacementTable> = parties
        .iter()
        .map(|party| party.build_placement_table(&publications, bucket_count))
        .collect();

    // S3x: the aggregator scans the union of all placement tables.
    let witnesses = crate::aggregator::recover_witnesses(&tables, config.k as usize, config.salt_tag);
    tracing::info!(witnesses = witnesses.len(), "aggregation complete");
    Ok(witnesses)
}
