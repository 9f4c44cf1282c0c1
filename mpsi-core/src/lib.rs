#![deny(missing_docs)]
//! Core implementation of a threshold multi-party private set intersection
//! (MPSI) protocol.
//!
//! Among `n` parties each holding a private set, an aggregator recovers
//! exactly the elements held by at least `k` of the `n` parties, and learns
//! nothing else with high probability. The construction layers three
//! primitives:
//!
//! * [`field`] -- binary-field arithmetic over GF(2^128), the algebra
//!   everything else is built on.
//! * [`prf`] -- BLAKE3-keyed hashes deriving every pseudo-random quantity the
//!   protocol needs (slot positions, band patterns, tags, free-column
//!   filler) from a small set of seeds.
//! * [`poly`] -- per-element degree-`(k-1)` polynomial secret sharing.
//! * [`okvs`] -- the randomized-banded oblivious key-value store parties use
//!   to publish their shares without revealing their sets.
//! * [`placement`] -- the per-party bucket table that lets the aggregator
//!   rediscover shares without coordination.
//! * [`aggregator`] -- bucket scan, tag grouping, Lagrange recovery and
//!   consistency verification.
//! * [`pipeline`] -- orchestrates a single party through publication and
//!   cross-decoding, plus a free function driving a full in-process run.
//!
//! [`config`] and [`error`] are the ambient configuration and error-handling
//! surface shared by the library and the CLI demonstrator; [`wire`] carries
//! the section 6 wire formats (JSON for human-debuggable artifacts, CBOR for
//! the OKVS/placement-table binary wire formats) over the `serde`-derived
//! types defined throughout this crate.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod field;
pub mod lagrange;
pub mod okvs;
pub mod placement;
pub mod pipeline;
pub mod poly;
pub mod prf;
pub mod wire;

pub use error::{Error, Result};
pub use field::Field;
