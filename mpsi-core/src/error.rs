//! Typed error taxonomy for the protocol (C8).
//!
//! Only the two fatal kinds described in section 7 of the specification are
//! represented as [`Error`] variants: [`Error::ParameterInvalid`], raised
//! immediately by [`crate::config::ProtocolConfig::new`], and
//! [`Error::OkvsUnsolvable`], raised by [`crate::okvs::Okvs::encode`] once
//! its bounded retry budget is exhausted. The non-fatal, per-element
//! outcomes (`ThresholdNotMet`, `ConsistencyCheckFailed`) are never
//! constructed as errors at all -- they are simply the reason a tag group is
//! absent from the aggregator's witness set, optionally logged via
//! `tracing`.

/// Errors the protocol can raise.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A protocol or OKVS parameter violates an invariant from section 3/7
    /// (`k == 0`, `k > n`, `w == 0`, or `m <= w`). Surfaced immediately; no
    /// recovery is attempted.
    #[error("invalid parameter: {0}")]
    ParameterInvalid(String),

    /// The RB-OKVS encoder detected an inconsistent row set on every seed it
    /// tried within its retry budget.
    #[error("OKVS encoding unsolvable after {attempts} attempt(s)")]
    OkvsUnsolvable {
        /// Number of encode attempts made before giving up.
        attempts: u32,
    },
}

/// Convenience alias for fallible protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
