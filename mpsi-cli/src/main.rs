//! `mpsi-cli` -- an in-process demonstrator for the threshold MPSI protocol.
//!
//! Loads each party's input set from a JSON file, drives phases S12 through
//! S3x in-process over the abstract in-memory transport (section 1: a real
//! network transport is an out-of-scope external collaborator), and prints
//! the recovered intersection witnesses. This binary is a demonstrator and
//! integration smoke test, not a benchmark driver: it performs no parameter
//! sweeps and does not generate synthetic input sets.

use std::path::PathBuf;

use clap::Parser;
use eyre::Context as _;
use mpsi_core::Field;
use mpsi_core::config::ProtocolConfig;

/// CLI arguments: the protocol configuration plus the path to the input-set
/// file this run demonstrates.
#[derive(Parser, Debug)]
#[command(about = "Runs a threshold MPSI protocol over a JSON set file")]
struct Cli {
    #[command(flatten)]
    config: ProtocolConfig,

    /// Path to a JSON file holding one array per party, each an array of
    /// `[hi, lo]` GF(2^128) element pairs (section 6: `Vec<Vec<(u64,u64)>>`).
    #[clap(long, env = "MPSI_SETS")]
    sets: PathBuf,
}

/// Parses the section 6 input-set JSON form, `Vec<Vec<(u64,u64)>>`, into the
/// per-party element sets `run_in_memory` expects.
fn sets_from_json(json: &str) -> eyre::Result<Vec<Vec<Field>>> {
    let raw: Vec<Vec<(u64, u64)>> =
        serde_json::from_str(json).context("parsing input-set JSON")?;
    Ok(raw
        .into_iter()
        .map(|set| set.into_iter().map(|(hi, lo)| Field::new(hi, lo)).collect())
        .collect())
}

/// Renders recovered witnesses back into the same `[hi, lo]` JSON form, for
/// snapshotting a run's output.
fn witnesses_to_json(witnesses: &[Field]) -> eyre::Result<String> {
    let pairs: Vec<(u64, u64)> = witnesses.iter().map(|f| f.halves()).collect();
    serde_json::to_string_pretty(&pairs).context("rendering witnesses as JSON")
}

fn install_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mpsi_core=info,mpsi_cli=info")),
        )
        .init();
}

fn main() -> eyre::Result<()> {
    install_tracing();
    let cli = Cli::parse();
    tracing::info!(config = ?cli.config, sets = ?cli.sets, "starting mpsi-cli");

    let json = std::fs::read_to_string(&cli.sets)
        .with_context(|| format!("reading input-set file {}", cli.sets.display()))?;
    let sets = sets_from_json(&json)?;

    if sets.len() != cli.config.n as usize {
        eyre::bail!(
            "input-set file holds {} parties but --n is {}",
            sets.len(),
            cli.config.n
        );
    }

    tracing::info!(parties = sets.len(), "running S12 through S3x in-process");
    let witnesses = mpsi_core::pipeline::run_in_memory(cli.config, &sets)
        .context("running the MPSI pipeline")?;
    tracing::info!(count = witnesses.len(), "recovered intersection witnesses");

    println!("{}", witnesses_to_json(&witnesses)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_per_party_element_sets_from_json() {
        let json = r#"[[[0,10],[0,20]],[[0,10],[0,30]]]"#;
        let sets = sets_from_json(json).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], vec![Field::new(0, 10), Field::new(0, 20)]);
        assert_eq!(sets[1], vec![Field::new(0, 10), Field::new(0, 30)]);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(sets_from_json("not json").is_err());
    }

    #[test]
    fn renders_witnesses_back_to_the_same_pair_form() {
        let witnesses = vec![Field::new(1, 2), Field::new(3, 4)];
        let json = witnesses_to_json(&witnesses).unwrap();
        let round_tripped = sets_from_json(&format!("[{json}]")).unwrap();
        assert_eq!(round_tripped, vec![witnesses]);
    }
}
