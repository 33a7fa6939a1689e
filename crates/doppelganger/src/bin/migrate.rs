//! Rewrites legacy `{key, type, value}` mapping params into `EQUALS`
//! expressions.
//!
//! Usage:
//!   doppelganger-migrate input.json output.json

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use doppelganger::config::migrate::migrate_document;

#[derive(Parser, Debug)]
#[command(name = "doppelganger-migrate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Legacy configuration file
    input: PathBuf,

    /// Where to write the migrated configuration
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let contents = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let document: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", args.input.display()))?;

    let migrated = serde_json::to_string_pretty(&migrate_document(document))?;
    std::fs::write(&args.output, migrated + "\n")
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    Ok(())
}
