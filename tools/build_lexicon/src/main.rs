//! Materialize the dictionary from the bundled tab-delimited sources
//!
//! Usage:
//!   cargo run -p build_lexicon -- --data data --out data/cache
//!   cargo run -p build_lexicon -- --data data --out data/cache --app-version 0.2.0
//!
//! Writes lexicon.fst and lexicon.bincode into `--out`, stamped with the same
//! version marker `Lexicon::prepare` checks at startup.

use anyhow::Context;
use clap::Parser;
use jyutping_core::lexicon::version_marker;
use jyutping_core::LexiconSources;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "build_lexicon")]
#[command(about = "Build the Jyutping dictionary artifacts")]
struct Args {
    /// Directory holding jyutping.txt, pinyin.txt and shape.txt
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Output directory for lexicon.fst / lexicon.bincode
    #[arg(long, default_value = "data/cache")]
    out: PathBuf,

    /// Application version recorded in the artifacts
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    app_version: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let sources = LexiconSources::from_dir(&args.data);
    let marker = version_marker(&args.app_version);

    let lexicon = sources
        .build(&marker)
        .with_context(|| format!("build lexicon from {}", args.data.display()))?;
    lexicon.save(&args.out)?;

    info!(rows = lexicon.len(), version = %marker, out = %args.out.display(), "lexicon written");
    println!("✓ {} rows → {}", lexicon.len(), args.out.display());
    Ok(())
}
