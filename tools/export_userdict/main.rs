//! Export the user lexicon to JSON or CSV
//!
//! Usage:
//!   cargo run -p export_userdict -- --db ~/.jyutping/user_lexicon.redb --format json
//!   cargo run -p export_userdict -- --db user_lexicon.redb --format csv --output learned.csv

use anyhow::Context;
use clap::Parser;
use jyutping_core::{LexiconEntry, UserLexicon};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "export_userdict")]
#[command(about = "Export the user lexicon to JSON or CSV")]
struct Args {
    /// Path to the user lexicon database
    #[arg(short, long)]
    db: PathBuf,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Order by word instead of frequency
    #[arg(long)]
    sort_by_word: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let lexicon = UserLexicon::open(&args.db)
        .with_context(|| format!("open user lexicon {}", args.db.display()))?;

    // Most frequent first.
    let mut entries = lexicon.entries();
    if args.sort_by_word {
        entries.sort_by(|a, b| a.word.cmp(&b.word).then(a.romanization.cmp(&b.romanization)));
    }

    let output = match args.format.as_str() {
        "json" => export_json(&entries)?,
        "csv" => export_csv(&entries),
        _ => anyhow::bail!("Unsupported format: {}. Use 'json' or 'csv'", args.format),
    };

    if let Some(path) = args.output {
        std::fs::write(&path, output).with_context(|| format!("write {}", path.display()))?;
    } else {
        print!("{}", output);
    }
    Ok(())
}

fn export_json(entries: &[LexiconEntry]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

fn csv_field(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn export_csv(entries: &[LexiconEntry]) -> String {
    let mut output = String::from("word,romanization,frequency\n");
    for e in entries {
        output.push_str(&format!(
            "{},{},{}\n",
            csv_field(&e.word),
            csv_field(&e.romanization),
            e.frequency
        ));
    }
    output
}
