//! Interactive Jyutping input test
//!
//! Usage:
//!   cargo run -p libjyutping -- --data data --cache target/lexicon
//!
//! Type Jyutping and press Enter. `:accept N` selects candidate N of the
//! current page, `:remove N` forgets it from the user lexicon, `:clear`
//! empties the user lexicon. `:next` / `:prev` page through the list.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use libjyutping::{open_session, InputSession, JyutpingConfig, Selection};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "libjyutping")]
#[command(about = "Cantonese Jyutping input from the terminal")]
struct Args {
    /// Directory holding jyutping.txt (and optionally pinyin.txt, shape.txt)
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Directory for the materialized dictionary
    #[arg(long, default_value = "data/cache")]
    cache: PathBuf,

    /// User lexicon database (in-memory when omitted)
    #[arg(long)]
    user_lexicon: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keyboard arrangement; above 1 disables tone shortcuts
    #[arg(long)]
    arrangement: Option<u8>,
}

fn print_page(session: &InputSession) {
    let list = session.candidates();
    if list.is_empty() {
        println!("  → (no candidates)\n");
        return;
    }
    println!("  [{}]", session.marked_text());
    for (i, c) in list.current_page_candidates().iter().enumerate() {
        println!("  {}. {} ({})", i + 1, c.text, c.mark);
    }
    println!(
        "  page {}/{}\n",
        list.current_page() + 1,
        list.num_pages()
    );
}

fn page_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => JyutpingConfig::load_toml(path)?,
        None => JyutpingConfig::default(),
    };
    if let Some(arrangement) = args.arrangement {
        config.arrangement = arrangement;
    }

    let mut session = open_session(
        &config,
        &args.data,
        &args.cache,
        args.user_lexicon.as_deref(),
    );
    if !session.engine().is_open() {
        eprintln!("suggestions unavailable: no dictionary under {}", args.data.display());
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let raw = line?;
        let input = raw.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(rest) = input.strip_prefix(":accept") {
            match page_index(rest).and_then(|i| session.select(i)) {
                Some(Selection::Committed(c)) => println!("  ✓ {} ({})\n", c.text, c.romanization),
                Some(Selection::Composing { selected, remaining }) => {
                    println!("  + {} … {}", selected.text, remaining);
                    print_page(&session);
                }
                None => println!("  no such candidate\n"),
            }
            continue;
        }
        if let Some(rest) = input.strip_prefix(":remove") {
            let target = page_index(rest)
                .and_then(|i| session.candidates().current_page_candidates().get(i).cloned());
            match target {
                Some(c) => {
                    if session.remove(&c) {
                        println!("  removed {}\n", c.text);
                    } else {
                        println!("  {} was not learned\n", c.text);
                    }
                }
                None => println!("  no such candidate\n"),
            }
            continue;
        }
        match input {
            ":clear" => {
                session.clear_user_lexicon();
                println!("  user lexicon cleared\n");
            }
            ":next" => {
                session.candidates_mut().page_down();
                print_page(&session);
            }
            ":prev" => {
                session.candidates_mut().page_up();
                print_page(&session);
            }
            text => {
                session.set_input(text);
                print_page(&session);
            }
        }
    }

    session.close();
    Ok(())
}
