//! libjyutping crate root
//!
//! Cantonese Jyutping input on top of `jyutping-core`: syllable grammar,
//! keystroke normalization, segmentation, the matching engine, a typing
//! session that folds in the user lexicon, and a background worker.
//!
//! Public API exported here:
//! - `Normalizer` and `LookupMode` from `normalizer`
//! - `Splitter`, `SyllableToken` and `Scheme` from `splitter`
//! - `Engine` from `engine`
//! - `InputSession` / `Selection` from `session`
//! - `SuggestionWorker` / `Suggestion` from `worker`
//! - `JyutpingConfig` from `config`

pub mod config;
pub mod engine;
pub mod normalizer;
pub mod session;
pub mod splitter;
pub mod syllables;
pub mod worker;

pub use jyutping_core::{
    Candidate, CandidateList, Config, Lexicon, LexiconBuilder, LexiconSources, UserLexicon,
};

pub use config::JyutpingConfig;
pub use engine::Engine;
pub use normalizer::{LookupMode, Normalizer};
pub use session::{InputSession, Selection};
pub use splitter::{Scheme, Splitter, SyllableToken};
pub use syllables::JYUTPING_SYLLABLES;
pub use worker::{Suggestion, SuggestionWorker};

use std::path::Path;
use std::sync::Arc;

/// Build a ready session from a config: the dictionary prepared from
/// `data_dir` (cached under `cache_dir`) and the user lexicon at
/// `user_lexicon_path`, or an in-memory one when no path is given.
///
/// Stores that cannot be opened leave the session degraded, never failed.
pub fn open_session(
    config: &JyutpingConfig,
    data_dir: &Path,
    cache_dir: &Path,
    user_lexicon_path: Option<&Path>,
) -> InputSession {
    let splitter = Arc::new(Splitter::new().with_max_schemes(config.base.max_schemes));
    let engine = Engine::prepare(
        &LexiconSources::from_dir(data_dir),
        cache_dir,
        &config.app_version,
        splitter,
        config.base.clone(),
    );
    let user_lexicon = match user_lexicon_path {
        Some(path) => UserLexicon::open_or_closed(path),
        None => UserLexicon::new_in_memory(),
    };
    InputSession::new(engine, user_lexicon, config.normalizer())
}
