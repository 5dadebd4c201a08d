//! jyutping-core
//!
//! Candidate model, dictionary store, user lexicon and configuration shared
//! by the Jyutping engine (libjyutping) and its tools.
//!
//! The dictionary is an FST index over stable key hashes with a bincode
//! payload; the user lexicon is stored in redb.
//!
//! Public API:
//! - `Candidate` / `CandidateList` - conversion results and the list shown to the user
//! - `Lexicon` - read-only romanization dictionary (exact, prefix, shortcut, reverse lookups)
//! - `UserLexicon` - persistent per-user frequency store
//! - `TrieNode` - syllable spelling trie used by the segmenter
//! - `Config` - engine limits and ranking options
use serde::{Deserialize, Serialize};

pub mod hash;
pub use hash::{key_hash, KeyKind, HASH_VERSION};

pub mod romanization;

pub mod trie;
pub use trie::TrieNode;

pub mod candidate;
pub use candidate::{dedup_candidates, Candidate, CandidateList};

pub mod lexicon;
pub use lexicon::{Lexicon, LexiconBuilder, LexiconRow, LexiconSources};

pub mod userdict;
pub use userdict::{LexiconEntry, UserLexicon};

/// Generic engine configuration.
///
/// Only language-agnostic limits live here. Keyboard-specific options
/// (arrangement, tone shortcuts, app version) belong in `JyutpingConfig`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Rows returned by a shortcut (initials) lookup.
    pub shortcut_limit: usize,
    /// Rows returned by a prefix lookup on the general paths.
    pub prefix_limit: usize,
    /// Rows returned by the whole-input prefix lookup on the partial-match path.
    pub partial_prefix_limit: usize,
    /// Rows returned by each user lexicon query.
    pub user_lexicon_limit: usize,

    /// Two rows of equal text length are reordered only when they are more
    /// than this many rows apart.
    pub row_distance_threshold: u32,

    /// Personalized results precede dictionary results.
    pub user_lexicon_first: bool,

    /// Upper bound on segmentation schemes kept per input.
    pub max_schemes: usize,

    /// Candidates per page.
    pub page_size: usize,

    /// Entries in the input -> candidates cache (0 disables it).
    pub max_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shortcut_limit: 100,
            prefix_limit: 100,
            partial_prefix_limit: 5,
            user_lexicon_limit: 5,
            row_distance_threshold: 30000,
            user_lexicon_first: true,
            max_schemes: 64,
            page_size: 6,
            max_cache_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    // ========== Ranking ==========

    pub fn set_row_distance_threshold(&mut self, rows: u32) {
        self.row_distance_threshold = rows;
    }

    pub fn get_row_distance_threshold(&self) -> u32 {
        self.row_distance_threshold
    }

    pub fn set_user_lexicon_first(&mut self, first: bool) {
        self.user_lexicon_first = first;
    }

    pub fn is_user_lexicon_first(&self) -> bool {
        self.user_lexicon_first
    }

    // ========== Paging ==========

    /// Set candidates per page. Zero is raised to one.
    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}
