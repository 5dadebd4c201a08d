//! Dictionary Store: read-only romanization lexicon backed by an FST index.
//!
//! Responsibilities implemented here:
//! - `LexiconBuilder` parses the bundled tab-delimited sources and derives
//!   every lookup key (ping, shortcut, prefix, pinyin and its initials,
//!   cangjie, stroke, word)
//! - `Lexicon` answers key lookups, optionally with row positions
//! - artifacts are two files in a cache directory: `lexicon.fst` maps
//!   `[kind, hash]` keys to posting-list indices, `lexicon.bincode` holds the
//!   version marker, rows, posting lists and the reverse-lookup codes
//! - `Lexicon::prepare` reuses those artifacts when their version marker
//!   matches and rebuilds them otherwise
//!
//! Row positions are source order in `jyutping.txt` and never change for a
//! given build, which is what the row-distance tie-break relies on.

use crate::hash::{index_key, key_hash, KeyKind, HASH_VERSION};
use crate::romanization::{anchors, ping, remove_tones};
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use fst::{Map, MapBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const FST_FILE: &str = "lexicon.fst";
pub const PAYLOAD_FILE: &str = "lexicon.bincode";

/// One dictionary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconRow {
    pub word: String,
    pub romanization: String,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    version: &'a str,
    rows: &'a [LexiconRow],
    postings: &'a [Vec<u32>],
    codes: &'a ReverseCodes,
}

#[derive(Deserialize)]
struct Payload {
    version: String,
    rows: Vec<LexiconRow>,
    postings: Vec<Vec<u32>>,
    codes: ReverseCodes,
}

// Codes attached to a row by the reverse-lookup sources, per key kind.
type ReverseCodes = BTreeMap<(u8, u32), Vec<String>>;

/// Marker stored alongside the artifacts: app version plus hash version.
pub fn version_marker(app_version: &str) -> String {
    format!("{}+h{}", app_version, HASH_VERSION)
}

/// Immutable, indexed dictionary.
pub struct Lexicon {
    index: Map<Vec<u8>>,
    rows: Vec<LexiconRow>,
    postings: Vec<Vec<u32>>,
    codes: ReverseCodes,
    version: String,
}

impl std::fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("version", &self.version)
            .field("rows", &self.rows.len())
            .field("keys", &self.index.len())
            .finish()
    }
}

impl Lexicon {
    /// Row indices posted under `key`. Empty keys never reach the index.
    fn postings(&self, kind: KeyKind, key: &str) -> &[u32] {
        if key.is_empty() {
            return &[];
        }
        self.index
            .get(index_key(kind, key_hash(key)))
            .and_then(|i| self.postings.get(i as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rows for `key`, in source order, capped at `limit`.
    pub fn lookup(&self, kind: KeyKind, key: &str, limit: usize) -> Vec<&LexiconRow> {
        self.lookup_with_position(kind, key)
            .into_iter()
            .take(limit)
            .map(|(_, row)| row)
            .collect()
    }

    /// Rows for `key` with their source position.
    pub fn lookup_with_position(&self, kind: KeyKind, key: &str) -> Vec<(u32, &LexiconRow)> {
        self.postings(kind, key)
            .iter()
            .filter_map(|&pos| self.rows.get(pos as usize).map(|row| (pos, row)))
            // Drop rows that only share the key's hash.
            .filter(|&(pos, row)| self.key_matches(kind, key, pos, row))
            .collect()
    }

    fn key_matches(&self, kind: KeyKind, key: &str, pos: u32, row: &LexiconRow) -> bool {
        match kind {
            KeyKind::Ping => ping(&row.romanization) == key,
            KeyKind::Shortcut => anchors(&row.romanization) == key,
            KeyKind::Prefix => ping(&row.romanization).starts_with(key),
            KeyKind::Word => row.word == key,
            KeyKind::Pinyin | KeyKind::PinyinShortcut | KeyKind::Cangjie | KeyKind::Stroke => self
                .codes
                .get(&(kind as u8, pos))
                .is_some_and(|codes| codes.iter().any(|code| code == key)),
        }
    }

    /// Every romanization recorded for `word`, in source order.
    pub fn romanizations_of(&self, word: &str) -> Vec<&str> {
        self.lookup(KeyKind::Word, word, usize::MAX)
            .into_iter()
            .map(|row| row.romanization.as_str())
            .collect()
    }

    pub fn row(&self, position: u32) -> Option<&LexiconRow> {
        self.rows.get(position as usize)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write `lexicon.fst` and `lexicon.bincode` into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

        let fst_path = dir.join(FST_FILE);
        std::fs::write(&fst_path, self.index.as_fst().as_bytes())
            .with_context(|| format!("write {}", fst_path.display()))?;

        let payload_path = dir.join(PAYLOAD_FILE);
        let f = File::create(&payload_path)
            .with_context(|| format!("create {}", payload_path.display()))?;
        let payload = PayloadRef {
            version: &self.version,
            rows: &self.rows,
            postings: &self.postings,
            codes: &self.codes,
        };
        let mut writer = BufWriter::new(f);
        bincode::serialize_into(&mut writer, &payload)
            .with_context(|| format!("serialize {}", payload_path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush {}", payload_path.display()))?;
        Ok(())
    }

    /// Load artifacts written by `save`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let fst_path = dir.join(FST_FILE);
        let bytes =
            std::fs::read(&fst_path).with_context(|| format!("read {}", fst_path.display()))?;
        let index = Map::new(bytes).with_context(|| format!("fst map {}", fst_path.display()))?;

        let payload_path = dir.join(PAYLOAD_FILE);
        let f = File::open(&payload_path)
            .with_context(|| format!("open {}", payload_path.display()))?;
        let payload: Payload = bincode::deserialize_from(BufReader::new(f))
            .with_context(|| format!("deserialize {}", payload_path.display()))?;

        if payload.postings.len() != index.len() {
            bail!(
                "corrupt lexicon: {} keys but {} posting lists",
                index.len(),
                payload.postings.len()
            );
        }
        let rows = payload.rows.len();
        if payload.postings.iter().flatten().any(|&pos| pos as usize >= rows) {
            bail!("corrupt lexicon: posting beyond {} rows", rows);
        }

        Ok(Self {
            index,
            rows: payload.rows,
            postings: payload.postings,
            codes: payload.codes,
            version: payload.version,
        })
    }

    /// Reuse the artifacts in `cache_dir` when their marker matches
    /// `app_version`, else rebuild from `sources` and write them back.
    ///
    /// A failed write-back is logged; the freshly built lexicon is still
    /// returned.
    pub fn prepare<P: AsRef<Path>>(
        sources: &LexiconSources,
        cache_dir: P,
        app_version: &str,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        let marker = version_marker(app_version);
        match Lexicon::load(cache_dir) {
            Ok(lexicon) if lexicon.version == marker => {
                info!(version = %marker, rows = lexicon.len(), "reusing materialized lexicon");
                return Ok(lexicon);
            }
            Ok(lexicon) => {
                info!(found = %lexicon.version, wanted = %marker, "lexicon version changed, rebuilding");
            }
            Err(e) => {
                debug!("no usable lexicon in {}: {:#}", cache_dir.display(), e);
            }
        }

        let lexicon = sources.build(&marker)?;
        info!(version = %marker, rows = lexicon.len(), "built lexicon");
        if let Err(e) = lexicon.save(cache_dir) {
            warn!("could not write lexicon to {}: {:#}", cache_dir.display(), e);
        }
        Ok(lexicon)
    }
}

/// Locations of the bundled source files.
#[derive(Debug, Clone)]
pub struct LexiconSources {
    pub jyutping: PathBuf,
    pub pinyin: Option<PathBuf>,
    pub shape: Option<PathBuf>,
}

impl LexiconSources {
    /// `jyutping.txt`, plus `pinyin.txt` and `shape.txt` when they exist.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let optional = |name: &str| {
            let path = dir.join(name);
            path.exists().then_some(path)
        };
        Self {
            jyutping: dir.join("jyutping.txt"),
            pinyin: optional("pinyin.txt"),
            shape: optional("shape.txt"),
        }
    }

    pub fn build(&self, version: &str) -> Result<Lexicon> {
        let open = |path: &Path| -> Result<BufReader<File>> {
            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            Ok(BufReader::new(f))
        };
        let mut builder = LexiconBuilder::new();
        builder.read_jyutping(open(&self.jyutping)?)?;
        if let Some(path) = &self.pinyin {
            builder.read_pinyin(open(path)?)?;
        }
        if let Some(path) = &self.shape {
            builder.read_shape(open(path)?)?;
        }
        builder.build(version)
    }
}

/// Accumulates rows and keys, then freezes them into a `Lexicon`.
///
/// Romanization rows must be pushed before pinyin and shape rows, since those
/// attach to words already known.
pub struct LexiconBuilder {
    rows: Vec<LexiconRow>,
    seen: AHashSet<(String, String)>,
    keys: BTreeMap<[u8; 9], Vec<u32>>,
    first_row: AHashMap<String, u32>,
    codes: ReverseCodes,
    prefix_cap: usize,
}

impl Default for LexiconBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconBuilder {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            seen: AHashSet::new(),
            keys: BTreeMap::new(),
            first_row: AHashMap::new(),
            codes: BTreeMap::new(),
            prefix_cap: 100,
        }
    }

    /// Cap on rows posted under a single prefix key.
    pub fn with_prefix_cap(mut self, cap: usize) -> Self {
        self.prefix_cap = cap.max(1);
        self
    }

    fn post(&mut self, kind: KeyKind, text: &str, row: u32) {
        if text.is_empty() {
            return;
        }
        let list = self.keys.entry(index_key(kind, key_hash(text))).or_default();
        if kind == KeyKind::Prefix && list.len() >= self.prefix_cap {
            return;
        }
        if list.last() != Some(&row) {
            list.push(row);
        }
    }

    /// Add one dictionary row. Returns false for empty or duplicate rows.
    pub fn push_romanization(&mut self, word: &str, romanization: &str) -> bool {
        let romanization = romanization.split_whitespace().collect::<Vec<_>>().join(" ");
        if word.is_empty() || romanization.is_empty() {
            return false;
        }
        if !self.seen.insert((word.to_string(), romanization.clone())) {
            return false;
        }

        let row = self.rows.len() as u32;
        let spelled = ping(&romanization);
        self.post(KeyKind::Ping, &spelled, row);
        self.post(KeyKind::Shortcut, &anchors(&romanization), row);
        let boundaries: Vec<usize> = spelled.char_indices().map(|(i, _)| i).skip(1).collect();
        for end in boundaries {
            self.post(KeyKind::Prefix, &spelled[..end], row);
        }
        self.post(KeyKind::Word, word, row);
        self.first_row.entry(word.to_string()).or_insert(row);

        self.rows.push(LexiconRow {
            word: word.to_string(),
            romanization,
        });
        true
    }

    /// Attach a pinyin spelling to a known word, keyed by the toneless
    /// spelling and by its syllable initials.
    pub fn push_pinyin(&mut self, word: &str, pinyin: &str) -> bool {
        let syllables: Vec<String> = remove_tones(pinyin)
            .split_whitespace()
            .map(|s| {
                s.chars()
                    .filter(|c| c.is_ascii_alphabetic())
                    .map(|c| c.to_ascii_lowercase())
                    .collect::<String>()
            })
            .filter(|s| !s.is_empty())
            .collect();
        let initials: String = syllables.iter().filter_map(|s| s.chars().next()).collect();
        if !self.attach(KeyKind::Pinyin, word, &syllables.concat()) {
            return false;
        }
        self.attach(KeyKind::PinyinShortcut, word, &initials)
    }

    /// Attach cangjie and stroke codes to a known word.
    pub fn push_shape(&mut self, word: &str, cangjie: &str, stroke: &str) -> bool {
        let cangjie = cangjie.trim().to_ascii_lowercase();
        let stroke = stroke.trim();
        let a = self.attach(KeyKind::Cangjie, word, &cangjie);
        let b = self.attach(KeyKind::Stroke, word, stroke);
        a || b
    }

    fn attach(&mut self, kind: KeyKind, word: &str, key: &str) -> bool {
        match self.first_row.get(word).copied() {
            Some(row) if !key.is_empty() => {
                self.post(kind, key, row);
                let codes = self.codes.entry((kind as u8, row)).or_default();
                if !codes.iter().any(|code| code == key) {
                    codes.push(key.to_string());
                }
                true
            }
            _ => false,
        }
    }

    /// `word<TAB>romanization` lines.
    pub fn read_jyutping<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        read_columns(reader, 2, |cols| self.push_romanization(cols[0], cols[1]))
    }

    /// `word<TAB>pinyin` lines.
    pub fn read_pinyin<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        read_columns(reader, 2, |cols| self.push_pinyin(cols[0], cols[1]))
    }

    /// `word<TAB>cangjie<TAB>stroke` lines.
    pub fn read_shape<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        read_columns(reader, 3, |cols| self.push_shape(cols[0], cols[1], cols[2]))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn build(self, version: &str) -> Result<Lexicon> {
        let mut builder = MapBuilder::memory();
        let mut postings = Vec::with_capacity(self.keys.len());
        for (i, (key, list)) in self.keys.into_iter().enumerate() {
            builder.insert(key, i as u64)?;
            postings.push(list);
        }
        let bytes = builder.into_inner()?;
        let index = Map::new(bytes)?;
        Ok(Lexicon {
            index,
            rows: self.rows,
            postings,
            codes: self.codes,
            version: version.to_string(),
        })
    }
}

// Returns the number of lines accepted. Malformed lines are skipped.
fn read_columns<R, F>(reader: R, columns: usize, mut accept: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(&[&str]) -> bool,
{
    let mut accepted = 0;
    for (n, line) in reader.lines().enumerate() {
        let line = crate::utils::normalize(&line?);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cols.len() < columns || cols[..columns].iter().any(|c| c.is_empty()) {
            debug!(line = n + 1, "skipping malformed source line");
            continue;
        }
        if accept(&cols) {
            accepted += 1;
        } else {
            debug!(line = n + 1, "source line not indexed");
        }
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = "你\tnei5\n尼\tnei4\n你好\tnei5 hou2\n好\thou2\n";

    fn sample() -> Lexicon {
        let mut b = LexiconBuilder::new();
        assert_eq!(b.read_jyutping(ROWS.as_bytes()).unwrap(), 4);
        b.read_pinyin("你\tni3\n你好\tni3 hao3\n".as_bytes()).unwrap();
        b.read_shape("你\tonf\t32352\n好\tvnd\t531521\n".as_bytes())
            .unwrap();
        b.build("test+h1").unwrap()
    }

    fn words(rows: Vec<&LexiconRow>) -> Vec<&str> {
        rows.into_iter().map(|r| r.word.as_str()).collect()
    }

    #[test]
    fn lookups_by_kind() {
        let lx = sample();
        assert_eq!(words(lx.lookup(KeyKind::Ping, "nei", 100)), vec!["你", "尼"]);
        assert_eq!(words(lx.lookup(KeyKind::Shortcut, "nh", 100)), vec!["你好"]);
        assert_eq!(words(lx.lookup(KeyKind::Prefix, "neih", 100)), vec!["你好"]);
        assert_eq!(words(lx.lookup(KeyKind::Pinyin, "nihao", 100)), vec!["你好"]);
        assert_eq!(words(lx.lookup(KeyKind::Cangjie, "vnd", 100)), vec!["好"]);
        assert_eq!(words(lx.lookup(KeyKind::Stroke, "32352", 100)), vec!["你"]);
        assert_eq!(lx.romanizations_of("你"), vec!["nei5"]);
    }

    #[test]
    fn pinyin_initials_and_codes_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        sample().save(dir.path()).unwrap();
        let lx = Lexicon::load(dir.path()).unwrap();
        assert_eq!(words(lx.lookup(KeyKind::PinyinShortcut, "nh", 100)), vec!["你好"]);
        assert_eq!(words(lx.lookup(KeyKind::PinyinShortcut, "n", 100)), vec!["你"]);
        assert_eq!(words(lx.lookup(KeyKind::Pinyin, "ni", 100)), vec!["你"]);
        assert!(lx.lookup(KeyKind::Pinyin, "nh", 100).is_empty());
    }

    #[test]
    fn reverse_rows_must_carry_the_typed_code() {
        let mut b = LexiconBuilder::new();
        b.read_jyutping(ROWS.as_bytes()).unwrap();
        b.read_shape("好\tvnd\t531521\n".as_bytes()).unwrap();
        // Reachable through the index, but no stored code backs it.
        b.post(KeyKind::Cangjie, "zzz", 3);
        b.post(KeyKind::Stroke, "111", 3);
        let lx = b.build("v").unwrap();
        assert_eq!(words(lx.lookup(KeyKind::Cangjie, "vnd", 100)), vec!["好"]);
        assert!(lx.lookup(KeyKind::Cangjie, "zzz", 100).is_empty());
        assert!(lx.lookup(KeyKind::Stroke, "111", 100).is_empty());
    }

    #[test]
    fn prefix_excludes_whole_spelling() {
        let lx = sample();
        assert!(lx.lookup(KeyKind::Prefix, "nei", 100).iter().all(|r| r.word == "你好"));
        assert!(lx.lookup(KeyKind::Prefix, "neihou", 100).is_empty());
    }

    #[test]
    fn positions_follow_source_order() {
        let lx = sample();
        let found = lx.lookup_with_position(KeyKind::Ping, "nei");
        let positions: Vec<u32> = found.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn empty_key_and_limit() {
        let lx = sample();
        assert!(lx.lookup(KeyKind::Ping, "", 100).is_empty());
        assert_eq!(lx.lookup(KeyKind::Ping, "nei", 1).len(), 1);
        assert!(lx.lookup(KeyKind::Ping, "zzz", 100).is_empty());
    }

    #[test]
    fn malformed_and_duplicate_lines_are_skipped() {
        let mut b = LexiconBuilder::new();
        let src = "你\tnei5\nbroken line\n\t\n# comment\n你\tnei5\n";
        assert_eq!(b.read_jyutping(src.as_bytes()).unwrap(), 1);
        assert!(!b.push_pinyin("未知", "wei zhi"));
    }

    #[test]
    fn prefix_postings_are_capped() {
        let mut b = LexiconBuilder::new().with_prefix_cap(2);
        for (w, r) in [("一", "jat1"), ("日", "jat6"), ("壹", "jat1 jat1")] {
            b.push_romanization(w, r);
        }
        let lx = b.build("v").unwrap();
        assert_eq!(lx.lookup(KeyKind::Prefix, "ja", 100).len(), 2);
    }

    #[test]
    fn save_load_and_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("jyutping.txt"), ROWS).unwrap();
        let sources = LexiconSources::from_dir(&data);
        assert!(sources.pinyin.is_none());

        let cache = dir.path().join("cache");
        let built = Lexicon::prepare(&sources, &cache, "1.0").unwrap();
        assert_eq!(built.version(), "1.0+h1");

        // Same version: the cache is reused even if the sources vanish.
        std::fs::remove_file(data.join("jyutping.txt")).unwrap();
        let reused = Lexicon::prepare(&sources, &cache, "1.0").unwrap();
        assert_eq!(reused.len(), 4);

        // New version with missing sources cannot rebuild.
        assert!(Lexicon::prepare(&sources, &cache, "2.0").is_err());
    }

    #[test]
    fn corrupt_cache_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jyutping.txt"), ROWS).unwrap();
        std::fs::write(dir.path().join(FST_FILE), b"garbage").unwrap();
        std::fs::write(dir.path().join(PAYLOAD_FILE), b"garbage").unwrap();
        let sources = LexiconSources::from_dir(dir.path());
        let lx = Lexicon::prepare(&sources, dir.path(), "1.0").unwrap();
        assert_eq!(lx.len(), 4);
        assert!(Lexicon::load(dir.path()).is_ok());
    }
}
