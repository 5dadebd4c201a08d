//! User Lexicon Store: per-user, frequency-ranked record of accepted candidates.
//!
//! Responsibilities implemented here:
//! - `LexiconEntry`: one learned (word, romanization) pair with its keys and
//!   frequency. The id is derived from word + romanization, so accepting the
//!   same candidate again bumps `frequency` instead of adding a row.
//! - `InMemoryUserLexicon`: thread-safe map, used by tests and by sessions
//!   that cannot persist.
//! - `RedbUserLexicon`: persistent backend. Entries live in a primary table;
//!   ping, shortcut and input hashes are multimap indexes onto entry ids.
//! - `UserLexicon` enum: backend switch with an explicit closed state. Its
//!   methods never fail; backend errors are logged and read as "no data".
use crate::candidate::Candidate;
use crate::hash::key_hash;
use crate::romanization::{anchors, ping};
use ahash::AHashMap;
use anyhow::{Context, Result};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// A learned entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    /// `key_hash(word + romanization)`
    pub id: u64,
    /// `key_hash(input)`
    pub input: u64,
    /// `key_hash(ping(romanization))`
    pub ping: u64,
    /// `key_hash(anchors(romanization))`
    pub shortcut: u64,
    pub frequency: u64,
    pub word: String,
    pub romanization: String,
}

impl LexiconEntry {
    pub fn derive_id(word: &str, romanization: &str) -> u64 {
        key_hash(&format!("{}{}", word, romanization))
    }

    /// A fresh entry for `candidate` with frequency 1.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: Self::derive_id(&candidate.text, &candidate.romanization),
            input: key_hash(&candidate.input),
            ping: key_hash(&ping(&candidate.romanization)),
            shortcut: key_hash(&anchors(&candidate.romanization)),
            frequency: 1,
            word: candidate.text.clone(),
            romanization: candidate.romanization.clone(),
        }
    }
}

/// Which secondary key a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey {
    Ping,
    Shortcut,
    Input,
}

impl EntryKey {
    fn of(self, entry: &LexiconEntry) -> u64 {
        match self {
            EntryKey::Ping => entry.ping,
            EntryKey::Shortcut => entry.shortcut,
            EntryKey::Input => entry.input,
        }
    }
}

// Highest frequency first; ties keep a stable id order.
fn rank(entries: &mut [LexiconEntry]) {
    entries.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.id.cmp(&b.id)));
}

/// Thread-safe in-memory user lexicon.
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserLexicon {
    inner: Arc<RwLock<AHashMap<u64, LexiconEntry>>>,
}

impl InMemoryUserLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or bump. Returns the new frequency.
    ///
    /// The lookup and the update happen under one write lock.
    pub fn learn(&self, candidate: &Candidate) -> u64 {
        let fresh = LexiconEntry::from_candidate(candidate);
        if let Ok(mut map) = self.inner.write() {
            let entry = map.entry(fresh.id).or_insert_with(|| LexiconEntry {
                frequency: 0,
                ..fresh
            });
            entry.frequency = entry.frequency.saturating_add(1);
            entry.frequency
        } else {
            0
        }
    }

    pub fn lookup(&self, key: EntryKey, hash: u64, limit: usize) -> Vec<LexiconEntry> {
        let mut found: Vec<LexiconEntry> = if let Ok(map) = self.inner.read() {
            map.values().filter(|e| key.of(e) == hash).cloned().collect()
        } else {
            Vec::new()
        };
        rank(&mut found);
        found.truncate(limit);
        found
    }

    pub fn get(&self, id: u64) -> Option<LexiconEntry> {
        self.inner.read().ok()?.get(&id).cloned()
    }

    pub fn remove(&self, id: u64) -> bool {
        if let Ok(mut map) = self.inner.write() {
            map.remove(&id).is_some()
        } else {
            false
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }

    pub fn entries(&self) -> Vec<LexiconEntry> {
        let mut all: Vec<LexiconEntry> = if let Ok(map) = self.inner.read() {
            map.values().cloned().collect()
        } else {
            Vec::new()
        };
        rank(&mut all);
        all
    }
}

/// Redb-backed user lexicon.
///
/// `learn` reads and rewrites an entry inside a single write transaction, and
/// redb admits one writer at a time, so concurrent increments cannot be lost.
pub struct RedbUserLexicon {
    db: redb::Database,
    path: PathBuf,
}

impl RedbUserLexicon {
    /// id -> bincode-encoded `LexiconEntry`
    const ENTRIES: redb::TableDefinition<'static, u64, &'static [u8]> =
        redb::TableDefinition::new("lexicon");
    const PING_INDEX: redb::MultimapTableDefinition<'static, u64, u64> =
        redb::MultimapTableDefinition::new("lexicon_ping");
    const SHORTCUT_INDEX: redb::MultimapTableDefinition<'static, u64, u64> =
        redb::MultimapTableDefinition::new("lexicon_shortcut");
    const INPUT_INDEX: redb::MultimapTableDefinition<'static, u64, u64> =
        redb::MultimapTableDefinition::new("lexicon_input");

    /// Create or open the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let db = redb::Database::create(path)
            .with_context(|| format!("open user lexicon {}", path.display()))?;
        let this = Self {
            db,
            path: path.to_path_buf(),
        };
        this.ensure_tables()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Read transactions fail on tables that were never created.
    fn ensure_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            txn.open_table(Self::ENTRIES)?;
            txn.open_multimap_table(Self::PING_INDEX)?;
            txn.open_multimap_table(Self::SHORTCUT_INDEX)?;
            txn.open_multimap_table(Self::INPUT_INDEX)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn index_for(key: EntryKey) -> redb::MultimapTableDefinition<'static, u64, u64> {
        match key {
            EntryKey::Ping => Self::PING_INDEX,
            EntryKey::Shortcut => Self::SHORTCUT_INDEX,
            EntryKey::Input => Self::INPUT_INDEX,
        }
    }

    /// Insert or bump. Returns the new frequency.
    pub fn learn(&self, candidate: &Candidate) -> Result<u64> {
        let fresh = LexiconEntry::from_candidate(candidate);
        let txn = self.db.begin_write()?;
        let frequency = {
            let mut entries = txn.open_table(Self::ENTRIES)?;
            let existing: Option<LexiconEntry> = match entries.get(fresh.id)? {
                Some(bytes) => Some(bincode::deserialize(bytes.value())?),
                None => None,
            };
            let entry = match existing {
                Some(mut entry) => {
                    entry.frequency = entry.frequency.saturating_add(1);
                    entry
                }
                None => {
                    txn.open_multimap_table(Self::PING_INDEX)?
                        .insert(fresh.ping, fresh.id)?;
                    txn.open_multimap_table(Self::SHORTCUT_INDEX)?
                        .insert(fresh.shortcut, fresh.id)?;
                    txn.open_multimap_table(Self::INPUT_INDEX)?
                        .insert(fresh.input, fresh.id)?;
                    fresh
                }
            };
            let bytes = bincode::serialize(&entry)?;
            entries.insert(entry.id, bytes.as_slice())?;
            entry.frequency
        };
        txn.commit()?;
        Ok(frequency)
    }

    pub fn get(&self, id: u64) -> Result<Option<LexiconEntry>> {
        let txn = self.db.begin_read()?;
        let entries = txn.open_table(Self::ENTRIES)?;
        match entries.get(id)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes.value())?)),
            None => Ok(None),
        }
    }

    pub fn lookup(&self, key: EntryKey, hash: u64, limit: usize) -> Result<Vec<LexiconEntry>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_multimap_table(Self::index_for(key))?;
        let entries = txn.open_table(Self::ENTRIES)?;
        let mut found = Vec::new();
        for id in index.get(hash)? {
            let id = id?.value();
            if let Some(bytes) = entries.get(id)? {
                found.push(bincode::deserialize::<LexiconEntry>(bytes.value())?);
            }
        }
        rank(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    pub fn remove(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut entries = txn.open_table(Self::ENTRIES)?;
            let removed: Option<LexiconEntry> = match entries.remove(id)? {
                Some(bytes) => Some(bincode::deserialize(bytes.value())?),
                None => None,
            };
            if let Some(entry) = &removed {
                txn.open_multimap_table(Self::PING_INDEX)?
                    .remove(entry.ping, entry.id)?;
                txn.open_multimap_table(Self::SHORTCUT_INDEX)?
                    .remove(entry.shortcut, entry.id)?;
                txn.open_multimap_table(Self::INPUT_INDEX)?
                    .remove(entry.input, entry.id)?;
            }
            removed.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(Self::ENTRIES)?;
        txn.delete_multimap_table(Self::PING_INDEX)?;
        txn.delete_multimap_table(Self::SHORTCUT_INDEX)?;
        txn.delete_multimap_table(Self::INPUT_INDEX)?;
        txn.commit()?;
        self.ensure_tables()
    }

    pub fn entries(&self) -> Result<Vec<LexiconEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(Self::ENTRIES)?;
        let mut all = Vec::new();
        for item in table.iter()? {
            let (_, bytes) = item?;
            all.push(bincode::deserialize::<LexiconEntry>(bytes.value())?);
        }
        rank(&mut all);
        Ok(all)
    }
}

/// User lexicon with a backend switch and an explicit lifecycle.
///
/// A closed lexicon answers every query with nothing and ignores writes.
pub enum UserLexicon {
    InMemory(InMemoryUserLexicon),
    Redb(RedbUserLexicon),
    Closed,
}

impl UserLexicon {
    pub fn new_in_memory() -> Self {
        UserLexicon::InMemory(InMemoryUserLexicon::new())
    }

    /// Open (creating if needed) a persistent lexicon at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(UserLexicon::Redb(RedbUserLexicon::open(path)?))
    }

    /// Open `path`, or fall back to a closed lexicon when it cannot be used.
    pub fn open_or_closed<P: AsRef<Path>>(path: P) -> Self {
        match Self::open(path.as_ref()) {
            Ok(lexicon) => lexicon,
            Err(e) => {
                warn!("user lexicon unavailable: {:#}", e);
                UserLexicon::Closed
            }
        }
    }

    /// Release the backend. Later calls see an empty lexicon.
    pub fn close(&mut self) {
        *self = UserLexicon::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, UserLexicon::Closed)
    }

    /// Record an accepted candidate. Returns its new frequency, 0 on failure.
    pub fn handle(&self, candidate: &Candidate) -> u64 {
        match self {
            UserLexicon::InMemory(m) => m.learn(candidate),
            UserLexicon::Redb(r) => r.learn(candidate).unwrap_or_else(|e| {
                warn!("user lexicon write failed: {:#}", e);
                0
            }),
            UserLexicon::Closed => 0,
        }
    }

    fn lookup(&self, key: EntryKey, text: &str, limit: usize) -> Vec<LexiconEntry> {
        if text.is_empty() || limit == 0 {
            return Vec::new();
        }
        let hash = key_hash(text);
        match self {
            UserLexicon::InMemory(m) => m.lookup(key, hash, limit),
            UserLexicon::Redb(r) => r.lookup(key, hash, limit).unwrap_or_else(|e| {
                warn!("user lexicon read failed: {:#}", e);
                Vec::new()
            }),
            UserLexicon::Closed => Vec::new(),
        }
    }

    /// Entries whose ping spelling is exactly `text`.
    pub fn lookup_ping(&self, text: &str, limit: usize) -> Vec<LexiconEntry> {
        self.lookup(EntryKey::Ping, text, limit)
    }

    /// Entries whose syllable initials are exactly `text`.
    pub fn lookup_shortcut(&self, text: &str, limit: usize) -> Vec<LexiconEntry> {
        self.lookup(EntryKey::Shortcut, text, limit)
    }

    /// Entries first learned from exactly this input.
    pub fn lookup_input(&self, text: &str, limit: usize) -> Vec<LexiconEntry> {
        self.lookup(EntryKey::Input, text, limit)
    }

    pub fn frequency(&self, candidate: &Candidate) -> u64 {
        let id = LexiconEntry::derive_id(&candidate.text, &candidate.romanization);
        let entry = match self {
            UserLexicon::InMemory(m) => m.get(id),
            UserLexicon::Redb(r) => r.get(id).unwrap_or_else(|e| {
                warn!("user lexicon read failed: {:#}", e);
                None
            }),
            UserLexicon::Closed => None,
        };
        entry.map(|e| e.frequency).unwrap_or(0)
    }

    /// Forget one candidate. Returns true if it was present.
    pub fn remove(&self, candidate: &Candidate) -> bool {
        let id = LexiconEntry::derive_id(&candidate.text, &candidate.romanization);
        match self {
            UserLexicon::InMemory(m) => m.remove(id),
            UserLexicon::Redb(r) => r.remove(id).unwrap_or_else(|e| {
                warn!("user lexicon delete failed: {:#}", e);
                false
            }),
            UserLexicon::Closed => false,
        }
    }

    pub fn delete_all(&self) {
        match self {
            UserLexicon::InMemory(m) => m.clear(),
            UserLexicon::Redb(r) => {
                if let Err(e) = r.clear() {
                    warn!("user lexicon clear failed: {:#}", e);
                }
            }
            UserLexicon::Closed => {}
        }
    }

    /// All entries, most frequent first.
    pub fn entries(&self) -> Vec<LexiconEntry> {
        match self {
            UserLexicon::InMemory(m) => m.entries(),
            UserLexicon::Redb(r) => r.entries().unwrap_or_else(|e| {
                warn!("user lexicon read failed: {:#}", e);
                Vec::new()
            }),
            UserLexicon::Closed => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nei_hou() -> Candidate {
        Candidate::new("你好", "nei5 hou2", "neihou")
    }

    fn exercise(lexicon: &UserLexicon) {
        assert_eq!(lexicon.handle(&nei_hou()), 1);
        assert_eq!(lexicon.handle(&nei_hou()), 2);
        lexicon.handle(&Candidate::new("你", "nei5", "nei"));

        let entries = lexicon.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].word, "你好");
        assert_eq!(entries[0].frequency, 2);

        let by_ping = lexicon.lookup_ping("neihou", 5);
        assert_eq!(by_ping.len(), 1);
        assert_eq!(lexicon.lookup_shortcut("nh", 5)[0].word, "你好");
        assert_eq!(lexicon.lookup_input("nei", 5)[0].word, "你");
        assert!(lexicon.lookup_ping("", 5).is_empty());

        assert!(lexicon.remove(&nei_hou()));
        assert!(!lexicon.remove(&nei_hou()));
        assert_eq!(lexicon.frequency(&nei_hou()), 0);
        assert!(lexicon.lookup_shortcut("nh", 5).is_empty());

        lexicon.delete_all();
        assert!(lexicon.entries().is_empty());
        assert!(lexicon.lookup_ping("nei", 5).is_empty());
    }

    #[test]
    fn in_memory_backend() {
        exercise(&UserLexicon::new_in_memory());
    }

    #[test]
    fn redb_backend() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = UserLexicon::open(dir.path().join("user.redb")).unwrap();
        exercise(&lexicon);
    }

    #[test]
    fn redb_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("user.redb");
        {
            let lexicon = UserLexicon::open(&path).unwrap();
            lexicon.handle(&nei_hou());
            lexicon.handle(&nei_hou());
        }
        let lexicon = UserLexicon::open(&path).unwrap();
        assert_eq!(lexicon.frequency(&nei_hou()), 2);
        // Learning again after reopen must not duplicate index rows.
        lexicon.handle(&nei_hou());
        assert_eq!(lexicon.lookup_ping("neihou", 5).len(), 1);
    }

    #[test]
    fn redb_open_reports_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let err = match RedbUserLexicon::open(blocker.join("user.redb")) {
            Ok(_) => panic!("opened a lexicon under a regular file"),
            Err(e) => e,
        };
        assert!(format!("{err:#}").starts_with("create "), "{err:#}");
        assert!(!UserLexicon::open_or_closed(blocker.join("user.redb")).is_open());
    }

    #[test]
    fn redb_bump_reads_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = RedbUserLexicon::open(dir.path().join("user.redb")).unwrap();
        assert_eq!(lexicon.learn(&nei_hou()).unwrap(), 1);
        assert_eq!(lexicon.learn(&nei_hou()).unwrap(), 2);
        let all = lexicon.entries().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].frequency, 2);
    }

    #[test]
    fn ranking_by_frequency_and_limit() {
        let lexicon = UserLexicon::new_in_memory();
        let a = Candidate::new("係", "hai6", "hai");
        let b = Candidate::new("嚡", "haai4", "haai");
        let c = Candidate::new("喺", "hai2", "hai");
        lexicon.handle(&a);
        for _ in 0..3 {
            lexicon.handle(&c);
        }
        lexicon.handle(&b);
        let found = lexicon.lookup_ping("hai", 5);
        assert_eq!(found[0].word, "喺");
        assert_eq!(found.len(), 2);
        assert_eq!(lexicon.lookup_ping("hai", 1).len(), 1);
    }

    #[test]
    fn closed_lexicon_is_inert() {
        let mut lexicon = UserLexicon::new_in_memory();
        lexicon.handle(&nei_hou());
        lexicon.close();
        assert!(!lexicon.is_open());
        assert_eq!(lexicon.handle(&nei_hou()), 0);
        assert!(lexicon.entries().is_empty());
        assert!(!lexicon.remove(&nei_hou()));
    }
}
