//! Jyutping matching engine
//!
//! `Engine::suggest(text, schemes)` turns processed keystrokes plus their
//! segmentation schemes into an ordered candidate list:
//!
//! - `r` / `v` / `x` prefixed input goes to Pinyin / Cangjie / stroke reverse
//!   lookup and never touches the segmenter
//! - inputs of 1 to 3 characters take fixed fast paths built from exact,
//!   prefix and shortcut (initials) lookups
//! - longer inputs take the full-match path when the best scheme covers the
//!   whole text, else the partial-match path; both stitch a second match onto
//!   the top candidate when it leaves input uncovered
//!
//! Results are not deduplicated here. An engine without a lexicon (store
//! unavailable, or closed) returns nothing for every input.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use jyutping_core::romanization::{first_syllable_toneless, is_tone, remove_tones, tones};
use jyutping_core::{Candidate, Config, KeyKind, Lexicon, LexiconSources};
use lru::LruCache;
use tracing::{debug, warn};

use crate::normalizer::{detect_mode, LookupMode, SEPARATOR};
use crate::splitter::Splitter;

type CacheKey = (String, Vec<Vec<String>>);

pub struct Engine {
    lexicon: Option<Arc<Lexicon>>,
    splitter: Arc<Splitter>,
    config: Config,
    cache: Option<RefCell<LruCache<CacheKey, Vec<Candidate>>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("lexicon", &self.lexicon)
            .field("config", &self.config)
            .finish()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn drop_first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[i..],
        None => "",
    }
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn drop_last_char(s: &str) -> &str {
    match s.char_indices().last() {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Stroke codes accept digits 1-5 or the letters h s p n z.
fn stroke_key(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            'h' | '1' => Some('1'),
            's' | '2' => Some('2'),
            'p' | '3' => Some('3'),
            'n' | '4' => Some('4'),
            'z' | '5' => Some('5'),
            _ => None,
        })
        .collect()
}

impl Engine {
    pub fn new(lexicon: Arc<Lexicon>, splitter: Arc<Splitter>, config: Config) -> Self {
        let mut engine = Self::unavailable(splitter, config);
        engine.lexicon = Some(lexicon);
        engine
    }

    /// An engine with no dictionary; every suggestion is empty until `open`.
    pub fn unavailable(splitter: Arc<Splitter>, config: Config) -> Self {
        let cache = NonZeroUsize::new(config.max_cache_size).map(|n| RefCell::new(LruCache::new(n)));
        Self {
            lexicon: None,
            splitter,
            config,
            cache,
        }
    }

    /// Prepare the dictionary from `sources`, reusing `cache_dir` when it is
    /// current. A store that cannot be prepared leaves the engine unavailable.
    pub fn prepare<P: AsRef<Path>>(
        sources: &LexiconSources,
        cache_dir: P,
        app_version: &str,
        splitter: Arc<Splitter>,
        config: Config,
    ) -> Self {
        match Lexicon::prepare(sources, cache_dir, app_version) {
            Ok(lexicon) => Self::new(Arc::new(lexicon), splitter, config),
            Err(e) => {
                warn!("suggestions unavailable: {:#}", e);
                Self::unavailable(splitter, config)
            }
        }
    }

    pub fn open(&mut self, lexicon: Arc<Lexicon>) {
        self.lexicon = Some(lexicon);
        self.clear_cache();
    }

    pub fn close(&mut self) {
        self.lexicon = None;
        self.clear_cache();
    }

    pub fn is_open(&self) -> bool {
        self.lexicon.is_some()
    }

    pub fn lexicon(&self) -> Option<&Arc<Lexicon>> {
        self.lexicon.as_ref()
    }

    pub fn splitter(&self) -> &Arc<Splitter> {
        &self.splitter
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.borrow_mut().clear();
        }
    }

    /// Candidates for `text`, given its segmentation `schemes` (scheme
    /// origins, best first).
    pub fn suggest(&self, text: &str, schemes: &[Vec<String>]) -> Vec<Candidate> {
        if text.is_empty() || self.lexicon.is_none() {
            return Vec::new();
        }
        let key: CacheKey = (text.to_string(), schemes.to_vec());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.borrow_mut().get(&key) {
                return hit.clone();
            }
        }

        let result = self.dispatch(text, schemes);

        if let Some(cache) = &self.cache {
            cache.borrow_mut().put(key, result.clone());
        }
        result
    }

    fn dispatch(&self, text: &str, schemes: &[Vec<String>]) -> Vec<Candidate> {
        let mode = detect_mode(text);
        if mode.is_reverse() {
            let code = drop_first_chars(text, 1);
            debug!(?mode, code, "reverse lookup");
            return if code.is_empty() {
                Vec::new()
            } else {
                self.reverse_lookup(mode, code, text)
            };
        }
        match char_len(text) {
            0 => Vec::new(),
            1 => self.shortcut(text, self.config.shortcut_limit),
            2 => self.fetch_two_chars(text),
            3 => self.fetch_three_chars(text),
            _ => {
                let filtered: String = text.chars().filter(|c| *c != SEPARATOR).collect();
                self.fetch(&filtered, text, schemes)
            }
        }
    }

    fn fetch_two_chars(&self, text: &str) -> Vec<Candidate> {
        if text.ends_with(SEPARATOR) {
            return self.matched(drop_last_char(text));
        }
        let mut out = self.matched(text);
        if text.chars().last().is_some_and(is_tone) {
            return out;
        }
        out.extend(self.shortcut(text, self.config.shortcut_limit));
        out.extend(self.shortcut(take_chars(text, 1), self.config.shortcut_limit));
        out
    }

    fn fetch_three_chars(&self, text: &str) -> Vec<Candidate> {
        if text.ends_with(SEPARATOR) {
            return self.matched(drop_last_char(text));
        }
        let exact = self.matched(text);
        if text.chars().last().is_some_and(is_tone) {
            return exact;
        }
        let prefixes = self.prefixed(text, self.config.prefix_limit);
        let shortcut_three = self.shortcut(text, self.config.shortcut_limit);

        let first_two = take_chars(text, 2);
        let match_two = self.matched(first_two);
        let shortcut_two = self.shortcut(first_two, self.config.shortcut_limit);
        if first_two.chars().last().is_some_and(is_tone) {
            return exact.into_iter().chain(match_two).collect();
        }

        let last = drop_first_chars(text, 2);
        let shortcut_last = self.shortcut(last, 1);
        let mut combined = Vec::new();
        if let Some(tail) = shortcut_last.first() {
            if let Some(head) = match_two.first() {
                combined.push(head + tail);
            }
            if let Some(head) = shortcut_two.first() {
                combined.push(head + tail);
            }
        }
        let shortcut_first = self.shortcut(take_chars(text, 1), self.config.shortcut_limit);

        let mut out = exact;
        out.extend(prefixes);
        out.extend(shortcut_three);
        out.extend(combined);
        out.extend(shortcut_two);
        out.extend(match_two);
        out.extend(shortcut_first);
        out
    }

    // `text` has its separators removed; `origin` is the text as typed.
    fn fetch(&self, text: &str, origin: &str, schemes: &[Vec<String>]) -> Vec<Candidate> {
        let best_len = match schemes.first() {
            Some(best) if !best.is_empty() => best.iter().map(|s| char_len(s)).sum::<usize>(),
            _ => {
                debug!(text, "unsplittable input");
                return self.process_unsplittable(text);
            }
        };
        if best_len == char_len(text) {
            debug!(text, schemes = schemes.len(), "full match");
            self.process(text, origin, schemes)
        } else {
            debug!(text, schemes = schemes.len(), "partial match");
            self.process_partial(text, schemes)
        }
    }

    fn process_unsplittable(&self, text: &str) -> Vec<Candidate> {
        let mut out = self.matched(text);
        out.extend(self.prefixed(text, self.config.prefix_limit));
        out.extend(self.shortcut(text, self.config.shortcut_limit));
        let len = char_len(text);
        for n in 1..len {
            out.extend(self.shortcut(take_chars(text, len - n), self.config.shortcut_limit));
        }
        out
    }

    fn scheme_matches(&self, schemes: &[Vec<String>]) -> Vec<Candidate> {
        let matches: Vec<(Candidate, u32)> = schemes
            .iter()
            .flat_map(|scheme| self.matched_with_position(&scheme.concat()))
            .collect();
        self.sort_by_row_distance(matches)
    }

    fn process(&self, text: &str, origin: &str, schemes: &[Vec<String>]) -> Vec<Candidate> {
        let mut candidates = self.scheme_matches(schemes);

        let has_separators = char_len(text) != char_len(origin);
        if has_separators {
            let first_syllable = schemes
                .first()
                .and_then(|s| s.first())
                .map(|s| remove_tones(s))
                .unwrap_or_default();
            candidates.retain(|c| {
                first_syllable_toneless(&c.romanization).as_deref() == Some(first_syllable.as_str())
            });
        }

        if candidates.len() < 2 {
            return candidates;
        }
        let first = &candidates[0];
        let second = &candidates[1];
        if first.input == text {
            return candidates;
        }

        let tail_text = drop_first_chars(text, first.input_len());
        let tail = self.splitter.split_best(tail_text);
        if tail.is_empty() {
            return candidates;
        }
        let mut stitched = Vec::new();
        for end in (1..=tail.len()).rev() {
            if let Some(one) = self.matched_with_limit(&tail[..end].concat(), 1).pop() {
                stitched.push(first + &one);
                if first.input_len() == second.input_len() && first.text_len() == second.text_len() {
                    stitched.push(second + &one);
                }
                break;
            }
        }
        stitched.extend(candidates);
        stitched
    }

    fn process_partial(&self, text: &str, schemes: &[Vec<String>]) -> Vec<Candidate> {
        let candidates = self.scheme_matches(schemes);
        let head = |middle: Vec<Candidate>, candidates: Vec<Candidate>| -> Vec<Candidate> {
            let mut out = self.matched(text);
            out.extend(self.prefixed(text, self.config.partial_prefix_limit));
            out.extend(middle);
            out.extend(candidates);
            out.extend(self.shortcut(text, self.config.shortcut_limit));
            out
        };

        let Some(first) = candidates.first().cloned() else {
            return head(Vec::new(), Vec::new());
        };
        if first.input == text {
            return head(Vec::new(), candidates);
        }

        let tail_text = drop_first_chars(text, first.input_len());
        if let Some(one) = self.prefixed(tail_text, 1).pop() {
            return head(vec![&first + &one], candidates);
        }

        let tail = self.splitter.split_best(tail_text);
        if tail.is_empty() {
            return head(Vec::new(), candidates);
        }
        let mut stitched = Vec::new();
        let tail_syllables_len = char_len(&tail.concat());
        let tail_len = char_len(tail_text);
        if tail_len > tail_syllables_len + 1 {
            let plus_one = take_chars(tail_text, tail_syllables_len + 1);
            if let Some(one) = self.prefixed(plus_one, 1).pop() {
                stitched.push(&first + &one);
            }
        }
        if stitched.is_empty() {
            for end in (1..=tail.len()).rev() {
                if let Some(one) = self.matched_with_limit(&tail[..end].concat(), 1).pop() {
                    stitched.push(&first + &one);
                    break;
                }
            }
        }
        head(stitched, candidates)
    }

    /// Stable reordering: `a` moves ahead of `b` only when both have the same
    /// text length and `a`'s row is more than the threshold below `b`'s.
    fn sort_by_row_distance(&self, matches: Vec<(Candidate, u32)>) -> Vec<Candidate> {
        let threshold = i64::from(self.config.row_distance_threshold);
        let before = |a: &(Candidate, u32), b: &(Candidate, u32)| {
            a.0.text_len() == b.0.text_len() && i64::from(b.1) - i64::from(a.1) > threshold
        };
        let mut sorted: Vec<(Candidate, u32)> = Vec::with_capacity(matches.len());
        for item in matches {
            let mut at = sorted.len();
            while at > 0 && before(&item, &sorted[at - 1]) {
                at -= 1;
            }
            sorted.insert(at, item);
        }
        sorted.into_iter().map(|(c, _)| c).collect()
    }

    fn reverse_lookup(&self, mode: LookupMode, code: &str, input: &str) -> Vec<Candidate> {
        let Some(lexicon) = &self.lexicon else {
            return Vec::new();
        };
        let words = match mode {
            LookupMode::Pinyin => {
                let key: String = code.chars().filter(|c| c.is_ascii_alphabetic()).collect();
                let spelled = lexicon.lookup(KeyKind::Pinyin, &key, usize::MAX);
                if spelled.is_empty() {
                    lexicon.lookup(KeyKind::PinyinShortcut, &key, usize::MAX)
                } else {
                    spelled
                }
            }
            LookupMode::Cangjie => lexicon.lookup(KeyKind::Cangjie, code, usize::MAX),
            LookupMode::Stroke => lexicon.lookup(KeyKind::Stroke, &stroke_key(code), usize::MAX),
            LookupMode::Jyutping => return Vec::new(),
        };
        words
            .into_iter()
            .flat_map(|row| {
                lexicon
                    .romanizations_of(&row.word)
                    .into_iter()
                    // Input is the whole typed text, marker included: selecting
                    // a reverse-lookup candidate consumes the entire buffer.
                    .map(|rom| Candidate::new(row.word.clone(), rom, input))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    // ---------- store queries ----------

    /// Initials lookup. `y` reads as `j` and separators are ignored.
    fn shortcut(&self, text: &str, limit: usize) -> Vec<Candidate> {
        let Some(lexicon) = &self.lexicon else {
            return Vec::new();
        };
        let key: String = text
            .chars()
            .filter(|c| *c != SEPARATOR)
            .map(|c| if c == 'y' { 'j' } else { c })
            .collect();
        lexicon
            .lookup(KeyKind::Shortcut, &key, limit)
            .into_iter()
            .map(|row| Candidate::new(row.word.clone(), row.romanization.clone(), text))
            .collect()
    }

    /// Exact spelling lookup. Typed tone digits must equal the entry's tones.
    fn matched_with_position(&self, text: &str) -> Vec<(Candidate, u32)> {
        let Some(lexicon) = &self.lexicon else {
            return Vec::new();
        };
        let digits = tones(text);
        let ping = remove_tones(text);
        lexicon
            .lookup_with_position(KeyKind::Ping, &ping)
            .into_iter()
            .filter(|(_, row)| digits.is_empty() || tones(&row.romanization) == digits)
            .map(|(pos, row)| {
                (
                    Candidate::new(row.word.clone(), row.romanization.clone(), text),
                    pos,
                )
            })
            .collect()
    }

    fn matched(&self, text: &str) -> Vec<Candidate> {
        self.matched_with_position(text)
            .into_iter()
            .map(|(c, _)| c)
            .collect()
    }

    fn matched_with_limit(&self, text: &str, limit: usize) -> Vec<Candidate> {
        let mut out = self.matched(text);
        out.truncate(limit);
        out
    }

    fn prefixed(&self, text: &str, limit: usize) -> Vec<Candidate> {
        let Some(lexicon) = &self.lexicon else {
            return Vec::new();
        };
        lexicon
            .lookup(KeyKind::Prefix, text, limit)
            .into_iter()
            .map(|row| Candidate::new(row.word.clone(), row.romanization.clone(), text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jyutping_core::LexiconBuilder;

    fn engine_with(rows: &str, config: Config) -> Engine {
        let mut b = LexiconBuilder::new();
        b.read_jyutping(rows.as_bytes()).unwrap();
        let lexicon = b.build("test").unwrap();
        Engine::new(Arc::new(lexicon), Arc::new(Splitter::new()), config)
    }

    fn texts(c: &[Candidate]) -> Vec<&str> {
        c.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn char_helpers() {
        assert_eq!(drop_first_chars("neihou", 3), "hou");
        assert_eq!(drop_first_chars("nei", 5), "");
        assert_eq!(take_chars("neihou", 2), "ne");
        assert_eq!(take_chars("ne", 5), "ne");
        assert_eq!(drop_last_char("nei'"), "nei");
        assert_eq!(stroke_key("hs3x9z"), "1235");
    }

    #[test]
    fn row_distance_only_reorders_far_rows() {
        let mut config = Config::default();
        config.row_distance_threshold = 1;
        let engine = engine_with("甲\tgaap3\n", config);
        let items = vec![
            (Candidate::new("乙", "jyut6", "j"), 10),
            (Candidate::new("丙", "bing2", "b"), 0),
            (Candidate::new("丁丁", "ding1 ding1", "dd"), 0),
            (Candidate::new("戊", "mou6", "m"), 9),
        ];
        let sorted = engine.sort_by_row_distance(items);
        // 丙 (row 0) jumps 乙 (row 10); 戊 (row 9) is 9 rows past 丙 but
        // blocked by 丁丁, whose text length differs.
        assert_eq!(texts(&sorted), vec!["丙", "乙", "丁丁", "戊"]);
    }

    #[test]
    fn default_threshold_keeps_source_order() {
        let engine = engine_with("甲\tgaap3\n", Config::default());
        let items = vec![
            (Candidate::new("乙", "jyut6", "j"), 20000),
            (Candidate::new("丙", "bing2", "b"), 0),
            (Candidate::new("丁", "ding1", "d"), 60000),
            (Candidate::new("戊", "mou6", "m"), 1),
        ];
        let sorted = engine.sort_by_row_distance(items);
        assert_eq!(texts(&sorted), vec!["乙", "丙", "戊", "丁"]);
    }

    #[test]
    fn unavailable_engine_is_empty() {
        let mut engine = engine_with("你\tnei5\n", Config::default());
        assert!(!engine.suggest("nei", &[vec!["nei".into()]]).is_empty());
        engine.close();
        assert!(!engine.is_open());
        assert!(engine.suggest("nei", &[vec!["nei".into()]]).is_empty());
    }

    #[test]
    fn cache_returns_identical_results() {
        let engine = engine_with("你\tnei5\n尼\tnei4\n", Config::default());
        let schemes = vec![vec!["nei".to_string()]];
        let a = engine.suggest("nei", &schemes);
        let b = engine.suggest("nei", &schemes);
        assert_eq!(a, b);
        // exact matches, then the initial "n" shortcut
        assert_eq!(texts(&a), vec!["你", "尼", "你", "尼"]);
    }
}
