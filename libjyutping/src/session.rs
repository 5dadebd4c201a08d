// libjyutping/src/session.rs
//
// One typing session over an owned engine and user lexicon.
// - keeps the raw buffer, its processing text, schemes and marked text
// - merges personalized and dictionary candidates into the candidate list
// - selection consumes the candidate's input; the full composition is
//   learned once nothing is left to convert

use jyutping_core::romanization::remove_tones;
use jyutping_core::{Candidate, CandidateList, Config, LexiconEntry, UserLexicon};
use tracing::debug;

use crate::engine::Engine;
use crate::normalizer::{detect_mode, Normalizer, SEPARATOR};
use crate::splitter::{scheme_length, scheme_origins, Scheme};

/// Outcome of selecting a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Input remains; the selection is held until the composition completes.
    Composing { selected: Candidate, remaining: String },
    /// Every keystroke is converted. Carries the whole composition.
    Committed(Candidate),
}

pub struct InputSession {
    engine: Engine,
    user_lexicon: UserLexicon,
    normalizer: Normalizer,
    config: Config,

    input: String,
    processing: String,
    schemes: Vec<Scheme>,
    marked_text: String,
    composed: Vec<Candidate>,
    candidates: CandidateList,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Preedit display for `text` given its schemes.
pub fn marked_text(text: &str, schemes: &[Scheme]) -> String {
    if text.contains(SEPARATOR) {
        return text.replace(SEPARATOR, "' ");
    }
    let Some(best) = schemes.first() else {
        return text.to_string();
    };
    let leading = best
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let covered = scheme_length(best);
    match text.char_indices().nth(covered) {
        Some((i, _)) => format!("{} {}", leading, &text[i..]),
        None => leading,
    }
}

/// What is left of `text` once `consumed` keystrokes are converted.
/// Separators are not counted and never lead the remainder.
fn remaining_after(text: &str, consumed: &str) -> String {
    let mut needed = consumed.chars().filter(|c| *c != SEPARATOR).count();
    let mut rest = "";
    for (i, c) in text.char_indices() {
        if needed == 0 {
            rest = &text[i..];
            break;
        }
        if c != SEPARATOR {
            needed -= 1;
        }
    }
    rest.trim_start_matches(SEPARATOR).to_string()
}

fn dedup_origins(schemes: &[Scheme]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = Vec::with_capacity(schemes.len());
    for scheme in schemes {
        let origins = scheme_origins(scheme);
        if !out.contains(&origins) {
            out.push(origins);
        }
    }
    out
}

fn entry_candidate(entry: LexiconEntry, input: &str, mark: Option<&str>) -> Candidate {
    let mark = match mark {
        Some(m) => m.to_string(),
        None => remove_tones(&entry.romanization),
    };
    Candidate::new(entry.word, entry.romanization, input).with_mark(mark)
}

impl InputSession {
    pub fn new(engine: Engine, user_lexicon: UserLexicon, normalizer: Normalizer) -> Self {
        let config = engine.config().clone();
        let candidates = CandidateList::with_page_size(config.page_size);
        Self {
            engine,
            user_lexicon,
            normalizer,
            config,
            input: String::new(),
            processing: String::new(),
            schemes: Vec::new(),
            marked_text: String::new(),
            composed: Vec::new(),
            candidates,
        }
    }

    // ========== State ==========

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn processing_text(&self) -> &str {
        &self.processing
    }

    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    pub fn marked_text(&self) -> &str {
        &self.marked_text
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateList {
        &mut self.candidates
    }

    /// Candidates selected so far in an unfinished composition.
    pub fn composed(&self) -> &[Candidate] {
        &self.composed
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn user_lexicon(&self) -> &UserLexicon {
        &self.user_lexicon
    }

    // ========== Input ==========

    /// Replace the buffer and recompute candidates.
    pub fn set_input(&mut self, raw: &str) -> &[Candidate] {
        self.input = raw.to_string();
        self.refresh();
        self.candidates.candidates()
    }

    pub fn push(&mut self, c: char) -> &[Candidate] {
        let mut raw = std::mem::take(&mut self.input);
        raw.push(c);
        self.set_input(&raw)
    }

    pub fn backspace(&mut self) -> &[Candidate] {
        let mut raw = std::mem::take(&mut self.input);
        raw.pop();
        self.set_input(&raw)
    }

    /// Drop the buffer and any unfinished composition.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.composed.clear();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.processing = self.normalizer.processing_text(&self.input);
        if self.processing.is_empty() {
            self.schemes.clear();
            self.marked_text.clear();
            self.candidates.clear();
            return;
        }
        if detect_mode(&self.processing).is_reverse() {
            self.schemes.clear();
            self.marked_text = self.processing.clone();
        } else {
            self.schemes = self.engine.splitter().split(&self.processing);
            self.marked_text = marked_text(&self.processing, &self.schemes);
        }
        let suggestions = self.suggest(&self.processing, &self.schemes);
        debug!(
            text = %self.processing,
            schemes = self.schemes.len(),
            candidates = suggestions.len(),
            "session refresh"
        );
        self.candidates.set_candidates(suggestions);
    }

    /// Personalized results and engine results for `text`, merged in the
    /// configured order. The candidate list deduplicates them.
    pub fn suggest(&self, text: &str, schemes: &[Scheme]) -> Vec<Candidate> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut dictionary = self.engine.suggest(text, &dedup_origins(schemes));

        let single_trailing_separator =
            text.ends_with(SEPARATOR) && text.matches(SEPARATOR).count() == 1;
        if dictionary.is_empty() && single_trailing_separator {
            let trimmed = text.trim_end_matches(SEPARATOR);
            let trimmed_len = char_len(trimmed);
            let retry: Vec<Scheme> = self
                .engine
                .splitter()
                .split(trimmed)
                .into_iter()
                .filter(|s| scheme_length(s) == trimmed_len || s.len() == 1)
                .collect();
            debug!(text = trimmed, schemes = retry.len(), "separator retry");
            dictionary = self.engine.suggest(trimmed, &dedup_origins(&retry));
        }

        let personal = if detect_mode(text).is_reverse() {
            Vec::new()
        } else {
            self.personalized(text, schemes)
        };
        if self.config.user_lexicon_first {
            personal.into_iter().chain(dictionary).collect()
        } else {
            dictionary.into_iter().chain(personal).collect()
        }
    }

    /// User lexicon candidates: ping match, shortcut match, then matches
    /// through each scheme covering the whole text.
    pub fn personalized(&self, text: &str, schemes: &[Scheme]) -> Vec<Candidate> {
        if !self.user_lexicon.is_open() {
            return Vec::new();
        }
        let limit = self.config.user_lexicon_limit;
        let key = self.normalizer.normalize(text);

        let mut out: Vec<Candidate> = self
            .user_lexicon
            .lookup_ping(&key, limit)
            .into_iter()
            .map(|e| entry_candidate(e, text, None))
            .collect();

        let shortcut_key = key.replace('y', "j");
        out.extend(
            self.user_lexicon
                .lookup_shortcut(&shortcut_key, limit)
                .into_iter()
                .map(|e| entry_candidate(e, text, Some(text))),
        );

        let key_len = char_len(&key);
        for scheme in schemes.iter().filter(|s| scheme_length(s) == key_len) {
            let syllables: Vec<&str> = scheme.iter().map(|t| t.toneless()).collect();
            let expected = syllables.join(" ");
            let mark = scheme
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            out.extend(
                self.user_lexicon
                    .lookup_ping(&syllables.concat(), limit)
                    .into_iter()
                    .filter(|e| remove_tones(&e.romanization) == expected)
                    .map(|e| entry_candidate(e, text, Some(&mark))),
            );
        }
        out
    }

    // ========== Selection ==========

    /// Select candidate `index` of the current page.
    pub fn select(&mut self, index: usize) -> Option<Selection> {
        let candidate = self.candidates.select_by_index(index)?.clone();
        Some(self.apply_selection(candidate))
    }

    pub fn select_highlighted(&mut self) -> Option<Selection> {
        let candidate = self.candidates.highlighted()?.clone();
        Some(self.apply_selection(candidate))
    }

    fn apply_selection(&mut self, candidate: Candidate) -> Selection {
        let reverse = detect_mode(&self.processing).is_reverse();
        let remaining = if reverse {
            String::new()
        } else {
            remaining_after(&self.processing, &candidate.input)
        };
        self.composed.push(candidate.clone());

        if !remaining.is_empty() {
            self.input = remaining.clone();
            self.refresh();
            return Selection::Composing {
                selected: candidate,
                remaining,
            };
        }

        let composition = std::mem::take(&mut self.composed)
            .into_iter()
            .reduce(|acc, next| acc + next)
            .unwrap_or(candidate);
        if !reverse {
            self.accept(&composition);
        }
        self.input.clear();
        self.refresh();
        Selection::Committed(composition)
    }

    /// Record `candidate` in the user lexicon. Returns its new frequency.
    pub fn accept(&mut self, candidate: &Candidate) -> u64 {
        self.user_lexicon.handle(candidate)
    }

    /// Forget `candidate` and refresh the list.
    pub fn remove(&mut self, candidate: &Candidate) -> bool {
        let removed = self.user_lexicon.remove(candidate);
        self.refresh();
        removed
    }

    pub fn clear_user_lexicon(&mut self) {
        self.user_lexicon.delete_all();
        self.refresh();
    }

    /// End the session: both stores are released and the buffer dropped.
    pub fn close(&mut self) {
        self.engine.close();
        self.user_lexicon.close();
        self.input.clear();
        self.composed.clear();
        self.refresh();
        self.candidates.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::Splitter;

    #[test]
    fn remaining_skips_separators() {
        assert_eq!(remaining_after("nei'hou", "nei"), "hou");
        assert_eq!(remaining_after("neihou", "neihou"), "");
        assert_eq!(remaining_after("nei'hou", "neihou"), "");
        assert_eq!(remaining_after("heonggong", "hoeng"), "gong");
    }

    #[test]
    fn marked_text_forms() {
        let s = Splitter::new();
        assert_eq!(marked_text("neihou", &s.split("neihou")), "nei hou");
        assert_eq!(marked_text("nei'hou", &s.split("nei'hou")), "nei' hou");
        assert_eq!(marked_text("neihz", &s.split("neihz")), "nei hz");
        assert_eq!(marked_text("zzz", &s.split("zzz")), "zzz");
    }

    #[test]
    fn origins_are_deduplicated() {
        let s = Splitter::new();
        let origins = dedup_origins(&s.split("heonggong"));
        assert_eq!(origins[0], vec!["hoeng".to_string(), "gong".to_string()]);
        let mut unique = origins.clone();
        unique.dedup();
        assert_eq!(unique, origins);
    }
}
