//! Candidate types shared by the engine, the stores and the session.
//!
//! This module provides:
//! - `Candidate`: a word with its romanization and the keystrokes it covers
//! - `CandidateList`: the ordered, deduplicated list shown to the user, with
//!   a highlight cursor, paging, and the longest candidate seen

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::{Add, Range};

/// A single conversion candidate.
///
/// Two candidates are equal when their `text` and `romanization` are equal;
/// `input` and `mark` only describe how the candidate was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Output text.
    pub text: String,
    /// Space-separated toned syllables, e.g. `"nei5 hou2"`.
    pub romanization: String,
    /// Keystrokes this candidate consumes.
    pub input: String,
    /// Display form of the romanization.
    pub mark: String,
}

impl Candidate {
    /// A candidate whose mark is its romanization.
    pub fn new<T, R, I>(text: T, romanization: R, input: I) -> Self
    where
        T: Into<String>,
        R: Into<String>,
        I: Into<String>,
    {
        let romanization = romanization.into();
        Candidate {
            text: text.into(),
            mark: romanization.clone(),
            romanization,
            input: input.into(),
        }
    }

    pub fn with_mark<M: Into<String>>(mut self, mark: M) -> Self {
        self.mark = mark.into();
        self
    }

    /// Number of characters in `text`.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of characters in `input`.
    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Longer text wins; equal text falls back to the longer mark.
    pub fn is_longer_than(&self, other: &Candidate) -> bool {
        match self.text_len().cmp(&other.text_len()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.mark.chars().count() > other.mark.chars().count(),
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.romanization == other.romanization
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.romanization.hash(state);
    }
}

/// Stitch two partial matches together.
///
/// Text and input concatenate; romanization and mark join with a space.
impl Add for Candidate {
    type Output = Candidate;

    fn add(self, rhs: Candidate) -> Candidate {
        Candidate {
            text: self.text + &rhs.text,
            romanization: join_spaced(&self.romanization, &rhs.romanization),
            input: self.input + &rhs.input,
            mark: join_spaced(&self.mark, &rhs.mark),
        }
    }
}

impl<'a> Add<&'a Candidate> for &'a Candidate {
    type Output = Candidate;

    fn add(self, rhs: &'a Candidate) -> Candidate {
        self.clone() + rhs.clone()
    }
}

fn join_spaced(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Drop repeated `(text, romanization)` pairs, keeping the first occurrence.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: AHashSet<(String, String)> = AHashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert((c.text.clone(), c.romanization.clone())))
        .collect()
}

/// Placeholder used to size the candidate bar before anything is typed.
fn default_longest() -> Candidate {
    Candidate::new("毋", "m4", "m")
}

/// The candidate list presented to the user.
///
/// Candidates are deduplicated on every update. The highlight is a global
/// index clamped to the list; the current page is the page holding it.
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    page_size: usize,
    highlighted: usize,
    longest: Candidate,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::with_page_size(6)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            candidates: Vec::new(),
            page_size: page_size.max(1),
            highlighted: 0,
            longest: default_longest(),
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the candidates. The list is deduplicated, the highlight goes
    /// back to the first entry and `longest` grows if a longer one arrived.
    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = dedup_candidates(candidates);
        self.highlighted = 0;
        if let Some(longest) = self
            .candidates
            .iter()
            .fold(None::<&Candidate>, |best, c| match best {
                Some(b) if !c.is_longer_than(b) => Some(b),
                _ => Some(c),
            })
        {
            if longest.is_longer_than(&self.longest) {
                self.longest = longest.clone();
            }
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Longest candidate seen since the last `reset`.
    pub fn longest(&self) -> &Candidate {
        &self.longest
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted(&self) -> Option<&Candidate> {
        self.candidates.get(self.highlighted)
    }

    /// Returns true if the highlight moved.
    pub fn increase_highlighted_index(&mut self) -> bool {
        if self.highlighted + 1 < self.candidates.len() {
            self.highlighted += 1;
            true
        } else {
            false
        }
    }

    /// Returns true if the highlight moved.
    pub fn decrease_highlighted_index(&mut self) -> bool {
        if self.highlighted > 0 {
            self.highlighted -= 1;
            true
        } else {
            false
        }
    }

    pub fn num_pages(&self) -> usize {
        self.candidates.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.highlighted / self.page_size
    }

    fn page_range(&self, page: usize) -> Range<usize> {
        let start = (page * self.page_size).min(self.candidates.len());
        let end = (start + self.page_size).min(self.candidates.len());
        start..end
    }

    pub fn current_page_candidates(&self) -> &[Candidate] {
        &self.candidates[self.page_range(self.current_page())]
    }

    /// Move the highlight to the first entry of the previous page.
    pub fn page_up(&mut self) -> bool {
        let page = self.current_page();
        if page == 0 {
            return false;
        }
        self.highlighted = (page - 1) * self.page_size;
        true
    }

    /// Move the highlight to the first entry of the next page.
    pub fn page_down(&mut self) -> bool {
        let page = self.current_page();
        if page + 1 >= self.num_pages() {
            return false;
        }
        self.highlighted = (page + 1) * self.page_size;
        true
    }

    /// Highlight and return the `index`-th candidate of the current page.
    pub fn select_by_index(&mut self, index: usize) -> Option<&Candidate> {
        let range = self.page_range(self.current_page());
        if index >= range.len() {
            return None;
        }
        self.highlighted = range.start + index;
        self.candidates.get(self.highlighted)
    }

    /// Drop all candidates, keeping `longest`.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.highlighted = 0;
    }

    /// Drop all candidates and forget `longest`.
    pub fn reset(&mut self) {
        self.clear();
        self.longest = default_longest();
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(format!("字{}", i), format!("zi{}", i % 6 + 1), "zi"))
            .collect()
    }

    #[test]
    fn combination_law() {
        let a = Candidate::new("你", "nei5", "nei");
        let b = Candidate::new("好", "hou2", "hou");
        let ab = &a + &b;
        assert_eq!(ab.text, "你好");
        assert_eq!(ab.romanization, "nei5 hou2");
        assert_eq!(ab.input, "neihou");
        assert_eq!(ab.mark, "nei5 hou2");
    }

    #[test]
    fn equality_ignores_input_and_mark() {
        let a = Candidate::new("你", "nei5", "nei");
        let b = Candidate::new("你", "nei5", "n").with_mark("nei");
        let c = Candidate::new("你", "nei4", "nei");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let list = vec![
            Candidate::new("你", "nei5", "nei"),
            Candidate::new("尼", "nei4", "nei"),
            Candidate::new("你", "nei5", "n"),
            Candidate::new("你", "nei4", "nei"),
        ];
        let out = dedup_candidates(list);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].input, "nei");
        assert_eq!(out[1].text, "尼");
        assert_eq!(out[2].romanization, "nei4");
    }

    #[test]
    fn highlight_is_clamped_and_reset() {
        let mut list = CandidateList::with_page_size(2);
        assert!(!list.increase_highlighted_index());
        list.set_candidates(numbered(3));
        assert!(!list.decrease_highlighted_index());
        assert!(list.increase_highlighted_index());
        assert!(list.increase_highlighted_index());
        assert!(!list.increase_highlighted_index());
        assert_eq!(list.highlighted_index(), 2);

        list.set_candidates(numbered(3));
        assert_eq!(list.highlighted_index(), 0);
    }

    #[test]
    fn paging_follows_highlight() {
        let mut list = CandidateList::with_page_size(4);
        list.set_candidates(numbered(10));
        assert_eq!(list.num_pages(), 3);
        assert_eq!(list.current_page_candidates().len(), 4);
        assert!(!list.page_up());

        assert!(list.page_down());
        assert_eq!(list.current_page(), 1);
        assert_eq!(list.highlighted_index(), 4);

        assert!(list.page_down());
        assert_eq!(list.current_page_candidates().len(), 2);
        assert!(!list.page_down());

        let picked = list.select_by_index(1).cloned();
        assert_eq!(picked.map(|c| c.text), Some("字9".to_string()));
        assert!(list.select_by_index(2).is_none());

        assert!(list.page_up());
        assert_eq!(list.highlighted_index(), 4);
    }

    #[test]
    fn longest_only_grows_until_reset() {
        let mut list = CandidateList::new();
        assert_eq!(list.longest().text, "毋");

        list.set_candidates(vec![Candidate::new("香港人", "hoeng1 gong2 jan4", "hgj")]);
        list.set_candidates(vec![Candidate::new("人", "jan4", "j")]);
        assert_eq!(list.longest().text, "香港人");

        list.reset();
        assert_eq!(list.longest().text, "毋");
        assert!(list.is_empty());
    }

    #[test]
    fn longest_breaks_ties_on_mark() {
        let mut list = CandidateList::new();
        list.set_candidates(vec![Candidate::new("香", "hoeng1", "hoeng")]);
        assert_eq!(list.longest().romanization, "hoeng1");
    }
}
