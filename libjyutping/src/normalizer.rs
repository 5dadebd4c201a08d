// libjyutping/src/normalizer.rs
//
// Keystroke normalization.
// - tone shortcuts: vv/xx/qq -> 4/5/6, then v/x/q -> 1/2/3
// - dialectal spellings rewritten per syllable (eo/oe swaps, y -> j, um/om -> am)
// - apostrophe separators stripped for dictionary keys
//
// Input starting with a reverse-lookup marker (r, v, x) is never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;

pub const PINYIN_MARKER: char = 'r';
pub const CANGJIE_MARKER: char = 'v';
pub const STROKE_MARKER: char = 'x';
pub const SEPARATOR: char = '\'';

/// How an input string is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    Jyutping,
    Pinyin,
    Cangjie,
    Stroke,
}

impl LookupMode {
    pub fn is_reverse(self) -> bool {
        self != LookupMode::Jyutping
    }
}

/// Detect the lookup mode from the first character of the raw input.
pub fn detect_mode(text: &str) -> LookupMode {
    match text.chars().next() {
        Some(PINYIN_MARKER) => LookupMode::Pinyin,
        Some(CANGJIE_MARKER) => LookupMode::Cangjie,
        Some(STROKE_MARKER) => LookupMode::Stroke,
        _ => LookupMode::Jyutping,
    }
}

/// Doubled letters first, so "vv" is 4 rather than "11".
pub fn expand_tone_shortcuts(text: &str) -> String {
    text.replace("vv", "4")
        .replace("xx", "5")
        .replace("qq", "6")
        .replace('v', "1")
        .replace('x', "2")
        .replace('q', "3")
}

// Ordered; each rule sees the output of the previous one.
static SYLLABLE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"eo(ng|k)$", "oe$1"),
        (r"oe(i|n|t)$", "eo$1"),
        (r"eoy", "eoi"),
        (r"oey", "eoi"),
        (r"^([b-z]|ng)(u|o)m$", "${1}am"),
        (r"^y", "j"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("syllable rule pattern"),
            replacement,
        )
    })
    .collect()
});

/// Rewrite one syllable (or apostrophe-free token) to its canonical spelling.
///
/// ```
/// use libjyutping::normalizer::normalize_syllable;
///
/// assert_eq!(normalize_syllable("heong"), "hoeng");
/// assert_eq!(normalize_syllable("seoy"), "seoi");
/// assert_eq!(normalize_syllable("yau"), "jau");
/// assert_eq!(normalize_syllable("sum"), "sam");
/// ```
pub fn normalize_syllable(token: &str) -> String {
    SYLLABLE_RULES
        .iter()
        .fold(token.to_string(), |acc, (re, replacement)| {
            re.replace(&acc, *replacement).into_owned()
        })
}

pub fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| *c != SEPARATOR).collect()
}

/// Options that change how keystrokes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    /// Keyboard arrangement; layouts above 1 type tone letters literally.
    pub arrangement: u8,
    pub tone_shortcuts: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            arrangement: 1,
            tone_shortcuts: true,
        }
    }
}

impl Normalizer {
    pub fn new(arrangement: u8, tone_shortcuts: bool) -> Self {
        Self {
            arrangement,
            tone_shortcuts,
        }
    }

    fn expands_tones(&self) -> bool {
        self.tone_shortcuts && self.arrangement <= 1
    }

    /// The text the engine and segmenter work on: tone shortcuts expanded,
    /// separators kept. Reverse-lookup input passes through unchanged.
    pub fn processing_text(&self, raw: &str) -> String {
        if raw.is_empty() || detect_mode(raw).is_reverse() || !self.expands_tones() {
            return raw.to_string();
        }
        expand_tone_shortcuts(raw)
    }

    /// Canonical key text: processing text, then per-token spelling rules,
    /// then separators stripped.
    ///
    /// ```
    /// use libjyutping::normalizer::Normalizer;
    ///
    /// let n = Normalizer::default();
    /// assert_eq!(n.normalize("yeung'heong"), "jeunghoeng");
    /// assert_eq!(n.normalize("neixx"), "nei5");
    /// assert_eq!(n.normalize("vonf"), "vonf");
    /// ```
    pub fn normalize(&self, raw: &str) -> String {
        if detect_mode(raw).is_reverse() {
            return raw.to_string();
        }
        let text = self.processing_text(raw);
        let rewritten: Vec<String> = text.split(SEPARATOR).map(normalize_syllable).collect();
        strip_separators(&rewritten.join("'"))
    }
}
