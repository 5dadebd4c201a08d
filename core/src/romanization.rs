//! Helpers over romanization strings.
//!
//! A romanization is a space-separated list of syllables, each ending in an
//! optional tone digit: `"nei5 hou2"`.

/// Jyutping tone digits are 1 through 6.
pub fn is_tone(c: char) -> bool {
    matches!(c, '1'..='6')
}

/// All tone digits of `text`, in order. `"nei5 hou2"` -> `"52"`.
pub fn tones(text: &str) -> String {
    text.chars().filter(|c| is_tone(*c)).collect()
}

/// `text` with tone digits removed, spaces kept. `"nei5 hou2"` -> `"nei hou"`.
pub fn remove_tones(text: &str) -> String {
    text.chars().filter(|c| !is_tone(*c)).collect()
}

/// Tone-less, space-less spelling used as the `Ping` key.
pub fn ping(romanization: &str) -> String {
    romanization
        .chars()
        .filter(|c| !is_tone(*c) && !c.is_whitespace())
        .collect()
}

/// First letter of each syllable, used as the `Shortcut` key.
pub fn anchors(romanization: &str) -> String {
    syllables(romanization)
        .filter_map(|syllable| syllable.chars().next())
        .collect()
}

pub fn syllables(romanization: &str) -> impl Iterator<Item = &str> {
    romanization.split_whitespace()
}

/// First syllable without its tone, or `None` for an empty romanization.
pub fn first_syllable_toneless(romanization: &str) -> Option<String> {
    syllables(romanization).next().map(remove_tones)
}
