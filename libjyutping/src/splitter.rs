// libjyutping/src/splitter.rs
//
// Jyutping segmentation.
// - every maximal tokenization is enumerated bottom-up over input positions
// - a syllable may carry one trailing tone digit
// - apostrophes are hard boundaries and produce no token
// - a position where no syllable starts ends the scheme (partial coverage)
//
// Schemes come out longest coverage first, then fewest syllables, then
// earliest boundaries, deduplicated on their origins.

use crate::syllables::syllable_trie;
use jyutping_core::romanization::is_tone;
use jyutping_core::TrieNode;

/// One syllable of a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyllableToken {
    /// Canonical spelling plus tone digit when typed, e.g. `"hoeng1"`.
    pub origin: String,
    /// The keystrokes this token covers, e.g. `"heong1"`.
    pub text: String,
    pub tone: Option<u8>,
}

impl SyllableToken {
    /// `origin` without the tone digit.
    pub fn toneless(&self) -> &str {
        match self.tone {
            Some(_) => &self.origin[..self.origin.len() - 1],
            None => &self.origin,
        }
    }
}

pub type Scheme = Vec<SyllableToken>;

/// Characters covered by a scheme (separators excluded).
pub fn scheme_length(scheme: &[SyllableToken]) -> usize {
    scheme.iter().map(|t| t.text.chars().count()).sum()
}

/// Scheme origins, as handed to the engine.
pub fn scheme_origins(scheme: &[SyllableToken]) -> Vec<String> {
    scheme.iter().map(|t| t.origin.clone()).collect()
}

#[derive(Debug, Clone)]
struct Path {
    tokens: Vec<SyllableToken>,
    // Exclusive char index where the path stopped.
    end: usize,
    // Char index after each token.
    boundaries: Vec<usize>,
}

fn rank(paths: &mut [Path]) {
    paths.sort_by(|a, b| {
        b.end
            .cmp(&a.end)
            .then(a.tokens.len().cmp(&b.tokens.len()))
            .then(a.boundaries.cmp(&b.boundaries))
    });
}

/// Segmenter over a syllable trie.
#[derive(Debug, Clone)]
pub struct Splitter {
    trie: TrieNode,
    max_schemes: usize,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Splitter {
    /// Splitter over the full Jyutping syllable table.
    pub fn new() -> Self {
        Self {
            trie: syllable_trie(),
            max_schemes: 64,
        }
    }

    /// Splitter over an explicit syllable list; each syllable is its own origin.
    pub fn with_syllables<T: AsRef<str>>(syllables: &[T]) -> Self {
        let mut trie = TrieNode::new();
        for s in syllables {
            let key = s.as_ref().trim().to_ascii_lowercase();
            trie.insert(&key, &key);
        }
        Self {
            trie,
            max_schemes: 64,
        }
    }

    pub fn with_max_schemes(mut self, max: usize) -> Self {
        self.max_schemes = max.max(1);
        self
    }

    pub fn is_syllable(&self, text: &str) -> bool {
        self.trie.contains(text)
    }

    /// Every admissible scheme of `text`, best first.
    ///
    /// Besides each maximal tokenization, every shorter leading run of it is
    /// a scheme too, so a partially typed word still matches its first
    /// syllables. Empty input, or input where no syllable starts, yields no
    /// schemes.
    pub fn split(&self, text: &str) -> Vec<Scheme> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let maximal = self.maximal_paths(&chars);

        let mut all: Vec<Path> = Vec::new();
        for path in maximal {
            for n in 1..=path.tokens.len() {
                let boundaries = path.boundaries[..n].to_vec();
                let end = boundaries[n - 1];
                all.push(Path {
                    tokens: path.tokens[..n].to_vec(),
                    end,
                    boundaries,
                });
            }
        }
        rank(&mut all);

        let mut seen: Vec<Vec<String>> = Vec::new();
        let mut out = Vec::new();
        for path in all {
            let origins = scheme_origins(&path.tokens);
            if seen.contains(&origins) {
                continue;
            }
            seen.push(origins);
            out.push(path.tokens);
            if out.len() >= self.max_schemes {
                break;
            }
        }
        out
    }

    /// Origins of the best scheme, or empty if nothing splits.
    pub fn split_best(&self, text: &str) -> Vec<String> {
        self.split(text)
            .into_iter()
            .next()
            .map(|s| scheme_origins(&s))
            .unwrap_or_default()
    }

    // memo[pos] holds the ranked maximal paths starting at pos. Since a
    // path's rank is decided by its tail once the first token is fixed,
    // truncating each level keeps the global best.
    fn maximal_paths(&self, chars: &[char]) -> Vec<Path> {
        let n = chars.len();
        let mut memo: Vec<Vec<Path>> = vec![Vec::new(); n + 1];
        memo[n] = vec![Path {
            tokens: Vec::new(),
            end: n,
            boundaries: Vec::new(),
        }];

        for pos in (0..n).rev() {
            if chars[pos] == crate::normalizer::SEPARATOR {
                memo[pos] = memo[pos + 1].clone();
                continue;
            }
            let matches = self.trie.walk_prefixes(chars, pos);
            if matches.is_empty() {
                memo[pos] = vec![Path {
                    tokens: Vec::new(),
                    end: pos,
                    boundaries: Vec::new(),
                }];
                continue;
            }

            let mut level = Vec::new();
            for (end, origin) in matches {
                let (stop, tone) = match chars.get(end) {
                    Some(&c) if is_tone(c) => (end + 1, c.to_digit(10).map(|d| d as u8)),
                    _ => (end, None),
                };
                let token = SyllableToken {
                    origin: match tone {
                        Some(d) => format!("{}{}", origin, d),
                        None => origin.to_string(),
                    },
                    text: chars[pos..stop].iter().collect(),
                    tone,
                };
                for tail in &memo[stop] {
                    let mut tokens = Vec::with_capacity(tail.tokens.len() + 1);
                    tokens.push(token.clone());
                    tokens.extend(tail.tokens.iter().cloned());
                    let mut boundaries = Vec::with_capacity(tail.boundaries.len() + 1);
                    boundaries.push(stop);
                    boundaries.extend(tail.boundaries.iter().copied());
                    level.push(Path {
                        tokens,
                        end: tail.end,
                        boundaries,
                    });
                }
            }
            rank(&mut level);
            level.truncate(self.max_schemes);
            memo[pos] = level;
        }

        memo.swap_remove(0)
            .into_iter()
            .filter(|p| !p.tokens.is_empty())
            .collect()
    }
}
