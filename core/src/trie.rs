//! Prefix trie over syllable spellings.
use std::collections::HashMap;

/// A prefix tree of syllable spellings.
///
/// Each terminal node records the canonical syllable its spelling stands for,
/// so an alternative spelling ("heong") can resolve to the form stored in the
/// dictionary ("hoeng"). Canonical spellings map to themselves.
///
/// # Example
/// ```
/// use jyutping_core::trie::TrieNode;
///
/// let mut trie = TrieNode::new();
/// trie.insert("nei", "nei");
/// trie.insert("hou", "hou");
///
/// let input: Vec<char> = "neihou".chars().collect();
/// assert_eq!(trie.walk_prefixes(&input, 0), vec![(3, "nei")]);
/// assert_eq!(trie.walk_prefixes(&input, 3), vec![(6, "hou")]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct TrieNode {
    children: HashMap<char, TrieNode>,
    origin: Option<String>,
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `spelling`, resolving to `origin`. A later insert of the same
    /// spelling keeps the first origin.
    pub fn insert(&mut self, spelling: &str, origin: &str) {
        let mut node = self;
        for ch in spelling.chars() {
            node = node.children.entry(ch).or_default();
        }
        if node.origin.is_none() {
            node.origin = Some(origin.to_string());
        }
    }

    /// Canonical syllable for a complete spelling, if any.
    pub fn get(&self, spelling: &str) -> Option<&str> {
        let mut node = self;
        for ch in spelling.chars() {
            node = node.children.get(&ch)?;
        }
        node.origin.as_deref()
    }

    pub fn contains(&self, spelling: &str) -> bool {
        self.get(spelling).is_some()
    }

    /// Every spelling that starts at `start` in `input`.
    ///
    /// Returns `(end, origin)` pairs with `end` exclusive, shortest first.
    pub fn walk_prefixes(&self, input: &[char], start: usize) -> Vec<(usize, &str)> {
        let mut res = Vec::new();
        let mut node = self;
        let mut idx = start;
        while let Some(ch) = input.get(idx) {
            match node.children.get(ch) {
                Some(child) => {
                    node = child;
                    idx += 1;
                    if let Some(origin) = node.origin.as_deref() {
                        res.push((idx, origin));
                    }
                }
                None => break,
            }
        }
        res
    }

    /// Number of complete spellings stored below this node.
    pub fn len(&self) -> usize {
        let here = usize::from(self.origin.is_some());
        here + self.children.values().map(TrieNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn insert_and_get() {
        let mut trie = TrieNode::new();
        trie.insert("hoeng", "hoeng");
        trie.insert("heong", "hoeng");

        assert_eq!(trie.get("hoeng"), Some("hoeng"));
        assert_eq!(trie.get("heong"), Some("hoeng"));
        assert!(!trie.contains("hoen"));
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn first_origin_wins() {
        let mut trie = TrieNode::new();
        trie.insert("jyu", "jyu");
        trie.insert("jyu", "ju");
        assert_eq!(trie.get("jyu"), Some("jyu"));
    }

    #[test]
    fn walk_reports_every_terminal() {
        let mut trie = TrieNode::new();
        trie.insert("n", "n");
        trie.insert("ng", "ng");
        trie.insert("ngo", "ngo");

        let input = chars("ngo5");
        assert_eq!(
            trie.walk_prefixes(&input, 0),
            vec![(1, "n"), (2, "ng"), (3, "ngo")]
        );
        assert!(trie.walk_prefixes(&input, 3).is_empty());
        assert!(trie.walk_prefixes(&input, 10).is_empty());
    }

    #[test]
    fn empty_trie() {
        let trie = TrieNode::new();
        assert!(trie.is_empty());
        assert!(trie.walk_prefixes(&chars("a"), 0).is_empty());
    }
}
