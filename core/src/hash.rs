//! Stable key hashing for on-disk indexes.
//!
//! Every lookup key in the Dictionary Store and the User Lexicon Store is a
//! 64-bit FNV-1a hash of a normalized string. The function is frozen:
//! changing it invalidates every materialized store, so any change must bump
//! `HASH_VERSION`.

/// Version of the key hash. Part of the Dictionary Store version marker.
pub const HASH_VERSION: u32 = 1;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64 over the UTF-8 bytes of `text`.
///
/// # Example
/// ```
/// use jyutping_core::hash::key_hash;
///
/// assert_eq!(key_hash(""), 0xcbf29ce484222325);
/// assert_eq!(key_hash("a"), 0xaf63dc4c8601ec8c);
/// ```
pub fn key_hash(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Which index a key belongs to.
///
/// The discriminant is the first byte of every key in the lexicon FST, so the
/// values are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum KeyKind {
    /// Romanization without tones and spaces ("nei5 hou2" -> "neihou").
    Ping = 1,
    /// First letter of every syllable ("nei5 hou2" -> "nh").
    Shortcut = 2,
    /// Proper prefixes of the ping spelling.
    Prefix = 3,
    Pinyin = 4,
    Cangjie = 5,
    Stroke = 6,
    /// Word text, resolving a word back to its romanizations.
    Word = 7,
    /// First letter of every pinyin syllable ("ni3 hao3" -> "nh").
    PinyinShortcut = 8,
}

impl KeyKind {
    pub const ALL: [KeyKind; 8] = [
        KeyKind::Ping,
        KeyKind::Shortcut,
        KeyKind::Prefix,
        KeyKind::Pinyin,
        KeyKind::Cangjie,
        KeyKind::Stroke,
        KeyKind::Word,
        KeyKind::PinyinShortcut,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Ping => "ping",
            KeyKind::Shortcut => "shortcut",
            KeyKind::Prefix => "prefix",
            KeyKind::Pinyin => "pinyin",
            KeyKind::Cangjie => "cangjie",
            KeyKind::Stroke => "stroke",
            KeyKind::Word => "word",
            KeyKind::PinyinShortcut => "pinyin_shortcut",
        }
    }
}

/// FST key layout: `[kind, hash big-endian]`.
///
/// Big-endian keeps keys of one kind contiguous and lexicographically sorted,
/// which `fst::MapBuilder` requires.
pub fn index_key(kind: KeyKind, hash: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = kind as u8;
    key[1..].copy_from_slice(&hash.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(key_hash(""), 0xcbf29ce484222325);
        assert_eq!(key_hash("a"), 0xaf63dc4c8601ec8c);
        assert_eq!(key_hash("foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn hash_is_byte_based() {
        // Same text, same hash, regardless of how it was built.
        let owned = String::from("nei") + "hou";
        assert_eq!(key_hash(&owned), key_hash("neihou"));
        assert_ne!(key_hash("neihou"), key_hash("nei hou"));
    }

    #[test]
    fn index_keys_sort_by_kind_then_hash() {
        let a = index_key(KeyKind::Ping, u64::MAX);
        let b = index_key(KeyKind::Shortcut, 0);
        assert!(a < b);
        assert_eq!(a[0], 1);
        assert_eq!(&b[1..], &[0u8; 8]);
    }
}
