// libjyutping/src/syllables.rs
//
// Jyutping syllable inventory: the attested initial + final combinations,
// the null-initial syllables and the syllabic nasals. Tones are not part of
// the table; the splitter consumes a trailing tone digit after any syllable.

use crate::normalizer::normalize_syllable;
use jyutping_core::TrieNode;
use once_cell::sync::Lazy;

/// Attested syllables, one line per initial.
const SYLLABLE_TABLE: &[&str] = &[
    // null initial and syllabic nasals
    "aa aai aau aam aan aang aap aat aak ai au am an ang ap at ak e ei o oi ou on ong ot ok uk ung m ng hm hng",
    "baa baai baau baam baan baang baat baak bai bau bam ban bang bat bak be bei beng bek bi bin bing bit bik biu bo bok bong bou bui bun but bung buk",
    "paa paai paau paan paang paat paak pai pau pan pang pat pak pe pei peng pek pin ping pit pik piu po pok pong pou pui pun put pung puk",
    "maa maai maau maan maang maat maak mai mau mam man mang mat mak me mei meng mi min ming mit mik miu mo mok mong mou mui mun mut mung muk",
    "faa faai faan faat faak fai fau fan fang fat fe fei fing fo fok fong fu fui fun fut fung fuk",
    "daa daai daam daan daap daat daak dai dau dam dan dang dap dat dak de dei deng dek deoi deon deu di dim din ding dip dit dik diu do doi dok dong dou doek dung duk dyun dyut",
    "taa taai taam taan taap taat tai tau tam tan tang tap tat tak tek teng teoi teon ti tim tin ting tip tit tik tiu to toi tok tong tou tung tuk tyun tyut",
    "naa naai naau naam naan naap naat nai nau nam nan nang nap nat nak ne nei neoi ni nim nin ning nip nik niu no noi nok nong nou nung nuk nyun noeng",
    "laa laai laau laam laan laang laap laat laak lai lau lam lan lang lap lat lak le lei leng lek leoi leon leot li lim lin ling lip lit lik liu lo loi lok long lou lung luk lyun lyut loeng loek",
    "gaa gaai gaau gaam gaan gaang gaap gaat gaak gai gau gam gan gang gap gat gak ge gei geng gep geoi geon gi gim gin ging gip git gik giu go goi gok gon gong got gou gu gui gun gung guk gyun goeng goek",
    "kaa kaai kaau kaat kaak kai kau kam kan kang kap kat kak ke kei kek keoi kim kin king kit kik kiu ko koi kok kong ku kui kung kuk kut kyun kyut koeng koek",
    "ngaa ngaai ngaau ngaam ngaan ngaang ngaap ngaat ngaak ngai ngau ngam ngan ngang ngap ngat ngak ngo ngoi ngok ngon ngong ngou",
    "haa haai haau haam haan haang haap haak hai hau ham han hang hap hat hak he hei heng hek heoi hi him hin hing hip hit hik hiu ho hoi hok hon hong hot hou hung huk hyun hyut hoe hoeng",
    "gwaa gwaai gwaan gwaang gwaat gwaak gwai gwan gwang gwat gwak gwik gwing gwo gwok gwong",
    "kwaa kwaai kwaang kwaak kwai kwan kwang kwat kwik kwing kwok kwong",
    "waa waai waan waang waat waak wai wan wang wat wak wing wik wo wok wong wu wui wun wut",
    "zaa zaai zaau zaam zaan zaang zaap zaat zaak zai zau zam zan zang zap zat zak ze zek zeng zeoi zeon zeot zeu zi zim zin zing zip zit zik ziu zo zoi zok zong zou zung zuk zyu zyun zyut zoeng zoek",
    "caa caai caau caam caan caang caap caat caak cai cau cam can cang cap cat cak ce cek ceng ceoi ceon ceot ci cim cin cing cip cit cik ciu co coi cok cong cou cung cuk cyu cyun cyut coeng coek",
    "saa saai saau saam saan saang saap saat saak sai sau sam san sang sap sat sak se sei sek seng seoi seon seot si sim sin sing sip sit sik siu so soi sok song sou sung suk syu syun syut soeng soek",
    "jaa jai jau jam jan jap jat je jeoi jeon ji jim jin jing jip jit jik jiu jo jung juk jyu jyun jyut joeng joek",
];

/// Every canonical (toneless) syllable, sorted and unique.
pub static JYUTPING_SYLLABLES: Lazy<Vec<String>> = Lazy::new(|| {
    let mut all: Vec<String> = SYLLABLE_TABLE
        .iter()
        .flat_map(|line| line.split_whitespace())
        .map(str::to_string)
        .collect();
    all.sort();
    all.dedup();
    all
});

/// Alternative spellings of `syllable` that the normalizer maps back to it.
///
/// Only same-length rewrites exist, so a variant always spans exactly as
/// many keystrokes as the syllable it stands for.
pub fn variants(syllable: &str) -> Vec<String> {
    fn push(out: &mut Vec<String>, syllable: &str, candidate: String) {
        if candidate != syllable
            && !out.contains(&candidate)
            && normalize_syllable(&candidate) == syllable
        {
            out.push(candidate);
        }
    }

    let mut out = Vec::new();
    for (canonical, alternatives) in [
        ("oeng", &["eong"][..]),
        ("oek", &["eok"][..]),
        ("eoi", &["oei", "eoy", "oey"][..]),
        ("eon", &["oen"][..]),
        ("eot", &["oet"][..]),
    ] {
        if let Some(stem) = syllable.strip_suffix(canonical) {
            for alt in alternatives {
                push(&mut out, syllable, format!("{}{}", stem, alt));
            }
        }
    }
    if let Some(stem) = syllable.strip_suffix("am") {
        if stem.len() == 1 || stem == "ng" {
            push(&mut out, syllable, format!("{}um", stem));
            push(&mut out, syllable, format!("{}om", stem));
        }
    }
    let spelled: Vec<String> = std::iter::once(syllable.to_string())
        .chain(out.iter().cloned())
        .collect();
    for s in spelled {
        if let Some(rest) = s.strip_prefix('j') {
            push(&mut out, syllable, format!("y{}", rest));
        }
    }
    out
}

/// Trie of every canonical syllable and its variant spellings.
pub fn syllable_trie() -> TrieNode {
    let mut trie = TrieNode::new();
    for syllable in JYUTPING_SYLLABLES.iter() {
        trie.insert(syllable, syllable);
    }
    // Canonical spellings first, so a variant never shadows a real syllable.
    for syllable in JYUTPING_SYLLABLES.iter() {
        for variant in variants(syllable) {
            trie.insert(&variant, syllable);
        }
    }
    trie
}

pub fn is_syllable(text: &str) -> bool {
    JYUTPING_SYLLABLES.binary_search_by(|s| s.as_str().cmp(text)).is_ok()
}
