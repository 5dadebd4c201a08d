// End-to-end matching scenarios over a small fixture dictionary
//
// Rows are listed in relevance order; row position is the tie-break value.
//
// File: libjyutping/tests/engine_scenarios.rs

use std::sync::Arc;

use libjyutping::splitter::scheme_origins;
use libjyutping::{Candidate, Config, Engine, LexiconBuilder, Splitter};

const FIXTURE_JYUTPING: &str = "\
你\tnei5
呢\tne1
尼\tnei4
好\thou2
號\thou6
你好\tnei5 hou2
我\tngo5
哋\tdei6
我哋\tngo5 dei6
係\thai6
香港\thoeng1 gong2
香\thoeng1
港\tgong2
人\tjan4
香港人\thoeng1 gong2 jan4
有\tjau5
冇\tmou5
食\tsik6
飯\tfaan6
食飯\tsik6 faan6
唔\tm4
";

const FIXTURE_PINYIN: &str = "你\tni3\n你好\tni3 hao3\n人\tren2\n";
const FIXTURE_SHAPE: &str = "你\tonf\t3235234\n人\to\t34\n";

fn fixture_engine() -> Engine {
    let mut b = LexiconBuilder::new();
    b.read_jyutping(FIXTURE_JYUTPING.as_bytes()).unwrap();
    b.read_pinyin(FIXTURE_PINYIN.as_bytes()).unwrap();
    b.read_shape(FIXTURE_SHAPE.as_bytes()).unwrap();
    let lexicon = b.build("fixture").unwrap();
    Engine::new(Arc::new(lexicon), Arc::new(Splitter::new()), Config::default())
}

fn engine_over(rows: &str) -> Engine {
    let mut b = LexiconBuilder::new();
    b.read_jyutping(rows.as_bytes()).unwrap();
    Engine::new(
        Arc::new(b.build("fixture").unwrap()),
        Arc::new(Splitter::new()),
        Config::default(),
    )
}

fn texts_and_inputs(candidates: &[Candidate]) -> Vec<(&str, &str)> {
    candidates
        .iter()
        .map(|c| (c.text.as_str(), c.input.as_str()))
        .collect()
}

fn suggest(engine: &Engine, text: &str) -> Vec<Candidate> {
    let schemes: Vec<Vec<String>> = engine
        .splitter()
        .split(text)
        .iter()
        .map(|s| scheme_origins(s))
        .collect();
    engine.suggest(text, &schemes)
}

fn texts(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.text.as_str()).collect()
}

fn dedup_texts(candidates: &[Candidate]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for c in candidates {
        if !out.contains(&c.text.as_str()) {
            out.push(c.text.as_str());
        }
    }
    out
}

#[test]
fn empty_input_is_empty() {
    assert!(suggest(&fixture_engine(), "").is_empty());
}

#[test]
fn single_letter_is_shortcut_only() {
    let engine = fixture_engine();
    // ngo5 anchors on "n" too
    assert_eq!(texts(&suggest(&engine, "n")), vec!["你", "呢", "尼", "我"]);
    // y reads as j
    let y = suggest(&engine, "y");
    assert_eq!(texts(&y), vec!["人", "有"]);
    assert!(y.iter().all(|c| c.input == "y"));
}

#[test]
fn two_letter_initials() {
    let engine = fixture_engine();
    // exact "nh" (none), then shortcut "nh", then shortcut "n"
    assert_eq!(
        texts(&suggest(&engine, "nh")),
        vec!["你好", "你", "呢", "尼", "我"]
    );
}

#[test]
fn two_letter_trailing_tone_is_exact_only() {
    let engine = fixture_engine();
    assert_eq!(texts(&suggest(&engine, "m4")), vec!["唔"]);
    assert!(suggest(&engine, "m3").is_empty());
}

#[test]
fn three_letters_layer_exact_prefix_and_shortcuts() {
    let engine = fixture_engine();
    let result = suggest(&engine, "nei");
    assert_eq!(
        texts(&result),
        vec!["你", "尼", "你好", "呢", "你", "呢", "尼", "我"]
    );
    assert_eq!(dedup_texts(&result), vec!["你", "尼", "你好", "呢", "我"]);
}

#[test]
fn three_letters_stitch_initials() {
    let engine = fixture_engine();
    let result = suggest(&engine, "hgj");
    // shortcut "hgj", then 港+人 stitched from shortcut "hg" + shortcut "j"
    assert_eq!(
        dedup_texts(&result),
        vec!["香港人", "香港", "好", "號", "係", "香"]
    );
    let stitched = &result[1];
    assert_eq!(stitched.romanization, "hoeng1 gong2 jan4");
    assert_eq!(stitched.input, "hgj");
}

#[test]
fn three_letters_middle_tone_stops_combination() {
    let engine = fixture_engine();
    assert_eq!(texts(&suggest(&engine, "m4g")), vec!["唔"]);
}

#[test]
fn toned_syllable_matches_before_fallback() {
    let engine = fixture_engine();
    let result = suggest(&engine, "nei5");
    assert_eq!(texts(&result), vec!["你", "呢"]);
    assert_eq!(result[0].romanization, "nei5");
}

#[test]
fn trailing_separator_keeps_exact_syllable() {
    let engine = fixture_engine();
    assert_eq!(texts(&suggest(&engine, "nei5'")), vec!["你"]);
}

#[test]
fn full_match_whole_phrase_first() {
    let engine = fixture_engine();
    assert_eq!(
        texts(&suggest(&engine, "neihou")),
        vec!["你好", "你", "尼", "呢"]
    );
}

#[test]
fn full_match_stitches_uncovered_tail() {
    let engine = fixture_engine();
    let result = suggest(&engine, "neihouhai");
    assert_eq!(texts(&result), vec!["你好係", "你好", "你", "尼", "呢"]);
    assert_eq!(result[0].romanization, "nei5 hou2 hai6");
    assert_eq!(result[0].input, "neihouhai");
}

#[test]
fn separator_filters_on_first_syllable() {
    let engine = fixture_engine();
    // 呢 (ne1) contradicts the boundary after "nei"
    assert_eq!(
        texts(&suggest(&engine, "nei'hou")),
        vec!["你好", "你", "尼"]
    );
}

#[test]
fn variant_spelling_reaches_canonical_entry() {
    let engine = fixture_engine();
    let result = suggest(&engine, "heonggong");
    assert_eq!(result[0].text, "香港");
    assert!(dedup_texts(&result).contains(&"香"));
}

#[test]
fn partial_match_extends_with_tail_prefix() {
    let engine = fixture_engine();
    // "h" is not a syllable; its first prefix row is 好
    assert_eq!(
        texts(&suggest(&engine, "neihouh")),
        vec!["你好好", "你好", "你", "尼", "呢"]
    );
}

#[test]
fn full_match_stitches_onto_equal_second_candidate() {
    let engine = engine_over("你\tnei5\n尼\tnei4\n好\thou2\n");
    assert_eq!(
        texts_and_inputs(&suggest(&engine, "neihou")),
        vec![
            ("你好", "neihou"),
            ("尼好", "neihou"),
            ("你", "nei"),
            ("尼", "nei"),
        ]
    );
}

#[test]
fn partial_match_extends_tail_by_one_raw_letter() {
    // "hai" is the only syllable in "haigz"; "haig" still prefixes 係講
    let engine = engine_over("你\tnei5\n係講\thai6 gong2\n");
    let result = suggest(&engine, "neihaigz");
    assert_eq!(
        texts_and_inputs(&result),
        vec![("你係講", "neihaig"), ("你", "nei")]
    );
    assert_eq!(result[0].romanization, "nei5 hai6 gong2");
}

#[test]
fn partial_match_without_extension() {
    let engine = fixture_engine();
    assert_eq!(texts(&suggest(&engine, "neihz")), vec!["你", "尼", "呢"]);
}

#[test]
fn unsplittable_input_shortens_shortcuts() {
    let engine = fixture_engine();
    // no scheme: shortcut "hgjz" is empty, then "hgj", "hg", "h"
    let result = suggest(&engine, "hgjz");
    assert_eq!(
        texts(&result),
        vec!["香港人", "香港", "好", "號", "係", "香"]
    );
}

#[test]
fn reverse_lookups_resolve_romanizations() {
    let engine = fixture_engine();

    let pinyin = suggest(&engine, "rnihao");
    assert_eq!(texts(&pinyin), vec!["你好"]);
    assert_eq!(pinyin[0].romanization, "nei5 hou2");
    assert_eq!(pinyin[0].input, "rnihao");

    assert_eq!(texts(&suggest(&engine, "vonf")), vec!["你"]);
    assert_eq!(texts(&suggest(&engine, "vo")), vec!["人"]);

    // p s p z s p n = 3 2 3 5 2 3 4
    assert_eq!(texts(&suggest(&engine, "xpspzspn")), vec!["你"]);
    assert_eq!(texts(&suggest(&engine, "x34")), vec!["人"]);

    // initials when no full spelling matches
    assert_eq!(texts(&suggest(&engine, "rnh")), vec!["你好"]);
    assert_eq!(texts(&suggest(&engine, "rn")), vec!["你"]);
    assert_eq!(suggest(&engine, "rnh")[0].input, "rnh");
    assert!(suggest(&engine, "rzz").is_empty());

    assert!(suggest(&engine, "r").is_empty());
    assert!(suggest(&engine, "vzzz").is_empty());
}

#[test]
fn repeated_queries_are_identical() {
    let engine = fixture_engine();
    for text in ["nei", "neihouhai", "nh", "hgjz", "nei'hou"] {
        assert_eq!(suggest(&engine, text), suggest(&engine, text), "{text}");
    }
}

#[test]
fn results_respect_shortcut_cap() {
    let mut config = Config::default();
    config.shortcut_limit = 2;
    let mut b = LexiconBuilder::new();
    b.read_jyutping(FIXTURE_JYUTPING.as_bytes()).unwrap();
    let engine = Engine::new(
        Arc::new(b.build("fixture").unwrap()),
        Arc::new(Splitter::new()),
        config,
    );
    assert_eq!(texts(&suggest(&engine, "n")), vec!["你", "呢"]);
}

#[test]
fn closed_engine_returns_nothing() {
    let mut engine = fixture_engine();
    engine.close();
    for text in ["n", "nei", "neihou", "rnihao"] {
        assert!(suggest(&engine, text).is_empty(), "{text}");
    }
}
