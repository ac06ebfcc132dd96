//! Noun lemmatizer modeled on WordNet's morphological rules.
//!
//! Without a lexicon to confirm candidates, regular plurals are detected by
//! suffix and irregular or uninflected forms come from fixed tables.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static IRREGULAR_PLURALS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("data", "datum"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("analyses", "analysis"),
        ("diagnoses", "diagnosis"),
        ("hypotheses", "hypothesis"),
        ("prognoses", "prognosis"),
        ("syntheses", "synthesis"),
        ("theses", "thesis"),
        ("crises", "crisis"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("vertices", "vertex"),
        ("appendices", "appendix"),
        ("media", "medium"),
        ("bacteria", "bacterium"),
        ("curricula", "curriculum"),
        ("stimuli", "stimulus"),
        ("nuclei", "nucleus"),
        ("fungi", "fungus"),
        ("radii", "radius"),
        ("foci", "focus"),
        ("loci", "locus"),
        ("alumni", "alumnus"),
        ("larvae", "larva"),
        ("formulae", "formula"),
        ("lives", "life"),
        ("wives", "wife"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("halves", "half"),
        ("selves", "self"),
        ("wolves", "wolf"),
    ])
});

static UNINFLECTED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "diabetes",
        "series",
        "species",
        "news",
        "physics",
        "mathematics",
        "economics",
        "genetics",
        "ethics",
        "politics",
        "robotics",
        "informatics",
        "bioinformatics",
        "linguistics",
        "logistics",
        "aids",
        "herpes",
        "rabies",
        "measles",
        "mumps",
        "lens",
        "bias",
        "alias",
        "atlas",
        "canvas",
        "pancreas",
        "chaos",
        "cosmos",
        "ethos",
        "pathos",
    ])
});

/// Suffixes stripped down to their stem plus replacement, checked in order.
const PLURAL_RULES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("xes", "x"),
    ("ies", "y"),
    ("s", ""),
];

/// Returns the noun base form of a lowercase word.
#[must_use]
pub fn lemmatize(word: &str) -> String {
    if let Some(lemma) = IRREGULAR_PLURALS.get(word) {
        return (*lemma).to_string();
    }
    if word.len() <= 3 || UNINFLECTED.contains(word) {
        return word.to_string();
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }

    for (suffix, replacement) in PLURAL_RULES {
        if let Some(stem) = word.strip_suffix(suffix) {
            if *suffix == "ies" && stem.len() < 2 {
                continue;
            }
            return format!("{stem}{replacement}");
        }
    }
    word.to_string()
}
