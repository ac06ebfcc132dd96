//! English contraction expansion, applied one whitespace-separated word at a time.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Contractions whose expansion is not a plain suffix rewrite.
static IRREGULAR: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("won't", "will not"),
        ("can't", "cannot"),
        ("shan't", "shall not"),
        ("ain't", "are not"),
        ("y'all", "you all"),
        ("let's", "let us"),
        ("ma'am", "madam"),
        ("o'clock", "of the clock"),
        ("'cause", "because"),
        ("it's", "it is"),
        ("he's", "he is"),
        ("she's", "she is"),
        ("that's", "that is"),
        ("there's", "there is"),
        ("here's", "here is"),
        ("what's", "what is"),
        ("where's", "where is"),
        ("who's", "who is"),
        ("how's", "how is"),
        ("i'm", "i am"),
    ])
});

/// Suffix rewrites, checked in order; the stem before the suffix must be non-empty.
const SUFFIXES: &[(&str, &str)] = &[
    ("n't", " not"),
    ("'re", " are"),
    ("'ll", " will"),
    ("'ve", " have"),
    ("'m", " am"),
    ("'d", " would"),
];

/// Expands contractions in every whitespace-separated word of `text`.
///
/// Words are rejoined with single spaces. Leading and trailing punctuation
/// around a word is kept in place; curly apostrophes count as apostrophes.
#[must_use]
pub fn expand_contractions(text: &str) -> String {
    text.split_whitespace()
        .map(expand_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_word(word: &str) -> String {
    let word = word.replace(['\u{2019}', '\u{2018}'], "'");
    let is_core = |c: char| c.is_alphanumeric() || c == '\'';

    let Some(start) = word.find(is_core) else {
        return word;
    };
    let end = word
        .rfind(is_core)
        .map_or(word.len(), |index| index + word[index..].chars().next().map_or(1, char::len_utf8));

    let (lead, rest) = word.split_at(start);
    let (core, trail) = rest.split_at(end - start);

    let expanded = expand_core(core);
    format!("{lead}{expanded}{trail}")
}

fn expand_core(core: &str) -> String {
    if let Some(expansion) = IRREGULAR.get(core) {
        return (*expansion).to_string();
    }
    for (suffix, replacement) in SUFFIXES {
        if let Some(stem) = core.strip_suffix(suffix)
            && !stem.is_empty()
            && !stem.ends_with('\'')
        {
            return format!("{stem}{replacement}");
        }
    }
    core.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_negations() {
        assert_eq!(expand_contractions("aren't"), "are not");
        assert_eq!(expand_contractions("don't know"), "do not know");
        assert_eq!(expand_contractions("won't can't"), "will not cannot");
    }

    #[test]
    fn test_expands_common_suffixes() {
        assert_eq!(expand_contractions("they're"), "they are");
        assert_eq!(expand_contractions("we'll"), "we will");
        assert_eq!(expand_contractions("you've"), "you have");
        assert_eq!(expand_contractions("i'm"), "i am");
        assert_eq!(expand_contractions("she'd"), "she would");
        assert_eq!(expand_contractions("it's"), "it is");
    }

    #[test]
    fn test_keeps_surrounding_punctuation() {
        assert_eq!(expand_contractions("(isn't)."), "(is not).");
        assert_eq!(expand_contractions("\"we're,"), "\"we are,");
    }

    #[test]
    fn test_curly_apostrophe_is_treated_as_straight() {
        assert_eq!(expand_contractions("doesn\u{2019}t"), "does not");
    }

    #[test]
    fn test_possessive_and_plain_words_unchanged() {
        assert_eq!(expand_contractions("the model's output"), "the model's output");
        assert_eq!(expand_contractions("simple."), "simple.");
        assert_eq!(expand_contractions("..."), "...");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(expand_contractions("  a \n b\t"), "a b");
    }
}
