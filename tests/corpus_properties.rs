//! Property checks for vocabulary pruning and corpus encoding.
//!
//! Collections are generated from a seeded RNG so failures are reproducible.

use std::collections::{HashMap, HashSet};

use litopics_core::corpus::{load_corpus, load_vocabulary, save_corpus, save_vocabulary};
use litopics_core::{CorpusBuilder, DirectoryPolicy, PruneThresholds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const WORDS: [&str; 24] = [
    "model", "data", "network", "learning", "patient", "clinical", "image", "gene", "protein",
    "cell", "robot", "control", "system", "signal", "brain", "neural", "risk", "drug", "trial",
    "text", "speech", "vision", "graph", "agent",
];

/// Documents with a skewed word distribution so some terms are common and some rare.
fn random_collection(seed: u64, documents: usize) -> Vec<Vec<String>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..documents)
        .map(|_| {
            let length = rng.gen_range(0..20);
            (0..length)
                .map(|_| {
                    let a = rng.gen_range(0..WORDS.len());
                    let b = rng.gen_range(0..WORDS.len());
                    WORDS[a.min(b)].to_string()
                })
                .collect()
        })
        .collect()
}

fn document_frequencies(documents: &[Vec<String>]) -> HashMap<&str, usize> {
    let mut dfs = HashMap::new();
    for document in documents {
        let unique: HashSet<&str> = document.iter().map(String::as_str).collect();
        for term in unique {
            *dfs.entry(term).or_insert(0) += 1;
        }
    }
    dfs
}

#[test]
fn test_pruning_bounds_hold_for_retained_and_excluded_terms() {
    for seed in 0..20 {
        let documents = random_collection(seed, 60);
        let min_df = usize::try_from(seed % 5).unwrap() + 1;
        let fraction = 0.3 + (seed as f64) * 0.03;
        let thresholds = PruneThresholds::new(min_df, fraction);
        let built = CorpusBuilder::new(thresholds).build(&documents).unwrap();

        let max_df = thresholds.max_df(documents.len());
        let dfs = document_frequencies(&documents);
        for (term, &df) in &dfs {
            let retained = built.vocabulary.id(term).is_some();
            let within = df >= min_df && df <= max_df;
            assert_eq!(
                retained, within,
                "seed {seed}: term {term} with df {df} (bounds {min_df}..={max_df})"
            );
        }
        assert_eq!(built.vocabulary.len(), built.report.terms_retained);
    }
}

#[test]
fn test_document_counts_sum_to_retained_tokens() {
    let documents = random_collection(7, 80);
    let built = CorpusBuilder::new(PruneThresholds::new(3, 0.6))
        .build(&documents)
        .unwrap();

    assert_eq!(built.corpus.len(), documents.len());
    for (document, encoded) in documents.iter().zip(built.corpus.iter()) {
        let retained_tokens = document
            .iter()
            .filter(|token| built.vocabulary.id(token).is_some())
            .count();
        assert_eq!(encoded.total(), u64::try_from(retained_tokens).unwrap());
        for (id, count) in encoded.iter() {
            assert!(count > 0);
            let term = built.vocabulary.term(id).unwrap();
            let occurrences = document.iter().filter(|token| *token == term).count();
            assert_eq!(count as usize, occurrences);
        }
    }
}

#[test]
fn test_identical_input_gives_identical_mapping() {
    let documents = random_collection(42, 50);
    let builder = CorpusBuilder::new(PruneThresholds::new(2, 0.9));
    let first = builder.build(&documents).unwrap();
    let second = builder.build(&documents).unwrap();

    assert_eq!(first.vocabulary, second.vocabulary);
    assert_eq!(first.vocabulary.terms(), second.vocabulary.terms());
    assert_eq!(first.corpus, second.corpus);
}

#[test]
fn test_all_singleton_terms_prune_to_empty_corpus() {
    let documents = vec![
        vec!["alpha".to_string(), "beta".to_string()],
        vec!["gamma".to_string()],
        vec!["delta".to_string(), "epsilon".to_string()],
    ];
    let built = CorpusBuilder::new(PruneThresholds::new(2, 1.0))
        .build(&documents)
        .unwrap();

    assert!(built.vocabulary.is_empty());
    assert!(built.report.is_degenerate());
    assert_eq!(built.corpus.len(), 3);
    assert!(built.corpus.iter().all(|document| document.is_empty()));
}

#[test]
fn test_cat_dog_bird_ids_and_counts() {
    let documents = vec![
        vec!["cat", "dog", "cat"],
        vec!["dog", "bird"],
        vec!["cat", "bird", "dog"],
    ];
    let built = CorpusBuilder::new(PruneThresholds::new(2, 1.0))
        .build(&documents)
        .unwrap();

    assert_eq!(built.vocabulary.len(), 3);
    assert_eq!(built.vocabulary.id("cat"), Some(0));
    assert_eq!(built.vocabulary.id("dog"), Some(1));
    assert_eq!(built.vocabulary.id("bird"), Some(2));
    let encoded: Vec<Vec<(u32, u32)>> = built
        .corpus
        .iter()
        .map(|document| document.iter().collect())
        .collect();
    assert_eq!(
        encoded,
        vec![
            vec![(0, 2), (1, 1)],
            vec![(1, 1), (2, 1)],
            vec![(0, 1), (1, 1), (2, 1)],
        ]
    );
}

#[test]
fn test_built_corpus_survives_persistence() {
    let documents = random_collection(3, 40);
    let built = CorpusBuilder::new(PruneThresholds::new(2, 0.8))
        .build(&documents)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let dictionary = dir.path().join("model").join("dictionary.json");
    let corpus = dir.path().join("model").join("corpus.mm");
    save_vocabulary(&built.vocabulary, &dictionary, DirectoryPolicy::Create).unwrap();
    save_corpus(
        &built.corpus,
        built.vocabulary.len(),
        &corpus,
        DirectoryPolicy::Create,
    )
    .unwrap();

    assert_eq!(load_vocabulary(&dictionary).unwrap(), built.vocabulary);
    let (loaded, num_terms) = load_corpus(&corpus).unwrap();
    assert_eq!(num_terms, built.vocabulary.len());
    assert_eq!(loaded, built.corpus);
}

#[test]
fn test_require_existing_refuses_missing_directory() {
    let documents = vec![vec!["cat", "dog"], vec!["cat"]];
    let built = CorpusBuilder::new(PruneThresholds::new(1, 1.0))
        .build(&documents)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let dictionary = dir.path().join("missing").join("dictionary.json");
    let result = save_vocabulary(&built.vocabulary, &dictionary, DirectoryPolicy::RequireExisting);
    assert!(result.is_err());
    assert!(!dictionary.exists());
}
