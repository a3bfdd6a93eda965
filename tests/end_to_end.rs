use std::sync::Arc;

use corpus_stats::{
    aggregate_parallel, read_counts_file, to_documents, Document, DocumentFrequencyBuilder,
    DocumentFrequencyModel, EngineConfig, IdfMode, Lowercase, ModelCache, NGramConfig,
    NGramCorpusAggregator, StatsError, TfMode, TfidfScorer, UnseenTermPolicy, WhitespaceTokenizer,
};

const EPSILON: f64 = 1e-6;

fn doc1() -> Document {
    Document::from_tokens(["example", "sentence", "funny"])
}

fn doc2() -> Document {
    Document::from_tokens(["example", "example", "sentence"])
}

fn train(documents: &[Document]) -> DocumentFrequencyModel {
    let mut builder = DocumentFrequencyBuilder::new();
    builder.begin_training().unwrap();
    for document in documents {
        builder.add_document(document).unwrap();
    }
    builder.freeze().unwrap()
}

fn weights(scorer: &TfidfScorer, document: &Document) -> Vec<(String, f64)> {
    scorer
        .score(document)
        .into_iter()
        .map(|w| (w.term, w.weight))
        .collect()
}

fn assert_weights(actual: &[(String, f64)], expected: &[(&str, f64)]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for ((term, weight), (want_term, want_weight)) in actual.iter().zip(expected) {
        assert_eq!(term, want_term);
        assert!(
            (weight - want_weight).abs() < EPSILON,
            "{term}: {weight} != {want_weight}"
        );
    }
}

#[test]
fn train_save_load_score() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("df.cbor");
    train(&[doc1(), doc2()]).save(&path).unwrap();

    let model = Arc::new(DocumentFrequencyModel::load(&path).unwrap());
    assert_eq!(model.document_count(), 2);
    assert_eq!(model.document_frequency("example"), 2);
    assert_eq!(model.document_frequency("sentence"), 2);
    assert_eq!(model.document_frequency("funny"), 1);

    let constant = TfidfScorer::new(Arc::clone(&model), TfMode::Normal, IdfMode::ConstantOne);
    assert_weights(
        &weights(&constant, &doc1()),
        &[("example", 1.0), ("sentence", 1.0), ("funny", 1.0)],
    );

    let binary = TfidfScorer::new(Arc::clone(&model), TfMode::Binary, IdfMode::Binary);
    assert_weights(&weights(&binary, &doc2()), &[("example", 1.0), ("sentence", 1.0)]);

    let log = TfidfScorer::new(model, TfMode::Normal, IdfMode::Log);
    assert_weights(
        &weights(&log, &doc1()),
        &[("example", 0.0), ("sentence", 0.0), ("funny", 2f64.ln())],
    );
}

#[test]
fn config_driven_scoring_goes_through_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("df.cbor");
    train(&[doc1(), doc2()]).save(&path).unwrap();

    let json = format!(
        r#"{{ "scoring": {{ "tf_mode": "NORMAL", "idf_mode": "LOG", "model_path": {:?} }} }}"#,
        path.to_str().unwrap()
    );
    let config = EngineConfig::from_json_str(&json).unwrap();

    let mut cache = ModelCache::new();
    let first = TfidfScorer::from_config(&config.scoring, &mut cache).unwrap();
    let second = TfidfScorer::from_config(&config.scoring, &mut cache).unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(first.model(), second.model());

    // "unseen" is dropped under the default policy
    let query = Document::from_tokens(["funny", "unseen", "funny"]);
    assert_weights(&weights(&first, &query), &[("funny", 2.0 * 2f64.ln())]);
}

#[test]
fn missing_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = TfidfScorer::from_path(&dir.path().join("absent.cbor"), TfMode::Normal, IdfMode::Log)
        .unwrap_err();
    assert!(matches!(err, StatsError::ModelNotFound(_)));
}

#[test]
fn smoothing_scores_every_term() {
    let model = Arc::new(train(&[doc1(), doc2()]));
    let scorer = TfidfScorer::new(model, TfMode::Normal, IdfMode::Log)
        .with_unseen_policy(UnseenTermPolicy::AddOneSmoothing);
    let query = Document::from_tokens(["funny", "unseen"]);
    assert_weights(
        &weights(&scorer, &query),
        &[("funny", (3.0f64 / 2.0).ln()), ("unseen", 3f64.ln())],
    );
}

#[test]
fn ngram_pass_over_two_identical_documents() {
    let dir = tempfile::tempdir().unwrap();
    let config = NGramConfig::new(1, 2, dir.path());
    let mut aggregator = NGramCorpusAggregator::new(config).unwrap();
    aggregator.begin_corpus(1, 2).unwrap();
    let document = Document::from_tokens(["a", "b"]);
    aggregator.add_document(&document).unwrap();
    aggregator.add_document(&document).unwrap();
    let report = aggregator.end_corpus().unwrap();

    assert_eq!(report.documents, 2);
    let unigrams = read_counts_file(&report.length(1).unwrap().path).unwrap();
    assert_eq!(
        unigrams,
        vec![
            ("</s>".to_string(), 2),
            ("<s>".to_string(), 2),
            ("a".to_string(), 2),
            ("b".to_string(), 2),
        ]
    );
    let bigrams = read_counts_file(&report.length(2).unwrap().path).unwrap();
    assert_eq!(
        bigrams,
        vec![
            ("<s> a".to_string(), 2),
            ("a b".to_string(), 2),
            ("b </s>".to_string(), 2),
        ]
    );
}

#[test]
fn parallel_training_matches_sequential() {
    let texts = [
        "The cat sat\non the mat",
        "the dog sat",
        "A cat and a dog",
        "mat mat mat",
        "",
        "on the other hand",
    ];
    let corpus = to_documents(&Lowercase(WhitespaceTokenizer), texts);

    let sequential = train(&corpus);
    for workers in [1, 2, 4, 8] {
        let parallel = DocumentFrequencyBuilder::train_parallel(&corpus, workers);
        assert_eq!(parallel, sequential, "workers = {workers}");
    }
    assert_eq!(sequential.document_count(), texts.len() as u64);
    for (term, df) in sequential.terms() {
        assert!(df <= sequential.document_count(), "{term}");
    }

    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let seq = aggregate_parallel(NGramConfig::new(1, 3, seq_dir.path()), &corpus, 1).unwrap();
    let par = aggregate_parallel(NGramConfig::new(1, 3, par_dir.path()), &corpus, 3).unwrap();
    for len in 1..=3 {
        let a = std::fs::read(&seq.length(len).unwrap().path).unwrap();
        let b = std::fs::read(&par.length(len).unwrap().path).unwrap();
        assert_eq!(a, b, "length {len}");
    }
}
