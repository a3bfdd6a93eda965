use corpus_stats::{
    aggregate_parallel, read_counts_file, to_document, to_documents, DocumentFrequencyBuilder, EngineConfig,
    Lowercase, ModelCache, StatsResult, TfidfScorer, WhitespaceTokenizer,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"{
    "ngram": { "min_len": 1, "max_len": 3 },
    "scoring": { "tf_mode": "NORMAL", "idf_mode": "LOG" }
}"#;

fn main() -> StatsResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let workdir = std::env::temp_dir().join("corpus-stats-demo");
    let mut config = EngineConfig::from_json_str(CONFIG)?;
    config.ngram.output_dir = workdir.join("ngrams");
    let model_path = workdir.join("df.cbor");
    config.scoring.model_path = Some(model_path.clone());

    // tokenize the corpus once, with one fixed strategy
    let source = Lowercase(WhitespaceTokenizer);
    let texts = [
        "Rust is fast\nRust is safe",
        "The borrow checker keeps Rust safe",
        "Fast code and safe code",
    ];
    let corpus = to_documents(&source, texts);

    // training pass: n-gram tables
    let report = aggregate_parallel(config.ngram.clone(), &corpus, 2)?;
    for length in &report.lengths {
        println!(
            "{}-grams: {} distinct, {} total -> {}",
            length.len,
            length.distinct,
            length.total,
            length.path.display()
        );
    }
    if let Some(bigrams) = report.length(2) {
        let counts = read_counts_file(&bigrams.path)?;
        println!("first bigrams: {:?}", &counts[..counts.len().min(5)]);
    }

    // training pass: document frequencies
    let mut builder = DocumentFrequencyBuilder::new();
    builder.begin_training()?;
    for document in &corpus {
        builder.add_document(document)?;
    }
    builder.freeze()?.save(&model_path)?;

    // scoring pass: load the frozen model through a caller-owned cache
    let mut cache = ModelCache::new();
    let scorer = TfidfScorer::from_config(&config.scoring, &mut cache)?;
    let query = to_document(&source, "rust code is safe and rust is fast");
    for weight in scorer.score_sorted(&query) {
        println!("{weight}");
    }
    Ok(())
}
