//! Documents and the strategies that turn upstream data into them.
//!
//! The engine never decides which annotation layer supplies token text.
//! A caller picks one [`TokenSource`] at setup time and every document
//! of a pass goes through that same strategy.

use serde::{Deserialize, Serialize};

/// An ordered sequence of sentences, each an ordered sequence of tokens.
///
/// Documents are consumed by reference during a pass and never retained.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub sentences: Vec<Vec<String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from already split sentences
    pub fn from_sentences<S, T>(sentences: S) -> Self
    where
        S: IntoIterator,
        S::Item: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            sentences: sentences
                .into_iter()
                .map(|sentence| sentence.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Build a single-sentence document
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            sentences: vec![tokens.into_iter().map(Into::into).collect()],
        }
    }

    /// Append a sentence
    pub fn push_sentence<I, T>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.sentences.push(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// All tokens of the document, sentence by sentence
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.sentences.iter().flatten().map(String::as_str)
    }

    /// Total number of tokens
    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    /// True if the document holds no tokens at all
    pub fn is_empty(&self) -> bool {
        self.sentences.iter().all(Vec::is_empty)
    }
}

/// Strategy that supplies token text for a document of type `D`.
pub trait TokenSource<D: ?Sized> {
    /// Sentences of token strings, in document order
    fn extract_tokens(&self, doc: &D) -> Vec<Vec<String>>;
}

/// Run a token source and wrap its output in a [`Document`]
pub fn to_document<D, S>(source: &S, doc: &D) -> Document
where
    D: ?Sized,
    S: TokenSource<D>,
{
    Document {
        sentences: source.extract_tokens(doc),
    }
}

/// Run a token source over a batch of upstream documents
pub fn to_documents<'a, D, S, I>(source: &S, docs: I) -> Vec<Document>
where
    D: ?Sized + 'a,
    S: TokenSource<D>,
    I: IntoIterator<Item = &'a D>,
{
    docs.into_iter().map(|doc| to_document(source, doc)).collect()
}

/// Identity source for documents that are already tokenized
#[derive(Debug, Clone, Copy, Default)]
pub struct PreTokenized;

impl TokenSource<Document> for PreTokenized {
    fn extract_tokens(&self, doc: &Document) -> Vec<Vec<String>> {
        doc.sentences.clone()
    }
}

/// One sentence per non-empty line, tokens split on whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl TokenSource<str> for WhitespaceTokenizer {
    fn extract_tokens(&self, doc: &str) -> Vec<Vec<String>> {
        doc.lines()
            .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|sentence| !sentence.is_empty())
            .collect()
    }
}

impl TokenSource<String> for WhitespaceTokenizer {
    fn extract_tokens(&self, doc: &String) -> Vec<Vec<String>> {
        <Self as TokenSource<str>>::extract_tokens(self, doc.as_str())
    }
}

/// Lowercases every token produced by the wrapped source
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase<S>(pub S);

impl<D, S> TokenSource<D> for Lowercase<S>
where
    D: ?Sized,
    S: TokenSource<D>,
{
    fn extract_tokens(&self, doc: &D) -> Vec<Vec<String>> {
        let mut sentences = self.0.extract_tokens(doc);
        sentences
            .iter_mut()
            .flatten()
            .for_each(|token| *token = token.to_lowercase());
        sentences
    }
}
