use crate::{DocId, Term};
use serde::{Deserialize, Serialize};

/// A document before tokenization, as handed over by the collection owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocId,
    pub text: String,
}

impl RawDocument {
    pub fn new(id: DocId, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// A document as the index sees it: an id and its term sequence.
/// Tokens may repeat; the index counts each term once per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedDocument {
    pub id: DocId,
    pub tokens: Vec<Term>,
}

impl TokenizedDocument {
    pub fn new<I, S>(id: DocId, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Term>,
    {
        Self { id, tokens: tokens.into_iter().map(Into::into).collect() }
    }
}
