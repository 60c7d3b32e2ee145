use crate::{DocId, Term, TokenizedDocument};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Term → posting set store with cached document frequencies.
///
/// `postings` is the source of truth. `df[t]` always equals
/// `postings[t].len()` and no term maps to an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    pub(crate) postings: HashMap<Term, HashSet<DocId>>,
    pub(crate) df: HashMap<Term, u32>,
}

/// Read-only diagnostics derived from the posting sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub term_count: usize,
    pub total_postings: usize,
    pub average_posting_list_length: f64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build from scratch: any previous content is discarded.
    ///
    /// Each document contributes once per unique term, regardless of how many
    /// times the term repeats in its token list.
    pub fn build_from_documents<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = &'a TokenizedDocument>,
    {
        let start = std::time::Instant::now();
        self.postings.clear();
        self.df.clear();
        let mut num_docs = 0usize;
        for doc in documents {
            self.insert_terms(doc.id, doc.tokens.iter().map(String::as_str));
            num_docs += 1;
        }
        tracing::debug!(
            num_docs,
            num_terms = self.postings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built inverted index"
        );
    }

    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a TokenizedDocument>,
    {
        let mut index = Self::new();
        index.build_from_documents(documents);
        index
    }

    /// Add `id` to the posting set of every distinct term and refresh the
    /// cached frequency from the set size. Shared by bulk build and maintenance.
    pub(crate) fn insert_terms<'t, I>(&mut self, id: DocId, terms: I)
    where
        I: IntoIterator<Item = &'t str>,
    {
        let unique: HashSet<&str> = terms.into_iter().collect();
        for term in unique {
            let set = self.postings.entry(term.to_string()).or_default();
            set.insert(id);
            let n = set.len() as u32;
            self.df.insert(term.to_string(), n);
        }
    }

    /// Boolean AND over `query_terms`. Unknown terms and an empty query both
    /// yield the empty set.
    pub fn search<S: AsRef<str>>(&self, query_terms: &[S]) -> HashSet<DocId> {
        let mut lists = Vec::with_capacity(query_terms.len());
        for term in query_terms {
            match self.postings.get(term.as_ref()) {
                Some(set) => lists.push(set),
                None => return HashSet::new(),
            }
        }
        // smallest list first keeps the candidate set minimal
        lists.sort_by_key(|set| set.len());
        let Some((first, rest)) = lists.split_first() else {
            return HashSet::new();
        };
        first
            .iter()
            .copied()
            .filter(|id| rest.iter().all(|set| set.contains(id)))
            .collect()
    }

    /// Same as [`search`](Self::search) with the result in ascending order.
    pub fn search_sorted<S: AsRef<str>>(&self, query_terms: &[S]) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.search(query_terms).into_iter().collect();
        ids.sort_unstable();
        ids
    }

    /// Borrowed posting set, `None` for unknown terms.
    pub fn postings(&self, term: &str) -> Option<&HashSet<DocId>> {
        self.postings.get(term)
    }

    /// Owned posting set; empty for unknown terms.
    pub fn posting_list(&self, term: &str) -> HashSet<DocId> {
        self.postings.get(term).cloned().unwrap_or_default()
    }

    /// Posting set in ascending id order, the shape the codecs expect.
    pub fn sorted_posting_list(&self, term: &str) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self
            .postings
            .get(term)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.df.get(term).copied().unwrap_or(0)
    }

    pub fn contains_term(&self, term: &str) -> bool { self.postings.contains_key(term) }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn statistics(&self) -> IndexStatistics {
        let term_count = self.postings.len();
        let total_postings: usize = self.postings.values().map(HashSet::len).sum();
        let average_posting_list_length = if term_count == 0 {
            0.0
        } else {
            total_postings as f64 / term_count as f64
        };
        IndexStatistics { term_count, total_postings, average_posting_list_length }
    }

    /// The `n` most frequent terms; ties resolve by term, ascending.
    pub fn top_terms(&self, n: usize) -> Vec<(Term, u32)> {
        let mut terms: Vec<(Term, u32)> =
            self.df.iter().map(|(t, &df)| (t.clone(), df)).collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(n);
        terms
    }

    /// Union `other` into this index, recomputing frequencies of every touched term.
    pub fn merge(&mut self, other: &InvertedIndex) {
        for (term, ids) in &other.postings {
            let set = self.postings.entry(term.clone()).or_default();
            set.extend(ids.iter().copied());
            let n = set.len() as u32;
            self.df.insert(term.clone(), n);
        }
    }

    /// Verify the frequency cache and the no-empty-list rule.
    pub fn check_invariants(&self) -> bool {
        self.postings.len() == self.df.len()
            && self.postings.iter().all(|(term, ids)| {
                !ids.is_empty() && self.df.get(term).copied() == Some(ids.len() as u32)
            })
    }
}
