//! Batch-parallel index construction.
//!
//! Documents are split into `workers` contiguous batches. Each batch is
//! tokenized and deduplicated on a rayon pool with no shared state; the
//! coordinator then merges all batches into one index sequentially.
//!
//! Dispatch overhead dominates on small collections: on a few dozen short
//! documents the sequential path is faster. The `build_bench` criterion bench
//! measures the crossover for a given machine.

use crate::error::{IndexError, Result};
use crate::{InvertedIndex, RawDocument, TokenizedDocument, Tokenizer};
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct ParallelIndexBuilder {
    workers: usize,
}

impl Default for ParallelIndexBuilder {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { workers }
    }
}

impl ParallelIndexBuilder {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(IndexError::invalid("worker count must be at least 1"));
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize { self.workers }

    /// `ceil(len / workers)`, never zero.
    pub fn batch_size(&self, len: usize) -> usize {
        len.div_ceil(self.workers).max(1)
    }

    /// Tokenize every document on the worker pool. Output keeps input order;
    /// each document's terms are unique, in first-occurrence order.
    pub fn tokenize_batches<T: Tokenizer + ?Sized>(
        &self,
        documents: &[RawDocument],
        tokenizer: &T,
    ) -> Result<Vec<TokenizedDocument>> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.workers).build()?;
        let batch_size = self.batch_size(documents.len());
        let batches: Vec<Vec<TokenizedDocument>> = pool.install(|| {
            documents
                .par_chunks(batch_size)
                .enumerate()
                .map(|(batch, chunk)| {
                    tracing::debug!(batch, docs = chunk.len(), "tokenizing batch");
                    chunk.iter().map(|doc| tokenize_unique(doc, tokenizer)).collect::<Vec<_>>()
                })
                .collect()
        });
        Ok(batches.into_iter().flatten().collect())
    }

    /// Parallel tokenize, then a single sequential merge into a fresh index.
    pub fn build<T: Tokenizer + ?Sized>(
        &self,
        documents: &[RawDocument],
        tokenizer: &T,
    ) -> Result<InvertedIndex> {
        let start = Instant::now();
        let tokenized = self.tokenize_batches(documents, tokenizer)?;
        let index = InvertedIndex::from_documents(&tokenized);
        tracing::info!(
            workers = self.workers,
            num_docs = documents.len(),
            num_terms = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "parallel build complete"
        );
        Ok(index)
    }
}

/// Reference path: tokenize and index on the calling thread.
pub fn build_sequential<T: Tokenizer + ?Sized>(
    documents: &[RawDocument],
    tokenizer: &T,
) -> InvertedIndex {
    let start = Instant::now();
    let tokenized: Vec<TokenizedDocument> =
        documents.iter().map(|doc| tokenize_unique(doc, tokenizer)).collect();
    let index = InvertedIndex::from_documents(&tokenized);
    tracing::info!(
        num_docs = documents.len(),
        num_terms = index.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sequential build complete"
    );
    index
}

fn tokenize_unique<T: Tokenizer + ?Sized>(doc: &RawDocument, tokenizer: &T) -> TokenizedDocument {
    let mut seen = HashSet::new();
    let tokens = tokenizer
        .tokenize(&doc.text)
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect();
    TokenizedDocument { id: doc.id, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleTokenizer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Metadata};

    /// Counts INFO events emitted on the thread it is installed on.
    struct InfoCounter(Arc<AtomicUsize>);

    impl tracing::Subscriber for InfoCounter {
        fn enabled(&self, _: &Metadata<'_>) -> bool { true }
        fn new_span(&self, _: &Attributes<'_>) -> Id { Id::from_u64(1) }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, event: &Event<'_>) {
            if *event.metadata().level() == Level::INFO {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    fn info_events_during(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        tracing::subscriber::with_default(InfoCounter(count.clone()), f);
        count.load(Ordering::SeqCst)
    }

    fn corpus() -> Vec<RawDocument> {
        vec![
            RawDocument::new(0, "Inverted indexes map terms to documents"),
            RawDocument::new(1, "Gap encoding shrinks sorted posting lists"),
            RawDocument::new(2, "Variable byte encoding uses seven bit groups"),
            RawDocument::new(3, "Workers tokenize batches in parallel"),
            RawDocument::new(4, "The merge step builds one inverted index"),
        ]
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(ParallelIndexBuilder::new(0), Err(IndexError::InvalidInput(_))));
    }

    #[test]
    fn batch_size_rounds_up() {
        let builder = ParallelIndexBuilder::new(4).unwrap();
        assert_eq!(builder.batch_size(10), 3);
        assert_eq!(builder.batch_size(8), 2);
        assert_eq!(builder.batch_size(0), 1);
        assert_eq!(ParallelIndexBuilder::new(3).unwrap().batch_size(2), 1);
    }

    #[test]
    fn matches_sequential_for_any_worker_count() {
        let docs = corpus();
        let expected = build_sequential(&docs, &SimpleTokenizer);
        for workers in 1..=8 {
            let builder = ParallelIndexBuilder::new(workers).unwrap();
            let index = builder.build(&docs, &SimpleTokenizer).unwrap();
            assert_eq!(index, expected, "workers = {workers}");
        }
        assert_eq!(expected.sorted_posting_list("inverted"), vec![0, 4]);
        assert_eq!(expected.sorted_posting_list("encoding"), vec![1, 2]);
    }

    #[test]
    fn tokenize_batches_preserves_order_and_dedups() {
        let docs = vec![RawDocument::new(7, "a b a"), RawDocument::new(3, "c")];
        let builder = ParallelIndexBuilder::new(2).unwrap();
        let out = builder.tokenize_batches(&docs, &SimpleTokenizer).unwrap();
        assert_eq!(out, vec![TokenizedDocument::new(7, ["a", "b"]), TokenizedDocument::new(3, ["c"])]);
    }

    #[test]
    fn one_info_line_per_build() {
        let docs = corpus();
        let builder = ParallelIndexBuilder::new(2).unwrap();
        assert_eq!(info_events_during(|| { builder.build(&docs, &SimpleTokenizer).unwrap(); }), 1);
        assert_eq!(info_events_during(|| { build_sequential(&docs, &SimpleTokenizer); }), 1);
    }

    #[test]
    fn empty_collection() {
        let builder = ParallelIndexBuilder::default();
        assert!(builder.build(&[], &SimpleTokenizer).unwrap().is_empty());
    }
}
