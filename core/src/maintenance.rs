//! Single-document mutation of a live index.
//!
//! Adding costs O(unique terms of the document). Removing scans every term in
//! the index, since there is no reverse `DocId → terms` map.

use crate::{DocId, InvertedIndex};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashSet;
use std::sync::Arc;

impl InvertedIndex {
    /// Index `id` under each distinct token. Re-adding the same pair is a no-op.
    pub fn add_document<S: AsRef<str>>(&mut self, id: DocId, tokens: &[S]) {
        self.insert_terms(id, tokens.iter().map(|t| t.as_ref()));
        tracing::debug!(doc_id = id, num_terms = self.postings.len(), "added document");
    }

    /// Drop `id` from every posting set, deleting terms left without documents.
    /// Unknown ids remove nothing.
    pub fn remove_document(&mut self, id: DocId) {
        let df = &mut self.df;
        let mut touched = 0usize;
        self.postings.retain(|term, ids| {
            if !ids.remove(&id) {
                return true;
            }
            touched += 1;
            if ids.is_empty() {
                df.remove(term);
                false
            } else {
                df.insert(term.clone(), ids.len() as u32);
                true
            }
        });
        tracing::debug!(doc_id = id, touched, "removed document");
    }

    /// Replace the content of `id`: remove, then add.
    pub fn update_document<S: AsRef<str>>(&mut self, id: DocId, new_tokens: &[S]) {
        self.remove_document(id);
        self.add_document(id, new_tokens);
    }

    /// Terms whose posting set currently contains `id`. Full scan.
    pub fn document_terms(&self, id: DocId) -> HashSet<&str> {
        self.postings
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(term, _)| term.as_str())
            .collect()
    }
}

/// An index behind a read-write lock for callers that share it across threads.
///
/// Each method holds the lock for exactly one operation, so `update_document`
/// is atomic with respect to readers going through the same handle.
#[derive(Clone, Default)]
pub struct SharedIndex {
    inner: Arc<RwLock<InvertedIndex>>,
}

impl SharedIndex {
    pub fn new(index: InvertedIndex) -> Self {
        Self { inner: Arc::new(RwLock::new(index)) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, InvertedIndex> { self.inner.read() }

    pub fn write(&self) -> RwLockWriteGuard<'_, InvertedIndex> { self.inner.write() }

    pub fn search<S: AsRef<str>>(&self, query_terms: &[S]) -> HashSet<DocId> {
        self.inner.read().search(query_terms)
    }

    pub fn add_document<S: AsRef<str>>(&self, id: DocId, tokens: &[S]) {
        self.inner.write().add_document(id, tokens);
    }

    pub fn remove_document(&self, id: DocId) {
        self.inner.write().remove_document(id);
    }

    pub fn update_document<S: AsRef<str>>(&self, id: DocId, new_tokens: &[S]) {
        self.inner.write().update_document(id, new_tokens);
    }

    /// Swap in a fully built index, e.g. after a snapshot import.
    pub fn replace(&self, index: InvertedIndex) -> InvertedIndex {
        std::mem::replace(&mut *self.inner.write(), index)
    }
}
