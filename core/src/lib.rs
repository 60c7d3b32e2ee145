//! Inverted-index engine: posting codecs, the term→postings store, incremental
//! maintenance, and a batch-parallel builder.
//!
//! The engine consumes already-tokenized documents. Tokenization is behind the
//! [`Tokenizer`] trait so callers can plug their own normalization in.

pub mod codec;
pub mod document;
pub mod error;
pub mod index;
pub mod maintenance;
pub mod parallel;
pub mod persist;
pub mod tokenizer;

pub use document::{RawDocument, TokenizedDocument};
pub use error::{IndexError, Result};
pub use index::{IndexStatistics, InvertedIndex};
pub use maintenance::SharedIndex;
pub use parallel::{build_sequential, ParallelIndexBuilder};
pub use persist::{EncodedPostings, Snapshot, SnapshotEncoding};
pub use tokenizer::{SimpleTokenizer, Tokenizer};

/// Document identifier assigned by the collection owner.
pub type DocId = u32;

/// A normalized token used as an index key.
pub type Term = String;
