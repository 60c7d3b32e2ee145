use crate::codec::{decode_gaps, decode_posting_list, encode_gaps, encode_posting_list};
use crate::error::{IndexError, Result};
use crate::{DocId, InvertedIndex, Term};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{create_dir_all, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

/// How posting lists are rendered inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotEncoding {
    /// Ascending ids as-is.
    Raw,
    /// Anchor plus gaps.
    Gaps,
    /// Var-byte count followed by var-byte gaps.
    VarByte,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodedPostings {
    Raw(Vec<DocId>),
    Gaps(Vec<u32>),
    VarByte(Vec<u8>),
}

impl EncodedPostings {
    /// `ids` must be ascending and duplicate-free.
    pub fn encode(ids: &[DocId], encoding: SnapshotEncoding) -> Result<Self> {
        Ok(match encoding {
            SnapshotEncoding::Raw => {
                encode_gaps(ids)?;
                EncodedPostings::Raw(ids.to_vec())
            }
            SnapshotEncoding::Gaps => EncodedPostings::Gaps(encode_gaps(ids)?),
            SnapshotEncoding::VarByte => EncodedPostings::VarByte(encode_posting_list(ids)?),
        })
    }

    /// Decode to ascending ids, rejecting unsorted or duplicated raw lists.
    pub fn decode(&self) -> Result<Vec<DocId>> {
        match self {
            EncodedPostings::Raw(ids) => {
                encode_gaps(ids)?;
                Ok(ids.clone())
            }
            EncodedPostings::Gaps(gaps) => decode_gaps(gaps),
            EncodedPostings::VarByte(bytes) => decode_posting_list(bytes),
        }
    }

    pub fn encoding(&self) -> SnapshotEncoding {
        match self {
            EncodedPostings::Raw(_) => SnapshotEncoding::Raw,
            EncodedPostings::Gaps(_) => SnapshotEncoding::Gaps,
            EncodedPostings::VarByte(_) => SnapshotEncoding::VarByte,
        }
    }
}

/// Point-in-time export of an index: term → encoded postings, sorted by term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub term_count: u64,
    pub encoding: SnapshotEncoding,
    pub entries: Vec<(Term, EncodedPostings)>,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Input that ends mid-structure is reported as `TruncatedData`; bytes
    /// left over after the snapshot are a `Serialization` error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        // same layout as `bincode::serialize`, minus the tolerance for trailing bytes
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| {
                if let bincode::ErrorKind::Io(io) = err.as_ref() {
                    if io.kind() == std::io::ErrorKind::UnexpectedEof {
                        return IndexError::TruncatedData { context: "snapshot" };
                    }
                }
                IndexError::Serialization(err)
            })
    }
}

impl InvertedIndex {
    pub fn to_snapshot(&self, encoding: SnapshotEncoding) -> Result<Snapshot> {
        let mut terms: Vec<&str> = self.terms().collect();
        terms.sort_unstable();
        let mut entries = Vec::with_capacity(terms.len());
        for term in terms {
            let ids = self.sorted_posting_list(term);
            entries.push((term.to_string(), EncodedPostings::encode(&ids, encoding)?));
        }
        Ok(Snapshot { version: SNAPSHOT_VERSION, term_count: entries.len() as u64, encoding, entries })
    }

    /// Decode and validate the whole snapshot before producing an index.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(IndexError::IncompatibleSnapshot {
                expected: SNAPSHOT_VERSION,
                actual: snapshot.version,
            });
        }
        if snapshot.term_count != snapshot.entries.len() as u64 {
            return Err(IndexError::invalid(format!(
                "snapshot declares {} terms but holds {}",
                snapshot.term_count,
                snapshot.entries.len()
            )));
        }
        let mut postings = HashMap::with_capacity(snapshot.entries.len());
        let mut df = HashMap::with_capacity(snapshot.entries.len());
        for (term, encoded) in &snapshot.entries {
            let ids = encoded.decode()?;
            if ids.is_empty() {
                return Err(IndexError::invalid(format!("term {term:?} has an empty posting list")));
            }
            df.insert(term.clone(), ids.len() as u32);
            let set: HashSet<DocId> = ids.into_iter().collect();
            if postings.insert(term.clone(), set).is_some() {
                return Err(IndexError::invalid(format!("duplicate term {term:?} in snapshot")));
            }
        }
        Ok(InvertedIndex { postings, df })
    }

    /// Replace this index with the snapshot's content. On error the index is untouched.
    pub fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        *self = InvertedIndex::from_snapshot(snapshot)?;
        Ok(())
    }
}

/// Serialized size of the index under each snapshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub raw_bytes: u64,
    pub gap_bytes: u64,
    pub var_byte_bytes: u64,
}

impl SizeReport {
    /// Raw size over var-byte size; 1.0 for an empty index.
    pub fn compression_ratio(&self) -> f64 {
        if self.var_byte_bytes == 0 {
            return 1.0;
        }
        self.raw_bytes as f64 / self.var_byte_bytes as f64
    }
}

pub fn measure_sizes(index: &InvertedIndex) -> Result<SizeReport> {
    let size = |encoding| -> Result<u64> {
        Ok(bincode::serialized_size(&index.to_snapshot(encoding)?)?)
    };
    Ok(SizeReport {
        raw_bytes: size(SnapshotEncoding::Raw)?,
        gap_bytes: size(SnapshotEncoding::Gaps)?,
        var_byte_bytes: size(SnapshotEncoding::VarByte)?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub term_count: usize,
    pub total_postings: usize,
    pub encoding: SnapshotEncoding,
    pub created_at: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write to a sibling `.tmp` file, then rename over `path`, so a crash
/// mid-write never leaves a partial file under the final name.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    rename(&tmp, path)?;
    Ok(())
}

pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_replacing(&paths.snapshot(), &snapshot.to_bytes()?)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let mut f = File::open(paths.snapshot())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Snapshot::from_bytes(&buf)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_replacing(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write `snapshot.bin` and `meta.json` for `index`.
pub fn save_index(
    paths: &IndexPaths,
    index: &InvertedIndex,
    encoding: SnapshotEncoding,
    created_at: String,
) -> Result<MetaFile> {
    let snapshot = index.to_snapshot(encoding)?;
    save_snapshot(paths, &snapshot)?;
    let stats = index.statistics();
    let meta = MetaFile {
        version: snapshot.version,
        term_count: stats.term_count,
        total_postings: stats.total_postings,
        encoding,
        created_at,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), terms = stats.term_count, ?encoding, "saved index");
    Ok(meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<(InvertedIndex, MetaFile)> {
    let meta = load_meta(paths)?;
    let snapshot = load_snapshot(paths)?;
    if meta.term_count as u64 != snapshot.term_count || meta.encoding != snapshot.encoding {
        return Err(IndexError::invalid(format!(
            "meta.json ({} terms, {:?}) disagrees with snapshot ({} terms, {:?})",
            meta.term_count, meta.encoding, snapshot.term_count, snapshot.encoding
        )));
    }
    let index = InvertedIndex::from_snapshot(&snapshot)?;
    tracing::info!(root = %paths.root.display(), terms = index.len(), "loaded index");
    Ok((index, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenizedDocument;

    fn sample() -> InvertedIndex {
        InvertedIndex::from_documents(&[
            TokenizedDocument::new(1, ["alpha", "beta"]),
            TokenizedDocument::new(130, ["alpha"]),
            TokenizedDocument::new(4000, ["alpha", "gamma"]),
        ])
    }

    #[test]
    fn snapshot_roundtrip_every_encoding() {
        let index = sample();
        for encoding in [SnapshotEncoding::Raw, SnapshotEncoding::Gaps, SnapshotEncoding::VarByte] {
            let snapshot = index.to_snapshot(encoding).unwrap();
            assert_eq!(snapshot.term_count, 3);
            assert!(snapshot.entries.iter().all(|(_, p)| p.encoding() == encoding));
            let bytes = snapshot.to_bytes().unwrap();
            let back = InvertedIndex::from_snapshot(&Snapshot::from_bytes(&bytes).unwrap()).unwrap();
            assert_eq!(back, index);
        }
    }

    #[test]
    fn snapshot_entries_sorted_by_term() {
        let snapshot = sample().to_snapshot(SnapshotEncoding::Gaps).unwrap();
        let terms: Vec<&str> = snapshot.entries.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "beta", "gamma"]);
        assert_eq!(snapshot.entries[0].1, EncodedPostings::Gaps(vec![1, 129, 3870]));
    }

    #[test]
    fn truncated_snapshot_bytes() {
        let bytes = sample().to_snapshot(SnapshotEncoding::VarByte).unwrap().to_bytes().unwrap();
        let err = Snapshot::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn trailing_snapshot_bytes_rejected() {
        let mut bytes = sample().to_snapshot(SnapshotEncoding::Gaps).unwrap().to_bytes().unwrap();
        bytes.extend_from_slice(&[0xde, 0xad]);
        assert!(matches!(Snapshot::from_bytes(&bytes), Err(IndexError::Serialization(_))));
    }

    #[test]
    fn failed_restore_leaves_index_untouched() {
        let mut index = sample();
        let mut snapshot = index.to_snapshot(SnapshotEncoding::VarByte).unwrap();
        snapshot.entries.push(("delta".into(), EncodedPostings::VarByte(vec![0x02, 0x05])));
        snapshot.term_count += 1;
        assert!(index.restore_from_snapshot(&snapshot).unwrap_err().is_truncation());
        assert_eq!(index, sample());
    }

    #[test]
    fn rejects_inconsistent_snapshots() {
        let mut snapshot = sample().to_snapshot(SnapshotEncoding::Raw).unwrap();
        snapshot.term_count = 7;
        assert!(matches!(InvertedIndex::from_snapshot(&snapshot), Err(IndexError::InvalidInput(_))));

        let unsorted = Snapshot {
            version: SNAPSHOT_VERSION,
            term_count: 1,
            encoding: SnapshotEncoding::Raw,
            entries: vec![("x".into(), EncodedPostings::Raw(vec![5, 2]))],
        };
        assert!(matches!(InvertedIndex::from_snapshot(&unsorted), Err(IndexError::InvalidInput(_))));

        let empty = Snapshot { entries: vec![("x".into(), EncodedPostings::Raw(vec![]))], ..unsorted.clone() };
        assert!(matches!(InvertedIndex::from_snapshot(&empty), Err(IndexError::InvalidInput(_))));

        let duplicated = Snapshot {
            term_count: 2,
            entries: vec![
                ("x".into(), EncodedPostings::Raw(vec![1])),
                ("x".into(), EncodedPostings::Raw(vec![2])),
            ],
            ..unsorted.clone()
        };
        assert!(matches!(InvertedIndex::from_snapshot(&duplicated), Err(IndexError::InvalidInput(_))));

        let future = Snapshot { version: SNAPSHOT_VERSION + 1, ..unsorted };
        assert!(matches!(
            InvertedIndex::from_snapshot(&future),
            Err(IndexError::IncompatibleSnapshot { .. })
        ));
    }

    #[test]
    fn var_byte_is_smallest() {
        let docs: Vec<TokenizedDocument> =
            (0..500).map(|id| TokenizedDocument::new(100_000 + id, ["common"])).collect();
        let report = measure_sizes(&InvertedIndex::from_documents(&docs)).unwrap();
        assert!(report.var_byte_bytes < report.gap_bytes);
        assert!(report.gap_bytes <= report.raw_bytes);
        assert!(report.compression_ratio() > 1.0);
    }
}
