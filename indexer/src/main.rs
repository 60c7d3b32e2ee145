use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use invertex_core::persist::{load_index, measure_sizes, save_index, IndexPaths};
use invertex_core::{
    build_sequential, InvertedIndex, ParallelIndexBuilder, RawDocument, SimpleTokenizer,
    SnapshotEncoding, Tokenizer,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and maintain an inverted index snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Raw,
    Gaps,
    VarByte,
}

impl From<Encoding> for SnapshotEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Raw => SnapshotEncoding::Raw,
            Encoding::Gaps => SnapshotEncoding::Gaps,
            Encoding::VarByte => SnapshotEncoding::VarByte,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from JSON/JSONL documents ({"id": u32, "text": "..."})
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Worker threads for tokenization; defaults to available cores
        #[arg(long, env = "INDEXER_WORKERS")]
        workers: Option<usize>,
        #[arg(long, value_enum, default_value_t = Encoding::VarByte)]
        encoding: Encoding,
        /// Tokenize on the calling thread only
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Boolean AND over already-normalized terms
    Search {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Print index statistics and the most frequent terms
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Index one document's text under the given id
    Add {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        id: u32,
        #[arg(long)]
        text: String,
    },
    /// Replace the indexed content of a document
    Update {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        id: u32,
        #[arg(long)]
        text: String,
    },
    /// Remove a document from every posting list
    Remove {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        id: u32,
    },
    /// Compare sequential and parallel builds, snapshot sizes and maintenance cost
    Bench {
        #[arg(long)]
        input: String,
        #[arg(long, env = "INDEXER_WORKERS")]
        workers: Option<usize>,
        #[arg(long, default_value_t = 3)]
        repeat: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, workers, encoding, sequential } => {
            build_index(&input, &output, workers, encoding.into(), sequential)
        }
        Commands::Search { index, terms } => search(&index, &terms),
        Commands::Stats { index, top } => stats(&index, top),
        Commands::Add { index, id, text } => mutate(&index, |idx| idx.add_document(id, &SimpleTokenizer.tokenize(&text))),
        Commands::Update { index, id, text } => mutate(&index, |idx| idx.update_document(id, &SimpleTokenizer.tokenize(&text))),
        Commands::Remove { index, id } => mutate(&index, |idx| idx.remove_document(id)),
        Commands::Bench { input, workers, repeat } => bench(&input, workers, repeat.max(1)),
    }
}

fn builder(workers: Option<usize>) -> Result<ParallelIndexBuilder> {
    Ok(match workers {
        Some(n) => ParallelIndexBuilder::new(n)?,
        None => ParallelIndexBuilder::default(),
    })
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into())
}

fn build_index(input: &str, output: &str, workers: Option<usize>, encoding: SnapshotEncoding, sequential: bool) -> Result<()> {
    let docs = read_documents(Path::new(input))?;
    tracing::info!(num_docs = docs.len(), "read documents");

    let index = if sequential {
        build_sequential(&docs, &SimpleTokenizer)
    } else {
        builder(workers)?.build(&docs, &SimpleTokenizer)?
    };

    let paths = IndexPaths::new(output);
    let meta = save_index(&paths, &index, encoding, now_rfc3339())?;
    tracing::info!(output, terms = meta.term_count, postings = meta.total_postings, "index build complete");
    Ok(())
}

fn search(index_dir: &str, terms: &[String]) -> Result<()> {
    let (index, _) = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading index from {index_dir}"))?;
    let hits = index.search_sorted(terms);
    println!("{}", serde_json::json!({ "terms": terms, "total_hits": hits.len(), "doc_ids": hits }));
    Ok(())
}

fn stats(index_dir: &str, top: usize) -> Result<()> {
    let (index, meta) = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading index from {index_dir}"))?;
    let out = serde_json::json!({
        "statistics": index.statistics(),
        "top_terms": index.top_terms(top),
        "encoding": meta.encoding,
        "created_at": meta.created_at,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Load, apply one maintenance operation, save back with the same encoding.
fn mutate(index_dir: &str, op: impl FnOnce(&mut InvertedIndex)) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let (mut index, meta) = load_index(&paths).with_context(|| format!("loading index from {index_dir}"))?;
    let start = Instant::now();
    op(&mut index);
    let elapsed = start.elapsed();
    save_index(&paths, &index, meta.encoding, now_rfc3339())?;
    tracing::info!(elapsed_us = elapsed.as_micros() as u64, terms = index.len(), "index updated");
    Ok(())
}

fn bench(input: &str, workers: Option<usize>, repeat: usize) -> Result<()> {
    let docs = read_documents(Path::new(input))?;
    let builder = builder(workers)?;

    let mut seq_best = f64::MAX;
    let mut par_best = f64::MAX;
    let mut sequential = InvertedIndex::new();
    let mut parallel = InvertedIndex::new();
    for _ in 0..repeat {
        let start = Instant::now();
        sequential = build_sequential(&docs, &SimpleTokenizer);
        seq_best = seq_best.min(start.elapsed().as_secs_f64());

        let start = Instant::now();
        parallel = builder.build(&docs, &SimpleTokenizer)?;
        par_best = par_best.min(start.elapsed().as_secs_f64());
    }
    if sequential != parallel {
        bail!("parallel build diverged from sequential build");
    }

    let sizes = measure_sizes(&sequential)?;

    let probe_id = docs.iter().map(|d| d.id).max().map_or(0, |m| m.saturating_add(1));
    let probe = SimpleTokenizer.tokenize("new technologies transform how indexes are maintained");
    let start = Instant::now();
    sequential.add_document(probe_id, &probe);
    let add_s = start.elapsed().as_secs_f64();
    let start = Instant::now();
    sequential.remove_document(probe_id);
    let remove_s = start.elapsed().as_secs_f64();

    let out = serde_json::json!({
        "num_docs": docs.len(),
        "workers": builder.workers(),
        "sequential_s": seq_best,
        "parallel_s": par_best,
        "speedup": if par_best > 0.0 { seq_best / par_best } else { 0.0 },
        "sizes": sizes,
        "compression_ratio": sizes.compression_ratio(),
        "add_document_s": add_s,
        "remove_document_s": remove_s,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn read_documents(input_path: &Path) -> Result<Vec<RawDocument>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input path {} does not exist", input_path.display());
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }
    Ok(docs)
}

fn read_jsonl(file: &Path, docs: &mut Vec<RawDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: RawDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<RawDocument>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping non-document JSON"),
    }
    Ok(())
}
