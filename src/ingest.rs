//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for a directory of advisory PDFs: scan →
//! text extraction → content-hash document id → IOC extraction →
//! chunking → per-chunk embedding and store insert → processed-file
//! rename. Documents are processed strictly sequentially; the first
//! failure aborts the remaining files. Re-running is safe: processed
//! files are renamed out of the scan, and an unchanged file that is
//! re-ingested hashes to the same document id.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::extract;
use crate::ioc::{self, IndicatorSet};
use crate::models::{RawDocument, StoredRecord};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{VectorStore, WeaviateStore};

/// Marker appended to a file's stem once it has been ingested, so the
/// next scan skips it.
const PROCESSED_MARKER: &str = "_processed";

pub async fn run_ingest(
    config: &Config,
    dry_run: bool,
    limit: Option<usize>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let mut files = scan_advisories(config)?;

    if let Some(lim) = limit {
        files.truncate(lim);
    }

    if dry_run {
        println!("ingest (dry-run)");
        println!("  files found: {}", files.len());
        let mut total_chunks = 0usize;
        for path in &files {
            let text = extract::extract_text(path)?;
            total_chunks += chunk_text(&text, config.chunking.max_words).len();
        }
        println!("  estimated chunks: {}", total_chunks);
        return Ok(());
    }

    let store = WeaviateStore::connect(&config.store).await?;
    store.ensure_collection().await?;
    let embedder = OllamaEmbedder::new(&config.embedding)?;

    let mut docs_ingested = 0u64;
    let mut chunks_written = 0u64;
    let total = files.len() as u64;

    for path in &files {
        let doc_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        reporter.report(ProgressEvent::StageStarted {
            stage: "extract",
            detail: doc_name.clone(),
        });
        let text = match extract::extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                reporter.report(ProgressEvent::StageFailed {
                    stage: "extract",
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let (doc, indicators, chunks) = process_document(&doc_name, text, config.chunking.max_words);
        reporter.report(ProgressEvent::StageCompleted {
            stage: "extract",
            detail: format!(
                "{}: {} chunks, {} indicators",
                doc.doc_id,
                chunks.len(),
                indicators.flattened().len()
            ),
        });

        let written = ingest_document(&store, &embedder, &doc, &indicators, &chunks).await?;
        chunks_written += written;

        mark_processed(path)?;
        docs_ingested += 1;
        reporter.report(ProgressEvent::Ingesting {
            n: docs_ingested,
            total,
        });
    }

    println!("ingest");
    println!("  files processed: {}", docs_ingested);
    println!("  chunks written: {}", chunks_written);
    println!("ok");
    Ok(())
}

/// The pure part of ingestion: hash the extracted text into the document
/// id, extract the document-level indicator set once over the full text,
/// and chunk. No I/O.
pub fn process_document(
    doc_name: &str,
    text: String,
    max_words: usize,
) -> (RawDocument, IndicatorSet, Vec<String>) {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let doc_id = format!("{:x}", hasher.finalize());

    let indicators = ioc::extract(&text);
    let chunks = chunk_text(&text, max_words);

    let doc = RawDocument {
        doc_id,
        doc_name: doc_name.to_string(),
        text,
    };
    (doc, indicators, chunks)
}

/// Embed and insert every chunk of one document, each record carrying
/// the document-level indicator set. Sequential; the first failed embed
/// or insert propagates immediately.
pub async fn ingest_document(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    doc: &RawDocument,
    indicators: &IndicatorSet,
    chunks: &[String],
) -> Result<u64> {
    let mut written = 0u64;
    for chunk in chunks {
        let vector = embedder.embed_text(chunk).await?;
        let record = StoredRecord::new(chunk.clone(), doc, indicators);
        store.insert(&record, &vector).await?;
        written += 1;
    }
    Ok(written)
}

/// Scan the configured root for advisory files matching the include
/// globs, skipping hidden files and already-processed ones. Deterministic
/// name order.
pub fn scan_advisories(config: &Config) -> Result<Vec<PathBuf>> {
    let ingest_config = config
        .ingest
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("[ingest] section not configured"))?;

    let root = &ingest_config.root;
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&ingest_config.include_globs)?;
    let exclude_set = build_globset(&ingest_config.exclude_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem.ends_with(PROCESSED_MARKER) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Rename an ingested file to `<stem>_processed<ext>` so re-runs skip it.
fn mark_processed(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let renamed = path.with_file_name(format!("{}{}{}", stem, PROCESSED_MARKER, extension));
    std::fs::rename(path, &renamed)
        .with_context(|| format!("failed to rename {}", path.display()))?;
    Ok(renamed)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, EmbeddingConfig, IngestConfig, RetrievalConfig, StoreConfig};

    fn test_config(root: PathBuf) -> Config {
        Config {
            store: StoreConfig {
                url: "http://localhost:9090".to_string(),
                api_key: None,
                collection: "Advisory".to_string(),
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                url: "http://localhost:11434".to_string(),
                model: "embeddinggemma".to_string(),
                timeout_secs: 30,
            },
            answer: None,
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingest: Some(IngestConfig {
                root,
                include_globs: vec!["**/*.pdf".to_string()],
                exclude_globs: Vec::new(),
            }),
        }
    }

    #[test]
    fn identical_text_hashes_to_same_doc_id() {
        let (a, _, _) = process_document("a.pdf", "Same text.".to_string(), 100);
        let (b, _, _) = process_document("b.pdf", "Same text.".to_string(), 100);
        assert_eq!(a.doc_id, b.doc_id);
        assert_eq!(a.doc_id.len(), 64);
    }

    #[test]
    fn indicators_computed_over_full_text_not_chunks() {
        // The budget forces a chunk boundary between the two sentences,
        // but the document-level set still sees both indicators.
        let text = "First sentence mentions CVE-2024-0001 today. Second sentence has 192.168.1.1 listed.";
        let (_, indicators, chunks) = process_document("a.pdf", text.to_string(), 8);
        assert!(chunks.len() > 1);
        assert_eq!(indicators.cves, vec!["CVE-2024-0001"]);
        assert_eq!(indicators.ipv4, vec!["192.168.1.1"]);
    }

    #[test]
    fn scan_skips_hidden_and_processed_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("alpha.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("beta_processed.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join(".hidden.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let config = test_config(tmp.path().to_path_buf());
        let files = scan_advisories(&config).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alpha.pdf"]);
    }

    #[test]
    fn scan_missing_root_is_error() {
        let config = test_config(PathBuf::from("/nonexistent/advisories"));
        assert!(scan_advisories(&config).is_err());
    }

    #[test]
    fn mark_processed_renames_with_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("alpha.pdf");
        std::fs::write(&path, b"x").unwrap();

        let renamed = mark_processed(&path).unwrap();
        assert!(!path.exists());
        assert!(renamed.exists());
        assert_eq!(
            renamed.file_name().unwrap().to_string_lossy(),
            "alpha_processed.pdf"
        );
    }
}
