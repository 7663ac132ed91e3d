//! Core data models used throughout Advisory Harness.
//!
//! These types represent the documents, stored chunk records, and query
//! hits that flow through the ingestion and retrieval pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ioc::IndicatorSet;

/// An advisory document after text extraction, identified by the SHA-256
/// hex digest of its extracted text. Byte-identical re-extractions hash
/// to the same id, which is how re-ingestion of an unchanged file is
/// detected.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_id: String,
    pub doc_name: String,
    pub text: String,
}

/// One retrieval chunk plus the owning document's metadata, as persisted
/// in the vector store (paired with an externally supplied embedding).
///
/// `indicators` is the *document-level* set: every chunk of a document
/// carries the same indicators, computed once over the full unchunked
/// text. `iocs` is the flattened view of the same set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub text: String,
    pub doc_name: String,
    pub doc_id: String,
    pub iocs: Vec<String>,
    #[serde(flatten)]
    pub indicators: IndicatorSet,
}

/// A single chunk hit returned from a similarity query. Multiple hits may
/// share `doc_name`. The pipeline never interprets `distance`, only hit
/// membership and per-document counts.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub doc_name: String,
    pub text: String,
    pub distance: f64,
}

/// The final artifact handed to answer generation: document name to one
/// representative text per retained document. BTreeMap keeps iteration
/// order deterministic so identical hit sets produce identical prompts.
pub type EvidenceMap = BTreeMap<String, String>;

impl StoredRecord {
    /// Build the per-chunk record for a document, attaching the
    /// document-level indicator set.
    pub fn new(chunk_text: String, doc: &RawDocument, indicators: &IndicatorSet) -> Self {
        Self {
            text: chunk_text,
            doc_name: doc.doc_name.clone(),
            doc_id: doc.doc_id.clone(),
            iocs: indicators.flattened(),
            indicators: indicators.clone(),
        }
    }
}
