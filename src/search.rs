//! Query-time retrieval pipeline.
//!
//! Embeds the query, pulls the top-K nearest chunks from the vector
//! store, and collapses them through the relevance filter into the
//! evidence map. The store connection is acquired at the start of the
//! operation and released on every exit path when the client drops.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::filter::filter_hits;
use crate::ioc;
use crate::models::EvidenceMap;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{VectorStore, WeaviateStore};

/// Retrieve the evidence map for `query` from an already-connected store
/// and embedder.
pub async fn search_evidence(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    config: &Config,
    query: &str,
) -> Result<EvidenceMap> {
    let vector = embedder.embed_text(query).await?;
    let hits = store.query(&vector, config.retrieval.top_k).await?;
    filter_hits(&hits, config.retrieval.relevance_percentile)
}

pub async fn run_search(
    config: &Config,
    query: &str,
    reporter: &dyn ProgressReporter,
) -> Result<EvidenceMap> {
    reporter.report(ProgressEvent::StageStarted {
        stage: "search",
        detail: query.chars().take(50).collect(),
    });

    // Pre-identify indicators mentioned in the question itself; same
    // extraction as ingestion, over shorter input.
    let query_indicators = ioc::extract(query);
    if !query_indicators.is_empty() {
        eprintln!(
            "query indicators: {}",
            query_indicators.flattened().join(", ")
        );
    }

    let store = match WeaviateStore::connect(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            reporter.report(ProgressEvent::StageFailed {
                stage: "search",
                error: e.to_string(),
            });
            return Err(e);
        }
    };
    let embedder = OllamaEmbedder::new(&config.embedding)?;

    match search_evidence(&store, &embedder, config, query).await {
        Ok(evidence) => {
            reporter.report(ProgressEvent::StageCompleted {
                stage: "search",
                detail: format!("{} documents retained", evidence.len()),
            });
            Ok(evidence)
        }
        Err(e) => {
            reporter.report(ProgressEvent::StageFailed {
                stage: "search",
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Print an evidence map the way `adv search` shows it.
pub fn print_evidence(evidence: &EvidenceMap) {
    if evidence.is_empty() {
        println!("No results.");
        return;
    }
    for (doc_name, text) in evidence {
        println!("## {}", doc_name);
        println!("{}", text);
        println!();
    }
}
