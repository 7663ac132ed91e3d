//! End-to-end pipeline tests over the in-memory store and a
//! deterministic stub embedder: ingest → store → query → filter.

use anyhow::Result;
use async_trait::async_trait;

use advisory_harness::embedding::Embedder;
use advisory_harness::filter::{filter_hits, DEFAULT_RELEVANCE_PERCENTILE};
use advisory_harness::ingest::{ingest_document, process_document};
use advisory_harness::search::search_evidence;
use advisory_harness::store::{InMemoryStore, VectorStore};

/// Deterministic embedder: a 26-dim letter-frequency histogram. Identical
/// text always embeds identically; no service involved.
struct StubEmbedder;

fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        let idx = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        v[idx] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letter_histogram(t)).collect())
    }
}

/// Embedder that returns the same fixed vector for every input, so test
/// scenarios can control distances purely through what they insert.
struct FixedEmbedder(Vec<f32>);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.0.clone()).collect())
    }
}

fn retrieval_config() -> advisory_harness::config::Config {
    // Construction mirrors config/adv.toml; only retrieval and chunking
    // matter for these tests.
    let toml = r#"
[store]
url = "http://localhost:9090"

[embedding]
model = "embeddinggemma"
"#;
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), toml).unwrap();
    advisory_harness::config::load_config(file.path()).unwrap()
}

#[tokio::test]
async fn end_to_end_ingest_and_search() {
    let store = InMemoryStore::new();
    let embedder = StubEmbedder;

    let text = "This advisory covers CVE-2024-0001 in detail. \
                Attackers connected from 192.168.1.1 port 445 repeatedly.";
    let (doc, indicators, chunks) = process_document("alpha.pdf", text.to_string(), 512);

    let written = ingest_document(&store, &embedder, &doc, &indicators, &chunks)
        .await
        .unwrap();
    assert_eq!(written as usize, chunks.len());

    // Every stored record carries the document-level indicator set:
    // exactly cve, ipv4, and port populated, all other types empty.
    for record in store.records() {
        assert_eq!(record.doc_id, doc.doc_id);
        assert_eq!(record.indicators.cves, vec!["CVE-2024-0001"]);
        assert_eq!(record.indicators.ipv4, vec!["192.168.1.1"]);
        assert_eq!(record.indicators.ports, vec!["445"]);
        assert!(record.indicators.tids.is_empty());
        assert!(record.indicators.ipv6.is_empty());
        assert!(record.indicators.hashes.is_empty());
        assert!(record.indicators.emails.is_empty());
        assert!(record.indicators.urls.is_empty());
        assert!(record.indicators.domains.is_empty());
        assert!(record.indicators.paths.is_empty());
        assert_eq!(record.iocs.len(), 3);
    }

    // A single ingested document is trivially retained by the filter.
    let config = retrieval_config();
    let evidence = search_evidence(&store, &embedder, &config, "CVE-2024-0001 activity")
        .await
        .unwrap();
    assert_eq!(evidence.len(), 1);
    assert!(evidence.contains_key("alpha.pdf"));
}

#[tokio::test]
async fn reingesting_identical_text_reuses_doc_id() {
    let text = "Identical advisory content. Nothing changed between runs.";
    let (first, _, _) = process_document("scan_2024.pdf", text.to_string(), 512);
    let (second, _, _) = process_document("scan_2024_copy.pdf", text.to_string(), 512);
    assert_eq!(first.doc_id, second.doc_id);
}

#[tokio::test]
async fn filter_narrows_to_frequently_matching_documents() {
    let store = InMemoryStore::new();
    let query_vector = vec![1.0f32, 0.0];
    let embedder = FixedEmbedder(query_vector.clone());

    // Five chunks for the relevant advisory, one for the stray.
    let busy = "Relevant advisory text spread over many chunks. ".repeat(5);
    let (busy_doc, busy_iocs, _) = process_document("busy.pdf", busy, 512);
    let busy_chunks: Vec<String> = (0..5).map(|i| format!("busy chunk {}", i)).collect();
    ingest_document(&store, &embedder, &busy_doc, &busy_iocs, &busy_chunks)
        .await
        .unwrap();

    let (stray_doc, stray_iocs, _) =
        process_document("stray.pdf", "Unrelated advisory.".to_string(), 512);
    ingest_document(
        &store,
        &embedder,
        &stray_doc,
        &stray_iocs,
        &["stray chunk".to_string()],
    )
    .await
    .unwrap();

    let hits = store.query(&query_vector, 25).await.unwrap();
    assert_eq!(hits.len(), 6);

    let evidence = filter_hits(&hits, DEFAULT_RELEVANCE_PERCENTILE).unwrap();
    assert!(evidence.contains_key("busy.pdf"));
    assert!(!evidence.contains_key("stray.pdf"));

    // The retained document keeps all its distinct chunks, in order.
    let kept = &evidence["busy.pdf"];
    for i in 0..5 {
        assert!(kept.contains(&format!("busy chunk {}", i)));
    }
}

#[tokio::test]
async fn empty_store_yields_empty_evidence() {
    let store = InMemoryStore::new();
    let embedder = StubEmbedder;
    let config = retrieval_config();

    let evidence = search_evidence(&store, &embedder, &config, "anything")
        .await
        .unwrap();
    assert!(evidence.is_empty());
}
