//! Vector store abstraction and implementations.
//!
//! The [`VectorStore`] trait covers the three operations the pipeline
//! needs from storage: collection setup, per-chunk insert with an
//! externally supplied vector, and top-K nearest-vector query. Two
//! implementations:
//! - [`WeaviateStore`]: a Weaviate-compatible REST/GraphQL endpoint.
//! - [`InMemoryStore`]: brute-force cosine over a `Vec`, for tests.
//!
//! Query results come back as [`RawHit`]s; a returned object missing its
//! `doc_name` or `text` fails the whole query rather than producing a
//! partial hit set.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::models::{RawHit, StoredRecord};

/// The per-type indicator array properties of the collection schema, in
/// storage order.
const INDICATOR_PROPERTIES: [&str; 10] = [
    "cves", "tids", "ipv4", "ipv6", "hashes", "emails", "urls", "domains", "paths", "ports",
];

/// Storage backend for chunk records and their embedding vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist. Idempotent.
    async fn ensure_collection(&self) -> Result<()>;

    /// Persist one chunk record with its embedding vector.
    async fn insert(&self, record: &StoredRecord, vector: &[f32]) -> Result<()>;

    /// Return the `top_k` nearest chunks to `vector`, ordered by distance.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RawHit>>;
}

// ============ Weaviate-compatible store ============

/// Client for a Weaviate-compatible vector store.
///
/// Inserts go through `POST /v1/objects`; queries through the GraphQL
/// `Get { <collection>(nearVector: ...) }` endpoint with distance
/// metadata requested. The connection is acquired once per operation
/// scope by the caller and released when the client drops.
pub struct WeaviateStore {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    collection: String,
}

impl WeaviateStore {
    /// Build a client and verify the endpoint is reachable.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let store = Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        };

        let response = store
            .request(reqwest::Method::GET, "/v1/.well-known/ready")
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Vector store connection error (is it running at {}?): {}",
                    store.url,
                    e
                )
            })?;
        if !response.status().is_success() {
            bail!("Vector store not ready: HTTP {}", response.status());
        }

        Ok(store)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// The schema body for the collection: core fields, the flat `iocs`
    /// view, and one text-array property per indicator type. External
    /// vectors, so no vectorizer.
    fn collection_schema(&self) -> serde_json::Value {
        let mut properties = vec![
            serde_json::json!({ "name": "text", "dataType": ["text"] }),
            serde_json::json!({ "name": "doc_name", "dataType": ["text"] }),
            serde_json::json!({ "name": "doc_id", "dataType": ["text"] }),
            serde_json::json!({ "name": "iocs", "dataType": ["text[]"] }),
        ];
        for name in INDICATOR_PROPERTIES {
            properties.push(serde_json::json!({ "name": name, "dataType": ["text[]"] }));
        }
        serde_json::json!({
            "class": self.collection,
            "vectorizer": "none",
            "properties": properties,
        })
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn ensure_collection(&self) -> Result<()> {
        let response = self.request(reqwest::Method::GET, "/v1/schema").send().await?;
        if !response.status().is_success() {
            bail!("Schema fetch failed: HTTP {}", response.status());
        }
        let schema: serde_json::Value = response.json().await?;
        let exists = schema
            .get("classes")
            .and_then(|c| c.as_array())
            .map(|classes| {
                classes
                    .iter()
                    .any(|c| c.get("class").and_then(|n| n.as_str()) == Some(&self.collection))
            })
            .unwrap_or(false);

        if exists {
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::POST, "/v1/schema")
            .json(&self.collection_schema())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Collection create failed: HTTP {}: {}", status, body_text);
        }
        Ok(())
    }

    async fn insert(&self, record: &StoredRecord, vector: &[f32]) -> Result<()> {
        let properties =
            serde_json::to_value(record).context("failed to serialize chunk record")?;
        let body = serde_json::json!({
            "class": self.collection,
            "properties": properties,
            "vector": vector,
        });

        let response = self
            .request(reqwest::Method::POST, "/v1/objects")
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chunk insert failed: HTTP {}: {}", status, body_text);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RawHit>> {
        let vector_json =
            serde_json::to_string(vector).context("failed to serialize query vector")?;
        let graphql = format!(
            "{{ Get {{ {collection}(nearVector: {{vector: {vector}}}, limit: {limit}) \
             {{ doc_name text _additional {{ distance }} }} }} }}",
            collection = self.collection,
            vector = vector_json,
            limit = top_k,
        );

        let response = self
            .request(reqwest::Method::POST, "/v1/graphql")
            .json(&serde_json::json!({ "query": graphql }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Vector query failed: HTTP {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        if let Some(errors) = json.get("errors") {
            bail!("Vector query returned errors: {}", errors);
        }

        let objects = json
            .pointer(&format!("/data/Get/{}", self.collection))
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid query response: missing result array"))?;

        let mut hits = Vec::with_capacity(objects.len());
        for obj in objects {
            let doc_name = obj
                .get("doc_name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("Malformed hit: missing doc_name"))?;
            let text = obj
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("Malformed hit: missing text"))?;
            let distance = obj
                .pointer("/_additional/distance")
                .and_then(|v| v.as_f64())
                .unwrap_or_default();
            hits.push(RawHit {
                doc_name: doc_name.to_string(),
                text: text.to_string(),
                distance,
            });
        }
        Ok(hits)
    }
}

// ============ In-memory store ============

/// In-memory store for tests: brute-force cosine distance over every
/// stored vector, no persistence.
pub struct InMemoryStore {
    records: RwLock<Vec<(StoredRecord, Vec<f32>)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of everything inserted so far, in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        1.0
    } else {
        1.0 - (dot / (mag_a * mag_b)) as f64
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, record: &StoredRecord, vector: &[f32]) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .push((record.clone(), vector.to_vec()));
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RawHit>> {
        let records = self.records.read().unwrap();
        let mut hits: Vec<RawHit> = records
            .iter()
            .map(|(record, stored)| RawHit {
                doc_name: record.doc_name.clone(),
                text: record.text.clone(),
                distance: cosine_distance(vector, stored),
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioc::IndicatorSet;

    fn record(doc_name: &str, text: &str) -> StoredRecord {
        StoredRecord {
            text: text.to_string(),
            doc_name: doc_name.to_string(),
            doc_id: "d".repeat(64),
            iocs: Vec::new(),
            indicators: IndicatorSet::default(),
        }
    }

    #[tokio::test]
    async fn memory_store_orders_by_distance() {
        let store = InMemoryStore::new();
        store
            .insert(&record("a.pdf", "near"), &[1.0, 0.0])
            .await
            .unwrap();
        store
            .insert(&record("b.pdf", "far"), &[0.0, 1.0])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_name, "a.pdf");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn memory_store_caps_at_top_k() {
        let store = InMemoryStore::new();
        for i in 0..10 {
            store
                .insert(&record("a.pdf", &format!("chunk {}", i)), &[1.0, 0.0])
                .await
                .unwrap();
        }
        let hits = store.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn schema_lists_all_indicator_properties() {
        let store = WeaviateStore {
            client: reqwest::Client::new(),
            url: "http://localhost:9090".to_string(),
            api_key: None,
            collection: "Advisory".to_string(),
        };
        let schema = store.collection_schema();
        let names: Vec<&str> = schema["properties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        for name in INDICATOR_PROPERTIES {
            assert!(names.contains(&name), "missing property {}", name);
        }
        assert!(names.contains(&"doc_id"));
        assert_eq!(schema["vectorizer"], "none");
    }
}
