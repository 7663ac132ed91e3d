use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::filter::DEFAULT_RELEVANCE_PERCENTILE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: Option<AnswerConfig>,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the Weaviate-compatible REST endpoint.
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    pub model: String,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_relevance_percentile")]
    pub relevance_percentile: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            relevance_percentile: default_relevance_percentile(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Directory scanned for advisory files.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_collection() -> String {
    "Advisory".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_answer_timeout_secs() -> u64 {
    120
}
fn default_max_words() -> usize {
    512
}
fn default_top_k() -> usize {
    25
}
fn default_relevance_percentile() -> f64 {
    DEFAULT_RELEVANCE_PERCENTILE
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.store.url.trim().is_empty() {
        anyhow::bail!("store.url must not be empty");
    }

    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    if config.chunking.max_words == 0 {
        anyhow::bail!("chunking.max_words must be > 0");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if !(config.retrieval.relevance_percentile > 0.0
        && config.retrieval.relevance_percentile <= 1.0)
    {
        anyhow::bail!("retrieval.relevance_percentile must be in (0.0, 1.0]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const MINIMAL: &str = r#"
[store]
url = "http://localhost:9090"

[embedding]
model = "embeddinggemma"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let f = write_config(MINIMAL);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.store.collection, "Advisory");
        assert_eq!(config.embedding.url, "http://localhost:11434");
        assert_eq!(config.chunking.max_words, 512);
        assert_eq!(config.retrieval.top_k, 25);
        assert_eq!(config.retrieval.relevance_percentile, 0.90);
        assert!(config.ingest.is_none());
        assert!(config.answer.is_none());
    }

    #[test]
    fn zero_max_words_rejected() {
        let f = write_config(&format!("{}\n[chunking]\nmax_words = 0\n", MINIMAL));
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn out_of_range_percentile_rejected() {
        let f = write_config(&format!(
            "{}\n[retrieval]\nrelevance_percentile = 1.5\n",
            MINIMAL
        ));
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn ingest_section_parsed() {
        let f = write_config(&format!(
            "{}\n[ingest]\nroot = \"/data/advisories\"\n",
            MINIMAL
        ));
        let config = load_config(f.path()).unwrap();
        let ingest = config.ingest.unwrap();
        assert_eq!(ingest.root, PathBuf::from("/data/advisories"));
        assert_eq!(ingest.include_globs, vec!["**/*.pdf"]);
    }
}
