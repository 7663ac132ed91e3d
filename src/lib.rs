//! # Advisory Harness
//!
//! A threat-advisory ingestion and retrieval pipeline.
//!
//! Advisory Harness ingests advisory PDFs, extracts typed indicators of
//! compromise (with obfuscation normalization), chunks the text into
//! retrieval units, and stores IOC-tagged chunks with external embeddings
//! in a Weaviate-compatible vector store. At query time, raw
//! nearest-neighbor hits are collapsed through a frequency-percentile
//! relevance filter into the evidence set handed to answer generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────┐   ┌───────────┐
//! │ PDF dir  │──▶│ Extract → IOCs → Chunk │──▶│ Vector DB │
//! │ (ingest) │   │ → Embed (external)     │   │ (external)│
//! └──────────┘   └───────────────────────┘   └─────┬─────┘
//!                                                  │
//!                    ┌─────────────────────────────┤
//!                    ▼                             ▼
//!              ┌───────────┐              ┌──────────────┐
//!              │  search   │              │     ask      │
//!              │ (filter)  │              │ (filter+LLM) │
//!              └───────────┘              └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`deobfuscate`] | Obfuscated-indicator normalization |
//! | [`ioc`] | Typed IOC extraction |
//! | [`chunk`] | Sentence/paragraph-aware chunking |
//! | [`extract`] | PDF text extraction |
//! | [`embedding`] | Embedding service client |
//! | [`store`] | Vector store abstraction |
//! | [`filter`] | Percentile relevance filter |
//! | [`ingest`] | Ingestion orchestration |
//! | [`search`] | Query-time retrieval |
//! | [`answer`] | Answer generation glue |
//! | [`progress`] | Stage/progress reporting |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod deobfuscate;
pub mod embedding;
pub mod extract;
pub mod filter;
pub mod ingest;
pub mod ioc;
pub mod models;
pub mod progress;
pub mod search;
pub mod store;
