//! # Knowbot
//!
//! Per-organization knowledge indexing and retrieval-augmented question
//! answering.
//!
//! An operator registers an *organization* — a knowledge domain described
//! either by an uploaded PDF or by structured manual input. Knowbot
//! normalizes that input into text units, embeds them into an in-memory
//! vector index, and answers natural-language questions against the index
//! using retrieval-augmented generation, recording each exchange.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Normalizer │──▶│ Index Builder │──▶│ IndexRegistry │
//! │ PDF/manual │   │  embed+index  │   │  (in-memory)  │
//! └────────────┘   └───────────────┘   └───────┬───────┘
//!                                              │
//!                       ┌──────────────────────┤
//!                       ▼                      ▼
//!                 ┌───────────┐          ┌───────────┐
//!                 │   Query   │          │  SQLite   │
//!                 │  Engine   │─────────▶│ orgs+log  │
//!                 └───────────┘          └───────────┘
//! ```
//!
//! Indexes live only in process memory: they are built at ingestion time,
//! never evicted, and lost on restart. An organization whose metadata
//! survived a restart but whose index did not is reported distinctly
//! (see [`error::CoreError::IndexUnavailable`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Core error taxonomy |
//! | [`models`] | Organizations, text units, interaction records |
//! | [`normalize`] | Document normalization (PDF pages, manual synthesis) |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector index and top-k retrieval |
//! | [`registry`] | Process-wide org → index cache |
//! | [`generate`] | Generative-answer provider |
//! | [`ingest`] | Ingestion orchestration |
//! | [`query`] | Retrieval-augmented query engine |
//! | [`store`] | Organization metadata and interaction log |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod query;
pub mod registry;
pub mod server;
pub mod store;
