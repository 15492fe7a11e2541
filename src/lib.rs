//! # Repolore
//!
//! Turns GitHub repositories into searchable, AI-summarized knowledge bases.
//!
//! Repolore ingests a repository's files, summarizes each one with Gemini,
//! embeds the summaries, and persists everything to SQLite. A background
//! poller keeps following new commits, summarizing each diff as it lands,
//! so answers about a project stay current without blocking any read path.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌──────────┐
//! │  GitHub  │──▶│     Pipeline      │──▶│  SQLite  │
//! │ tree/diff│   │ Summarize + Embed │   │ rows+vec │
//! └──────────┘   └───────────────────┘   └────┬─────┘
//!       ▲                                     │
//!       │        ┌──────────┐           ┌─────▼────┐
//!       └────────│  Poller  │           │  Search  │
//!         diffs  │ (commits)│           │ (cosine) │
//!                └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use repolore::config::load_config;
//! use repolore::embedding::GeminiEmbedder;
//! use repolore::gemini::GeminiClient;
//! use repolore::github::GithubClient;
//! use repolore::ingest::{ingest_new_project, IngestionCoordinator};
//! use repolore::poll::{spawn_poller, CommitTracker};
//! use repolore::store::sqlite::SqliteStore;
//! use repolore::store::Store;
//! use repolore::summarize::GeminiSummarizer;
//!
//! #[tokio::main]
//! async fn main() -> repolore::error::Result<()> {
//!     let config = load_config(Path::new("repolore.toml"))?;
//!     let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&config.store.path).await?);
//!
//!     let github = Arc::new(GithubClient::new(config.github.clone())?);
//!     let gemini = GeminiClient::new(config.gemini.clone())?;
//!     let summarizer = Arc::new(GeminiSummarizer::new(gemini.clone()));
//!     let embedder = Arc::new(GeminiEmbedder::new(gemini));
//!
//!     let coordinator = IngestionCoordinator::new(
//!         github.clone(),
//!         summarizer.clone(),
//!         embedder,
//!         Arc::clone(&store),
//!     );
//!     let tracker = Arc::new(CommitTracker::new(github, summarizer, Arc::clone(&store)));
//!
//!     let (project, report) = ingest_new_project(
//!         &coordinator,
//!         &tracker,
//!         &store,
//!         "my-project",
//!         "https://github.com/owner/repo",
//!         None,
//!     )
//!     .await?;
//!     println!(
//!         "{}: {} files ingested, {} failed",
//!         project.name, report.succeeded, report.failed
//!     );
//!
//!     let _poller = spawn_poller(tracker, store, Duration::from_secs(config.poll.interval_secs));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`traits`] | Pipeline seams (sources, summarizer, embedder) |
//! | [`github`] | GitHub REST client (file trees, commits, diffs) |
//! | [`gemini`] | Gemini REST client (generation, embeddings) |
//! | [`summarize`] | Code and diff summarization |
//! | [`embedding`] | Summary embeddings and vector helpers |
//! | [`ingest`] | One-shot repository ingestion |
//! | [`poll`] | Commit polling and the background poller |
//! | [`search`] | Similarity search over documents |
//! | [`store`] | Persistence trait, SQLite and in-memory backends |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod embedding;
pub mod error;
pub mod gemini;
pub mod github;
pub mod ingest;
pub mod models;
pub mod poll;
pub mod search;
pub mod store;
pub mod summarize;
pub mod traits;
