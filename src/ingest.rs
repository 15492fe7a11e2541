//! Repository ingestion pipeline.
//!
//! [`IngestionCoordinator::ingest`] drives one repository through
//! fetch -> summarize -> embed -> persist. Fetching the file tree is
//! all-or-nothing; everything after that point is per-document. A
//! document that fails to persist is counted and logged, never allowed
//! to sink its siblings.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{IngestReport, Project};
use crate::poll::CommitTracker;
use crate::store::Store;
use crate::traits::{Embedder, RepositorySource, Summarizer};

/// Orchestrates one-shot ingestion of a repository into the store.
///
/// All four collaborators are trait objects so tests can swap in fakes
/// and callers can mix backends without touching this module.
pub struct IngestionCoordinator {
    source: Arc<dyn RepositorySource>,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn Store>,
}

impl IngestionCoordinator {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            source,
            summarizer,
            embedder,
            store,
        }
    }

    /// Ingest every eligible file of `github_url` into `project_id`.
    ///
    /// Fetch failures (bad URL, auth, missing repo) abort the whole run.
    /// Once files are in hand each one is processed independently: the
    /// summary row is written first, then the embedding is attached. An
    /// unavailable embedding leaves the row without a vector and still
    /// counts as success; a store error marks just that document failed.
    pub async fn ingest(
        &self,
        project_id: &str,
        github_url: &str,
        token: Option<&str>,
    ) -> Result<IngestReport> {
        let documents = self.source.fetch_documents(github_url, token).await?;
        info!(
            project_id,
            files = documents.len(),
            "fetched repository files"
        );

        let results = join_all(documents.into_iter().map(|doc| {
            let summarizer = Arc::clone(&self.summarizer);
            let embedder = Arc::clone(&self.embedder);
            let store = Arc::clone(&self.store);
            let project_id = project_id.to_string();

            async move {
                let summary = summarizer.summarize_code(&doc.path, &doc.content).await;
                let embedding = embedder.embed(&summary).await;

                let doc_id = match store
                    .create_document(&project_id, &doc.path, &doc.content, &summary)
                    .await
                {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(file = %doc.path, error = %e, "failed to persist document");
                        return false;
                    }
                };

                if !embedding.is_empty() {
                    if let Err(e) = store.update_document_embedding(&doc_id, &embedding).await {
                        warn!(file = %doc.path, error = %e, "failed to persist embedding");
                        return false;
                    }
                }
                true
            }
        }))
        .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - succeeded;
        info!(project_id, succeeded, failed, "ingestion finished");
        Ok(IngestReport { succeeded, failed })
    }
}

/// Register a project and run its first ingestion and commit poll.
///
/// `name` and `github_url` must be non-empty. The initial poll is best
/// effort; a poll failure is logged and does not undo the ingestion.
pub async fn ingest_new_project(
    coordinator: &IngestionCoordinator,
    tracker: &CommitTracker,
    store: &Arc<dyn Store>,
    name: &str,
    github_url: &str,
    token: Option<&str>,
) -> Result<(Project, IngestReport)> {
    if name.trim().is_empty() {
        return Err(Error::EmptyField("name"));
    }
    if github_url.trim().is_empty() {
        return Err(Error::EmptyField("github_url"));
    }

    let project = store.create_project(name, github_url, token).await?;
    let report = coordinator.ingest(&project.id, github_url, token).await?;

    if let Err(e) = tracker.poll(&project.id).await {
        warn!(project_id = %project.id, error = %e, "initial commit poll failed");
    }

    Ok((project, report))
}
