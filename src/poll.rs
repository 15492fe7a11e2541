//! Commit history polling.
//!
//! [`CommitTracker::poll`] pulls the newest commits for one project,
//! drops the ones already in the store, summarizes each new diff, and
//! persists the batch. [`spawn_poller`] runs that on a timer for every
//! live project so reads never have to trigger network work.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::models::Commit;
use crate::store::{NewCommit, Store};
use crate::summarize::DIFF_UNAVAILABLE_SUMMARY;
use crate::traits::{CommitSource, Summarizer};

/// Watches project repositories for commits the store has not seen.
pub struct CommitTracker {
    commits: Arc<dyn CommitSource>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn Store>,
}

impl CommitTracker {
    pub fn new(
        commits: Arc<dyn CommitSource>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            commits,
            summarizer,
            store,
        }
    }

    /// Fetch, summarize, and persist commits not yet in the store.
    ///
    /// Returns the newly persisted rows, newest first. A second poll
    /// with no upstream activity returns an empty list. The commit
    /// listing is all-or-nothing; diff fetching and summarization fall
    /// back to fixed placeholder summaries per commit, so one bad diff
    /// cannot block the batch.
    pub async fn poll(&self, project_id: &str) -> Result<Vec<Commit>> {
        let github_url = self
            .store
            .find_project_github_url(project_id)
            .await?
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;

        let recent = self.commits.recent_commits(&github_url).await?;
        let known: HashSet<String> = self
            .store
            .list_commit_hashes(project_id)
            .await?
            .into_iter()
            .collect();

        // Filtering preserves the newest-first order of the listing.
        let fresh: Vec<_> = recent
            .into_iter()
            .filter(|c| !known.contains(&c.commit_hash))
            .collect();
        if fresh.is_empty() {
            debug!(project_id, "no new commits");
            return Ok(Vec::new());
        }
        info!(project_id, new = fresh.len(), "summarizing new commits");

        let summaries = join_all(fresh.iter().map(|c| {
            let commits = Arc::clone(&self.commits);
            let summarizer = Arc::clone(&self.summarizer);
            let github_url = github_url.clone();
            let hash = c.commit_hash.clone();

            async move {
                match commits.commit_diff(&github_url, &hash).await {
                    Ok(diff) => summarizer.summarize_diff(&diff).await,
                    Err(e) => {
                        warn!(commit = %hash, error = %e, "failed to fetch diff");
                        DIFF_UNAVAILABLE_SUMMARY.to_string()
                    }
                }
            }
        }))
        .await;

        let rows: Vec<NewCommit> = fresh
            .into_iter()
            .zip(summaries)
            .map(|(c, summary)| NewCommit {
                project_id: project_id.to_string(),
                commit_hash: c.commit_hash,
                commit_message: c.commit_message,
                commit_author_name: c.commit_author_name,
                commit_author_avatar: c.commit_author_avatar,
                commit_date: c.commit_date.timestamp(),
                summary,
            })
            .collect();

        let inserted = self.store.bulk_insert_commits(&rows).await?;
        info!(project_id, inserted = inserted.len(), "persisted new commits");
        Ok(inserted)
    }
}

/// Spawn a background task polling every live project on a fixed cadence.
///
/// The first sweep runs immediately. Failures are logged and the loop
/// keeps going; abort the returned handle to stop it.
pub fn spawn_poller(
    tracker: Arc<CommitTracker>,
    store: Arc<dyn Store>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let projects = match store.list_projects().await {
                Ok(projects) => projects,
                Err(e) => {
                    warn!(error = %e, "failed to list projects for polling");
                    continue;
                }
            };

            for project in projects {
                match tracker.poll(&project.id).await {
                    Ok(new) if !new.is_empty() => {
                        info!(project_id = %project.id, new = new.len(), "poll found new commits");
                    }
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        error!(project_id = %project.id, error = %e, "poll failed");
                    }
                    Err(e) => {
                        warn!(project_id = %project.id, error = %e, "poll failed, will retry next cycle");
                    }
                }
            }
        }
    })
}
