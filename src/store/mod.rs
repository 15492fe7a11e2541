//! Storage abstraction for repolore.
//!
//! The [`Store`] trait defines every persistence operation the pipelines
//! and read paths need, enabling pluggable backends. The crate ships two:
//! [`sqlite::SqliteStore`] for durable storage and [`memory::InMemoryStore`]
//! for tests and embedding applications that want no database file.
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and
//! must enforce the `(project_id, commit_hash)` uniqueness invariant by
//! treating conflicting inserts as no-ops.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Commit, Document, Project};

/// A commit row ready for insertion. The store assigns the row id.
#[derive(Debug, Clone)]
pub struct NewCommit {
    pub project_id: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub commit_author_name: String,
    pub commit_author_avatar: String,
    pub commit_date: i64,
    pub summary: String,
}

/// A document scored against a query vector.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub similarity: f32,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_project`](Store::create_project) | Insert a project row |
/// | [`project`](Store::project) | Fetch one project by id |
/// | [`list_projects`](Store::list_projects) | All live (non-archived) projects |
/// | [`archive_project`](Store::archive_project) | Soft-delete a project |
/// | [`find_project_github_url`](Store::find_project_github_url) | Resolve a project's repository URL |
/// | [`create_document`](Store::create_document) | Insert a document row without embedding |
/// | [`update_document_embedding`](Store::update_document_embedding) | Second-phase embedding write |
/// | [`documents_for_project`](Store::documents_for_project) | All document rows of a project |
/// | [`similar_documents`](Store::similar_documents) | Cosine similarity query |
/// | [`list_commit_hashes`](Store::list_commit_hashes) | Hashes already persisted (dedup read) |
/// | [`bulk_insert_commits`](Store::bulk_insert_commits) | Insert new commits, skipping conflicts |
/// | [`list_commits`](Store::list_commits) | A project's commits, newest first |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a project row and return it.
    async fn create_project(
        &self,
        name: &str,
        github_url: &str,
        github_token: Option<&str>,
    ) -> Result<Project>;

    /// Fetch a project by id, archived or not.
    async fn project(&self, id: &str) -> Result<Option<Project>>;

    /// All projects that have not been archived, newest first.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Soft-delete: set `deleted_at`, keep all ingested data. Archiving an
    /// already-archived project is a no-op.
    async fn archive_project(&self, id: &str) -> Result<()>;

    /// Resolve the repository URL for a project, reading through soft
    /// delete (an archived project can still be polled).
    async fn find_project_github_url(&self, project_id: &str) -> Result<Option<String>>;

    /// First phase of a document write: persist summary and source with
    /// no embedding. Returns the new row id.
    async fn create_document(
        &self,
        project_id: &str,
        file_name: &str,
        source_code: &str,
        summary: &str,
    ) -> Result<String>;

    /// Second phase: attach the embedding to an existing row. Callers
    /// only invoke this when a non-empty vector was produced.
    async fn update_document_embedding(&self, document_id: &str, embedding: &[f32]) -> Result<()>;

    /// All document rows of a project, ordered by file name.
    async fn documents_for_project(&self, project_id: &str) -> Result<Vec<Document>>;

    /// Brute-force cosine similarity over the project's embedded
    /// documents: results above `min_similarity`, best first, at most
    /// `limit`.
    async fn similar_documents(
        &self,
        project_id: &str,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredDocument>>;

    /// Every commit hash already persisted for a project.
    async fn list_commit_hashes(&self, project_id: &str) -> Result<Vec<String>>;

    /// Insert commit rows in the given order, skipping any that collide
    /// on `(project_id, commit_hash)`. Returns only the rows actually
    /// inserted, in input order.
    async fn bulk_insert_commits(&self, commits: &[NewCommit]) -> Result<Vec<Commit>>;

    /// A project's commits, newest first (ties broken by hash).
    async fn list_commits(&self, project_id: &str) -> Result<Vec<Commit>>;
}
