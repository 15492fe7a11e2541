//! In-memory [`Store`] implementation for tests and embedding
//! applications that want no database file.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Mirrors the SQLite store's semantics: `(project_id, commit_hash)`
//! conflicts are skipped, archived projects drop out of listings, and
//! similarity search is brute-force cosine over stored vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Commit, Document, Project};

use super::{NewCommit, ScoredDocument, Store};

/// In-memory store for tests and ephemeral pipelines.
pub struct InMemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    documents: RwLock<Vec<Document>>,
    commits: RwLock<Vec<Commit>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            documents: RwLock::new(Vec::new()),
            commits: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_project(
        &self,
        name: &str,
        github_url: &str,
        github_token: Option<&str>,
    ) -> Result<Project> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            github_url: github_url.to_string(),
            github_token: github_token.map(|t| t.to_string()),
            created_at: chrono::Utc::now().timestamp(),
            deleted_at: None,
        };
        let mut projects = self.projects.write().unwrap();
        projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn project(&self, id: &str) -> Result<Option<Project>> {
        let projects = self.projects.read().unwrap();
        Ok(projects.get(id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = self.projects.read().unwrap();
        let mut live: Vec<Project> = projects
            .values()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(live)
    }

    async fn archive_project(&self, id: &str) -> Result<()> {
        let mut projects = self.projects.write().unwrap();
        match projects.get_mut(id) {
            Some(project) => {
                if project.deleted_at.is_none() {
                    project.deleted_at = Some(chrono::Utc::now().timestamp());
                }
                Ok(())
            }
            None => Err(Error::ProjectNotFound(id.to_string())),
        }
    }

    async fn find_project_github_url(&self, project_id: &str) -> Result<Option<String>> {
        let projects = self.projects.read().unwrap();
        Ok(projects.get(project_id).map(|p| p.github_url.clone()))
    }

    async fn create_document(
        &self,
        project_id: &str,
        file_name: &str,
        source_code: &str,
        summary: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut documents = self.documents.write().unwrap();
        documents.push(Document {
            id: id.clone(),
            project_id: project_id.to_string(),
            file_name: file_name.to_string(),
            source_code: source_code.to_string(),
            summary: summary.to_string(),
            embedding: Vec::new(),
        });
        Ok(id)
    }

    async fn update_document_embedding(&self, document_id: &str, embedding: &[f32]) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        if let Some(doc) = documents.iter_mut().find(|d| d.id == document_id) {
            doc.embedding = embedding.to_vec();
        }
        Ok(())
    }

    async fn documents_for_project(&self, project_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.read().unwrap();
        let mut matched: Vec<Document> = documents
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.file_name.cmp(&b.file_name).then_with(|| a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn similar_documents(
        &self,
        project_id: &str,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let documents = self.documents.read().unwrap();
        let mut scored: Vec<ScoredDocument> = documents
            .iter()
            .filter(|d| d.project_id == project_id && !d.embedding.is_empty())
            .map(|d| ScoredDocument {
                similarity: cosine_similarity(query, &d.embedding),
                document: d.clone(),
            })
            .filter(|s| s.similarity > min_similarity)
            .collect();
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn list_commit_hashes(&self, project_id: &str) -> Result<Vec<String>> {
        let commits = self.commits.read().unwrap();
        Ok(commits
            .iter()
            .filter(|c| c.project_id == project_id)
            .map(|c| c.commit_hash.clone())
            .collect())
    }

    async fn bulk_insert_commits(&self, new_commits: &[NewCommit]) -> Result<Vec<Commit>> {
        let mut commits = self.commits.write().unwrap();
        let mut inserted = Vec::new();

        for c in new_commits {
            let collides = commits
                .iter()
                .any(|e| e.project_id == c.project_id && e.commit_hash == c.commit_hash);
            if collides {
                continue;
            }
            let row = Commit {
                id: Uuid::new_v4().to_string(),
                project_id: c.project_id.clone(),
                commit_hash: c.commit_hash.clone(),
                commit_message: c.commit_message.clone(),
                commit_author_name: c.commit_author_name.clone(),
                commit_author_avatar: c.commit_author_avatar.clone(),
                commit_date: c.commit_date,
                summary: c.summary.clone(),
            };
            commits.push(row.clone());
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn list_commits(&self, project_id: &str) -> Result<Vec<Commit>> {
        let commits = self.commits.read().unwrap();
        let mut matched: Vec<Commit> = commits
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.commit_date
                .cmp(&a.commit_date)
                .then_with(|| a.commit_hash.cmp(&b.commit_hash))
        });
        Ok(matched)
    }
}
