//! SQLite-backed [`Store`] implementation.
//!
//! One database file holds three tables: `projects`, `documents`, and
//! `commits`. Embeddings are stored as little-endian `f32` BLOBs and
//! compared in process; `(project_id, commit_hash)` is UNIQUE so a
//! commit re-inserted by a concurrent poll degrades to a no-op.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{Commit, Document, Project};

use super::{NewCommit, ScoredDocument, Store};

/// SQLite store. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the
    /// schema. WAL mode keeps concurrent readers off the writers' backs.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Config(format!("create {}: {e}", parent.display())))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(Error::Store)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool, for callers that need raw queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS projects (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            github_url   TEXT NOT NULL,
            github_token TEXT,
            created_at   INTEGER NOT NULL,
            deleted_at   INTEGER
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL,
            file_name   TEXT NOT NULL,
            source_code TEXT NOT NULL,
            summary     TEXT NOT NULL,
            embedding   BLOB,
            FOREIGN KEY (project_id) REFERENCES projects(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS commits (
            id                   TEXT PRIMARY KEY,
            project_id           TEXT NOT NULL,
            commit_hash          TEXT NOT NULL,
            commit_message       TEXT NOT NULL,
            commit_author_name   TEXT NOT NULL,
            commit_author_avatar TEXT NOT NULL,
            commit_date          INTEGER NOT NULL,
            summary              TEXT NOT NULL,
            UNIQUE (project_id, commit_hash),
            FOREIGN KEY (project_id) REFERENCES projects(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_commits_project_date ON commits(project_id, commit_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn project_from_row(row: &SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        name: row.get("name"),
        github_url: row.get("github_url"),
        github_token: row.get("github_token"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    let blob: Option<Vec<u8>> = row.get("embedding");
    Document {
        id: row.get("id"),
        project_id: row.get("project_id"),
        file_name: row.get("file_name"),
        source_code: row.get("source_code"),
        summary: row.get("summary"),
        embedding: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
    }
}

fn commit_from_row(row: &SqliteRow) -> Commit {
    Commit {
        id: row.get("id"),
        project_id: row.get("project_id"),
        commit_hash: row.get("commit_hash"),
        commit_message: row.get("commit_message"),
        commit_author_name: row.get("commit_author_name"),
        commit_author_avatar: row.get("commit_author_avatar"),
        commit_date: row.get("commit_date"),
        summary: row.get("summary"),
    }
}

#[async_trait]
impl Store for SqliteStore {
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

        sqlx::query(
            "INSERT INTO projects (id, name, github_url, github_token, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.github_url)
        .bind(&project.github_token)
        .bind(project.created_at)
        .execute(&self.pool)
        .await?;

        Ok(project)
    }

    async fn project(&self, id: &str) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(project_from_row))
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT * FROM projects WHERE deleted_at IS NULL ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(project_from_row).collect())
    }

    async fn archive_project(&self, id: &str) -> Result<()> {
        let existing = self.project(id).await?;
        match existing {
            None => Err(Error::ProjectNotFound(id.to_string())),
            Some(p) if p.deleted_at.is_some() => Ok(()),
            Some(_) => {
                sqlx::query("UPDATE projects SET deleted_at = ? WHERE id = ?")
                    .bind(chrono::Utc::now().timestamp())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    async fn find_project_github_url(&self, project_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT github_url FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("github_url")))
    }

    async fn create_document(
        &self,
        project_id: &str,
        file_name: &str,
        source_code: &str,
        summary: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO documents (id, project_id, file_name, source_code, summary, embedding)
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(file_name)
        .bind(source_code)
        .bind(summary)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_document_embedding(&self, document_id: &str, embedding: &[f32]) -> Result<()> {
        sqlx::query("UPDATE documents SET embedding = ? WHERE id = ?")
            .bind(vec_to_blob(embedding))
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn documents_for_project(&self, project_id: &str) -> Result<Vec<Document>> {
        let rows =
            sqlx::query("SELECT * FROM documents WHERE project_id = ? ORDER BY file_name, id")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn similar_documents(
        &self,
        project_id: &str,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let rows =
            sqlx::query("SELECT * FROM documents WHERE project_id = ? AND embedding IS NOT NULL")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;

        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .map(document_from_row)
            .map(|d| ScoredDocument {
                similarity: cosine_similarity(query, &d.embedding),
                document: d,
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
        let rows = sqlx::query("SELECT commit_hash FROM commits WHERE project_id = ?")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("commit_hash")).collect())
    }

    async fn bulk_insert_commits(&self, new_commits: &[NewCommit]) -> Result<Vec<Commit>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::new();

        for c in new_commits {
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

            let result = sqlx::query(
                "INSERT OR IGNORE INTO commits
                 (id, project_id, commit_hash, commit_message, commit_author_name,
                  commit_author_avatar, commit_date, summary)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.id)
            .bind(&row.project_id)
            .bind(&row.commit_hash)
            .bind(&row.commit_message)
            .bind(&row.commit_author_name)
            .bind(&row.commit_author_avatar)
            .bind(row.commit_date)
            .bind(&row.summary)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted.push(row);
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_commits(&self, project_id: &str) -> Result<Vec<Commit>> {
        let rows = sqlx::query(
            "SELECT * FROM commits WHERE project_id = ?
             ORDER BY commit_date DESC, commit_hash ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(commit_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&dir.path().join("repolore.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn project_roundtrip_and_soft_delete() {
        let (_dir, store) = temp_store().await;

        let p = store
            .create_project("demo", "https://github.com/acme/demo", Some("tok"))
            .await
            .unwrap();
        assert_eq!(store.list_projects().await.unwrap().len(), 1);

        store.archive_project(&p.id).await.unwrap();
        assert!(store.list_projects().await.unwrap().is_empty());

        // Archived projects still resolve for background work.
        let url = store.find_project_github_url(&p.id).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://github.com/acme/demo"));

        // Archiving twice is a no-op, not an error.
        store.archive_project(&p.id).await.unwrap();
        assert!(matches!(
            store.archive_project("nope").await,
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn embedding_blob_roundtrip() {
        let (_dir, store) = temp_store().await;
        let p = store
            .create_project("demo", "https://github.com/acme/demo", None)
            .await
            .unwrap();

        let id = store
            .create_document(&p.id, "src/lib.rs", "fn main() {}", "Entry point.")
            .await
            .unwrap();
        store
            .update_document_embedding(&id, &[0.5, -1.0, 2.0])
            .await
            .unwrap();

        let docs = store.documents_for_project(&p.id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].embedding, vec![0.5, -1.0, 2.0]);
    }

    #[tokio::test]
    async fn duplicate_commit_insert_is_skipped() {
        let (_dir, store) = temp_store().await;
        let p = store
            .create_project("demo", "https://github.com/acme/demo", None)
            .await
            .unwrap();

        let commit = NewCommit {
            project_id: p.id.clone(),
            commit_hash: "abc123".into(),
            commit_message: "init".into(),
            commit_author_name: "dev".into(),
            commit_author_avatar: String::new(),
            commit_date: 1_700_000_000,
            summary: "Initial import.".into(),
        };

        let first = store.bulk_insert_commits(&[commit.clone()]).await.unwrap();
        assert_eq!(first.len(), 1);

        let second = store.bulk_insert_commits(&[commit]).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_commits(&p.id).await.unwrap().len(), 1);
    }
}
