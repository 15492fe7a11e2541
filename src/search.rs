//! Semantic search over ingested documents.
//!
//! Embeds a natural-language question and ranks a project's documents
//! by cosine similarity. Pure read path: nothing here touches GitHub
//! or triggers a poll.

use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::store::{ScoredDocument, Store};
use crate::traits::Embedder;

/// Results returned per question.
pub const DEFAULT_LIMIT: usize = 10;
/// Similarity floor; matches below this are noise for a Q&A context.
pub const MIN_SIMILARITY: f32 = 0.5;

/// Ranks a project's documents against a question.
pub struct DocumentSearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn Store>,
}

impl DocumentSearch {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn Store>) -> Self {
        Self { embedder, store }
    }

    /// The most relevant documents for `question`, best first.
    ///
    /// Returns an empty list when the question cannot be embedded;
    /// a search that cannot rank should come back empty, not error.
    pub async fn relevant_documents(
        &self,
        project_id: &str,
        question: &str,
    ) -> Result<Vec<ScoredDocument>> {
        let query = self.embedder.embed(question).await;
        if query.is_empty() {
            warn!(project_id, "question embedding unavailable");
            return Ok(Vec::new());
        }
        self.store
            .similar_documents(project_id, &query, DEFAULT_LIMIT, MIN_SIMILARITY)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Vec<f32> {
            self.0.clone()
        }
    }

    async fn seeded_store() -> (Arc<InMemoryStore>, String) {
        let store = Arc::new(InMemoryStore::new());
        let project = store
            .create_project("demo", "https://github.com/acme/demo", None)
            .await
            .unwrap();

        for (name, embedding) in [
            ("close.rs", vec![1.0, 0.0]),
            ("far.rs", vec![0.0, 1.0]),
            ("near.rs", vec![0.9, 0.1]),
        ] {
            let id = store
                .create_document(&project.id, name, "code", "summary")
                .await
                .unwrap();
            store.update_document_embedding(&id, &embedding).await.unwrap();
        }
        (store, project.id)
    }

    #[tokio::test]
    async fn ranks_by_similarity_and_filters_weak_matches() {
        let (store, project_id) = seeded_store().await;
        let search = DocumentSearch::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), store);

        let hits = search.relevant_documents(&project_id, "what handles close?").await.unwrap();
        let names: Vec<_> = hits.iter().map(|h| h.document.file_name.as_str()).collect();
        // far.rs is orthogonal to the query and falls below the floor.
        assert_eq!(names, vec!["close.rs", "near.rs"]);
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[tokio::test]
    async fn unembeddable_question_returns_empty() {
        let (store, project_id) = seeded_store().await;
        let search = DocumentSearch::new(Arc::new(FixedEmbedder(Vec::new())), store);

        let hits = search.relevant_documents(&project_id, "").await.unwrap();
        assert!(hits.is_empty());
    }
}
