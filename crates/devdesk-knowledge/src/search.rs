//! Knowledge search facade combining loading, embedding, and the index.
//!
//! Builds the chunk index once at startup, then answers top-k queries and
//! renders the `[Source: file]` context blocks handed to the LLM.

use std::path::Path;

use tracing::info;

use devdesk_core::error::DevDeskError;
use devdesk_core::types::DocChunk;

use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::index::ChunkIndex;
use crate::loader;

/// A chunk matched by a search, with its similarity score.
#[derive(Debug, Clone)]
pub struct KnowledgeHit {
    pub chunk: DocChunk,
    pub score: f64,
}

/// Rendered context for the LLM plus the distinct source filenames it cites.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeContext {
    pub text: String,
    pub sources: Vec<String>,
}

/// Vector search over the markdown knowledge base.
pub struct KnowledgeSearch {
    chunks: Vec<DocChunk>,
    index: ChunkIndex,
    embedder: Box<dyn DynEmbeddingService>,
    top_k: usize,
    snippet_max_chars: usize,
}

impl KnowledgeSearch {
    /// Load and index every markdown file under `kb_dir`.
    pub async fn build(
        kb_dir: &Path,
        embedder: impl EmbeddingService + 'static,
        top_k: usize,
        snippet_max_chars: usize,
    ) -> Result<Self, DevDeskError> {
        let chunks = loader::load_documents(kb_dir)?;
        Self::from_chunks(chunks, Box::new(embedder), top_k, snippet_max_chars).await
    }

    /// Index a pre-built chunk list.
    pub async fn from_chunks(
        chunks: Vec<DocChunk>,
        embedder: Box<dyn DynEmbeddingService>,
        top_k: usize,
        snippet_max_chars: usize,
    ) -> Result<Self, DevDeskError> {
        let index = ChunkIndex::new();
        for chunk in &chunks {
            let embedding = embedder.embed_boxed(&chunk.content).await?;
            index.push(embedding)?;
        }
        info!("Indexed {} knowledge chunks", chunks.len());
        Ok(Self {
            chunks,
            index,
            embedder,
            top_k,
            snippet_max_chars,
        })
    }

    /// Top-k chunks most similar to the query.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeHit>, DevDeskError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_boxed(query).await?;
        let hits = self.index.search(&query_vec, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| KnowledgeHit {
                chunk: self.chunks[hit.position].clone(),
                score: hit.score,
            })
            .collect())
    }

    /// Render the top-k results as LLM context blocks.
    ///
    /// Each block is `[Source: <filename>]` followed by the chunk content
    /// truncated to the snippet limit. Source filenames are deduplicated
    /// in hit order.
    pub async fn context(&self, query: &str) -> Result<KnowledgeContext, DevDeskError> {
        let hits = self.search(query, self.top_k).await?;

        let mut blocks = Vec::with_capacity(hits.len());
        let mut sources: Vec<String> = Vec::new();
        for hit in &hits {
            let mut snippet: String =
                hit.chunk.content.chars().take(self.snippet_max_chars).collect();
            if hit.chunk.content.chars().count() > self.snippet_max_chars {
                snippet.push_str("...");
            }
            blocks.push(format!("[Source: {}]\n{}", hit.chunk.filename, snippet));
            if !sources.contains(&hit.chunk.filename) {
                sources.push(hit.chunk.filename.clone());
            }
        }

        Ok(KnowledgeContext {
            text: blocks.join("\n\n"),
            sources,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl std::fmt::Debug for KnowledgeSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeSearch")
            .field("chunks", &self.chunks.len())
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedding;

    fn chunk(id: &str, filename: &str, content: &str) -> DocChunk {
        DocChunk {
            id: id.to_string(),
            filename: filename.to_string(),
            title: "Test".to_string(),
            content: content.to_string(),
        }
    }

    async fn make_search(chunks: Vec<DocChunk>) -> KnowledgeSearch {
        KnowledgeSearch::from_chunks(chunks, Box::new(MockEmbedding::new()), 3, 500)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_kb_returns_no_hits() {
        let search = make_search(vec![]).await;
        assert!(search.is_empty());
        let hits = search.search("anything", 3).await.unwrap();
        assert!(hits.is_empty());

        let ctx = search.context("anything").await.unwrap();
        assert!(ctx.text.is_empty());
        assert!(ctx.sources.is_empty());
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first() {
        let search = make_search(vec![
            chunk("a_0", "a.md", "How to roll back a deployment"),
            chunk("b_0", "b.md", "Office snack policy and kitchen rules"),
        ])
        .await;

        // MockEmbedding gives identical text a perfect score.
        let hits = search.search("How to roll back a deployment", 2).await.unwrap();
        assert_eq!(hits[0].chunk.filename, "a.md");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_context_blocks_and_sources() {
        let search = make_search(vec![
            chunk("a_0", "deploy.md", "Rollback instructions"),
            chunk("a_1", "deploy.md", "Release checklist"),
            chunk("b_0", "oncall.md", "Paging policy"),
        ])
        .await;

        let ctx = search.context("rollback").await.unwrap();
        assert!(ctx.text.contains("[Source: deploy.md]"));
        // Filenames are deduplicated.
        assert_eq!(
            ctx.sources.iter().filter(|s| s.as_str() == "deploy.md").count(),
            1
        );
        assert!(ctx.sources.len() <= 2);
    }

    #[tokio::test]
    async fn test_snippet_truncated() {
        let long = "x".repeat(2000);
        let chunks = vec![chunk("a_0", "long.md", &long)];
        let search = KnowledgeSearch::from_chunks(chunks, Box::new(MockEmbedding::new()), 3, 500)
            .await
            .unwrap();

        let ctx = search.context("anything").await.unwrap();
        // Header line plus 500 chars of content and the ellipsis.
        let body = ctx.text.lines().skip(1).collect::<String>();
        assert_eq!(body.chars().count(), 503);
        assert!(body.ends_with("..."));
    }

    #[tokio::test]
    async fn test_top_k_limits_context() {
        let chunks: Vec<DocChunk> = (0..10)
            .map(|i| chunk(&format!("c_{}", i), &format!("f{}.md", i), &format!("doc {}", i)))
            .collect();
        let search = make_search(chunks).await;

        let ctx = search.context("doc").await.unwrap();
        assert_eq!(ctx.text.matches("[Source:").count(), 3);
    }
}
