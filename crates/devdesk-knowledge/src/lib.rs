//! Markdown knowledge base with vector search.
//!
//! Loads `.md` files from a directory, splits them into heading-aware
//! chunks, embeds each chunk, and answers top-k similarity queries used
//! to build LLM context.

pub mod embedding;
pub mod index;
pub mod loader;
pub mod search;

pub use embedding::{DynEmbeddingService, EmbeddingService, HttpEmbeddingService, MockEmbedding};
pub use index::{ChunkIndex, ChunkHit};
pub use loader::load_documents;
pub use search::{KnowledgeContext, KnowledgeHit, KnowledgeSearch};
