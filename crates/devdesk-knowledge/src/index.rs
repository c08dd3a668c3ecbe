//! In-memory vector index with brute-force cosine similarity search.
//!
//! All operations are O(n) for search, which is fine for a knowledge
//! base of a few hundred chunks. Entries are addressed by insertion
//! position; ties in score keep insertion order.

use std::sync::RwLock;

use devdesk_core::error::DevDeskError;

/// A single hit returned from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    /// Position of the chunk in insertion order.
    pub position: usize,
    /// Cosine similarity score.
    pub score: f64,
}

/// In-memory vector index using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    embeddings: RwLock<Vec<Vec<f32>>>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self {
            embeddings: RwLock::new(Vec::new()),
        }
    }

    /// Append an embedding and return its position.
    pub fn push(&self, embedding: Vec<f32>) -> Result<usize, DevDeskError> {
        let mut embeddings = self
            .embeddings
            .write()
            .map_err(|e| DevDeskError::Knowledge(format!("Lock poisoned: {}", e)))?;
        embeddings.push(embedding);
        Ok(embeddings.len() - 1)
    }

    /// Search for the k nearest neighbors by cosine similarity.
    ///
    /// Results are sorted by descending score; equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>, DevDeskError> {
        let embeddings = self
            .embeddings
            .read()
            .map_err(|e| DevDeskError::Knowledge(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<ChunkHit> = embeddings
            .iter()
            .enumerate()
            .map(|(position, embedding)| ChunkHit {
                position,
                score: cosine_similarity(query, embedding),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.embeddings.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
