//! Paragraph ingestor - turns raw text into stored, embedded chunks

use crate::{EmbeddingProvider, EngineError, Result};
use hyrag_core::Chunk;
use hyrag_store::Repository;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fragments shorter than this are noise (headings, page numbers)
const MIN_CHUNK_CHARS: usize = 20;

/// Ingests documents: splits text into paragraph chunks, embeds them in
/// batch, and stores them. Re-ingesting a document replaces its chunks and
/// drops any indexes built over the old ones.
pub struct Ingestor {
    repo: Repository,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Ingestor {
    pub fn new(repo: Repository, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { repo, embedder }
    }

    /// Ingest one document's text
    #[instrument(skip(self, text))]
    pub async fn ingest_text(&self, doc_id: &str, text: &str) -> Result<Vec<Chunk>> {
        info!("Ingesting document {} ({} chars)", doc_id, text.len());

        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = paragraphs.iter().map(|s| s.to_string()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                Chunk::new(doc_id, i as u32, text).with_embedding(embedding)
            })
            .collect();

        // Replace, never append: chunk ids are positional, and any built
        // graph/tree refers to the old chunk set
        self.repo
            .delete_doc(doc_id)
            .await
            .map_err(|e| EngineError::store("delete_doc", e))?;
        self.repo
            .create_chunks(&chunks)
            .await
            .map_err(|e| EngineError::store("create_chunks", e))?;

        info!("Stored {} chunks for document {}", chunks.len(), doc_id);
        Ok(chunks)
    }
}

/// Split on blank lines, trimming and dropping short fragments.
/// Falls back to the whole text when nothing survives the filter.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| p.len() >= MIN_CHUNK_CHARS)
        .collect();

    if paragraphs.is_empty() {
        let whole = text.trim();
        if whole.is_empty() {
            Vec::new()
        } else {
            vec![whole]
        }
    } else {
        paragraphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paragraphs() {
        let text = "First paragraph with enough text.\n\nshort\n\nSecond paragraph, also long enough.";
        let parts = split_paragraphs(text);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("First"));
        assert!(parts[1].starts_with("Second"));
    }

    #[test]
    fn test_split_keeps_minimum_length_fragment() {
        // "exactly twenty chars" sits right on the threshold and survives
        let text = "exactly twenty chars\n\nAnother paragraph long enough to keep.";
        let parts = split_paragraphs(text);
        assert_eq!(parts, vec!["exactly twenty chars", "Another paragraph long enough to keep."]);
    }

    #[test]
    fn test_split_falls_back_to_whole_text() {
        let parts = split_paragraphs("tiny");
        assert_eq!(parts, vec!["tiny"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_paragraphs("   \n\n  ").is_empty());
    }
}
