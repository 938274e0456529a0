use crate::chunker::{Chunk, Chunker};
use crate::document::{load_documents, Document};
use crate::embedder::{embed_batch, Embedder};
use crate::error::{RagError, Result};
use crate::store::{IndexedChunk, VectorStore};
use std::path::Path;

/// Loads, chunks and embeds every document under `docs_dir` into a fresh
/// in-memory store. Nothing is written to disk.
pub fn build_store<E: Embedder + ?Sized>(
    docs_dir: &Path,
    chunker: &Chunker,
    embedder: &E,
    concurrency: usize,
) -> Result<VectorStore> {
    let documents = load_documents(docs_dir)?;
    build_store_from_documents(&documents, chunker, embedder, concurrency)
}

/// Chunks and embeds already loaded documents. Fails with `MissingInput`
/// before calling the embedder when no document yields a chunk.
pub fn build_store_from_documents<E: Embedder + ?Sized>(
    documents: &[Document],
    chunker: &Chunker,
    embedder: &E,
    concurrency: usize,
) -> Result<VectorStore> {
    let mut chunks: Vec<Chunk> = Vec::new();
    for document in documents {
        let document_chunks = chunker.chunk_document(document);
        log::info!(
            "{}: {} chunks ({} words, {} overlap)",
            document.filename,
            document_chunks.len(),
            chunker.chunk_size(),
            chunker.overlap()
        );
        chunks.extend(document_chunks);
    }
    if chunks.is_empty() {
        return Err(RagError::MissingInput(format!(
            "{} documents contain no text",
            documents.len()
        )));
    }
    log::info!("Total: {} chunks from {} documents", chunks.len(), documents.len());

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embed_batch(embedder, &texts, concurrency)?;

    let records = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| IndexedChunk {
            embedding,
            chunk_text: chunk.text,
            filename: chunk.source_filename,
        })
        .collect();
    let store = VectorStore::from_records(records, embedder.model())?;
    log::info!("Index holds {} vectors of dimension {}", store.len(), store.dimension());
    Ok(store)
}
