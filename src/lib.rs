//! Retrieval-augmented question answering over a folder of markdown
//! documents: word-window chunking, embeddings from an OpenAI-compatible
//! service, an exact L2 vector index persisted to disk, and prompt
//! composition for a chat model.

pub mod builder;
pub mod chunker;
pub mod client;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod index;
pub mod prompt;
pub mod retriever;
pub mod store;
pub mod vector_ops;

pub use builder::{build_store, build_store_from_documents};
pub use chunker::{Chunk, Chunker};
pub use client::OpenAiClient;
pub use config::{Number, State};
pub use document::{load_documents, Document};
pub use embedder::{embed_batch, Embedder};
pub use error::{RagError, Result};
pub use generator::{generate_answer, Answer, ChatMessage, ChatModel};
pub use index::FlatL2Index;
pub use prompt::{build_context, compose_prompt, PromptStyle};
pub use retriever::{retrieve, QueryEngine, RagResponse};
pub use store::{ChunkMetadata, IndexedChunk, SearchResult, StorePaths, VectorStore};
