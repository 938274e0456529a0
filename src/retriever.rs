use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::generator::{generate_answer, Answer, ChatModel};
use crate::prompt::PromptStyle;
use crate::store::{SearchResult, StorePaths, VectorStore};
use serde::Serialize;

/// Embeds `query` and returns the `top_k` closest chunks, closest first.
/// Overlapping chunks from the same region are not deduplicated.
pub fn retrieve<E: Embedder + ?Sized>(
    embedder: &E,
    store: &VectorStore,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    if embedder.model() != store.embedding_model() {
        log::warn!(
            "Query model {} differs from the model the store was built with ({})",
            embedder.model(),
            store.embedding_model()
        );
    }

    let query_vector = embedder.embed(query)?;
    if query_vector.len() != store.dimension() {
        return Err(RagError::DimensionMismatch {
            expected: store.dimension(),
            actual: query_vector.len(),
        });
    }

    let results = store.search(&query_vector, top_k)?;
    log::debug!("Retrieved {} chunks for {:?}", results.len(), query);
    Ok(results)
}

#[derive(Serialize, Debug, Clone)]
pub struct RagResponse {
    pub query: String,
    pub sources: Vec<SearchResult>,
    pub answer: Answer,
}

/// Query-phase facade over a loaded store and injected service handles.
pub struct QueryEngine<'a, E: ?Sized, C: ?Sized> {
    store: VectorStore,
    embedder: &'a E,
    chat: &'a C,
    max_tokens: u32,
}

impl<'a, E, C> QueryEngine<'a, E, C>
where
    E: Embedder + ?Sized,
    C: ChatModel + ?Sized,
{
    pub fn new(store: VectorStore, embedder: &'a E, chat: &'a C, max_tokens: u32) -> Self {
        Self {
            store,
            embedder,
            chat,
            max_tokens,
        }
    }

    /// Loads the persisted store before anything talks to the service, so a
    /// missing build fails fast.
    pub fn open(paths: &StorePaths, embedder: &'a E, chat: &'a C, max_tokens: u32) -> Result<Self> {
        let store = VectorStore::load(paths)?;
        Ok(Self::new(store, embedder, chat, max_tokens))
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        retrieve(self.embedder, &self.store, query, top_k)
    }

    pub fn generate(
        &self,
        query: &str,
        sources: &[SearchResult],
        style: PromptStyle,
    ) -> Result<Answer> {
        generate_answer(self.chat, query, sources, style, self.max_tokens)
    }

    pub fn answer(&self, query: &str, top_k: usize, style: PromptStyle) -> Result<RagResponse> {
        let sources = self.retrieve(query, top_k)?;
        let answer = self.generate(query, &sources, style)?;
        Ok(RagResponse {
            query: query.to_string(),
            sources,
            answer,
        })
    }
}
