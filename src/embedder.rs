use crate::config::Number;
use crate::error::{RagError, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const PROGRESS_EVERY: usize = 10;

/// Turns text into a fixed-dimension vector. Build and query must use the
/// same model or distances are meaningless.
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<Number>>;
}

/// Embeds `texts` on a pool of `concurrency` threads. The output is in
/// input order regardless of completion order; the first failure aborts
/// the batch.
pub fn embed_batch<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    concurrency: usize,
) -> Result<Vec<Vec<Number>>> {
    log::info!(
        "Embedding {} chunks with {} ({} workers)",
        texts.len(),
        embedder.model(),
        concurrency.max(1)
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|e| RagError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let done = AtomicUsize::new(0);
    let total = texts.len();
    let embeddings = pool.install(|| {
        texts
            .par_iter()
            .map(|text| {
                let embedding = embedder.embed(text)?;
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if finished % PROGRESS_EVERY == 0 {
                    log::info!("Embedding progress: {}/{}", finished, total);
                }
                Ok(embedding)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    log::info!("Created {} embeddings", embeddings.len());
    Ok(embeddings)
}
