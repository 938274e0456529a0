use secrag::{
    build_store, build_store_from_documents, Answer, ChatMessage, ChatModel, Chunker, Document,
    Embedder, Number, PromptStyle, QueryEngine, RagError, Result, StorePaths, VectorStore,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::tempdir;

const DIM: usize = 64;

/// Bag-of-words hashing embedder: identical word multisets give identical vectors.
#[derive(Default)]
struct HashingEmbedder {
    calls: AtomicUsize,
}

impl HashingEmbedder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        "hashing-test"
    }

    fn embed(&self, text: &str) -> Result<Vec<Number>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; DIM];
        for word in text.split_whitespace() {
            let bucket = word
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            vector[bucket as usize % DIM] += 1.0;
        }
        Ok(vector)
    }
}

struct WideEmbedder;

impl Embedder for WideEmbedder {
    fn model(&self) -> &str {
        "wide-test"
    }

    fn embed(&self, _text: &str) -> Result<Vec<Number>> {
        Ok(vec![0.5; DIM * 2])
    }
}

#[derive(Default)]
struct EchoChat {
    prompts: Mutex<Vec<String>>,
}

impl ChatModel for EchoChat {
    fn model(&self) -> &str {
        "echo-test"
    }

    fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<Answer> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(Answer {
            text: "Laut [a.md] ...".to_string(),
            total_tokens: 123,
        })
    }
}

fn words(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect::<Vec<_>>().join(" ")
}

fn write_docs(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("a.md"), words("alpha", 150)).unwrap();
    fs::write(dir.join("b.md"), words("beta", 150)).unwrap();
}

#[test]
fn two_short_documents_yield_one_chunk_each() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    write_docs(&docs);
    let embedder = HashingEmbedder::default();

    let store = build_store(&docs, &Chunker::default(), &embedder, 4).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.dimension(), DIM);

    let query = fs::read_to_string(docs.join("a.md")).unwrap();
    let query_vector = embedder.embed(&query).unwrap();
    let hits = store.search(&query_vector, 2).unwrap();
    assert_eq!(hits[0].filename, "a.md");
    assert_eq!(hits[0].distance, 0.0);
    assert!(hits[0].distance < hits[1].distance);
}

#[test]
fn every_position_holds_the_embedding_of_its_chunk() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("long.md"), words("lang", 700)).unwrap();
    fs::write(docs.join("short.md"), words("kurz", 40)).unwrap();
    let embedder = HashingEmbedder::default();

    let store = build_store(&docs, &Chunker::new(100, 20).unwrap(), &embedder, 3).unwrap();
    // long.md: ceil((700 - 20) / 80) windows; short.md: one
    assert_eq!(store.len(), 9 + 1);
    for position in 0..store.len() {
        let meta = store.metadata(position).unwrap();
        let expected = embedder.embed(&meta.chunk_text).unwrap();
        assert_eq!(store.vector(position).unwrap(), expected.as_slice());
    }
    assert_eq!(store.metadata(0).unwrap().filename, "long.md");
    assert_eq!(store.metadata(9).unwrap().filename, "short.md");
}

#[test]
fn build_fails_fast_without_documents() {
    let temp = tempdir().unwrap();
    let embedder = HashingEmbedder::default();
    let docs = temp.path().join("docs");
    let err = build_store(&docs, &Chunker::default(), &embedder, 2).unwrap_err();
    assert!(matches!(err, RagError::MissingInput(_)));
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn blank_documents_are_rejected_before_embedding() {
    let documents = vec![Document {
        filename: "leer.md".to_string(),
        content: " \n\t ".to_string(),
    }];
    let embedder = HashingEmbedder::default();
    let err = build_store_from_documents(&documents, &Chunker::default(), &embedder, 2)
        .unwrap_err();
    assert!(matches!(err, RagError::MissingInput(_)));
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn query_without_index_fails_before_any_service_call() {
    let temp = tempdir().unwrap();
    let paths = StorePaths::new(temp.path().join("index.bin"), temp.path().join("meta.bin"));
    let embedder = HashingEmbedder::default();
    let chat = EchoChat::default();

    let result = QueryEngine::open(&paths, &embedder, &chat, 600);
    assert!(matches!(result, Err(RagError::MissingIndex(_))));
    assert_eq!(embedder.calls(), 0);
    assert!(chat.prompts.lock().unwrap().is_empty());
}

#[test]
fn persisted_store_answers_like_the_in_memory_one() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    write_docs(&docs);
    let paths = StorePaths::new(temp.path().join("index.bin"), temp.path().join("meta.bin"));
    let embedder = HashingEmbedder::default();
    let chat = EchoChat::default();

    let store = build_store(&docs, &Chunker::default(), &embedder, 2).unwrap();
    store.save(&paths, true).unwrap();

    let in_memory = QueryEngine::new(store, &embedder, &chat, 600);
    let reloaded = QueryEngine::open(&paths, &embedder, &chat, 600).unwrap();
    let question = "alpha1 alpha2 beta3";
    assert_eq!(
        reloaded.retrieve(question, 2).unwrap(),
        in_memory.retrieve(question, 2).unwrap()
    );

    let response = reloaded.answer(question, 1, PromptStyle::Cite).unwrap();
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.answer.total_tokens, 123);
    let prompts = chat.prompts.lock().unwrap();
    assert!(prompts[0].contains(&format!("Source: {}\n", response.sources[0].filename)));
    assert!(prompts[0].contains("Frage: alpha1 alpha2 beta3"));
}

#[test]
fn switching_embedding_model_is_a_dimension_mismatch() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    write_docs(&docs);
    let store = build_store(&docs, &Chunker::default(), &HashingEmbedder::default(), 1).unwrap();
    let chat = EchoChat::default();

    let engine = QueryEngine::new(store, &WideEmbedder, &chat, 600);
    let err = engine.answer("Was ist ein VPN?", 3, PromptStyle::Cite).unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch { expected: DIM, actual } if actual == DIM * 2
    ));
    assert!(chat.prompts.lock().unwrap().is_empty());
}

#[test]
fn loaded_store_remembers_build_model() {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    write_docs(&docs);
    let paths = StorePaths::new(temp.path().join("i.bin"), temp.path().join("m.bin"));
    build_store(&docs, &Chunker::default(), &HashingEmbedder::default(), 1)
        .unwrap()
        .save(&paths, false)
        .unwrap();
    assert_eq!(VectorStore::load(&paths).unwrap().embedding_model(), "hashing-test");
}
