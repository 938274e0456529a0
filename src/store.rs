use crate::config::{Number, State};
use crate::error::{RagError, Result};
use crate::index::FlatL2Index;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const METADATA_FORMAT_VERSION: u32 = 1;

/// One chunk together with its embedding. Building a store from these
/// keeps vectors and metadata aligned by construction.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub embedding: Vec<Number>,
    pub chunk_text: String,
    pub filename: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk_text: String,
}

#[derive(Deserialize, Serialize)]
struct MetadataFile {
    format_version: u32,
    dimension: u32,
    embedding_model: String,
    index_sha256: String,
    records: Vec<ChunkMetadata>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub chunk_text: String,
    pub filename: String,
    pub distance: Number,
}

impl SearchResult {
    /// The first `max_chars` characters of the chunk on a single line.
    pub fn preview(&self, max_chars: usize) -> String {
        self.chunk_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(max_chars)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl StorePaths {
    pub fn new(index: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            metadata: metadata.into(),
        }
    }

    pub fn from_state(state: &State) -> Self {
        Self::new(&state.index_path, &state.metadata_path)
    }

    pub fn exist(&self) -> bool {
        self.index.is_file() && self.metadata.is_file()
    }
}

/// Vector index and chunk metadata kept side by side. Position `i` of the
/// index always describes `metadata[i]`.
#[derive(Debug, Clone)]
pub struct VectorStore {
    index: FlatL2Index,
    metadata: Vec<ChunkMetadata>,
    embedding_model: String,
}

impl VectorStore {
    pub fn new(dimension: usize, embedding_model: &str) -> Result<Self> {
        Ok(Self {
            index: FlatL2Index::new(dimension)?,
            metadata: Vec::new(),
            embedding_model: embedding_model.to_string(),
        })
    }

    /// The dimension is taken from the first record.
    pub fn from_records(records: Vec<IndexedChunk>, embedding_model: &str) -> Result<Self> {
        let dimension = records
            .first()
            .map(|r| r.embedding.len())
            .ok_or_else(|| RagError::MissingInput("no chunks to index".to_string()))?;
        let mut store = Self::new(dimension, embedding_model)?;
        for record in records {
            store.push(record)?;
        }
        Ok(store)
    }

    pub fn push(&mut self, record: IndexedChunk) -> Result<()> {
        self.index.add(std::slice::from_ref(&record.embedding))?;
        self.metadata.push(ChunkMetadata {
            filename: record.filename,
            chunk_text: record.chunk_text,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn metadata(&self, position: usize) -> Option<&ChunkMetadata> {
        self.metadata.get(position)
    }

    pub fn vector(&self, position: usize) -> Option<&[Number]> {
        self.index.get_vector(position)
    }

    pub fn search(&self, query: &[Number], k: usize) -> Result<Vec<SearchResult>> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|(position, distance)| {
                let meta = self.metadata.get(position).ok_or_else(|| {
                    RagError::CorruptStore(format!("no metadata for index position {}", position))
                })?;
                Ok(SearchResult {
                    chunk_text: meta.chunk_text.clone(),
                    filename: meta.filename.clone(),
                    distance,
                })
            })
            .collect()
    }

    /// Writes both files next to their targets and renames them into place
    /// only after both writes succeeded. With `backup`, files being replaced
    /// are kept as `*.bak`.
    pub fn save(&self, paths: &StorePaths, backup: bool) -> Result<()> {
        let index_bytes = self.index.encode();
        let metadata_file = MetadataFile {
            format_version: METADATA_FORMAT_VERSION,
            dimension: self.dimension() as u32,
            embedding_model: self.embedding_model.clone(),
            index_sha256: sha256_hex(&index_bytes),
            records: self.metadata.clone(),
        };
        let metadata_bytes = bincode::serialize(&metadata_file)?;

        let index_tmp = with_suffix(&paths.index, "tmp");
        let metadata_tmp = with_suffix(&paths.metadata, "tmp");
        write_synced(&index_tmp, &index_bytes)?;
        if let Err(e) = write_synced(&metadata_tmp, &metadata_bytes) {
            let _ = fs::remove_file(&index_tmp);
            return Err(e);
        }

        if backup {
            for target in [&paths.index, &paths.metadata] {
                if target.exists() {
                    let bak = with_suffix(target, "bak");
                    log::warn!(
                        "Replacing existing {}; previous copy kept at {}",
                        target.display(),
                        bak.display()
                    );
                    fs::rename(target, &bak)?;
                }
            }
        }

        fs::rename(&index_tmp, &paths.index)?;
        fs::rename(&metadata_tmp, &paths.metadata)?;
        log::info!(
            "Saved {} vectors to {} and {}",
            self.len(),
            paths.index.display(),
            paths.metadata.display()
        );
        Ok(())
    }

    pub fn load(paths: &StorePaths) -> Result<Self> {
        for path in [&paths.index, &paths.metadata] {
            if !path.is_file() {
                return Err(RagError::MissingIndex(path.clone()));
            }
        }

        let file = File::open(&paths.index)?;
        // The file is replaced by rename, never rewritten in place.
        let mmap = unsafe { Mmap::map(&file)? };
        let index = FlatL2Index::decode(&mmap)?;
        let index_sha256 = sha256_hex(&mmap);

        let metadata_file: MetadataFile = bincode::deserialize(&fs::read(&paths.metadata)?)?;
        if metadata_file.format_version != METADATA_FORMAT_VERSION {
            return Err(RagError::CorruptStore(format!(
                "unsupported metadata format_version {} (expected {})",
                metadata_file.format_version, METADATA_FORMAT_VERSION
            )));
        }
        if metadata_file.index_sha256 != index_sha256 {
            return Err(RagError::CorruptStore(
                "index file does not belong to this metadata file".to_string(),
            ));
        }
        if metadata_file.records.len() != index.len()
            || metadata_file.dimension as usize != index.dimension()
        {
            return Err(RagError::CorruptStore(format!(
                "metadata describes {} records of dimension {}, index holds {} of dimension {}",
                metadata_file.records.len(),
                metadata_file.dimension,
                index.len(),
                index.dimension()
            )));
        }

        log::debug!("Loaded {} vectors from {}", index.len(), paths.index.display());
        Ok(Self {
            index,
            metadata: metadata_file.records,
            embedding_model: metadata_file.embedding_model,
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
