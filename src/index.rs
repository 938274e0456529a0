use crate::config::Number;
use crate::error::{RagError, Result};
use crate::vector_ops::l2_distance_squared_simd;
use rayon::prelude::*;
use std::mem::size_of;

const INDEX_MAGIC: &[u8; 8] = b"SRAGIDX1";
const DIMENSION_OFFSET: usize = INDEX_MAGIC.len();
const COUNT_OFFSET: usize = DIMENSION_OFFSET + size_of::<u32>();
const HEADER_LEN: usize = COUNT_OFFSET + size_of::<u64>();

/// Exact nearest-neighbour index over squared L2 distance.
///
/// Vectors live back to back in one contiguous buffer; position `i` is the
/// `i`-th vector added. The index is append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<Number>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::CorruptStore(
                "index dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends all vectors or none of them.
    pub fn add(&mut self, embeddings: &[Vec<Number>]) -> Result<()> {
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        self.data.reserve(embeddings.len() * self.dimension);
        for embedding in embeddings {
            self.data.extend_from_slice(embedding);
        }
        Ok(())
    }

    pub fn get_vector(&self, position: usize) -> Option<&[Number]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Returns up to `k` `(position, distance)` pairs, closest first. Equal
    /// distances are ordered by position.
    pub fn search(&self, query: &[Number], k: usize) -> Result<Vec<(usize, Number)>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, Number)> = self
            .data
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| {
                // NaN (e.g. inf - inf) ranks with the farthest rows.
                let distance = l2_distance_squared_simd(query, vector)
                    .filter(|d| !d.is_nan())
                    .unwrap_or(Number::INFINITY);
                (position, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Serializes as magic, `u32` dimension, `u64` count, then the raw
    /// little-endian floats.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * size_of::<Number>());
        bytes.extend_from_slice(INDEX_MAGIC);
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend(self.data.iter().flat_map(|&num| num.to_le_bytes()));
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..INDEX_MAGIC.len()] != INDEX_MAGIC {
            return Err(RagError::CorruptStore(
                "index file has no valid header".to_string(),
            ));
        }

        let mut dimension_bytes = [0u8; 4];
        dimension_bytes.copy_from_slice(&bytes[DIMENSION_OFFSET..COUNT_OFFSET]);
        let dimension = u32::from_le_bytes(dimension_bytes) as usize;

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[COUNT_OFFSET..HEADER_LEN]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(size_of::<Number>()));
        if expected != Some(body.len()) {
            return Err(RagError::CorruptStore(format!(
                "index declares {} vectors of dimension {} but holds {} bytes",
                count,
                dimension,
                body.len()
            )));
        }

        let mut index = Self::new(dimension)?;
        index.data = body
            .chunks_exact(size_of::<Number>())
            .map(|b| Number::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(index)
    }
}
