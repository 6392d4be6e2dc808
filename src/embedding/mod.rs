//! Image embeddings - fixed-dimension half-precision vectors
//!
//! Vectors are stored in `image_embeddings.embedding` as little-endian f16
//! blobs of exactly `EMBEDDING_DIM` values. The dimension is enforced when a
//! [`HalfVector`] is built, and again by a CHECK on the blob length.

pub mod hnsw;

pub use hnsw::{HnswIndex, HnswParams};

use crate::{Error, Result};
use half::f16;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// Dimensionality of image embeddings
pub const EMBEDDING_DIM: usize = 3584;

/// Size in bytes of an encoded embedding
pub const EMBEDDING_BYTES: usize = EMBEDDING_DIM * 2;

/// A 3584-dimension half-precision vector
#[derive(Debug, Clone, PartialEq)]
pub struct HalfVector(Box<[f16; EMBEDDING_DIM]>);

impl HalfVector {
    /// Quantize f32 values to half precision. Fails unless exactly `EMBEDDING_DIM` values are given.
    pub fn from_f32(values: &[f32]) -> Result<Self> {
        if values.len() != EMBEDDING_DIM {
            return Err(Error::Dimension { expected: EMBEDDING_DIM, actual: values.len() });
        }
        let halves: Box<[f16]> = values.iter().map(|v| f16::from_f32(*v)).collect();
        Self::from_boxed(halves)
    }

    fn from_boxed(halves: Box<[f16]>) -> Result<Self> {
        let actual = halves.len();
        let fixed: Box<[f16; EMBEDDING_DIM]> = halves
            .try_into()
            .map_err(|_| Error::Dimension { expected: EMBEDDING_DIM, actual })?;
        Ok(Self(fixed))
    }

    /// Widen back to f32
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|h| h.to_f32()).collect()
    }

    pub fn as_slice(&self) -> &[f16] {
        &self.0[..]
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|h| h.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EMBEDDING_BYTES {
            return Err(Error::Dimension { expected: EMBEDDING_DIM, actual: bytes.len() / 2 });
        }
        let halves: Box<[f16]> = bytes
            .chunks_exact(2)
            .map(|pair| f16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::from_boxed(halves)
    }
}

impl ToSql for HalfVector {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_bytes()))
    }
}

impl FromSql for HalfVector {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        HalfVector::from_bytes(blob).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Cosine distance `1 - cos(a, b)`.
///
/// Returns 1.0 for mismatched lengths or zero-norm input, and never goes below 0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        (1.0 - dot_product / (norm_a * norm_b)).max(0.0)
    }
}
