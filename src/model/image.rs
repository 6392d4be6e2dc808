//! Stored image embeddings and similarity hits

use crate::embedding::HalfVector;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A row of `image_embeddings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEmbedding {
    pub id: i64,
    pub file_name: String,
    pub image_path: String,
    #[serde(skip)]
    pub embedding: Option<HalfVector>,
    pub created_at: NaiveDateTime,
}

/// An image to be stored with its embedding
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub image_path: String,
    pub embedding: HalfVector,
}

/// An image ranked against a query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMatch {
    pub id: i64,
    pub file_name: String,
    pub image_path: String,
    /// Cosine distance to the query
    pub distance: f32,
    /// `1 - distance`, rounded to 4 decimals
    pub similarity: f64,
}

impl ImageMatch {
    pub fn new(image: &ImageEmbedding, distance: f32) -> Self {
        Self {
            id: image.id,
            file_name: image.file_name.clone(),
            image_path: image.image_path.clone(),
            distance,
            similarity: similarity(distance),
        }
    }
}

/// Similarity score shown for a cosine distance
pub fn similarity(distance: f32) -> f64 {
    ((1.0 - distance as f64) * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_rounding() {
        assert_eq!(similarity(0.0), 1.0);
        assert_eq!(similarity(0.123456), 0.8765);
        assert_eq!(similarity(1.0), 0.0);
    }
}
