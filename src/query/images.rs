//! Approximate similarity search over image embeddings
//!
//! The HNSW graph for `idx_image_embeddings_hnsw` is rebuilt in memory from
//! the stored vectors; its dimensions and metric come from the
//! `vector_indexes` registry row.

use std::collections::HashMap;
use crate::embedding::{HalfVector, HnswIndex, HnswParams};
use crate::model::{ImageEmbedding, ImageMatch};
use crate::storage::schema::IMAGE_EMBEDDINGS_ANN_INDEX;
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Number of matches returned when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 2;

/// Similarity search backed by an HNSW index
pub struct ImageSearch {
    index: HnswIndex,
    images: HashMap<i64, ImageEmbedding>,
}

impl ImageSearch {
    /// Build the index from every stored embedding
    pub fn build(store: &SqliteStore, params: HnswParams) -> Result<Self> {
        let definition = store
            .vector_index(IMAGE_EMBEDDINGS_ANN_INDEX)?
            .ok_or_else(|| Error::NotFound(format!("vector index {}", IMAGE_EMBEDDINGS_ANN_INDEX)))?;
        if definition.metric != "cosine" {
            return Err(Error::InvalidValue(format!(
                "index {} uses unsupported metric {}",
                definition.name, definition.metric
            )));
        }

        let mut index = HnswIndex::new(definition.dimensions, params);
        let mut images = HashMap::new();
        for mut image in store.image_embeddings()? {
            let Some(vector) = image.embedding.take() else {
                continue;
            };
            index.insert(image.id, vector.to_f32())?;
            images.insert(image.id, image);
        }

        tracing::info!("Built {} over {} images", definition.name, index.len());
        Ok(Self { index, images })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Up to `top_k` images closest to `query` whose similarity is at least `min_similarity`
    pub fn similar(&self, query: &HalfVector, top_k: usize, min_similarity: f64) -> Result<Vec<ImageMatch>> {
        let hits = self.index.search(&query.to_f32(), top_k)?;
        let matches = hits
            .into_iter()
            .filter_map(|(id, distance)| self.images.get(&id).map(|image| ImageMatch::new(image, distance)))
            .filter(|m| m.similarity >= min_similarity)
            .collect();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIM;

    fn axis_vector(axis: usize) -> HalfVector {
        let values: Vec<f32> = (0..EMBEDDING_DIM)
            .map(|i| if i == axis { 1.0 } else { ((i * 5 + axis * 3) % 13) as f32 * 0.002 })
            .collect();
        HalfVector::from_f32(&values).unwrap()
    }

    fn populated(n: usize) -> (SqliteStore, Vec<i64>) {
        let store = SqliteStore::open_in_memory().unwrap();
        let ids = (0..n)
            .map(|axis| {
                store
                    .insert_image_embedding(&format!("img{}.png", axis), &format!("/data/img{}.png", axis), &axis_vector(axis))
                    .unwrap()
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let search = ImageSearch::build(&store, HnswParams::default()).unwrap();
        assert!(search.is_empty());
        assert!(search.similar(&axis_vector(0), DEFAULT_TOP_K, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_similar_finds_itself_first() {
        let (store, ids) = populated(20);
        let search = ImageSearch::build(&store, HnswParams::default()).unwrap();
        assert_eq!(search.len(), 20);

        for (axis, id) in ids.iter().enumerate() {
            let matches = search.similar(&axis_vector(axis), DEFAULT_TOP_K, 0.0).unwrap();
            assert_eq!(matches.len(), 2);
            assert_eq!(matches[0].id, *id);
            assert_eq!(matches[0].similarity, 1.0);
            assert_eq!(matches[0].file_name, format!("img{}.png", axis));
            assert!(matches[0].distance <= matches[1].distance);
        }
    }

    #[test]
    fn test_clustered_images_find_themselves() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        let centers: Vec<Vec<f32>> = (0..6)
            .map(|_| (0..EMBEDDING_DIM).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
            .collect();
        let store = SqliteStore::open_in_memory().unwrap();
        let mut images = Vec::new();
        for i in 0..240 {
            let values: Vec<f32> = centers[i / 40].iter().map(|c| c + rng.gen_range(-0.05f32..0.05)).collect();
            let vector = HalfVector::from_f32(&values).unwrap();
            let id = store
                .insert_image_embedding(&format!("class{}.png", i), &format!("/data/class{}.png", i), &vector)
                .unwrap();
            images.push((id, vector));
        }

        let search = ImageSearch::build(&store, HnswParams::default()).unwrap();
        for (id, vector) in &images {
            let matches = search.similar(vector, DEFAULT_TOP_K, 0.0).unwrap();
            assert_eq!(matches[0].id, *id);
            assert_eq!(matches[0].similarity, 1.0);
        }
    }

    #[test]
    fn test_agrees_with_exact_search() {
        let (store, _) = populated(30);
        let search = ImageSearch::build(&store, HnswParams::default()).unwrap();
        let query = axis_vector(7);

        let approx = search.similar(&query, 1, 0.0).unwrap();
        let exact = store.nearest_images_exact(&query, 1).unwrap();
        assert_eq!(approx[0].id, exact[0].id);
    }

    #[test]
    fn test_min_similarity_filters() {
        let (store, ids) = populated(10);
        let search = ImageSearch::build(&store, HnswParams::default()).unwrap();
        let matches = search.similar(&axis_vector(4), 5, 0.99).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, ids[4]);
    }
}
