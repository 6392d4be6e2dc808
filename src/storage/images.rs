//! Image embedding rows

use rusqlite::{OptionalExtension, params};
use crate::embedding::{HalfVector, cosine_distance};
use crate::model::{ImageEmbedding, ImageMatch, NewImage};
use crate::Result;
use super::sqlite::SqliteStore;

impl SqliteStore {
    pub fn insert_image_embedding(&self, file_name: &str, image_path: &str, embedding: &HalfVector) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO image_embeddings (file_name, image_path, embedding) VALUES (?1, ?2, ?3)",
            params![file_name, image_path, embedding],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert every image from `images` in one transaction, returning how many were stored
    pub fn import_images<I>(&self, images: I) -> Result<usize>
    where
        I: IntoIterator<Item = NewImage>,
    {
        let tx = self.immediate()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO image_embeddings (file_name, image_path, embedding) VALUES (?1, ?2, ?3)",
            )?;
            for image in images {
                stmt.execute(params![image.file_name, image.image_path, image.embedding])?;
                inserted += 1;
            }
        }
        tx.commit()?;
        tracing::debug!("Imported {} image embeddings", inserted);
        Ok(inserted)
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageEmbedding>> {
        self.conn
            .query_row(
                "SELECT id, file_name, image_path, embedding, created_at FROM image_embeddings WHERE id = ?1",
                [id],
                row_to_image,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Every image that has an embedding, by id
    pub fn image_embeddings(&self) -> Result<Vec<ImageEmbedding>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, file_name, image_path, embedding, created_at
            FROM image_embeddings WHERE embedding IS NOT NULL
            ORDER BY id
            "#,
        )?;
        let images = stmt
            .query_map([], row_to_image)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(images)
    }

    /// Definition of a registered vector index
    pub fn vector_index(&self, name: &str) -> Result<Option<VectorIndexDef>> {
        self.conn
            .query_row(
                r#"
                SELECT name, table_name, column_name, method, metric, dimensions, element_type
                FROM vector_indexes WHERE name = ?1
                "#,
                [name],
                |row| {
                    Ok(VectorIndexDef {
                        name: row.get(0)?,
                        table_name: row.get(1)?,
                        column_name: row.get(2)?,
                        method: row.get(3)?,
                        metric: row.get(4)?,
                        dimensions: row.get(5)?,
                        element_type: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Rank every stored embedding by cosine distance to `query`, closest first
    pub fn nearest_images_exact(&self, query: &HalfVector, k: usize) -> Result<Vec<ImageMatch>> {
        let query = query.to_f32();
        let mut scored: Vec<ImageMatch> = self
            .image_embeddings()?
            .iter()
            .filter_map(|image| {
                let vector = image.embedding.as_ref()?;
                Some(ImageMatch::new(image, cosine_distance(&query, &vector.to_f32())))
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// A row of `vector_indexes`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VectorIndexDef {
    pub name: String,
    pub table_name: String,
    pub column_name: String,
    pub method: String,
    pub metric: String,
    pub dimensions: usize,
    pub element_type: String,
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageEmbedding> {
    Ok(ImageEmbedding {
        id: row.get(0)?,
        file_name: row.get(1)?,
        image_path: row.get(2)?,
        embedding: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIM;
    use crate::IntegrityViolation;

    /// Deterministic vector pointing mostly along axis `axis`
    pub(crate) fn axis_vector(axis: usize) -> HalfVector {
        let values: Vec<f32> = (0..EMBEDDING_DIM)
            .map(|i| if i == axis { 1.0 } else { ((i * 7 + axis * 13) % 11) as f32 * 0.001 })
            .collect();
        HalfVector::from_f32(&values).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        let v = axis_vector(3);
        let id = store.insert_image_embedding("cat.png", "/img/cat.png", &v).unwrap();

        let image = store.get_image(id).unwrap().unwrap();
        assert_eq!(image.file_name, "cat.png");
        assert_eq!(image.embedding, Some(v));
        assert!(store.get_image(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_embedding_is_its_own_nearest_neighbour() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for axis in 0..5 {
            ids.push(
                store
                    .insert_image_embedding(&format!("{}.png", axis), "/img", &axis_vector(axis))
                    .unwrap(),
            );
        }

        for (axis, id) in ids.iter().enumerate() {
            let hits = store.nearest_images_exact(&axis_vector(axis), 2).unwrap();
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].id, *id);
            assert!(hits[0].distance.abs() < 1e-6);
            assert_eq!(hits[0].similarity, 1.0);
        }
    }

    #[test]
    fn test_import_images() {
        let store = SqliteStore::open_in_memory().unwrap();
        let images = (0..4).map(|axis| NewImage {
            file_name: format!("{}.png", axis),
            image_path: format!("/img/{}.png", axis),
            embedding: axis_vector(axis),
        });
        assert_eq!(store.import_images(images).unwrap(), 4);
        assert_eq!(store.image_embeddings().unwrap().len(), 4);
        assert_eq!(store.import_images(Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_storage_rejects_wrong_length_blob() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err: crate::Error = store
            .connection()
            .execute(
                "INSERT INTO image_embeddings (file_name, image_path, embedding) VALUES ('x', 'y', ?1)",
                [vec![0u8; 100]],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(IntegrityViolation::Check));
    }

    #[test]
    fn test_rows_without_embedding_are_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute("INSERT INTO image_embeddings (file_name, image_path) VALUES ('pending.png', '/img')", [])
            .unwrap();
        store.insert_image_embedding("a.png", "/img/a.png", &axis_vector(0)).unwrap();

        assert_eq!(store.count_rows("image_embeddings").unwrap(), 2);
        assert_eq!(store.image_embeddings().unwrap().len(), 1);
    }
}
