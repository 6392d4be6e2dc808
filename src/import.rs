//! Bulk loading of image embeddings from JSON Lines
//!
//! Each non-blank line is an object with `file_name`, `image_path` and an
//! `embedding` array of 3584 numbers. A reader thread parses and validates
//! lines and sends them over a channel; the thread owning the store inserts
//! them in a single transaction. Invalid lines, including bytes that are not
//! UTF-8, are reported and skipped.

use crossbeam::channel::{self, Receiver};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use crate::embedding::HalfVector;
use crate::model::NewImage;
use crate::storage::SqliteStore;
use crate::Result;

/// Lines buffered between the reader and the inserting thread
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
struct ImportRecord {
    file_name: String,
    image_path: String,
    embedding: Vec<f32>,
}

/// Events produced while reading an import file
#[derive(Debug)]
pub enum ImportMessage {
    /// A valid line; `offset` is the number of bytes read so far
    Row { line: usize, offset: u64, image: NewImage },
    /// A line that could not be imported
    Invalid { line: usize, offset: u64, reason: String },
    /// The reader stopped on an I/O error
    Failed(String),
}

impl ImportMessage {
    pub fn offset(&self) -> Option<u64> {
        match self {
            ImportMessage::Row { offset, .. } | ImportMessage::Invalid { offset, .. } => Some(*offset),
            ImportMessage::Failed(_) => None,
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

fn parse_line(text: &str) -> std::result::Result<NewImage, String> {
    let record: ImportRecord = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let embedding = HalfVector::from_f32(&record.embedding).map_err(|e| e.to_string())?;
    Ok(NewImage { file_name: record.file_name, image_path: record.image_path, embedding })
}

/// Start a reader thread over `path`; the channel closes at end of file
pub fn spawn_reader(path: &Path) -> Result<Receiver<ImportMessage>> {
    let file = File::open(path)?;
    let (tx, rx) = channel::bounded(CHANNEL_CAPACITY);

    thread::spawn(move || {
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut offset = 0u64;
        let mut line = 0usize;
        loop {
            buf.clear();
            let read = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    let _ = tx.send(ImportMessage::Failed(e.to_string()));
                    break;
                }
            };
            offset += read as u64;
            line += 1;

            let msg = match std::str::from_utf8(&buf).map(str::trim) {
                Ok("") => continue,
                Ok(text) => match parse_line(text) {
                    Ok(image) => ImportMessage::Row { line, offset, image },
                    Err(reason) => ImportMessage::Invalid { line, offset, reason },
                },
                Err(e) => ImportMessage::Invalid { line, offset, reason: format!("not valid UTF-8: {}", e) },
            };
            if tx.send(msg).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// Import every valid line of `path`, calling `on_message` for each event
pub fn import_embeddings<F>(store: &SqliteStore, path: &Path, mut on_message: F) -> Result<ImportSummary>
where
    F: FnMut(&ImportMessage),
{
    let rx = spawn_reader(path)?;
    let mut skipped = 0;
    let mut failure = None;

    let images = rx.iter().filter_map(|msg| {
        on_message(&msg);
        match msg {
            ImportMessage::Row { image, .. } => Some(image),
            ImportMessage::Invalid { line, reason, .. } => {
                tracing::warn!("Skipping line {}: {}", line, reason);
                skipped += 1;
                None
            }
            ImportMessage::Failed(reason) => {
                failure = Some(reason);
                None
            }
        }
    });
    let inserted = store.import_images(images)?;

    if let Some(reason) = failure {
        return Err(std::io::Error::other(reason).into());
    }
    tracing::info!("Imported {} embeddings from {} ({} skipped)", inserted, path.display(), skipped);
    Ok(ImportSummary { inserted, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIM;
    use std::io::Write;

    fn record(name: &str, dims: usize) -> String {
        serde_json::json!({
            "file_name": name,
            "image_path": format!("/img/{}", name),
            "embedding": vec![0.5f32; dims],
        })
        .to_string()
    }

    #[test]
    fn test_parse_line_rejects_wrong_dimension() {
        assert!(parse_line(&record("a.png", EMBEDDING_DIM)).is_ok());
        let reason = parse_line(&record("b.png", 8)).unwrap_err();
        assert!(reason.contains("8"));
        assert!(parse_line("{not json").is_err());
    }

    #[test]
    fn test_import_skips_invalid_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", record("a.png", EMBEDDING_DIM)).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", record("short.png", 3)).unwrap();
        writeln!(file, "{}", record("b.png", EMBEDDING_DIM)).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let mut offsets = Vec::new();
        let summary = import_embeddings(&store, file.path(), |msg| offsets.extend(msg.offset())).unwrap();

        assert_eq!(summary, ImportSummary { inserted: 2, skipped: 1 });
        assert_eq!(offsets.len(), 3);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        let names: Vec<String> = store.image_embeddings().unwrap().into_iter().map(|i| i.file_name).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_import_skips_non_utf8_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", record("a.png", EMBEDDING_DIM)).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        writeln!(file, "{}", record("b.png", EMBEDDING_DIM)).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let mut reasons = Vec::new();
        let summary = import_embeddings(&store, file.path(), |msg| {
            if let ImportMessage::Invalid { line, reason, .. } = msg {
                reasons.push((*line, reason.clone()));
            }
        })
        .unwrap();

        assert_eq!(summary, ImportSummary { inserted: 2, skipped: 1 });
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].0, 2);
        assert!(reasons[0].1.contains("UTF-8"));
        assert_eq!(store.image_embeddings().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_embeddings(&store, Path::new("/no/such/file.jsonl"), |_| {}).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
