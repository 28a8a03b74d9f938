//! Document loading and chunking.

use std::path::Path;

use crate::errors::IngestError;
use crate::model::Chunk;

pub mod chunker;
pub mod loader;

pub use chunker::Chunker;
pub use loader::{load_document, DocumentFormat, PageText};

/// Load `path` and split it into chunks of at most `max_chars` characters.
pub fn chunk_document(path: &Path, max_chars: usize) -> Result<Vec<Chunk>, IngestError> {
    let pages = load_document(path)?;
    Ok(Chunker::new(max_chars).split_pages(&pages))
}
