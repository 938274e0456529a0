use crate::error::{RagError, Result};
use std::fs;
use std::path::Path;

/// A source document as read from disk. The filename doubles as the
/// citation label in generated answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content: String,
}

/// Loads every `*.md` file directly inside `dir`, sorted by filename.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagError::MissingInput(format!(
            "documents directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_markdown = path.extension().map_or(false, |ext| ext == "md");
        if !path.is_file() || !is_markdown {
            continue;
        }
        let Some(filename) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
            continue;
        };
        let content = fs::read_to_string(&path)?;
        log::info!("Loaded {} ({} chars)", filename, content.chars().count());
        documents.push(Document { filename, content });
    }

    if documents.is_empty() {
        return Err(RagError::MissingInput(format!(
            "no .md files in '{}'",
            dir.display()
        )));
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(documents)
}
