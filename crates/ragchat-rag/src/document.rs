//! Documents and the sources they are loaded from.

use crate::error::{RagError, RagResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A named text loaded from a document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Document name, used as the section heading of its chunks.
    pub name: String,
    /// Full document text.
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Something that can (re)produce the current document set.
///
/// Implementations return documents in a stable order; the index and the
/// full-corpus prompt both follow it.
pub trait DocumentSource: Send + Sync {
    /// Load the current documents.
    fn load(&self) -> RagResult<Vec<Document>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Reads every file with a given extension from one directory.
///
/// Files are sorted by file name, their text trimmed, and empty files
/// skipped. A missing directory is an empty corpus.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: String,
}

impl DirectorySource {
    /// Source reading `*.txt` from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "txt".to_string(),
        }
    }

    /// Change the file extension (without the leading dot).
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> RagError {
        RagError::DocumentSource {
            path: path.display().to_string(),
            source,
        }
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self) -> RagResult<Vec<Document>> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "context directory not found, corpus is empty");
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(&self.dir, e))?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == self.extension);
            if matches {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|e| self.io_error(&path, e))?;
            let text = text.trim();
            if text.is_empty() {
                debug!(path = %path.display(), "skipping empty document");
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push(Document::new(name, text));
        }

        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("{}/*.{}", self.dir.display(), self.extension)
    }
}

/// A fixed, in-memory document set.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<Document>,
}

impl StaticSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

impl DocumentSource for StaticSource {
    fn load(&self) -> RagResult<Vec<Document>> {
        Ok(self.documents.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory documents", self.documents.len())
    }
}
