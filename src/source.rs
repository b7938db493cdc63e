//! Declaration text providers
//!
//! The parser never touches the filesystem itself; it asks a [`Source`] for
//! the raw text of a declaration.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default extension of declaration files
pub const DEFAULT_EXTENSION: &str = "decl";

/// Failure to read declaration text
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Declaration not found: {path}")]
    NotFound { path: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Anything that can hand out declaration text by path
pub trait Source {
    fn read_all(&self, path: &str) -> Result<String, SourceError>;
}

/// Reads declarations from disk
#[derive(Debug, Clone)]
pub struct FsSource {
    root: Option<PathBuf>,
    extension: String,
}

impl Default for FsSource {
    fn default() -> Self {
        Self {
            root: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against this directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Full path for a declaration, appending the extension when missing
    pub fn resolve(&self, path: &str) -> PathBuf {
        let suffix = format!(".{}", self.extension);
        let file = if self.extension.is_empty() || path.ends_with(&suffix) {
            path.to_string()
        } else {
            format!("{}{}", path, suffix)
        };

        match &self.root {
            Some(root) if Path::new(&file).is_relative() => root.join(file),
            _ => PathBuf::from(file),
        }
    }
}

impl Source for FsSource {
    fn read_all(&self, path: &str) -> Result<String, SourceError> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|e| {
            let path = full.display().to_string();
            if e.kind() == io::ErrorKind::NotFound {
                SourceError::NotFound { path }
            } else {
                SourceError::Io { path, source: e }
            }
        })
    }
}

/// Declarations held in memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl Source for MemorySource {
    fn read_all(&self, path: &str) -> Result<String, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound { path: path.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_appended_once() {
        let source = FsSource::new();
        assert_eq!(source.resolve("user"), PathBuf::from("user.decl"));
        assert_eq!(source.resolve("user.decl"), PathBuf::from("user.decl"));

        let custom = FsSource::new().with_extension(".jsint").with_root("/schemas");
        assert_eq!(custom.resolve("user"), PathBuf::from("/schemas/user.jsint"));
        assert_eq!(custom.resolve("/abs/user"), PathBuf::from("/abs/user.jsint"));
    }

    #[test]
    fn test_fs_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("user.decl"), "name = string;").unwrap();

        let source = FsSource::new().with_root(dir.path());
        assert_eq!(source.read_all("user").unwrap(), "name = string;");
        assert!(matches!(source.read_all("missing"), Err(SourceError::NotFound { .. })));
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("a", "x = number;");
        assert_eq!(source.read_all("a").unwrap(), "x = number;");
        assert!(source.read_all("b").is_err());
    }
}
