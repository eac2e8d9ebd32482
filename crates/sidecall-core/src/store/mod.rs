//! Read-only access to the on-disk password store.
//!
//! The engine never decrypts or writes the store; it only needs name lookup
//! plus the store's own path, which is embedded into pass-safely secret
//! references so the invoked probe can open the store itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

/// Error reading the password store file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be read.
    #[error("failed to read password store {path}: {source}")]
    Io {
        /// Store path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A line did not have the `name:secret` shape.
    #[error("malformed password store line {line}: missing ':' separator")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
    },
}

/// In-memory view of the password store.
#[derive(Debug, Clone)]
pub struct SecretsStore {
    path: PathBuf,
    entries: BTreeMap<String, SecretString>,
}

impl SecretsStore {
    /// Empty store at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Store at the given path with the given entries.
    #[must_use]
    pub fn with_entries(
        path: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = (String, SecretString)>,
    ) -> Self {
        Self {
            path: path.into(),
            entries: entries.into_iter().collect(),
        }
    }

    /// Load the legacy line-oriented `name:secret` store format.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the file cannot be read or a non-empty
    /// line lacks the separator.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut entries = BTreeMap::new();
        for (index, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let (name, secret) = line
                .split_once(':')
                .ok_or(StoreError::MalformedLine { line: index + 1 })?;
            entries.insert(name.to_string(), SecretString::from(secret));
        }
        Ok(Self { path, entries })
    }

    /// Look up a secret by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&SecretString> {
        self.entries.get(name)
    }

    /// The path at which the store persists.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
