//! File-system repository for learned examples.
//!
//! # Storage Format
//!
//! Examples are stored as pretty-printed JSON files named
//! `{operation}_{schema_type}_{slug}_{digest}.json`, where `slug` is a bounded,
//! readable form of the headers and `digest` identifies the exact header list.
//! Registering an example with the same operation, schema type and headers
//! replaces the earlier file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use colmap_model::Example;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{FeedbackError, Result};
use crate::pool::ExamplePool;

/// Directory of example files.
#[derive(Debug, Clone)]
pub struct ExampleRepository {
    base_dir: PathBuf,
}

impl ExampleRepository {
    /// Opens the repository, creating the directory if it doesn't exist.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| FeedbackError::Io {
            operation: "create directory",
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes `example` atomically (temp file + rename) and returns its path.
    pub fn save(&self, example: &Example) -> Result<PathBuf> {
        let path = self.base_dir.join(example_filename(example));
        let json =
            serde_json::to_string_pretty(example).map_err(|source| FeedbackError::Serialization {
                what: "example",
                source,
            })?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|source| FeedbackError::Io {
            operation: "create",
            path: temp_path.clone(),
            source,
        })?;
        file.write_all(json.as_bytes())
            .map_err(|source| FeedbackError::Io {
                operation: "write",
                path: temp_path.clone(),
                source,
            })?;
        file.sync_all().map_err(|source| FeedbackError::Io {
            operation: "sync",
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| FeedbackError::Io {
            operation: "rename",
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "saved example");
        Ok(path)
    }

    /// Loads one example file.
    pub fn load(&self, path: &Path) -> Result<Example> {
        let contents = fs::read_to_string(path).map_err(|source| FeedbackError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| FeedbackError::Serialization {
            what: "example",
            source,
        })
    }

    /// All parseable examples, sorted by file name. Unreadable files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<Example>> {
        let entries = fs::read_dir(&self.base_dir).map_err(|source| FeedbackError::Io {
            operation: "read directory",
            path: self.base_dir.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut examples = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load(&path) {
                Ok(example) => examples.push(example),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable example"),
            }
        }
        Ok(examples)
    }
}

impl ExamplePool for ExampleRepository {
    fn register(&self, example: Example) -> Result<()> {
        self.save(&example)
            .map(|_| ())
            .map_err(|err| FeedbackError::Pool(err.to_string()))
    }
}

/// Longest id segment kept in a file name, in characters.
const MAX_ID_CHARS: usize = 32;

/// Longest header slug kept in a file name, in characters.
const MAX_SLUG_CHARS: usize = 48;

/// Hex characters of the header digest kept in a file name.
const DIGEST_HEX_CHARS: usize = 16;

fn example_filename(example: &Example) -> String {
    format!(
        "{}_{}_{}_{}.json",
        normalize_id(&example.operation, MAX_ID_CHARS),
        normalize_id(&example.schema_type, MAX_ID_CHARS),
        normalize_id(&example.headers.join("_"), MAX_SLUG_CHARS),
        headers_digest(&example.headers)
    )
}

/// Lowercased id with non-alphanumeric characters replaced for use in file
/// names, cut to `max_chars`.
fn normalize_id(id: &str, max_chars: usize) -> String {
    let id: String = id
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(max_chars)
        .collect();
    if id.is_empty() { "_".to_string() } else { id }
}

/// Digest of the exact header list, separating headers that share a slug.
fn headers_digest(headers: &[String]) -> String {
    let mut hasher = Sha256::new();
    for header in headers {
        hasher.update(header.as_bytes());
        hasher.update([0x1e]);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_HEX_CHARS);
    digest
}
