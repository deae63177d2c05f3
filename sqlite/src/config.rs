//! Datastore configuration and schema documents on disk.
//!
//! [`DatastoreConfig`] is a small YAML document:
//!
//! ```yaml
//! filename: data/app.db
//! foreign_keys: true
//! busy_timeout_ms: 5000
//! ```
//!
//! Schemas can live next to it as JSON or YAML and are loaded with
//! [`load_schema`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use schemastore_core::Schema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DatastoreError, Result};

/// Filename marking an in-memory database.
pub const MEMORY: &str = ":memory:";

fn default_filename() -> String {
    MEMORY.to_string()
}

fn default_true() -> bool {
    true
}

/// How a datastore opens its database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Issue `PRAGMA foreign_keys = ON` after opening.
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database before failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_timeout_ms: Option<u64>,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            foreign_keys: true,
            busy_timeout_ms: None,
        }
    }
}

impl DatastoreConfig {
    /// Configuration for a database file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            filename: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn is_in_memory(&self) -> bool {
        self.filename == MEMORY
    }

    /// Loads a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](DatastoreError::IoError) if the file cannot be read, or
    /// [`YamlError`](DatastoreError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](DatastoreError::IoError) if the file cannot be written, or
    /// [`YamlError`](DatastoreError::YamlError) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Opens the engine handle and applies the connection settings.
    pub(crate) fn open_connection(&self) -> Result<Connection> {
        let conn = if self.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&self.filename)?
        };
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        info!(filename = %self.filename, "opened database");
        Ok(conn)
    }
}

/// Loads a schema document, choosing the format by extension
/// (`.json`, `.yaml` or `.yml`).
///
/// # Errors
///
/// Returns [`ConfigError`](DatastoreError::ConfigError) for any other extension,
/// [`IoError`](DatastoreError::IoError) if the file cannot be read, and
/// [`JsonError`](DatastoreError::JsonError) / [`YamlError`](DatastoreError::YamlError) for
/// malformed documents.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let reader = || -> Result<BufReader<File>> { Ok(BufReader::new(File::open(path)?)) };
    match extension.as_deref() {
        Some("json") => Ok(serde_json::from_reader(reader()?)?),
        Some("yaml" | "yml") => Ok(serde_yaml::from_reader(reader()?)?),
        _ => Err(DatastoreError::ConfigError(format!(
            "unsupported schema file '{}': expected .json, .yaml or .yml",
            path.display()
        ))),
    }
}
