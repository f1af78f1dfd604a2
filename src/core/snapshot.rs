//! Immutable Record Snapshots and the Connector Boundary
//!
//! Connectors (issue trackers, document stores, test management tools) sit
//! outside the engine and expose records through `RecordSource`. A run reads
//! a source exactly once into a `Snapshot`, so every candidate in a batch sees
//! the same repository even if the backing store changes mid-run.
//!
//! # Example
//!
//! ```rust
//! use casematch::core::snapshot::{InMemorySource, RepositorySnapshot};
//! use casematch::core::TestCase;
//!
//! let source = InMemorySource::new(vec![TestCase::new("TC-1", "Login")]);
//! let snapshot = RepositorySnapshot::capture(&source).unwrap();
//! assert_eq!(snapshot.len(), 1);
//! ```

use crate::core::model::{Requirement, TestCase};
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A record with a stable identifier.
pub trait Record {
    /// The record's id (may be empty for malformed records).
    fn record_id(&self) -> &str;
}

impl Record for TestCase {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Requirement {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Errors raised while reading from a record source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The backing store could not be read
    Io {
        /// Location that failed
        location: String,
        /// Underlying error message
        message: String,
    },
    /// The backing store returned data that does not fit the record shape
    Parse {
        /// Location that failed
        location: String,
        /// Underlying error message
        message: String,
    },
    /// No record with the requested id
    NotFound {
        /// Requested id
        id: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { location, message } => {
                write!(f, "Failed to read {}: {}", location, message)
            }
            SourceError::Parse { location, message } => {
                write!(f, "Failed to parse {}: {}", location, message)
            }
            SourceError::NotFound { id } => write!(f, "Record not found: {}", id),
        }
    }
}

impl std::error::Error for SourceError {}

/// Read-only access to externally held records.
pub trait RecordSource<T>: Send + Sync {
    /// All records in the source.
    fn list(&self) -> Result<Vec<T>, SourceError>;

    /// A single record by id.
    fn get(&self, id: &str) -> Result<T, SourceError>
    where
        T: Record,
    {
        self.list()?
            .into_iter()
            .find(|r| r.record_id() == id)
            .ok_or_else(|| SourceError::NotFound { id: id.to_string() })
    }
}

/// An immutable, cheaply clonable set of records for one run.
#[derive(Debug)]
pub struct Snapshot<T> {
    records: Arc<[T]>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> Snapshot<T> {
    /// Snapshot records already in memory.
    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Read a source once and freeze the result.
    pub fn capture<S>(source: &S) -> Result<Self, SourceError>
    where
        S: RecordSource<T> + ?Sized,
    {
        Ok(Self::from_records(source.list()?))
    }

    /// The records, in source order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }
}

impl<T> From<Vec<T>> for Snapshot<T> {
    fn from(records: Vec<T>) -> Self {
        Self::from_records(records)
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

/// Snapshot of repository test cases.
pub type RepositorySnapshot = Snapshot<TestCase>;

/// Snapshot of requirements.
pub type RequirementSnapshot = Snapshot<Requirement>;

/// Source backed by a vector held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource<T> {
    records: Vec<T>,
}

impl<T> InMemorySource<T> {
    /// Create a source over `records`.
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }
}

impl<T: Clone + Send + Sync> RecordSource<T> for InMemorySource<T> {
    fn list(&self) -> Result<Vec<T>, SourceError> {
        Ok(self.records.clone())
    }
}

/// Source backed by a JSON file holding an array of records.
#[derive(Debug, Clone)]
pub struct JsonFileSource<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileSource<T> {
    /// Create a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned> RecordSource<T> for JsonFileSource<T> {
    fn list(&self) -> Result<Vec<T>, SourceError> {
        let location = self.path.display().to_string();
        let content = std::fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            location: location.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| SourceError::Parse {
            location,
            message: e.to_string(),
        })
    }
}
