//! File-based store: a JSON directory document loaded at construction.
//!
//! Layout:
//!
//! ```json
//! {
//!   "employees": [ { "employee_number": "EMP001", "name": "...", ... } ],
//!   "availability": { "EMP001": [ { "week_number": 1, "status": "Available", "hours": 40 } ] }
//! }
//! ```
//!
//! Records that fail to deserialize are skipped with a warning so one bad
//! row does not take the whole directory down.

use async_trait::async_trait;
use resgenie_core::error::LookupError;
use resgenie_core::store::DEFAULT_ANY_OF_LIMIT;
use resgenie_core::{AvailabilityWeek, DocumentStore, Employee, EmployeeFilter};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::directory::Directory;

/// Document shape with records kept raw, so each one parses independently.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    employees: Vec<serde_json::Value>,
    #[serde(default)]
    availability: HashMap<String, Vec<serde_json::Value>>,
}

/// A read-only employee directory backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
    directory: Arc<RwLock<Directory>>,
}

impl FileStore {
    /// Load the directory at `path`.
    ///
    /// A missing or unparseable file is `LookupError::Unavailable`; the
    /// caller decides what to tell the user.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LookupError> {
        let path = path.into();
        let directory = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = directory.employee_count(), "File store loaded");
        Ok(Self {
            path,
            directory: Arc::new(RwLock::new(directory)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, replacing the loaded directory.
    pub async fn reload(&self) -> Result<usize, LookupError> {
        let fresh = Self::load_from_disk(&self.path)?;
        let count = fresh.employee_count();
        *self.directory.write().await = fresh;
        Ok(count)
    }

    fn load_from_disk(path: &Path) -> Result<Directory, LookupError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LookupError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;

        let raw: RawDocument = serde_json::from_str(&content).map_err(|e| {
            LookupError::Unavailable(format!("{} is not a directory document: {e}", path.display()))
        })?;

        let mut directory = Directory::default();

        for value in raw.employees {
            match serde_json::from_value::<Employee>(value) {
                Ok(employee) => {
                    directory.push_employee(employee);
                }
                Err(e) => warn!(error = %e, "Skipping corrupted employee record"),
            }
        }

        for (number, weeks) in raw.availability {
            for value in weeks {
                match serde_json::from_value::<AvailabilityWeek>(value) {
                    Ok(week) => directory.push_week(&number, week),
                    Err(e) => {
                        warn!(employee_number = %number, error = %e, "Skipping corrupted availability record")
                    }
                }
            }
        }

        Ok(directory)
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn query_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, LookupError> {
        self.directory.read().await.query(filter, DEFAULT_ANY_OF_LIMIT)
    }

    async fn availability(
        &self,
        employee_number: &str,
        weeks: &BTreeSet<u8>,
    ) -> Result<Vec<AvailabilityWeek>, LookupError> {
        Ok(self.directory.read().await.availability(employee_number, weeks))
    }
}
