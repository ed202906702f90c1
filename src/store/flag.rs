//! Durable storage for the auto clock-out flag.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BundyError, BundyResult};

use super::FlagStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FlagRecord {
    last_fired_date: Option<String>,
}

/// Keeps the "last fired date" in a small JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written record behind.
/// A missing file reads as "never fired".
#[derive(Debug, Clone)]
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    /// Creates a flag store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(path: &Path) -> BundyResult<FlagRecord> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FlagRecord::default());
            }
            Err(e) => {
                return Err(BundyError::FlagStore {
                    message: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| BundyError::FlagStore {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }

    fn write_record(path: &Path, record: &FlagRecord) -> BundyResult<()> {
        let flag_error = |e: std::io::Error| BundyError::FlagStore {
            message: format!("failed to write {}: {}", path.display(), e),
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(flag_error)?;

        let json = serde_json::to_string_pretty(record).map_err(|e| BundyError::FlagStore {
            message: e.to_string(),
        })?;

        let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(flag_error)?;
        temp_file.write_all(json.as_bytes()).map_err(flag_error)?;
        temp_file.flush().map_err(flag_error)?;
        temp_file.persist(path).map_err(|e| flag_error(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl FlagStore for FileFlagStore {
    async fn last_fired_date(&self) -> BundyResult<Option<String>> {
        let path = self.path.clone();
        let record = tokio::task::spawn_blocking(move || Self::read_record(&path))
            .await
            .map_err(|e| BundyError::FlagStore {
                message: e.to_string(),
            })??;
        Ok(record.last_fired_date)
    }

    async fn set_last_fired_date(&self, date_key: &str) -> BundyResult<()> {
        let path = self.path.clone();
        let record = FlagRecord {
            last_fired_date: Some(date_key.to_string()),
        };
        tokio::task::spawn_blocking(move || Self::write_record(&path, &record))
            .await
            .map_err(|e| BundyError::FlagStore {
                message: e.to_string(),
            })?
    }
}

/// Keeps the flag in memory. Does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    value: Mutex<Option<String>>,
}

impl MemoryFlagStore {
    /// Creates an empty flag store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag store that has already fired on `date_key`.
    pub fn fired_on(date_key: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(date_key.into())),
        }
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn last_fired_date(&self) -> BundyResult<Option<String>> {
        self.value
            .lock()
            .map(|value| value.clone())
            .map_err(|_| BundyError::FlagStore {
                message: "flag lock poisoned".to_string(),
            })
    }

    async fn set_last_fired_date(&self, date_key: &str) -> BundyResult<()> {
        let mut value = self.value.lock().map_err(|_| BundyError::FlagStore {
            message: "flag lock poisoned".to_string(),
        })?;
        *value = Some(date_key.to_string());
        Ok(())
    }
}
