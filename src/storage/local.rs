//! Local filesystem storage implementation.
//!
//! State files are small JSON documents written atomically (temp file, then
//! rename) so an interrupted run never leaves a half-written ledger behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PathsConfig, SeenState};
use crate::storage::{LastRunFile, SeenFile, StateStore};
use crate::utils::time::{format_timestamp, parse_timestamp};

/// Ensure the parent directory of `path` exists.
async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes).await
}

/// Read a JSON document, returning None if the file doesn't exist.
async fn read_json_value(path: &Path) -> Result<Option<Value>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read a state document, treating any failure as absence.
async fn read_state_document(path: &Path) -> Option<Value> {
    match read_json_value(path).await {
        Ok(Some(Value::Object(map))) => Some(Value::Object(map)),
        Ok(Some(_)) => {
            log::warn!("Ignoring {}: not a JSON object", path.display());
            None
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
            None
        }
    }
}

fn timestamp_field(document: &Value, key: &str) -> Option<DateTime<Utc>> {
    match document.get(key)? {
        Value::String(raw) => parse_timestamp(raw),
        _ => None,
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Local filesystem state backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    state_path: PathBuf,
    seen_path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the state files under `root`.
    pub fn new(root: impl AsRef<Path>, paths: &PathsConfig) -> Self {
        let root = root.as_ref();
        Self {
            state_path: paths.state_path(root),
            seen_path: paths.seen_path(root),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn seen_path(&self) -> &Path {
        &self.seen_path
    }
}

#[async_trait]
impl StateStore for LocalStorage {
    async fn load_last_run_at(&self) -> Option<DateTime<Utc>> {
        let document = read_state_document(&self.state_path).await?;
        timestamp_field(&document, "last_crawl_at")
    }

    async fn save_last_run_at(&self, at: DateTime<Utc>) -> Result<()> {
        let payload = LastRunFile {
            last_crawl_at: format_timestamp(at),
        };
        write_json_atomic(&self.state_path, &payload).await
    }

    async fn load_seen(&self) -> SeenState {
        let Some(document) = read_state_document(&self.seen_path).await else {
            return SeenState::default();
        };

        let ids = match document.get("ids") {
            Some(Value::Array(items)) => items.iter().filter_map(id_from_value).collect(),
            _ => Default::default(),
        };

        SeenState {
            ids,
            latest_published_at: timestamp_field(&document, "latest_published_at"),
        }
    }

    async fn save_seen(&self, state: &SeenState) -> Result<()> {
        let payload = SeenFile {
            updated_at: format_timestamp(Utc::now()),
            latest_published_at: state
                .latest_published_at
                .map(format_timestamp)
                .unwrap_or_default(),
            ids: state.ids.iter().cloned().collect(),
        };
        write_json_atomic(&self.seen_path, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path(), &PathsConfig::default())
    }

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        assert!(storage.load_last_run_at().await.is_none());
        assert_eq!(storage.load_seen().await, SeenState::default());
    }

    #[tokio::test]
    async fn test_corrupt_seen_ledger_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        ensure_parent(storage.seen_path()).await.unwrap();

        for body in ["{not json", "[1, 2, 3]", "\"ids\"", ""] {
            tokio::fs::write(storage.seen_path(), body).await.unwrap();
            let state = storage.load_seen().await;
            assert!(state.ids.is_empty(), "body: {body}");
            assert!(state.latest_published_at.is_none(), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_last_run_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        ensure_parent(storage.state_path()).await.unwrap();

        for body in ["garbage", r#"{"last_crawl_at": "not a date"}"#, r#"{"last_crawl_at": 5}"#] {
            tokio::fs::write(storage.state_path(), body).await.unwrap();
            assert!(storage.load_last_run_at().await.is_none(), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_seen_round_trip_is_sorted() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let latest = Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap();

        let state = SeenState {
            ids: BTreeSet::from([
                "2406.0003".to_string(),
                "2406.0001".to_string(),
                "2406.0002".to_string(),
            ]),
            latest_published_at: Some(latest),
        };
        storage.save_seen(&state).await.unwrap();

        let raw: Value =
            serde_json::from_slice(&tokio::fs::read(storage.seen_path()).await.unwrap()).unwrap();
        assert_eq!(
            raw["ids"],
            serde_json::json!(["2406.0001", "2406.0002", "2406.0003"])
        );
        assert_eq!(raw["latest_published_at"], "2024-06-09T12:00:00+00:00");
        assert!(raw["updated_at"].as_str().is_some_and(|s| !s.is_empty()));

        assert_eq!(storage.load_seen().await, state);
    }

    #[tokio::test]
    async fn test_seen_without_high_water_mark() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        let state = SeenState {
            ids: BTreeSet::from(["a".to_string()]),
            latest_published_at: None,
        };
        storage.save_seen(&state).await.unwrap();

        let raw: Value =
            serde_json::from_slice(&tokio::fs::read(storage.seen_path()).await.unwrap()).unwrap();
        assert_eq!(raw["latest_published_at"], "");
        assert_eq!(storage.load_seen().await, state);
    }

    #[tokio::test]
    async fn test_seen_ids_are_coerced_and_cleaned() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        ensure_parent(storage.seen_path()).await.unwrap();
        tokio::fs::write(
            storage.seen_path(),
            r#"{"ids": [" 2406.0001 ", "", 1234, null], "latest_published_at": "2024-06-09T20:00:00+08:00"}"#,
        )
        .await
        .unwrap();

        let state = storage.load_seen().await;
        assert_eq!(
            state.ids,
            BTreeSet::from(["2406.0001".to_string(), "1234".to_string()])
        );
        assert_eq!(
            state.latest_published_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_last_run_round_trip_and_naive_timestamp() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();

        storage.save_last_run_at(at).await.unwrap();
        assert_eq!(storage.load_last_run_at().await, Some(at));

        tokio::fs::write(storage.state_path(), r#"{"last_crawl_at": "2024-06-10T03:30:00"}"#)
            .await
            .unwrap();
        assert_eq!(
            storage.load_last_run_at().await,
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 3, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_writes_create_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let paths = PathsConfig {
            state_file: "deep/nested/state.json".to_string(),
            ..PathsConfig::default()
        };
        let storage = LocalStorage::new(tmp.path(), &paths);

        storage.save_last_run_at(Utc::now()).await.unwrap();
        assert!(tmp.path().join("deep/nested/state.json").is_file());
        assert!(!tmp.path().join("deep/nested/state.tmp").exists());
    }

    #[tokio::test]
    async fn test_unwritable_location_is_an_error() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the state directory should be
        std::fs::write(tmp.path().join("archive"), b"blocker").unwrap();
        let storage = storage(&tmp);

        assert!(storage.save_last_run_at(Utc::now()).await.is_err());
        assert!(storage.save_seen(&SeenState::default()).await.is_err());
    }
}
