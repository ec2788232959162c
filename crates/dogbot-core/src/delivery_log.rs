//! Append-only CSV log of delivered images.
//!
//! The file always holds a header row followed by one row per successful
//! send, in send order. Every append rewrites the whole file through a temp
//! file and a rename, so a reader never sees a half-written row.

use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::{errors::Error, Result};

/// Column order of the log file. Stable across restarts.
pub const COLUMNS: [&str; 4] = ["group", "timestamp", "breed", "gif"];

pub const DEFAULT_LOG_PATH: &str = "logs/dog_bot_logs.csv";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(rename = "group", with = "title_bool")]
    pub is_group: bool,
    #[serde(with = "local_timestamp")]
    pub timestamp: NaiveDateTime,
    pub breed: String,
    #[serde(rename = "gif", with = "title_bool")]
    pub is_gif: bool,
}

impl DeliveryRecord {
    /// Record stamped with the current local time, at the microsecond
    /// precision the file keeps.
    pub fn now(is_group: bool, breed: impl Into<String>, is_gif: bool) -> Self {
        Self {
            is_group,
            timestamp: Local::now().naive_local().trunc_subsecs(6),
            breed: breed.into(),
            is_gif,
        }
    }
}

/// Durable store that only ever grows.
#[async_trait]
pub trait AppendableLog: Send + Sync {
    /// Persist one record. On error nothing is recorded.
    async fn append(&self, record: DeliveryRecord) -> Result<()>;
}

#[derive(Debug)]
pub struct CsvDeliveryLog {
    path: PathBuf,
    rows: Mutex<Vec<DeliveryRecord>>,
}

impl CsvDeliveryLog {
    /// Empty log backed by `path`; nothing is read or written yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Load the log at `path`, or start an empty one if the file does not
    /// exist or has no header yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = if path.exists() {
            read_rows(&path)?
        } else {
            Vec::new()
        };
        info!(path = %path.display(), rows = rows.len(), "opened delivery log");
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    pub async fn rows(&self) -> Vec<DeliveryRecord> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl AppendableLog for CsvDeliveryLog {
    async fn append(&self, record: DeliveryRecord) -> Result<()> {
        // Held across the write: appends are serialized.
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        next.push(record);

        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || write_rows(&path, &next).map(|()| next))
            .await
            .map_err(|e| Error::External(format!("delivery log writer failed: {e}")))??;
        *rows = next;
        Ok(())
    }
}

fn read_rows(path: &Path) -> Result<Vec<DeliveryRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    if headers.iter().all(str::is_empty) {
        return Ok(Vec::new());
    }
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(Error::InvalidLog {
            path: path.to_path_buf(),
            reason: format!(
                "expected columns {:?}, found {:?}",
                COLUMNS,
                headers.iter().collect::<Vec<_>>()
            ),
        });
    }

    let mut rows = Vec::new();
    for row in rdr.deserialize::<DeliveryRecord>() {
        rows.push(row?);
    }
    Ok(rows)
}

fn write_rows(path: &Path, rows: &[DeliveryRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let res = write_csv(&tmp, rows).and_then(|()| fs::rename(&tmp, path).map_err(Error::Io));
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

fn write_csv(path: &Path, rows: &[DeliveryRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    let file = wtr
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Booleans as `True` / `False`, the spelling existing log files use.
mod title_bool {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *v { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean: {other}"))),
        }
    }
}

mod local_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
    const READ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn serialize<S: Serializer>(v: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        let raw = raw.trim();
        READ_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
