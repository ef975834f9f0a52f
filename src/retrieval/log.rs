//! Append-only JSON answer log.

use crate::retrieval::types::{AnswerLogError, AnswerRecord};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File name of the answer log inside the results directory.
pub const ANSWER_LOG_FILE_NAME: &str = "answers.json";

/// JSON-array file of [`AnswerRecord`]s.
///
/// Each append reads the whole array, pushes one record and rewrites the file. Appends through
/// the same handle are serialized; other processes writing the same file are not coordinated
/// and can lose updates.
pub struct AnswerLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl AnswerLog {
    /// Log stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Log stored as `answers.json` inside `results_dir`.
    pub fn in_dir(results_dir: &Path) -> Self {
        Self::new(results_dir.join(ANSWER_LOG_FILE_NAME))
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, creating the file as an empty array first if needed.
    pub async fn append(&self, record: &AnswerRecord) -> Result<(), AnswerLogError> {
        let _lock = self.guard.lock().await;
        let mut records = self.read_or_create().await?;
        records.push(record.clone());
        let body = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| self.io_error(source))?;
        tracing::debug!(path = %self.path.display(), total = records.len(), "Answer recorded");
        Ok(())
    }

    /// Every record in append order. A missing file reads as empty.
    pub async fn records(&self) -> Result<Vec<AnswerRecord>, AnswerLogError> {
        let _lock = self.guard.lock().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => self.parse(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    async fn read_or_create(&self) -> Result<Vec<AnswerRecord>, AnswerLogError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => self.parse(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| self.io_error(source))?;
                }
                tokio::fs::write(&self.path, "[]")
                    .await
                    .map_err(|source| self.io_error(source))?;
                tracing::info!(path = %self.path.display(), "Created answer log");
                Ok(Vec::new())
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn parse(&self, raw: &str) -> Result<Vec<AnswerRecord>, AnswerLogError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(raw).map_err(|source| AnswerLogError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn io_error(&self, source: std::io::Error) -> AnswerLogError {
        AnswerLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
