//! Run statistics persisted after each ingestion run.

use crate::ingest::types::StatsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// File name of the statistics record inside the results directory.
pub const STATS_FILE_NAME: &str = "processing_stats.json";

/// Summary of one ingestion run as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Run identifier, also attached to the run's log lines.
    pub run_id: String,
    /// RFC 3339 completion time.
    pub processed_at: String,
    /// Documents extracted.
    pub documents_count: usize,
    /// Chunks produced.
    pub chunks_count: usize,
    /// Target index.
    pub index_name: String,
    /// Documents the index accepted.
    pub uploaded: usize,
    /// Keys the index rejected.
    pub failed_ids: Vec<String>,
}

/// Current UTC time as RFC 3339.
pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

impl RunStats {
    /// Write the record as pretty JSON to `results_dir/processing_stats.json`, replacing any
    /// previous run's file.
    pub async fn persist(&self, results_dir: &Path) -> Result<PathBuf, StatsError> {
        let path = results_dir.join(STATS_FILE_NAME);
        let io_error = |source: std::io::Error| StatsError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(results_dir)
            .await
            .map_err(io_error)?;
        let body = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, body).await.map_err(io_error)?;

        tracing::info!(path = %path.display(), "Run statistics saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_pretty_json_into_results_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let results = dir.path().join("results");
        let stats = RunStats {
            run_id: "run-1".into(),
            processed_at: now_rfc3339(),
            documents_count: 2,
            chunks_count: 5,
            index_name: "travel".into(),
            uploaded: 4,
            failed_ids: vec!["1_0_4".into()],
        };

        let path = stats.persist(&results).await.expect("persist");

        assert_eq!(path, results.join(STATS_FILE_NAME));
        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\n  \"documents_count\": 2"));
        let parsed: RunStats = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, stats);
    }
}
