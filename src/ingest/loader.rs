//! Recursive discovery and extraction of source documents.

use crate::ingest::{
    extract::{self, DocumentFormat},
    types::{Document, ExtractionError, LoadFailure, LoadOutcome},
};
use std::path::Path;
use walkdir::WalkDir;

/// Walk `root` and extract every supported file beneath it.
///
/// Files are visited in file-name order so repeated runs number documents identically. A file
/// whose extraction fails is recorded in [`LoadOutcome::failures`] and skipped. Unsupported
/// extensions are ignored silently. The caller must check that `root` exists.
pub fn load_documents(root: &Path) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable entry");
                outcome.failures.push(LoadFailure {
                    path: path.clone(),
                    error: ExtractionError::Walk {
                        path,
                        message: err.to_string(),
                    },
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(format) = DocumentFormat::from_path(path) else {
            continue;
        };

        match extract::extract(path, format) {
            Ok(sections) => {
                let title = title_for(path);
                tracing::debug!(
                    path = %path.display(),
                    format = format.name(),
                    sections = sections.len(),
                    "Extracted document"
                );
                outcome
                    .documents
                    .extend(sections.into_iter().map(|(content, format_metadata)| Document {
                        content,
                        source_path: path.to_path_buf(),
                        title: title.clone(),
                        format_metadata,
                    }));
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Skipping unreadable file");
                outcome.failures.push(LoadFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        documents = outcome.documents.len(),
        failures = outcome.failures.len(),
        "Loaded documents"
    );
    outcome
}

fn title_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_supported_files_recursively_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("brochures");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(dir.path().join("b-london.txt"), "London guide").expect("write");
        fs::write(dir.path().join("a-dubai.MD"), "# Dubai\n\nDesert tours").expect("write");
        fs::write(nested.join("c-paris.txt"), "Paris guide").expect("write");
        fs::write(dir.path().join("photo.png"), [0u8, 1, 2]).expect("write");

        let outcome = load_documents(dir.path());

        assert!(outcome.failures.is_empty());
        let titles: Vec<_> = outcome.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a-dubai", "b-london", "c-paris"]);
        assert_eq!(outcome.documents[0].content, "Dubai\n\nDesert tours");
        assert_eq!(
            outcome.documents[0]
                .format_metadata
                .get("format")
                .map(String::as_str),
            Some("md")
        );
        assert_eq!(outcome.documents[2].source_path, nested.join("c-paris.txt"));
    }

    #[test]
    fn unreadable_file_is_skipped_and_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.pdf"), "not a pdf").expect("write");
        fs::write(dir.path().join("ok.txt"), "fine").expect("write");

        let outcome = load_documents(dir.path());

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].title, "ok");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].path, dir.path().join("broken.pdf"));
    }

    #[test]
    fn directory_without_supported_files_yields_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("data.csv"), "a,b").expect("write");

        let outcome = load_documents(dir.path());

        assert!(outcome.documents.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
