use crate::sink::{ReportSink, SheetDocument, SinkError};
use std::path::{Path, PathBuf};

/// Writes each document to `<dir>/<title>.json`, replacing any earlier copy.
pub struct JsonDirSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonDirSink {
    /// Create the output directory if it does not exist.
    pub fn new(dir: &Path) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Path a document with `title` is written to.
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(title)))
    }

    /// Files written so far, in publish order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Titles may hold separators and line breaks; keep a portable subset.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.').trim();
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}

impl ReportSink for JsonDirSink {
    fn publish(&mut self, document: &SheetDocument) -> Result<(), SinkError> {
        let path = self.path_for(&document.title);
        let body = serde_json::to_vec_pretty(document)?;
        // write-then-rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), rows = document.rows.len(), "Sheet written");
        self.written.push(path);
        Ok(())
    }
}
