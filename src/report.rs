//! Batch outcome bookkeeping.

use crate::error::{DocumentError, Severity};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Written { injected: usize, replaced: usize },
    /// The splice produced the content already on disk.
    Unchanged { injected: usize },
    Skipped { code: &'static str, reason: String },
    Failed { code: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// The declaration file that drove this document.
    pub source: PathBuf,
    /// The rewritten file, once known.
    pub target: Option<PathBuf>,
    pub status: DocumentStatus,
    pub warnings: Vec<String>,
}

impl DocumentReport {
    pub fn from_error(source: &Path, error: &DocumentError) -> Self {
        let reason = error.to_string();
        let code = error.code();
        let status = match error.severity() {
            Severity::Notice => DocumentStatus::Skipped { code, reason },
            Severity::Error => DocumentStatus::Failed { code, reason },
        };
        Self {
            source: source.to_path_buf(),
            target: None,
            status,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warning_count: usize,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: DocumentReport) {
        match report.status {
            DocumentStatus::Written { .. } => self.written += 1,
            DocumentStatus::Unchanged { .. } => self.unchanged += 1,
            DocumentStatus::Skipped { .. } => self.skipped += 1,
            DocumentStatus::Failed { .. } => self.failed += 1,
        }
        self.warning_count += report.warnings.len();
        self.documents.push(report);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total(&self) -> usize {
        self.documents.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} document(s): {} written, {} unchanged, {} skipped, {} failed, {} warning(s)",
            self.total(),
            self.written,
            self.unchanged,
            self.skipped,
            self.failed,
            self.warning_count
        )
    }

    pub fn log_summary(&self) {
        if self.has_failures() {
            tracing::error!(
                written = self.written,
                unchanged = self.unchanged,
                skipped = self.skipped,
                failed = self.failed,
                warnings = self.warning_count,
                "batch finished with failures"
            );
        } else {
            tracing::info!(
                written = self.written,
                unchanged = self.unchanged,
                skipped = self.skipped,
                warnings = self.warning_count,
                "batch finished"
            );
        }
    }
}
