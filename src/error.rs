//! Per-document error taxonomy.
//!
//! Batches catch every [`DocumentError`] at the document boundary. Its
//! [`Severity`] decides whether the document counts as skipped (a notice) or
//! failed; neither stops the batch.

use crate::splice::SpliceError;
use crate::writer::WriteError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use strum::Display;
use thiserror::Error;

/// A companion input a family needs besides its STRUCT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum SourceRole {
    #[strum(serialize = "parameter file")]
    ParameterFile,
    #[strum(serialize = "method file")]
    MethodFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The document is skipped; nothing is wrong with the inputs.
    Notice,
    /// The document could not be processed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Notice => write!(f, "notice"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{role} {} does not exist", path.display())]
    SourceMissing { role: SourceRole, path: PathBuf },

    #[error("no method file declared in {} or {}", struct_file.display(), param_file.display())]
    NoMethodDeclared {
        struct_file: PathBuf,
        param_file: PathBuf,
    },

    #[error("duplicate method declaration {second} at line {line} of {} ({first} already declared)", file.display())]
    DuplicateMethod {
        file: PathBuf,
        line: usize,
        first: String,
        second: String,
    },

    #[error("cannot scan {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{} is not a STRUCT_ family file", .0.display())]
    NotAFamilyFile(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} not written: {source}", path.display())]
    Splice {
        path: PathBuf,
        #[source]
        source: SpliceError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl DocumentError {
    pub fn severity(&self) -> Severity {
        match self {
            DocumentError::SourceMissing { .. } | DocumentError::NoMethodDeclared { .. } => {
                Severity::Notice
            }
            DocumentError::DuplicateMethod { .. }
            | DocumentError::Discovery { .. }
            | DocumentError::NotAFamilyFile(_)
            | DocumentError::Read { .. }
            | DocumentError::Splice { .. }
            | DocumentError::Write(_) => Severity::Error,
        }
    }

    /// Stable identifier used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::SourceMissing { .. } => "source_missing",
            DocumentError::NoMethodDeclared { .. } => "no_method_declared",
            DocumentError::DuplicateMethod { .. } => "duplicate_method",
            DocumentError::Discovery { .. } => "discovery_failed",
            DocumentError::NotAFamilyFile(_) => "not_a_family_file",
            DocumentError::Read { .. } => "read_failed",
            DocumentError::Splice {
                source: SpliceError::MarkerNotFound { .. },
                ..
            } => "marker_not_found",
            DocumentError::Splice {
                source: SpliceError::UnterminatedRegion { .. },
                ..
            } => "unterminated_region",
            DocumentError::Write(_) => "write_failed",
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> DocumentError {
        let path = path.into();
        move |source| DocumentError::Read { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sources_are_notices() {
        let error = DocumentError::SourceMissing {
            role: SourceRole::ParameterFile,
            path: PathBuf::from("Families/PARAM_CONTRACT.csv"),
        };
        assert_eq!(error.severity(), Severity::Notice);
        assert_eq!(error.code(), "source_missing");
        assert_eq!(
            error.to_string(),
            "parameter file Families/PARAM_CONTRACT.csv does not exist"
        );
    }

    #[test]
    fn structural_errors_are_failures() {
        let error = DocumentError::Splice {
            path: PathBuf::from("Method.contract.php"),
            source: SpliceError::UnterminatedRegion {
                marker: "/**ATTR**/".into(),
                line: 12,
            },
        };
        assert_eq!(error.severity(), Severity::Error);
        assert_eq!(error.code(), "unterminated_region");
        assert!(error.to_string().starts_with("Method.contract.php not written"));
    }
}
