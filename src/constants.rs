//! Class-constant injection for family method files.
//!
//! For every `STRUCT_<X>.csv` family, the attribute and parameter names it
//! declares become `const name = 'name';` lines inside the `/**ATTR**/`
//! region of the family's method file.

use crate::error::{DocumentError, SourceRole};
use crate::feed::declaration::{Declaration, DeclarationFile};
use crate::logging::document_span;
use crate::report::{BatchReport, DocumentReport, DocumentStatus};
use crate::splice::{Document, RegionAnchor, RegionMarkers, splice_region};
use crate::writer::{SafeFileWriter, WriteMode};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const STRUCT_PREFIX: &str = "STRUCT_";
const PARAM_PREFIX: &str = "PARAM_";
const DEFAULT_CONSTANT_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Attribute,
    Parameter,
}

/// Payload of one injected constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantEntry {
    pub kind: EntryKind,
    pub label: Option<String>,
    /// Declaring line in the STRUCT file.
    pub line: usize,
}

/// Everything needed to rewrite one family's method file.
#[derive(Debug, Clone)]
pub struct FamilyConstants {
    pub struct_file: PathBuf,
    pub param_file: PathBuf,
    pub method_file: PathBuf,
    /// Lower-cased names in declaration order.
    pub entries: IndexMap<String, ConstantEntry>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub families_dir: PathBuf,
    /// Explicit STRUCT files; discovered under `families_dir` when empty.
    pub family_files: Vec<PathBuf>,
    pub markers: RegionMarkers,
}

/// `PARAM_<X>.csv` next to `STRUCT_<X>.csv`.
pub fn companion_param_file(struct_file: &Path) -> Option<PathBuf> {
    let name = struct_file.file_name()?.to_str()?;
    let family = name.strip_prefix(STRUCT_PREFIX)?;
    Some(struct_file.with_file_name(format!("{PARAM_PREFIX}{family}")))
}

/// Every `STRUCT_*.csv` below `dir`, sorted.
///
/// Only an unreadable `dir` is an error. Entries below it that cannot be read
/// are logged and skipped.
pub fn discover_family_files(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(DocumentError::Discovery {
                    path: dir.to_path_buf(),
                    source,
                });
            }
            Err(error) => {
                tracing::warn!(
                    path = ?error.path(),
                    %error,
                    "skipping unreadable entry"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let is_struct = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(STRUCT_PREFIX));
        if is_csv && is_struct {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Collect the constants of one family and locate its method file.
pub fn resolve_family(
    families_dir: &Path,
    struct_file: &Path,
) -> Result<FamilyConstants, DocumentError> {
    let param_file = companion_param_file(struct_file)
        .ok_or_else(|| DocumentError::NotAFamilyFile(struct_file.to_path_buf()))?;
    if !param_file.is_file() {
        return Err(DocumentError::SourceMissing {
            role: SourceRole::ParameterFile,
            path: param_file,
        });
    }

    let params = DeclarationFile::read(&param_file).map_err(DocumentError::read(&param_file))?;
    let structure =
        DeclarationFile::read(struct_file).map_err(DocumentError::read(struct_file))?;

    let mut warnings = Vec::new();
    for file in [&params, &structure] {
        for rejected in &file.rejected {
            warnings.push(format!(
                "{}:{}: {}",
                file.path.display(),
                rejected.line,
                rejected.error
            ));
        }
    }

    let mut method = params.method_files().next().map(|(_, file)| file.to_owned());
    let mut entries = IndexMap::new();

    for record in &structure.records {
        let (name, kind, label) = match &record.declaration {
            Declaration::Attribute { name, label } => (name, EntryKind::Attribute, label),
            Declaration::Parameter { name, label } => (name, EntryKind::Parameter, label),
            Declaration::Method(target) => {
                let Some(file) = target.file() else { continue };
                if let Some(first) = &method {
                    return Err(DocumentError::DuplicateMethod {
                        file: struct_file.to_path_buf(),
                        line: record.line,
                        first: first.clone(),
                        second: file.to_owned(),
                    });
                }
                method = Some(file.to_owned());
                continue;
            }
            Declaration::Begin { .. } | Declaration::Other => continue,
        };

        let key = name.to_lowercase();
        let entry = ConstantEntry {
            kind,
            label: label.clone(),
            line: record.line,
        };
        if let Some(previous) = entries.insert(key.clone(), entry) {
            warnings.push(format!(
                "{} declared again at line {} (first at line {})",
                key, record.line, previous.line
            ));
        }
    }

    let Some(method) = method else {
        return Err(DocumentError::NoMethodDeclared {
            struct_file: struct_file.to_path_buf(),
            param_file,
        });
    };

    let method_file = families_dir.join(method);
    if !method_file.is_file() {
        return Err(DocumentError::SourceMissing {
            role: SourceRole::MethodFile,
            path: method_file,
        });
    }

    Ok(FamilyConstants {
        struct_file: struct_file.to_path_buf(),
        param_file,
        method_file,
        entries,
        warnings,
    })
}

/// `const name = 'name';` aligned with the region marker.
pub fn render_constant(name: &str, _entry: &ConstantEntry, anchor: &RegionAnchor<'_>) -> String {
    let indent = if anchor.indent.is_empty() {
        DEFAULT_CONSTANT_INDENT
    } else {
        anchor.indent
    };
    format!("{indent}const {name} = '{name}';{}", anchor.line_ending)
}

/// Rewrite the method file of one family.
pub fn inject_family(
    families_dir: &Path,
    struct_file: &Path,
    markers: &RegionMarkers,
    writer: &SafeFileWriter,
) -> Result<DocumentReport, DocumentError> {
    let family = resolve_family(families_dir, struct_file)?;
    for warning in &family.warnings {
        tracing::warn!(%warning, "declaration anomaly");
    }

    tracing::info!(
        method = %family.method_file.display(),
        param = %family.param_file.display(),
        "working on method file"
    );

    let original =
        Document::read(&family.method_file).map_err(DocumentError::read(&family.method_file))?;
    let outcome = splice_region(&original, &family.entries, markers, render_constant).map_err(
        |source| DocumentError::Splice {
            path: family.method_file.clone(),
            source,
        },
    )?;

    let mut warnings = family.warnings;
    for warning in &outcome.warnings {
        tracing::warn!(method = %family.method_file.display(), "{warning}");
        warnings.push(warning.to_string());
    }

    let status = if outcome.document == original {
        tracing::info!(
            constants = outcome.injected,
            "method file already up to date"
        );
        DocumentStatus::Unchanged {
            injected: outcome.injected,
        }
    } else {
        writer.write(
            &family.method_file,
            &outcome.document.to_text(),
            WriteMode::Overwrite,
        )?;
        tracing::info!(
            constants = outcome.injected,
            replaced = outcome.replaced,
            "constants written"
        );
        DocumentStatus::Written {
            injected: outcome.injected,
            replaced: outcome.replaced,
        }
    };

    Ok(DocumentReport {
        source: struct_file.to_path_buf(),
        target: Some(family.method_file),
        status,
        warnings,
    })
}

/// Inject constants for every family. Failures are recorded per document and
/// never stop the batch.
pub fn inject_constants(options: &InjectOptions, writer: &SafeFileWriter) -> BatchReport {
    let mut report = BatchReport::new();

    let family_files = if options.family_files.is_empty() {
        match discover_family_files(&options.families_dir) {
            Ok(files) => files,
            Err(error) => {
                tracing::error!(code = error.code(), "{error}");
                report.record(DocumentReport::from_error(&options.families_dir, &error));
                report.log_summary();
                return report;
            }
        }
    } else {
        options.family_files.clone()
    };
    tracing::info!(count = family_files.len(), "found family files");

    for struct_file in &family_files {
        let _span = document_span(struct_file).entered();
        let document =
            match inject_family(&options.families_dir, struct_file, &options.markers, writer) {
                Ok(document) => document,
                Err(error) => {
                    let document = DocumentReport::from_error(struct_file, &error);
                    match error.severity() {
                        crate::error::Severity::Notice => {
                            tracing::info!(code = error.code(), "skipping: {error}")
                        }
                        crate::error::Severity::Error => {
                            tracing::error!(code = error.code(), "{error}")
                        }
                    }
                    document
                }
            };
        report.record(document);
    }

    report.log_summary();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splice::Marker;

    #[test]
    fn param_companion_replaces_struct_prefix() {
        assert_eq!(
            companion_param_file(Path::new("Families/contract/STRUCT_CONTRACT.csv")),
            Some(PathBuf::from("Families/contract/PARAM_CONTRACT.csv"))
        );
        assert_eq!(companion_param_file(Path::new("Families/CONTRACT.csv")), None);
    }

    #[test]
    fn constants_follow_marker_indent() {
        let entry = ConstantEntry {
            kind: EntryKind::Attribute,
            label: None,
            line: 1,
        };
        let document = Document::from_text("\t/**ATTR**/\r\n\t/**ATTR**/\r\n");
        let entries: IndexMap<_, _> = [("ba_title".to_owned(), entry)].into_iter().collect();

        let outcome = splice_region(
            &document,
            &entries,
            &RegionMarkers::symmetric(Marker::new("/**ATTR**/")),
            render_constant,
        )
        .unwrap();

        assert_eq!(
            outcome.document.to_text(),
            "\t/**ATTR**/\r\n\tconst ba_title = 'ba_title';\r\n\t/**ATTR**/\r\n"
        );
    }

    #[test]
    fn unindented_marker_gets_default_indent() {
        let entry = ConstantEntry {
            kind: EntryKind::Parameter,
            label: None,
            line: 1,
        };
        let document = Document::from_text("/**ATTR**/\n/**ATTR**/\n");
        let entries: IndexMap<_, _> = [("pa_delay".to_owned(), entry)].into_iter().collect();

        let outcome =
            splice_region(&document, &entries, &RegionMarkers::default(), render_constant)
                .unwrap();

        assert_eq!(outcome.document.lines()[1], "    const pa_delay = 'pa_delay';\n");
    }
}
