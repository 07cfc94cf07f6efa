//! Family declaration files (`STRUCT_*.csv`, `PARAM_*.csv`).
//!
//! Each line is a `;`-separated record whose first field is a tag. Records are
//! decoded once here into [`Declaration`]; nothing downstream looks at raw tags.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{AsRefStr, EnumString};
use thiserror::Error;

const FIELD_SEPARATOR: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
enum Tag {
    Begin,
    Attr,
    Param,
    Method,
}

/// Where a `METHOD` record points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTarget {
    /// A PHP method file, relative to the families directory.
    File(String),
    /// A `*` or `+` prefixed reference to methods inherited or inlined.
    Inline(String),
}

impl MethodTarget {
    fn parse(raw: &str) -> Self {
        if raw.starts_with('*') || raw.starts_with('+') {
            MethodTarget::Inline(raw.to_owned())
        } else {
            MethodTarget::File(raw.to_owned())
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            MethodTarget::File(name) => Some(name),
            MethodTarget::Inline(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Begin {
        parent: Option<String>,
        title: Option<String>,
    },
    Attribute {
        name: String,
        label: Option<String>,
    },
    Parameter {
        name: String,
        label: Option<String>,
    },
    Method(MethodTarget),
    /// Any record whose tag this tool has no use for.
    Other,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("{tag} record has no name")]
    MissingName { tag: String },
}

impl Declaration {
    pub fn parse_line(line: &str) -> Result<Self, DeclarationError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let Ok(tag) = Tag::from_str(fields[0]) else {
            return Ok(Declaration::Other);
        };

        let field = |index: usize| {
            fields
                .get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        let name = || {
            field(1).ok_or_else(|| DeclarationError::MissingName {
                tag: tag.as_ref().to_owned(),
            })
        };

        Ok(match tag {
            Tag::Begin => Declaration::Begin {
                parent: field(1),
                title: field(2),
            },
            Tag::Attr => Declaration::Attribute {
                name: name()?,
                label: field(3),
            },
            Tag::Param => Declaration::Parameter {
                name: name()?,
                label: field(3),
            },
            Tag::Method => Declaration::Method(MethodTarget::parse(&name()?)),
        })
    }
}

/// A decoded record with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRecord {
    pub line: usize,
    pub declaration: Declaration,
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    pub line: usize,
    pub error: DeclarationError,
}

#[derive(Debug, Clone, Default)]
pub struct DeclarationFile {
    pub path: PathBuf,
    pub records: Vec<DeclarationRecord>,
    pub rejected: Vec<RejectedLine>,
}

impl DeclarationFile {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(path, &text))
    }

    pub fn parse(path: &Path, text: &str) -> Self {
        let mut records = Vec::new();
        let mut rejected = Vec::new();
        for (index, line) in text.lines().enumerate() {
            match Declaration::parse_line(line) {
                Ok(Declaration::Other) => {}
                Ok(declaration) => records.push(DeclarationRecord {
                    line: index + 1,
                    declaration,
                }),
                Err(error) => rejected.push(RejectedLine {
                    line: index + 1,
                    error,
                }),
            }
        }
        Self {
            path: path.to_path_buf(),
            records,
            rejected,
        }
    }

    /// Method files in declaration order, skipping inline references.
    pub fn method_files(&self) -> impl Iterator<Item = (usize, &str)> {
        self.records.iter().filter_map(|record| match &record.declaration {
            Declaration::Method(target) => target.file().map(|file| (record.line, file)),
            _ => None,
        })
    }
}
