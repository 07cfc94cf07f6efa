//! Tera templates for generated files.
//!
//! The built-in set is compiled into the binary. A template directory may
//! override any of them by providing a file with the same name.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;

pub const FAMILY_STRUCT: &str = "family__STRUCT.csv.tera";
pub const FAMILY_PARAM: &str = "family__PARAM.csv.tera";
pub const FAMILY_CLASS: &str = "family.php.tera";
pub const FAMILY_METHOD: &str = "family.method.php.tera";
pub const WORKFLOW_CSV: &str = "workflow__WFL.csv.tera";
pub const WORKFLOW_CLASS: &str = "workflow__class.php.tera";
pub const GRAPHML_WORKFLOW_CLASS: &str = "graphml_workflow__class.php.tera";

const BUILTIN: &[(&str, &str)] = &[
    (
        FAMILY_STRUCT,
        include_str!("../../templates/family__STRUCT.csv.tera"),
    ),
    (
        FAMILY_PARAM,
        include_str!("../../templates/family__PARAM.csv.tera"),
    ),
    (FAMILY_CLASS, include_str!("../../templates/family.php.tera")),
    (
        FAMILY_METHOD,
        include_str!("../../templates/family.method.php.tera"),
    ),
    (
        WORKFLOW_CSV,
        include_str!("../../templates/workflow__WFL.csv.tera"),
    ),
    (
        WORKFLOW_CLASS,
        include_str!("../../templates/workflow__class.php.tera"),
    ),
    (
        GRAPHML_WORKFLOW_CLASS,
        include_str!("../../templates/graphml_workflow__class.php.tera"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot read template {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("template {name}: {source}")]
    Tera {
        name: String,
        #[source]
        source: tera::Error,
    },
}

#[derive(Debug)]
pub struct TemplateSet {
    tera: Tera,
    overridden: Vec<String>,
}

impl TemplateSet {
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::load(None)
    }

    /// Built-in templates, with same-named files from `dir` taking precedence.
    pub fn load(dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        let mut overridden = Vec::new();
        for (name, builtin) in BUILTIN {
            let source = match dir {
                Some(dir) => override_for(dir, name)?,
                None => None,
            };
            let content = match source {
                Some(content) => {
                    overridden.push((*name).to_owned());
                    content
                }
                None => (*builtin).to_owned(),
            };
            tera.add_raw_template(name, &content)
                .map_err(|source| TemplateError::Tera {
                    name: (*name).to_owned(),
                    source,
                })?;
        }

        if !overridden.is_empty() {
            tracing::debug!(templates = ?overridden, "using template overrides");
        }
        Ok(Self { tera, overridden })
    }

    pub fn overridden(&self) -> &[String] {
        &self.overridden
    }

    pub fn render<T: Serialize>(&self, name: &str, values: &T) -> Result<String, TemplateError> {
        let wrap = |source: tera::Error| TemplateError::Tera {
            name: name.to_owned(),
            source,
        };
        let context = Context::from_serialize(values).map_err(wrap)?;
        self.tera.render(name, &context).map_err(wrap)
    }
}

fn override_for(dir: &Path, name: &str) -> Result<Option<String>, TemplateError> {
    if !dir.is_dir() {
        return Err(TemplateError::NotADirectory(dir.to_path_buf()));
    }
    let path = dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(&path)
        .map(Some)
        .map_err(|source| TemplateError::Read { path, source })
}
