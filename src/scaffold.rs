//! Skeleton files for new families and workflows.

use crate::naming;
use crate::template::{
    FAMILY_CLASS, FAMILY_METHOD, FAMILY_PARAM, FAMILY_STRUCT, TemplateError, TemplateSet,
    WORKFLOW_CLASS, WORKFLOW_CSV,
};
use crate::writer::{SafeFileWriter, WriteError, WriteMode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_FROM_CLASS: &str = "\\Dcp\\Family\\Document";

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(
        "{} existing file(s) would be overwritten, use --force to allow this: {}",
        .0.len(),
        .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )]
    WouldOverwrite(Vec<PathBuf>),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone)]
pub struct FamilyRequest {
    pub name: String,
    pub namespace: String,
    pub from_name: String,
    pub from_class: String,
    pub title: Option<String>,
    pub target_dir: PathBuf,
    pub force: bool,
    pub with_workflow: bool,
}

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub name: String,
    pub namespace: String,
    pub target_dir: PathBuf,
    pub force: bool,
}

/// Template values of a family skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyValues {
    pub family_title: String,
    pub family_icon: String,
    pub family_method: String,
    #[serde(rename = "familyDFLID")]
    pub family_dflid: String,
    pub family_name: String,
    pub family_class: String,
    pub from_name: String,
    pub from_class: String,
    pub namespace: String,
    pub namespace_class: String,
}

impl FamilyValues {
    pub fn new(request: &FamilyRequest) -> Self {
        let lower = request.name.to_lowercase();
        let upper = request.name.to_uppercase();
        let family_class = naming::capitalize(&request.name);
        let namespace = naming::namespace(&request.namespace);
        Self {
            family_title: request
                .title
                .clone()
                .unwrap_or_else(|| format!("title for {upper}")),
            family_icon: format!("{lower}.png"),
            family_method: format!("Method.{lower}.php"),
            family_dflid: format!("FLD_{upper}"),
            family_name: upper,
            namespace_class: format!("{namespace}\\{family_class}"),
            family_class,
            from_name: request.from_name.to_uppercase(),
            from_class: request.from_class.clone(),
            namespace,
        }
    }
}

/// Template values of a workflow skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowValues {
    pub family_name: String,
    pub family_class: String,
    pub namespace: String,
    pub namespace_class: String,
    pub workflow_name: String,
}

impl WorkflowValues {
    /// Values for a workflow generated on its own; the namespace is kept as
    /// given and the class path is rooted.
    pub fn standalone(request: &WorkflowRequest) -> Self {
        let upper = request.name.to_uppercase();
        let family_class = naming::capitalize(&upper);
        Self {
            namespace_class: format!("\\{}\\{family_class}", request.namespace),
            workflow_name: format!("{upper}_WFL"),
            family_name: upper,
            family_class,
            namespace: request.namespace.clone(),
        }
    }

    pub fn for_family(family: &FamilyValues) -> Self {
        Self {
            family_name: family.family_name.clone(),
            family_class: family.family_class.clone(),
            namespace: family.namespace.clone(),
            namespace_class: family.namespace_class.clone(),
            workflow_name: format!("{}_WFL", family.family_name),
        }
    }
}

/// A file ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

/// What a scaffold run produced.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldOutput {
    pub files: Vec<PathBuf>,
    /// Import commands to register the generated CSV files.
    pub memo: Vec<String>,
}

pub fn import_memo(csv_file_name: &str) -> String {
    format!(
        "<process command=\"./wsh.php --api=importDocuments --file=./@APPNAME@/{csv_file_name}\"/>"
    )
}

fn family_files(
    templates: &TemplateSet,
    target_dir: &Path,
    lower: &str,
    values: &FamilyValues,
) -> Result<Vec<RenderedFile>, TemplateError> {
    let targets = [
        (format!("{lower}__STRUCT.csv"), FAMILY_STRUCT),
        (format!("{lower}__PARAM.csv"), FAMILY_PARAM),
        (format!("{lower}__CLASS.php"), FAMILY_CLASS),
        (values.family_method.clone(), FAMILY_METHOD),
    ];
    render_all(templates, target_dir, &targets, values)
}

fn workflow_files(
    templates: &TemplateSet,
    target_dir: &Path,
    lower: &str,
    values: &WorkflowValues,
) -> Result<Vec<RenderedFile>, TemplateError> {
    let targets = [
        (format!("{lower}__WFL.csv"), WORKFLOW_CSV),
        (format!("{lower}__WFL_CLASS.php"), WORKFLOW_CLASS),
    ];
    render_all(templates, target_dir, &targets, values)
}

fn render_all<T: Serialize>(
    templates: &TemplateSet,
    target_dir: &Path,
    targets: &[(String, &str)],
    values: &T,
) -> Result<Vec<RenderedFile>, TemplateError> {
    targets
        .iter()
        .map(|(file_name, template)| {
            Ok(RenderedFile {
                path: target_dir.join(file_name),
                content: templates.render(template, values)?,
            })
        })
        .collect()
}

/// Write rendered files, refusing to replace any existing one unless `force`.
/// Existence is checked for every file before the first write.
pub fn write_files(
    writer: &SafeFileWriter,
    files: &[RenderedFile],
    force: bool,
) -> Result<Vec<PathBuf>, ScaffoldError> {
    if !force {
        let existing: Vec<PathBuf> = files
            .iter()
            .filter(|file| file.path.exists())
            .map(|file| file.path.clone())
            .collect();
        if !existing.is_empty() {
            for path in &existing {
                tracing::error!(path = %path.display(), "existing file would be overwritten");
            }
            return Err(ScaffoldError::WouldOverwrite(existing));
        }
    }

    let mode = if force {
        WriteMode::Overwrite
    } else {
        WriteMode::CreateNew
    };
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        writer.write(&file.path, &file.content, mode)?;
        tracing::info!(path = %file.path.display(), "generated");
        written.push(file.path.clone());
    }
    Ok(written)
}

pub fn generate_family(
    templates: &TemplateSet,
    writer: &SafeFileWriter,
    request: &FamilyRequest,
) -> Result<ScaffoldOutput, ScaffoldError> {
    let lower = request.name.to_lowercase();
    let values = FamilyValues::new(request);

    let mut files = family_files(templates, &request.target_dir, &lower, &values)?;
    if request.with_workflow {
        let workflow = WorkflowValues::for_family(&values);
        files.extend(workflow_files(templates, &request.target_dir, &lower, &workflow)?);
    }

    let written = write_files(writer, &files, request.force)?;

    let mut memo = vec![import_memo(&format!("{lower}__STRUCT.csv"))];
    if request.with_workflow {
        memo.push(import_memo(&format!("{lower}__WFL.csv")));
    }
    memo.push(import_memo(&format!("{lower}__PARAM.csv")));

    Ok(ScaffoldOutput {
        files: written,
        memo,
    })
}

pub fn generate_workflow(
    templates: &TemplateSet,
    writer: &SafeFileWriter,
    request: &WorkflowRequest,
) -> Result<ScaffoldOutput, ScaffoldError> {
    let lower = request.name.to_lowercase();
    let values = WorkflowValues::standalone(request);
    let files = workflow_files(templates, &request.target_dir, &lower, &values)?;
    let written = write_files(writer, &files, request.force)?;

    Ok(ScaffoldOutput {
        files: written,
        memo: vec![import_memo(&format!("{lower}__WFL.csv"))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> FamilyRequest {
        FamilyRequest {
            name: name.into(),
            namespace: "acme\\legal".into(),
            from_name: "".into(),
            from_class: DEFAULT_FROM_CLASS.into(),
            title: None,
            target_dir: PathBuf::from("out"),
            force: false,
            with_workflow: false,
        }
    }

    #[test]
    fn family_values_follow_naming_conventions() {
        let values = FamilyValues::new(&request("Contract"));

        assert_eq!(values.family_title, "title for CONTRACT");
        assert_eq!(values.family_icon, "contract.png");
        assert_eq!(values.family_method, "Method.contract.php");
        assert_eq!(values.family_dflid, "FLD_CONTRACT");
        assert_eq!(values.family_name, "CONTRACT");
        assert_eq!(values.family_class, "Contract");
        assert_eq!(values.namespace, "Acme\\Legal");
        assert_eq!(values.namespace_class, "Acme\\Legal\\Contract");
    }

    #[test]
    fn family_values_serialize_with_template_names() {
        let json = serde_json::to_value(FamilyValues::new(&request("contract"))).unwrap();
        assert_eq!(json["familyDFLID"], "FLD_CONTRACT");
        assert_eq!(json["namespaceClass"], "Acme\\Legal\\Contract");
    }

    #[test]
    fn standalone_workflow_keeps_namespace_verbatim() {
        let values = WorkflowValues::standalone(&WorkflowRequest {
            name: "contract".into(),
            namespace: "acme".into(),
            target_dir: PathBuf::from("out"),
            force: false,
        });

        assert_eq!(values.workflow_name, "CONTRACT_WFL");
        assert_eq!(values.family_class, "Contract");
        assert_eq!(values.namespace_class, "\\acme\\Contract");
    }

    #[test]
    fn memo_points_at_app_directory() {
        assert_eq!(
            import_memo("contract__STRUCT.csv"),
            "<process command=\"./wsh.php --api=importDocuments --file=./@APPNAME@/contract__STRUCT.csv\"/>"
        );
    }
}
