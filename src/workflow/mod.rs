//! Workflow base class generation from a yEd GraphML diagram.

pub mod fragments;

use crate::feed::{GraphmlError, WorkflowGraph};
use crate::naming;
use crate::template::{GRAPHML_WORKFLOW_CLASS, TemplateError, TemplateSet};
use crate::writer::{SafeFileWriter, WriteError, WriteMode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("generation aborted:\n  {}", .0.join("\n  "))]
    Preconditions(Vec<String>),

    #[error("{}: {source}", path.display())]
    Graphml {
        path: PathBuf,
        #[source]
        source: GraphmlError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("{source}; already written: {}", display_paths(written))]
    PartialWrite {
        written: Vec<PathBuf>,
        #[source]
        source: WriteError,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct GraphmlWorkflowRequest {
    pub graphml_file: PathBuf,
    pub family: String,
    pub namespace: String,
    pub target_dir: PathBuf,
    /// Renames every id to `<prefix>_<id>` and becomes the attribute prefix.
    pub prefix: Option<String>,
    pub locales_target_dir: Option<PathBuf>,
    pub force: bool,
}

impl GraphmlWorkflowRequest {
    pub fn class_target(&self) -> PathBuf {
        self.target_dir.join(format!(
            "{}__WFL_BASE_CLASS.php",
            self.family.to_lowercase()
        ))
    }

    pub fn locales_target(&self) -> Option<PathBuf> {
        self.locales_target_dir.as_ref().map(|dir| {
            dir.join(format!(
                "{}__WFL_BASE_LOCALES.php",
                self.family.to_lowercase()
            ))
        })
    }

    /// Attribute prefix of the generated class.
    pub fn attr_prefix(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_owned(),
            _ => format!("{}_wfl", self.family.to_lowercase()),
        }
    }

    /// Every reason the request cannot run, empty when it can.
    pub fn check(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.graphml_file.is_file() {
            problems.push(format!(
                "{} is not a GraphML file",
                self.graphml_file.display()
            ));
        }
        if !self.target_dir.is_dir() {
            problems.push(format!(
                "target directory {} does not exist",
                self.target_dir.display()
            ));
        }
        if let Some(dir) = &self.locales_target_dir {
            if !dir.is_dir() {
                problems.push(format!(
                    "locales directory {} does not exist",
                    dir.display()
                ));
            }
        }
        let targets = std::iter::once(self.class_target()).chain(self.locales_target());
        for target in targets {
            let Ok(metadata) = target.metadata() else {
                continue;
            };
            if !self.force {
                problems.push(format!(
                    "{} already exists, use --force to overwrite",
                    target.display()
                ));
            } else if metadata.permissions().readonly() {
                problems.push(format!("{} is read-only", target.display()));
            }
        }
        problems
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowClassValues {
    pub namespace: String,
    pub workflow_class: String,
    pub prefix: String,
    pub first_state: String,
    pub state_constants: String,
    pub transition_constants: String,
    pub transitions: String,
    pub cycle: String,
    pub activities: String,
    pub abstract_methods: String,
}

impl WorkflowClassValues {
    pub fn new(request: &GraphmlWorkflowRequest, graph: &WorkflowGraph) -> Self {
        Self {
            namespace: naming::namespace(&request.namespace),
            workflow_class: naming::capitalize(&format!("{}_wfl_base", request.family)),
            prefix: request.attr_prefix(),
            first_state: graph.first_state.clone(),
            state_constants: fragments::constants(&graph.states),
            transition_constants: fragments::constants(&graph.transitions),
            transitions: fragments::transitions(&graph.transitions),
            cycle: fragments::cycle(&graph.transitions),
            activities: fragments::activities(&graph.states),
            abstract_methods: fragments::abstract_methods(&graph.transitions),
        }
    }
}

/// Generated files, in write order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOutput {
    pub files: Vec<PathBuf>,
    pub states: usize,
    pub transitions: usize,
}

pub fn generate_from_graphml(
    templates: &TemplateSet,
    writer: &SafeFileWriter,
    request: &GraphmlWorkflowRequest,
) -> Result<WorkflowOutput, WorkflowError> {
    let problems = request.check();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("{problem}");
        }
        return Err(WorkflowError::Preconditions(problems));
    }

    let id_prefix = request.prefix.as_deref().unwrap_or_default();
    let graph = read_graph(&request.graphml_file, id_prefix)?;
    tracing::info!(
        states = graph.states.len(),
        transitions = graph.transitions.len(),
        first_state = %graph.first_state,
        "workflow diagram decoded"
    );

    let class = templates.render(
        GRAPHML_WORKFLOW_CLASS,
        &WorkflowClassValues::new(request, &graph),
    )?;
    let locales = request
        .locales_target()
        .map(|target| (target, fragments::locales(&graph.states, &graph.transitions)));

    let mode = if request.force {
        WriteMode::Overwrite
    } else {
        WriteMode::CreateNew
    };
    let mut files = Vec::new();
    let class_target = request.class_target();
    writer.write(&class_target, &class, mode)?;
    tracing::info!(path = %class_target.display(), "generated workflow class");
    files.push(class_target);

    if let Some((target, content)) = locales {
        if let Err(source) = writer.write(&target, &content, mode) {
            tracing::error!(
                path = %target.display(),
                written = files.len(),
                "locales stub not written"
            );
            return Err(WorkflowError::PartialWrite {
                written: files,
                source,
            });
        }
        tracing::info!(path = %target.display(), "generated locales stub");
        files.push(target);
    }

    Ok(WorkflowOutput {
        files,
        states: graph.states.len(),
        transitions: graph.transitions.len(),
    })
}

fn read_graph(path: &Path, prefix: &str) -> Result<WorkflowGraph, WorkflowError> {
    WorkflowGraph::read(path, prefix).map_err(|source| WorkflowError::Graphml {
        path: path.to_path_buf(),
        source,
    })
}
