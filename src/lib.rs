pub mod config;
pub mod constants;
pub mod error;
pub mod feed;
pub mod logging;
pub mod naming;
pub mod report;
pub mod scaffold;
pub mod splice;
pub mod template;
pub mod workflow;
pub mod writer;

pub use config::{CliArgs, Command, ToolConfig};
pub use error::{DocumentError, Severity};
pub use logging::{LoggingConfig, init_logging};
pub use report::{BatchReport, DocumentReport, DocumentStatus};
pub use splice::{Document, Marker, RegionAnchor, RegionMarkers, SpliceError, splice_region};

use anyhow::{Context, Result};
use constants::InjectOptions;
use scaffold::{FamilyRequest, WorkflowRequest};
use template::TemplateSet;
use workflow::GraphmlWorkflowRequest;
use writer::SafeFileWriter;

/// Run one subcommand to completion.
pub fn run(command: &Command, config: &ToolConfig) -> Result<()> {
    let _span = logging::operation_span(command.name()).entered();
    let writer = SafeFileWriter::new()
        .with_backups(config.backups)
        .with_backup_dir(config.backup_dir.clone());

    match command {
        Command::InjectConstants(_) => {
            let options = InjectOptions {
                families_dir: config.families_dir.clone(),
                family_files: config.family_files.clone(),
                markers: config.markers.clone(),
            };
            let report = constants::inject_constants(&options, &writer);
            println!("{}", report.summary());
            anyhow::ensure!(
                !report.has_failures(),
                "{} of {} family file(s) failed",
                report.failed,
                report.total()
            );
        }
        Command::Family(args) => {
            let templates = load_templates(config)?;
            let output = scaffold::generate_family(
                &templates,
                &writer,
                &FamilyRequest {
                    name: args.name.clone(),
                    namespace: args.namespace.clone(),
                    from_name: args.from_name.clone(),
                    from_class: args.from_class.clone(),
                    title: args.title.clone(),
                    target_dir: args.target_dir.clone(),
                    force: args.force,
                    with_workflow: args.with_workflow,
                },
            )?;
            print_memo(&output.memo);
        }
        Command::Workflow(args) => {
            let templates = load_templates(config)?;
            let output = scaffold::generate_workflow(
                &templates,
                &writer,
                &WorkflowRequest {
                    name: args.name.clone(),
                    namespace: args.namespace.clone(),
                    target_dir: args.target_dir.clone(),
                    force: args.force,
                },
            )?;
            print_memo(&output.memo);
        }
        Command::GraphmlWorkflow(args) => {
            let templates = load_templates(config)?;
            let output = workflow::generate_from_graphml(
                &templates,
                &writer,
                &GraphmlWorkflowRequest {
                    graphml_file: args.graphml_file.clone(),
                    family: args.family.clone(),
                    namespace: args.namespace.clone(),
                    target_dir: args.target_dir.clone(),
                    prefix: args.prefix.clone(),
                    locales_target_dir: args.locales_target_dir.clone(),
                    force: args.force,
                },
            )?;
            tracing::info!(
                files = output.files.len(),
                states = output.states,
                transitions = output.transitions,
                "workflow generated"
            );
        }
    }
    Ok(())
}

fn load_templates(config: &ToolConfig) -> Result<TemplateSet> {
    TemplateSet::load(config.template_dir.as_deref()).context("failed to load templates")
}

fn print_memo(memo: &[String]) {
    println!("Memo: add these lines to the application info.xml");
    for line in memo {
        println!("{line}");
    }
}
