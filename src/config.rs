use crate::splice::{ATTR_MARKER, Marker, RegionMarkers};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_FAMILIES_DIR: &str = "Families";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dcp-codegen",
    about = "Code generation helpers for Dynacase family applications",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)",
        global = true
    )]
    pub verbose: u8,

    #[arg(
        long,
        env = "DCP_CODEGEN_TEMPLATE_DIR",
        value_name = "DIR",
        help = "Directory whose templates override the built-in ones",
        global = true
    )]
    pub template_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write attribute and parameter names as constants into family method files
    InjectConstants(InjectArgs),
    /// Generate the skeleton of a new family
    Family(FamilyArgs),
    /// Generate the skeleton of a family workflow
    Workflow(WorkflowArgs),
    /// Generate a workflow base class from a yEd GraphML diagram
    GraphmlWorkflow(GraphmlArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InjectConstants(_) => "inject-constants",
            Command::Family(_) => "family",
            Command::Workflow(_) => "workflow",
            Command::GraphmlWorkflow(_) => "graphml-workflow",
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct InjectArgs {
    #[arg(
        env = "DCP_CODEGEN_FAMILIES_DIR",
        value_name = "DIR",
        help = "Directory containing the family definitions"
    )]
    pub families_dir: Option<PathBuf>,

    #[arg(
        long = "family-file",
        value_name = "FILE",
        help = "Process only this STRUCT file (repeatable)"
    )]
    pub family_files: Vec<PathBuf>,

    #[arg(
        long,
        env = "DCP_CODEGEN_ATTR_MARKER",
        value_name = "TEXT",
        help = "Marker delimiting the constants region"
    )]
    pub attr_marker: Option<String>,

    #[arg(
        long,
        env = "DCP_CODEGEN_ATTR_MARKER_WRITE",
        value_name = "TEXT",
        help = "Marker spelling written back, to rename the marker"
    )]
    pub attr_marker_write: Option<String>,

    #[arg(long, help = "Keep a .bak copy of every rewritten method file")]
    pub backup: bool,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory receiving the .bak copies (implies --backup)"
    )]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FamilyArgs {
    #[arg(help = "Logical name of the family")]
    pub name: String,

    #[arg(help = "PHP namespace of the family classes")]
    pub namespace: String,

    #[arg(short, long, default_value = "", help = "Logical name of the parent family")]
    pub from_name: String,

    #[arg(
        short = 'p',
        long,
        default_value = crate::scaffold::DEFAULT_FROM_CLASS,
        help = "Class of the parent family"
    )]
    pub from_class: String,

    #[arg(long, help = "Family title")]
    pub title: Option<String>,

    #[arg(short, long, value_name = "DIR", help = "Where generated files are placed")]
    pub target_dir: PathBuf,

    #[arg(long, help = "Overwrite existing files")]
    pub force: bool,

    #[arg(short, long, help = "Also generate a workflow for the family")]
    pub with_workflow: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WorkflowArgs {
    #[arg(help = "Logical name of the family")]
    pub name: String,

    #[arg(help = "PHP namespace of the workflow class")]
    pub namespace: String,

    #[arg(short, long, value_name = "DIR", help = "Where generated files are placed")]
    pub target_dir: PathBuf,

    #[arg(long, help = "Overwrite existing files")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GraphmlArgs {
    #[arg(value_name = "GRAPHML", help = "yEd GraphML diagram of the workflow")]
    pub graphml_file: PathBuf,

    #[arg(help = "Logical name of the family")]
    pub family: String,

    #[arg(help = "PHP namespace of the workflow class")]
    pub namespace: String,

    #[arg(short, long, value_name = "DIR", help = "Where the class is placed")]
    pub target_dir: PathBuf,

    #[arg(long, help = "Prefix of state and transition ids")]
    pub prefix: Option<String>,

    #[arg(long, value_name = "DIR", help = "Where to put the locales stub")]
    pub locales_target_dir: Option<PathBuf>,

    #[arg(long, help = "Overwrite existing files")]
    pub force: bool,
}

/// Settings shared by every subcommand, after merging flags, env and file.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub families_dir: PathBuf,
    pub family_files: Vec<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub markers: RegionMarkers,
    pub backups: bool,
    pub backup_dir: Option<PathBuf>,
}

impl ToolConfig {
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let file_config = match args.config.as_ref() {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };

        let PartialConfig {
            families_dir: file_families_dir,
            template_dir: file_template_dir,
            attr_marker: file_attr_marker,
            attr_marker_write: file_attr_marker_write,
            backups: file_backups,
            backup_dir: file_backup_dir,
        } = file_config;

        let inject = match &args.command {
            Command::InjectConstants(inject) => inject.clone(),
            _ => InjectArgs::default(),
        };

        let families_dir = inject
            .families_dir
            .or(file_families_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FAMILIES_DIR));

        let family_files = inject
            .family_files
            .into_iter()
            .map(|path| {
                if path.is_absolute() || path.exists() {
                    path
                } else {
                    families_dir.join(path)
                }
            })
            .collect();

        let read = inject
            .attr_marker
            .or(file_attr_marker)
            .unwrap_or_else(|| ATTR_MARKER.to_string());
        let write = inject
            .attr_marker_write
            .or(file_attr_marker_write)
            .unwrap_or_else(|| read.clone());

        let backup_dir = inject.backup_dir.or(file_backup_dir);

        Ok(Self {
            families_dir,
            family_files,
            template_dir: args.template_dir.clone().or(file_template_dir),
            markers: RegionMarkers::symmetric(Marker::migrating(read, write)),
            backups: inject.backup || file_backups.unwrap_or(false) || backup_dir.is_some(),
            backup_dir,
        })
    }

    /// Check what `command` needs before anything is read or written.
    pub fn validate(&self, command: &Command) -> Result<()> {
        anyhow::ensure!(
            !self.markers.begin.read().trim().is_empty(),
            "the region marker must not be empty"
        );
        anyhow::ensure!(
            !self.markers.begin.write().trim().is_empty(),
            "the written region marker must not be empty"
        );
        if let Some(dir) = self.template_dir.as_ref() {
            anyhow::ensure!(
                dir.is_dir(),
                "template directory {:?} is not a directory",
                dir
            );
        }
        if let Command::InjectConstants(_) = command {
            anyhow::ensure!(
                self.families_dir.is_dir(),
                "families directory {:?} is not a directory",
                self.families_dir
            );
            for file in &self.family_files {
                anyhow::ensure!(file.is_file(), "family file {:?} does not exist", file);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    families_dir: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    attr_marker: Option<String>,
    attr_marker_write: Option<String>,
    backups: Option<bool>,
    backup_dir: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("dcp-codegen").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    #[serial]
    fn defaults_use_attr_marker_and_families_dir() {
        let config = ToolConfig::from_args(&parse(&["inject-constants"])).unwrap();

        assert_eq!(config.families_dir, PathBuf::from("Families"));
        assert_eq!(config.markers, RegionMarkers::default());
        assert!(!config.backups);
    }

    #[test]
    #[serial]
    fn flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codegen.yaml");
        fs::write(
            &path,
            "families_dir: /srv/app/Families\nattr_marker: '/**CONST**/'\nbackups: true\n",
        )
        .unwrap();
        let config_arg = path.to_str().unwrap();

        let from_file =
            ToolConfig::from_args(&parse(&["--config", config_arg, "inject-constants"])).unwrap();
        assert_eq!(from_file.families_dir, PathBuf::from("/srv/app/Families"));
        assert_eq!(from_file.markers.begin.read(), "/**CONST**/");
        assert!(from_file.backups);

        let overridden = ToolConfig::from_args(&parse(&[
            "--config",
            config_arg,
            "inject-constants",
            "other",
            "--attr-marker-write",
            "/**ATTR**/",
        ]))
        .unwrap();
        assert_eq!(overridden.families_dir, PathBuf::from("other"));
        assert_eq!(overridden.markers.begin.read(), "/**CONST**/");
        assert_eq!(overridden.markers.begin.write(), "/**ATTR**/");
    }

    #[test]
    #[serial]
    fn env_sets_the_marker() {
        unsafe {
            env::set_var("DCP_CODEGEN_ATTR_MARKER", "/**FIELDS**/");
        }
        let config = ToolConfig::from_args(&parse(&["inject-constants"])).unwrap();
        unsafe {
            env::remove_var("DCP_CODEGEN_ATTR_MARKER");
        }

        assert_eq!(config.markers.begin.read(), "/**FIELDS**/");
        assert_eq!(config.markers.end.write(), "/**FIELDS**/");
    }

    #[test]
    #[serial]
    fn backup_dir_turns_backups_on() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codegen.yml");
        fs::write(&path, "backup_dir: /var/backups/codegen\n").unwrap();
        let config_arg = path.to_str().unwrap();

        let from_file =
            ToolConfig::from_args(&parse(&["--config", config_arg, "inject-constants"])).unwrap();
        assert!(from_file.backups);
        assert_eq!(
            from_file.backup_dir,
            Some(PathBuf::from("/var/backups/codegen"))
        );

        let from_flag = ToolConfig::from_args(&parse(&[
            "--config",
            config_arg,
            "inject-constants",
            "--backup-dir",
            "bak",
        ]))
        .unwrap();
        assert_eq!(from_flag.backup_dir, Some(PathBuf::from("bak")));
    }

    #[test]
    fn json_config_is_supported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codegen.json");
        fs::write(&path, r#"{ "template_dir": "tpl" }"#).unwrap();

        let parsed = load_config_file(&path).unwrap();
        assert_eq!(parsed.template_dir, Some(PathBuf::from("tpl")));
    }

    #[test]
    fn unknown_config_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codegen.toml");
        fs::write(&path, "").unwrap();
        assert!(load_config_file(&path).is_err());
    }

    #[test]
    #[serial]
    fn validate_rejects_missing_families_dir() {
        let args = parse(&["inject-constants", "/nonexistent/Families"]);
        let config = ToolConfig::from_args(&args).unwrap();
        assert!(config.validate(&args.command).is_err());
    }

    #[test]
    #[serial]
    fn validate_rejects_blank_marker() {
        let dir = TempDir::new().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let args = parse(&["inject-constants", dir_arg, "--attr-marker", "  "]);
        let config = ToolConfig::from_args(&args).unwrap();
        assert!(config.validate(&args.command).is_err());
    }

    #[test]
    fn family_subcommand_accepts_short_flags() {
        let args = parse(&["family", "contract", "acme", "-f", "base", "-t", "out", "-w"]);
        match args.command {
            Command::Family(family) => {
                assert_eq!(family.from_name, "base");
                assert_eq!(family.from_class, "\\Dcp\\Family\\Document");
                assert_eq!(family.target_dir, PathBuf::from("out"));
                assert!(family.with_workflow);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
