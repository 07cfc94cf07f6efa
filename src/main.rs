use clap::Parser;
use dcp_codegen::{CliArgs, LoggingConfig, ToolConfig, init_logging, run};

fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    let logging_config = LoggingConfig::from_env().with_verbosity(cli.verbose);
    let _guard = init_logging(logging_config)?;

    let config = ToolConfig::from_args(&cli)?;

    // Fail before touching any file
    config.validate(&cli.command)?;

    run(&cli.command, &config)
}
