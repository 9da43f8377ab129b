use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Tessera binary.
#[derive(Debug, Parser)]
#[command(name = "tessera", version, about = "Compose block pages into cacheable render trees")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TESSERA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compose a page layout and print its render tree as JSON.
    Compose(ComposeArgs),
    /// List the regions a layout can place blocks into.
    Regions(RegionsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub overrides: ComposeOverrides,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,

    /// Layout file describing the page variant, its blocks and contexts.
    #[arg(value_name = "LAYOUT", value_hint = ValueHint::FilePath)]
    pub layout: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Read the region catalog from this layout instead of the default one.
    #[arg(long, value_name = "LAYOUT", value_hint = ValueHint::FilePath)]
    pub layout: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ComposeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the number of block builds allowed to run at once.
    #[arg(long = "block-concurrency", value_name = "COUNT")]
    pub block_concurrency: Option<u64>,
}
