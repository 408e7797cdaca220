//! CLI command definitions and handlers

mod analyze;
mod graph;
mod init;
mod session;
mod watch;

use crate::config::{load_config_file, ModscopeConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Modscope - module and provider analysis for decorator-DI TypeScript projects
#[derive(Parser, Debug)]
#[command(name = "modscope")]
#[command(
    version,
    about = "Static analysis for decorator-based dependency-injection backends",
    long_about = "Modscope parses a TypeScript project, rebuilds its module graph and \
provider wiring, and runs architecture, security, correctness and performance rules \
over the result.\n\n\
Run without a subcommand to analyze the current directory:\n  \
modscope .",
    after_help = "\
Examples:
  modscope .                              Analyze current directory
  modscope analyze . --format json        JSON output for scripting
  modscope analyze . --fail-under 75      Exit code 1 below score 75 (CI mode)
  modscope graph . --format dot | dot -Tsvg > modules.svg
  modscope watch .                        Re-analyze on save
  modscope session .                      JSON-lines transport for editors"
)]
pub struct Cli {
    /// Path to the project (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Configuration file to use instead of the project's modscope.toml
    #[arg(long, global = true, env = "MODSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example modscope.toml
    Init,

    /// Analyze a project and print diagnostics with its score
    #[command(after_help = "\
Examples:
  modscope analyze .                      Analyze current directory
  modscope analyze apps/api               Analyze one sub-project
  modscope analyze . --format json        JSON report
  modscope analyze . --fail-under 90      Fail CI unless the project is Excellent")]
    Analyze {
        /// Output format
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Exit with code 1 when the score is below this value
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        fail_under: Option<u8>,
    },

    /// Export the module graph
    Graph {
        /// Output format
        #[arg(long, short = 'f', default_value = "dot", value_parser = ["dot", "json"])]
        format: String,
    },

    /// Watch the project and re-analyze changed files
    Watch,

    /// Serve a scan session over stdin/stdout (one JSON message per line)
    Session,
}

/// Configuration from `--config`, or `None` to let the workspace discover it
fn config_override(path: Option<&Path>) -> Result<Option<ModscopeConfig>> {
    path.map(|p| load_config_file(p).with_context(|| format!("Invalid config file {}", p.display())))
        .transpose()
}

pub fn run(cli: Cli) -> Result<()> {
    let config = config_override(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Init) => init::run(&cli.path),
        Some(Commands::Analyze { format, fail_under }) => {
            analyze::run(&cli.path, config, &format, fail_under)
        }
        Some(Commands::Graph { format }) => graph::run(&cli.path, config, &format),
        Some(Commands::Watch) => watch::run(&cli.path, config),
        Some(Commands::Session) => session::run(&cli.path, config),
        None => analyze::run(&cli.path, config, "text", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["modscope", "analyze", "apps/api", "--format", "json", "--fail-under", "75"])
            .unwrap();
        assert_eq!(cli.path, PathBuf::from("apps/api"));
        match cli.command {
            Some(Commands::Analyze { format, fail_under }) => {
                assert_eq!(format, "json");
                assert_eq!(fail_under, Some(75));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(Cli::try_parse_from(["modscope", "analyze", "--fail-under", "101"]).is_err());
        assert!(Cli::try_parse_from(["modscope", "graph", "--format", "svg"]).is_err());
    }

    #[test]
    fn test_default_is_analyze_current_dir() {
        let cli = Cli::try_parse_from(["modscope"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.path, PathBuf::from("."));
    }
}
