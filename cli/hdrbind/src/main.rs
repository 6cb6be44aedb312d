//! hdrbind CLI: translate the exported functions of a C header into an
//! `extern` block.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use hdrbind_core::BindError;
use tracing_subscriber::EnvFilter;

use commands::translate::TranslateOptions;
use config::{Frontend, HdrbindConfig, OutputFormat};

/// Environment variable holding a tracing filter, e.g. `hdrbind_core=trace`.
const LOG_ENV: &str = "HDRBIND_LOG";

#[derive(Parser)]
#[command(name = "hdrbind", version, about = "Translate C header declarations into extern blocks")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Config file to use instead of searching for hdrbind.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a header's exported functions
    Translate {
        /// C header or source file
        header: PathBuf,
        /// Compiler flag passed to the front end (repeatable)
        #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
        flags: Vec<String>,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Front end used to parse the header
        #[arg(long, value_enum)]
        frontend: Option<Frontend>,
    },
    /// Print the declaration tree of a header
    Inspect {
        /// C header or source file
        header: PathBuf,
        /// Compiler flag passed to the front end (repeatable)
        #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
        flags: Vec<String>,
        /// Front end used to parse the header
        #[arg(long, value_enum)]
        frontend: Option<Frontend>,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a starter hdrbind.toml in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        process::exit(report(&e));
    }
}

/// Print `e` and pick the exit status for it.
fn report(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<BindError>() {
        Some(BindError::SourceDiagnostics(diagnostics)) => {
            for diagnostic in diagnostics {
                eprintln!("{diagnostic}");
            }
        }
        _ => eprintln!("error: {e:#}"),
    }
    e.downcast_ref::<BindError>().map_or(1, BindError::exit_code)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "off"
    } else {
        "error"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init => commands::init::run(&cwd),

        Commands::Translate {
            header,
            flags,
            format,
            output,
            frontend,
        } => {
            let (config, config_dir) = load_config(cli.config.as_deref(), &cwd)?;
            let options = TranslateOptions {
                header,
                flags,
                format,
                output,
                frontend,
            };
            commands::translate::run(&config, &config_dir, options)
        }

        Commands::Inspect {
            header,
            flags,
            frontend,
            json,
        } => {
            let (config, config_dir) = load_config(cli.config.as_deref(), &cwd)?;
            commands::inspect::run(&config, &config_dir, &header, &flags, frontend, json)
        }
    }
}

/// The config named on the command line, else the nearest `hdrbind.toml`,
/// else defaults. Comes with the directory relative paths resolve against.
fn load_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<(HdrbindConfig, PathBuf)> {
    if let Some(path) = explicit {
        let config = HdrbindConfig::load(path)?;
        let dir = path
            .parent()
            .map(|parent| cwd.join(parent))
            .unwrap_or_else(|| cwd.to_path_buf());
        return Ok((config, dir));
    }
    match HdrbindConfig::find_and_load(cwd)? {
        Some((config, dir)) => {
            tracing::debug!(dir = %dir.display(), "using hdrbind.toml");
            Ok((config, dir))
        }
        None => Ok((HdrbindConfig::default(), cwd.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrbind_core::diag::{Diagnostic, SourceLocation};

    #[test]
    fn flags_may_start_with_a_dash() {
        let cli = Cli::try_parse_from([
            "hdrbind", "translate", "api.h", "--flag", "-m32", "--flag=-DX=1", "--format", "json",
        ])
        .unwrap();
        let Commands::Translate { flags, format, .. } = cli.command else {
            panic!("expected translate");
        };
        assert_eq!(flags, ["-m32", "-DX=1"]);
        assert_eq!(format, Some(OutputFormat::Json));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["hdrbind", "-v", "-q", "init"]).is_err());
    }

    #[test]
    fn exit_status_follows_error_category() {
        let source = anyhow::Error::new(BindError::SourceDiagnostics(vec![Diagnostic::error(
            SourceLocation::new("a.h", 1, 1),
            "unknown type name 'x'",
        )]));
        assert_eq!(report(&source), 1);
        let unsupported = anyhow::Error::new(BindError::Unsupported {
            kind: "vector".into(),
            location: SourceLocation::new("a.h", 2, 3),
        });
        assert_eq!(report(&unsupported), 2);
        let internal = anyhow::Error::new(BindError::Unexposed {
            location: SourceLocation::new("a.h", 4, 1),
        });
        assert_eq!(report(&internal), 101);
        assert_eq!(report(&anyhow::anyhow!("config trouble")), 1);
    }
}
