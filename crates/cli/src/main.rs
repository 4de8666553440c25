// postwatch CLI - posts-per-party workbook and document export

mod exit_codes;
mod export;
mod inspect;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};

use exit_codes::{EXIT_CONFIG, EXIT_INPUT, EXIT_RENDER, EXIT_SUCCESS, EXIT_USAGE, EXIT_WRITE};

#[derive(Parser)]
#[command(name = "postwatch")]
#[command(about = "Reconcile per-party post counts with election results and export charts")]
#[command(version, long_version = long_version())]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only errors on stderr
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// The two payload files plus the optional report config.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Posts payload (JSON, current or legacy schema)
    #[arg(long, value_name = "FILE")]
    posts: PathBuf,

    /// Election percentage payload (JSON)
    #[arg(long, value_name = "FILE")]
    election: PathBuf,

    /// Report config (TOML). Defaults to the file shown by `postwatch config-path`
    #[arg(long, value_name = "FILE", env = "POSTWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the workbook and/or document
    #[command(after_help = "\
Examples:
  postwatch export --posts posts.json --election election.json
  postwatch export --posts posts.json --election election.json --format pdf --out-dir out/
  postwatch export --posts posts.json --election election.json --config report.toml --json")]
    Export {
        #[command(flatten)]
        inputs: InputArgs,

        /// Which artifacts to write
        #[arg(long, short = 'f', value_enum, default_value = "both")]
        format: export::FormatArg,

        /// Directory for the artifacts (created if missing)
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,

        /// Print a JSON summary of the written artifacts to stdout
        #[arg(long)]
        json: bool,
    },

    /// Print the reconciled report as JSON
    #[command(after_help = "\
Examples:
  postwatch inspect --posts posts.json --election election.json
  postwatch inspect --posts posts.json --election election.json --charts | jq '.issues'")]
    Inspect {
        #[command(flatten)]
        inputs: InputArgs,

        /// Include the chart specs
        #[arg(long)]
        charts: bool,
    },

    /// Print the default config file location
    ConfigPath,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("POSTWATCH_COMMIT"), ")",
        "\nrecon:   postwatch-recon ", env!("CARGO_PKG_VERSION"),
        "\nio:      postwatch-io ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    // RUST_LOG, when set, wins over the flags.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Export { inputs, format, out_dir, json } => {
            export::cmd_export(&inputs, format, &out_dir, json, cli.quiet)
        }
        Commands::Inspect { inputs, charts } => inspect::cmd_inspect(&inputs, charts),
        Commands::ConfigPath => cmd_config_path(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RENDER, message: msg.into(), hint: None }
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self { code: EXIT_WRITE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<postwatch_recon::ReconError> for CliError {
    fn from(e: postwatch_recon::ReconError) -> Self {
        CliError::config(e.to_string())
    }
}

impl From<postwatch_io::RenderError> for CliError {
    fn from(e: postwatch_io::RenderError) -> Self {
        CliError::render(e.to_string())
    }
}

// ============================================================================
// config-path
// ============================================================================

fn cmd_config_path() -> Result<(), CliError> {
    let path = util::default_config_path().ok_or_else(|| {
        CliError::config("no config directory on this platform")
            .with_hint("pass --config <FILE> explicitly")
    })?;
    util::print_line(&path.display().to_string())
}
