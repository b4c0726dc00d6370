//! Command-line entry point: resolves the user's options into a
//! [`ccbuild::Driver`] invocation and turns the library's [`Result`] into
//! one of the three user-visible diagnostic prefixes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use yansi::Paint;

use ccbuild::{BuildError, Driver, Mode};

/// The config file name `ccbuild` looks for at the project root. Not named
/// by the build-orchestration core (CLI argument resolution is a separate
/// concern), so this is a design decision recorded in DESIGN.md: a project is a
/// directory containing `ccbuild.ini`, the same "one conventional filename
/// at the root" shape as `Cargo.toml` or `package.json`.
const CONFIG_FILE_NAME: &str = "ccbuild.ini";

#[derive(Parser)]
#[command(name = "ccbuild", about = "A parallel, declarative build tool for compiled native projects")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Build one or all targets.
    Build {
        /// Use release flags instead of debug flags.
        #[arg(short, long, conflicts_with = "debug")]
        release: bool,

        /// Use debug flags (the default).
        #[arg(short, long)]
        debug: bool,

        /// Only build targets whose name contains this substring.
        #[arg(short, long, value_name = "SUBSTR")]
        target: Option<String>,

        /// Number of parallel compile workers.
        #[arg(short = 'j', long = "jlevel", value_name = "N", default_value_t = 1)]
        jlevel: usize,

        /// Project root directory (must contain ccbuild.ini).
        #[arg(default_value = ".")]
        rootdir: PathBuf,
    },
    /// Remove a project's build and install trees.
    Clean {
        /// Project root directory (must contain ccbuild.ini).
        #[arg(default_value = ".")]
        rootdir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Build { release, debug: _, target, jlevel, rootdir } => {
            let mode = if release { Mode::Release } else { Mode::Debug };
            run_build(&rootdir, mode, target.as_deref(), jlevel.max(1))
        }
        Command::Clean { rootdir } => run_clean(&rootdir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::from(err.exit_code().clamp(1, 255) as u8)
        }
    }
}

fn run_build(rootdir: &Path, mode: Mode, target: Option<&str>, jlevel: usize) -> ccbuild::Result<()> {
    println!("rootdir={}", rootdir.display());
    let driver = Driver::new(rootdir, jlevel)?;
    let config_path = Path::new(CONFIG_FILE_NAME);
    driver.build(config_path, mode, target)
}

fn run_clean(rootdir: &Path) -> ccbuild::Result<()> {
    let driver = Driver::new(rootdir, 1)?;
    driver.clean(Path::new(CONFIG_FILE_NAME))
}

/// Prints a one-line diagnostic: config errors as `config error: ...`,
/// everything else as `error: ...`, colorized with `yansi`.
fn report_error(err: &BuildError) {
    let prefix = match err {
        BuildError::Config(_) => "config error:",
        _ => "error:",
    };
    eprintln!("{} {}", Paint::red(prefix).bold(), err);
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).without_time().init();
}
