//! # msrun CLI Entry Point
//!
//! Parses CLI arguments with clap and routes them to the build/test
//! orchestrator. Results go to stdout (coloured text or JSON with `--json`),
//! logs and progress go to stderr.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use msrun::build::{Orchestrator, ToolKind, WatchAction};
use msrun::config;
use msrun::error::RunError;
use msrun::model::{BuildRequest, RunMode, RunResult, TestRequest};
use msrun::project::{FsProjectLocator, OutlineResolver, ProjectLocator};
use msrun::ui;

type DefaultOrchestrator = Orchestrator<FsProjectLocator, OutlineResolver>;

#[derive(Parser)]
#[command(name = "msrun")]
#[command(about = "Run msbuild and mstest with editor-ready diagnostics", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print the result as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project that owns FILE
    Build {
        /// Any file inside the project
        file: PathBuf,
        /// Build configuration [default: from msrun.toml, else Debug]
        #[arg(short, long)]
        configuration: Option<String>,
        /// Do not build referenced projects
        #[arg(long)]
        exclude_project_references: bool,
        /// Source language of FILE
        #[arg(long, default_value = "C#")]
        language: String,
    },
    /// Run tests of the project that owns FILE
    Test {
        /// Test source file
        file: PathBuf,
        /// Which tests to run
        #[arg(long, value_enum, default_value_t = Mode::All)]
        mode: Mode,
        /// Zero-based cursor line (current-test / current-class)
        #[arg(long, default_value_t = 0)]
        line: u32,
        /// Zero-based cursor column (current-test / current-class)
        #[arg(long, default_value_t = 0)]
        column: u32,
    },
    /// Rebuild whenever a source file of the project changes
    Watch {
        /// Any file inside the project
        file: PathBuf,
        /// Run all tests instead of building
        #[arg(long)]
        test: bool,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    All,
    CurrentTest,
    CurrentClass,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => RunMode::All,
            Mode::CurrentTest => RunMode::CurrentTest,
            Mode::CurrentClass => RunMode::CurrentClass,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    let success = match cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "msrun", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Build {
            file,
            configuration,
            exclude_project_references,
            language,
        } => {
            let orchestrator = orchestrator()?;
            let request = BuildRequest {
                file_name: file,
                configuration,
                exclude_project_references,
                language,
            };
            let outcome = with_spinner("Building...", json, || orchestrator.build_project(&request));
            report(outcome, ToolKind::Build, json)?
        }
        Commands::Test {
            file,
            mode,
            line,
            column,
        } => {
            let orchestrator = orchestrator()?;
            let request = TestRequest {
                file_name: file,
                line,
                column,
                run_mode: mode.into(),
            };
            let outcome = with_spinner("Running tests...", json, || orchestrator.run_tests(&request));
            report(outcome, ToolKind::Test, json)?
        }
        Commands::Watch { file, test } => {
            let orchestrator = orchestrator()?;
            return watch(&orchestrator, file, test, json);
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "msrun=debug" } else { "msrun=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn orchestrator() -> Result<DefaultOrchestrator> {
    let settings = config::load_settings()?;
    Ok(Orchestrator::new(
        settings,
        FsProjectLocator::new(),
        OutlineResolver,
    ))
}

fn with_spinner<T>(message: &'static str, json: bool, f: impl FnOnce() -> T) -> T {
    if json {
        return f();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    pb.finish_and_clear();
    out
}

/// Print the outcome; returns whether the run succeeded.
fn report(outcome: Result<RunResult, RunError>, kind: ToolKind, json: bool) -> Result<bool> {
    let result = match outcome {
        Ok(result) => result,
        Err(e) if e.is_launch_failure() => {
            eprintln!("{} {}", "x".red(), e);
            RunResult::failed()
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        ui::print_result(&result, kind);
    }
    Ok(result.success)
}

fn watch(orchestrator: &DefaultOrchestrator, file: PathBuf, test: bool, json: bool) -> Result<()> {
    let root = FsProjectLocator::new()
        .locate(&file)
        .first()
        .map(|p| p.directory.clone())
        .or_else(|| file.parent().map(Path::to_path_buf))
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));

    let (action, kind) = if test {
        let request = TestRequest {
            file_name: file,
            line: 0,
            column: 0,
            run_mode: RunMode::All,
        };
        (WatchAction::Test(request), ToolKind::Test)
    } else {
        (WatchAction::Build(BuildRequest::new(file)), ToolKind::Build)
    };

    println!("{} Watching for changes in {}...", "👀".cyan(), root.display());
    msrun::build::watch(orchestrator, &root, &action, |outcome| {
        if !json {
            print!("\x1B[2J\x1B[1;1H");
            println!("{} Change detected, rerunning...", "🔄".yellow());
        }
        if let Err(e) = report(outcome, kind, json) {
            println!("{} Error: {}", "x".red(), e);
        }
    })
}
