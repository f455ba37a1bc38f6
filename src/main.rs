use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lptest::{
    ContentParser, HarnessError, LogicEngine, RunnerConfig, run_tests, upgrade_path,
};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURES: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "lptest")]
#[command(about = "Checks the queries embedded as markup in logic-program scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every script found under PATH.
    Run {
        path: PathBuf,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        ignore_failed_retries: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the parsed content of a script as JSON.
    Parse { file: PathBuf },
    /// Convert legacy markup to the current syntax.
    Upgrade {
        path: PathBuf,
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LPTEST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            path,
            parallel,
            ignore_failed_retries,
            config,
        } => run_command(&path, parallel, ignore_failed_retries, config.as_deref()),
        Command::Parse { file } => parse_command(&file),
        Command::Upgrade { path, write } => upgrade_command(&path, write),
    }
}

fn load_config(path: &Path, explicit: Option<&Path>) -> Result<RunnerConfig, HarnessError> {
    if let Some(file) = explicit {
        return RunnerConfig::load(file);
    }
    let dir = if path.is_dir() {
        Some(path)
    } else {
        path.parent()
    };
    match dir.and_then(RunnerConfig::discover) {
        Some(file) => RunnerConfig::load(&file),
        None => Ok(RunnerConfig::default()),
    }
}

fn run_command(
    path: &Path,
    parallel: bool,
    ignore_failed_retries: bool,
    config: Option<&Path>,
) -> ExitCode {
    let mut config = match load_config(path, config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    config.parallel |= parallel;
    config.ignore_failed_retries |= ignore_failed_retries;

    match run_tests(path, &config, LogicEngine::new) {
        Ok(report) => {
            print!("{}", report.summary());
            if report.has_failures() {
                ExitCode::from(EXIT_FAILURES)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn parse_command(file: &Path) -> ExitCode {
    let parser = match ContentParser::open(file) {
        Ok(parser) => parser,
        Err(diag) => {
            eprintln!("{diag}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let contents = match parser.collect::<Result<Vec<_>, _>>() {
        Ok(contents) => contents,
        Err(diag) => {
            eprintln!("{diag}");
            return ExitCode::from(EXIT_FAILURES);
        }
    };
    match serde_json::to_string_pretty(&contents) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to encode content: {err}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn upgrade_command(path: &Path, write: bool) -> ExitCode {
    let config = match load_config(path, None) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let upgrades = match upgrade_path(path, &config.extensions, write) {
        Ok(upgrades) => upgrades,
        Err(err @ HarnessError::Parse(_)) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_FAILURES);
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    for upgrade in &upgrades {
        if write {
            if upgrade.changed {
                println!("upgraded {}", upgrade.path.display());
            }
        } else {
            print!("{}", upgrade.text);
        }
    }
    ExitCode::SUCCESS
}
