use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::info;

use crate::config::RunnerConfig;
use crate::engine::Engine;
use crate::error::HarnessError;
use crate::executor::{ScriptExecutor, ScriptResult};

#[derive(Debug, Clone)]
pub struct ScriptFilter {
    extensions: GlobSet,
}

impl ScriptFilter {
    pub fn new(extensions: &[String]) -> Result<Self, HarnessError> {
        let mut builder = GlobSetBuilder::new();
        for ext in extensions {
            let glob = GlobBuilder::new(&format!("*.{ext}"))
                .case_insensitive(true)
                .build()
                .map_err(|err| HarnessError::Config {
                    path: PathBuf::from(ext),
                    message: format!("invalid extension pattern: {err}"),
                })?;
            builder.add(glob);
        }
        let extensions = builder.build().map_err(|err| HarnessError::Config {
            path: PathBuf::new(),
            message: format!("failed to build extension set: {err}"),
        })?;
        Ok(Self { extensions })
    }

    pub fn is_script(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        // a leading dot alone is a hidden file, not an extension
        if !name.rfind('.').is_some_and(|pos| pos > 0) {
            return false;
        }
        self.extensions.is_match(name)
    }
}

pub fn is_script(path: &Path, extensions: &[String]) -> bool {
    ScriptFilter::new(extensions).is_ok_and(|filter| filter.is_script(path))
}

pub fn find_scripts(root: &Path, filter: &ScriptFilter) -> Result<Vec<PathBuf>, HarnessError> {
    if !root.exists() {
        return Err(HarnessError::MissingPath(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut scripts = Vec::new();
    for entry in WalkBuilder::new(root).standard_filters(false).build() {
        let entry = entry.map_err(|err| HarnessError::Io {
            path: root.to_path_buf(),
            source: io::Error::other(err.to_string()),
        })?;
        let is_file = entry.file_type().is_some_and(|ty| ty.is_file());
        if is_file && filter.is_script(entry.path()) {
            scripts.push(entry.into_path());
        }
    }
    scripts.sort();
    Ok(scripts)
}

pub fn run_tests<E, F>(
    root: &Path,
    config: &RunnerConfig,
    new_engine: F,
) -> Result<HarnessReport, HarnessError>
where
    E: Engine,
    F: Fn() -> E + Sync,
{
    let filter = ScriptFilter::new(&config.extensions)?;
    let scripts = find_scripts(root, &filter)?;
    Ok(run_scripts(&scripts, config, new_engine))
}

/// Results are merged in the order of `scripts`, whatever order they finish in.
pub fn run_scripts<E, F>(scripts: &[PathBuf], config: &RunnerConfig, new_engine: F) -> HarnessReport
where
    E: Engine,
    F: Fn() -> E + Sync,
{
    info!(
        scripts = scripts.len(),
        parallel = config.parallel,
        "running scripts"
    );
    let start = Instant::now();
    let check = |path: &PathBuf| ScriptExecutor::new(path, new_engine(), config).check_script();
    let results: Vec<ScriptResult> = if config.parallel {
        scripts.par_iter().map(check).collect()
    } else {
        scripts.iter().map(check).collect()
    };
    HarnessReport::new(results, start.elapsed())
}

#[derive(Debug, Clone)]
pub struct HarnessReport {
    results: Vec<ScriptResult>,
    query_count: usize,
    error_count: usize,
    error_messages: String,
    summaries: String,
    duration: Duration,
}

impl HarnessReport {
    pub fn new(results: Vec<ScriptResult>, duration: Duration) -> Self {
        let mut query_count = 0;
        let mut error_count = 0;
        let mut error_messages = String::new();
        let mut summaries = String::new();
        for result in &results {
            query_count += result.query_count();
            error_count += result.error_count();
            summaries.push_str(&result.summary_line());
            for error in result.errors() {
                let _ = writeln!(error_messages, "{} {error}", result.path().display());
            }
        }
        Self {
            results,
            query_count,
            error_count,
            error_messages,
            summaries,
            duration,
        }
    }

    pub fn results(&self) -> &[ScriptResult] {
        &self.results
    }

    pub fn scripts_count(&self) -> usize {
        self.results.len()
    }

    pub fn query_count(&self) -> usize {
        self.query_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_failures(&self) -> bool {
        self.error_count != 0
    }

    pub fn error_messages(&self) -> &str {
        &self.error_messages
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Completed {} queries from {} files with {} failures in: {}ms\n\n",
            self.query_count,
            self.scripts_count(),
            self.error_count,
            self.duration.as_millis()
        );
        out.push_str(&self.summaries);
        if self.has_failures() {
            let _ = write!(out, "\n ***** Failed: {} tests!!! *****\n\n", self.error_count);
            out.push_str(&self.error_messages);
        }
        out
    }

    pub fn assert_success(&self) -> Result<(), HarnessError> {
        if self.has_failures() {
            return Err(HarnessError::Failures {
                count: self.error_count,
                messages: self.error_messages.clone(),
            });
        }
        Ok(())
    }
}
