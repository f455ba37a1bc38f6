use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::HarnessError;

pub const DEFAULT_CONFIG_FILENAME: &str = ".lptest.toml";

pub const CONFIG_TEMPLATE: &str = r#"# run scripts on a thread pool
parallel = false
# do not fail queries that needed a failing retry to prove there were no more answers
ignore_failed_retries = false
extensions = ["pl", "p", "pro", "prolog"]
"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub parallel: bool,
    pub ignore_failed_retries: bool,
    pub extensions: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            ignore_failed_retries: false,
            extensions: ["pl", "p", "pro", "prolog"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let body = fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&body, path)
    }

    pub fn from_toml(body: &str, path: &Path) -> Result<Self, HarnessError> {
        let config: RunnerConfig = toml::from_str(body).map_err(|err| HarnessError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(DEFAULT_CONFIG_FILENAME);
        candidate.is_file().then_some(candidate)
    }

    fn validate(&self, path: &Path) -> Result<(), HarnessError> {
        let invalid = |message: String| HarnessError::Config {
            path: path.to_path_buf(),
            message,
        };
        if self.extensions.is_empty() {
            return Err(invalid("extensions must list at least one entry".to_string()));
        }
        for ext in &self.extensions {
            if ext.is_empty() || ext.contains(['.', '/', '\\', '*']) {
                return Err(invalid(format!("invalid extension: {ext:?}")));
            }
        }
        Ok(())
    }
}
