use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::engine::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{0}")]
    Protocol(String),
    #[error("{0}")]
    Mismatch(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Parse(#[from] Diagnostic),
    #[error("{0}")]
    Engine(EngineError),
    #[error("{} not found", .0.display())]
    MissingPath(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("{count} test failures:\n{messages}")]
    Failures { count: usize, messages: String },
}
