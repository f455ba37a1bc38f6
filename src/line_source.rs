use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostic;

#[derive(Debug, Clone)]
pub struct LineSource {
    path: PathBuf,
    lines: Vec<String>,
    consumed: usize,
    mark: usize,
}

impl LineSource {
    pub fn open(path: &Path) -> Result<Self, Diagnostic> {
        let text = fs::read_to_string(path).map_err(|err| {
            Diagnostic::new("E-IO", format!("failed to read {}: {err}", path.display()))
                .with_source(path.display().to_string())
        })?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
            consumed: 0,
            mark: 0,
        }
    }

    pub fn read_line(&mut self) -> Option<&str> {
        if self.consumed == self.lines.len() {
            return None;
        }
        self.consumed += 1;
        Some(&self.lines[self.consumed - 1])
    }

    pub fn mark(&mut self) {
        self.mark = self.consumed;
    }

    pub fn reset(&mut self) {
        self.consumed = self.mark;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based number of the most recently read line; 0 before the first read.
    pub fn line_number(&self) -> usize {
        self.consumed
    }

    pub fn current_line(&self) -> Option<&str> {
        self.consumed
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }
}
