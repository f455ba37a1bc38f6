use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::diagnostics::Diagnostic;
use crate::error::HarnessError;
use crate::harness::{ScriptFilter, find_scripts};
use crate::text::{concat_lines, to_unix_line_endings};

static TAGGED_GOAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%(QUERY|FALSE)\s+(\S.*)$").expect("valid legacy goal regex")
});

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%(?:ANSWER\s+|\s*)([^=\s]+)\s*=\s*(.*)$").expect("valid legacy answer regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    pub path: PathBuf,
    pub text: String,
    pub changed: bool,
}

pub fn upgrade_text(text: &str) -> Result<String, Diagnostic> {
    let text = to_unix_line_endings(text);
    let mut output: Vec<String> = Vec::new();
    let mut in_answer = false;

    for (idx, line) in text.lines().enumerate() {
        let malformed = |what: &str| {
            Diagnostic::new("E-LEGACY", format!("{what}: {line}")).at_line(idx + 1, line)
        };
        let trimmed = line.trim();

        if trimmed == "%ANSWER" {
            in_answer = !in_answer;
        } else if trimmed == "%ANSWER/" {
            output.push("%YES".to_string());
        } else if trimmed.starts_with("%QUERY") || trimmed.starts_with("%FALSE") {
            let Some(caps) = TAGGED_GOAL.captures(trimmed) else {
                return Err(malformed("missing goal"));
            };
            let tag = if &caps[1] == "QUERY" { "%?-" } else { "%FAIL" };
            output.push(format!("{tag} {}", caps[2].trim()));
        } else if trimmed.starts_with("%ANSWER") || (in_answer && trimmed.starts_with('%')) {
            let Some(caps) = ASSIGNMENT.captures(trimmed) else {
                return Err(malformed("malformed answer"));
            };
            output.push(format!("% {}={}", &caps[1], caps[2].trim()));
        } else {
            output.push(line.to_string());
        }
    }

    if in_answer {
        return Err(Diagnostic::new("E-LEGACY", "unterminated %ANSWER block"));
    }
    Ok(concat_lines(&output))
}

pub fn upgrade_path(
    root: &Path,
    extensions: &[String],
    write: bool,
) -> Result<Vec<Upgrade>, HarnessError> {
    let filter = ScriptFilter::new(extensions)?;
    let mut upgrades = Vec::new();
    for path in find_scripts(root, &filter)? {
        let original = fs::read_to_string(&path).map_err(|source| HarnessError::Io {
            path: path.clone(),
            source,
        })?;
        let text = upgrade_text(&original)
            .map_err(|diag| diag.with_source(path.display().to_string()))?;
        let changed = has_legacy_markup(&original, &text);
        if changed && write {
            fs::write(&path, &text).map_err(|source| HarnessError::Io {
                path: path.clone(),
                source,
            })?;
            info!(script = %path.display(), "upgraded");
        }
        upgrades.push(Upgrade {
            path,
            text,
            changed,
        });
    }
    Ok(upgrades)
}

/// Line endings and a missing final newline alone do not count as a change.
fn has_legacy_markup(original: &str, upgraded: &str) -> bool {
    let normalized = to_unix_line_endings(original);
    concat_lines(&normalized.lines().collect::<Vec<_>>()) != upgraded
}
