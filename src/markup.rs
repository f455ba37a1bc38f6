use crate::diagnostics::Diagnostic;

pub const COMMENT_SIGIL: char = '%';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Markup {
    True,
    TrueNo,
    Yes,
    No,
    Quit,
    Fail,
    Query,
    Output,
    Error,
    Link,
}

impl Markup {
    pub const ALL: [Markup; 10] = [
        Markup::True,
        Markup::TrueNo,
        Markup::Yes,
        Markup::No,
        Markup::Quit,
        Markup::Fail,
        Markup::Query,
        Markup::Output,
        Markup::Error,
        Markup::Link,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Markup::True => "TRUE",
            Markup::TrueNo => "TRUE_NO",
            Markup::Yes => "YES",
            Markup::No => "NO",
            Markup::Quit => "QUIT",
            Markup::Fail => "FAIL",
            Markup::Query => "?-",
            Markup::Output => "OUTPUT",
            Markup::Error => "ERROR",
            Markup::Link => "LINK",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Markup::True => "%TRUE",
            Markup::TrueNo => "%TRUE_NO",
            Markup::Yes => "%YES",
            Markup::No => "%NO",
            Markup::Quit => "%QUIT",
            Markup::Fail => "%FAIL",
            Markup::Query => "%?-",
            Markup::Output => "%OUTPUT",
            Markup::Error => "%ERROR",
            Markup::Link => "%LINK",
        }
    }

    pub fn never_has_text(self) -> bool {
        matches!(self, Markup::Yes | Markup::No | Markup::Quit)
    }

    // trailing text after a tag that never carries any is an error, not a non-match
    pub fn is_match(self, line: &str) -> Result<bool, Diagnostic> {
        let trimmed = line.trim();
        let prefix = self.prefix();
        if trimmed == prefix {
            return Ok(true);
        }
        let Some(rest) = trimmed.strip_prefix(prefix) else {
            return Ok(false);
        };
        if !rest.starts_with(' ') {
            return Ok(false);
        }
        if self.never_has_text() {
            return Err(Diagnostic::new(
                "E-PARSE",
                format!("Did not expect text after : {prefix} but got: {line}"),
            ));
        }
        Ok(true)
    }

    pub fn parse_text(self, line: &str) -> String {
        line.trim()
            .strip_prefix(self.prefix())
            .map(|rest| rest.trim().to_string())
            .unwrap_or_default()
    }

    pub fn is_markup(line: &str) -> Result<bool, Diagnostic> {
        for markup in Markup::ALL {
            if markup.is_match(line)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub fn is_standard_comment(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some(COMMENT_SIGIL) && chars.next().is_some_and(char::is_whitespace)
}

/// Only meaningful for lines that already failed every tag match.
pub fn is_illegal_markup(line: &str) -> bool {
    let Some(rest) = line.strip_prefix(COMMENT_SIGIL) else {
        return false;
    };
    if rest.trim().is_empty() {
        return false;
    }
    // `% ?- goal` is a query with a stray space, not prose
    !rest.starts_with(char::is_whitespace)
        || rest.trim_start().starts_with(Markup::Query.keyword())
}

pub fn parse_assignment(line: &str) -> Result<Option<(String, String)>, Diagnostic> {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix(COMMENT_SIGIL) else {
        return Ok(None);
    };
    if Markup::is_markup(line)? {
        return Ok(None);
    }
    let Some(eq) = rest.find('=') else {
        return Ok(None);
    };
    let id = rest[..eq].trim();
    if id.is_empty() || id.contains(char::is_whitespace) {
        return Ok(None);
    }
    Ok(Some((id.to_string(), rest[eq + 1..].trim().to_string())))
}
