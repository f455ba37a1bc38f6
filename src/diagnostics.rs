use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub line: Option<usize>,
    pub line_text: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
            line_text: None,
            source: None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        hint_for_code(self.code)
    }

    pub fn at_line(mut self, line: usize, text: impl Into<String>) -> Self {
        self.line = Some(line);
        self.line_text = Some(text.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source() {
            write!(f, "{}: ", source)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(line) = self.line {
            write!(f, " at line {line}")?;
            if let Some(text) = &self.line_text {
                write!(f, ": {text}")?;
            }
        }
        if let Some(hint) = self.hint() {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

pub fn hint_for_code(code: &str) -> Option<&'static str> {
    match code {
        "E-IO" => Some("check the script path and read permissions"),
        "E-PARSE" => Some("check markup tag spelling and that OUTPUT/ERROR blocks are closed"),
        "E-CATALOG" => Some("add at least one query or %LINK to the script"),
        "E-LEGACY" => Some("legacy answers are written `%ANSWER X=value`"),
        _ => None,
    }
}
