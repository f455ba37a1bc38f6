use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermView {
    pub formatted: String,
    pub unbound: bool,
}

pub trait Solutions {
    fn advance(&mut self) -> Result<bool, EngineError>;

    /// True when no further solution can exist, known without another
    /// `advance`.
    fn is_exhausted(&self) -> bool;

    fn variable_ids(&self) -> BTreeSet<String>;

    fn value_of(&self, id: &str) -> Option<TermView>;
}

pub trait Engine {
    fn consult(&mut self, script: &Path) -> Result<(), EngineError>;

    fn prepare<'a>(&'a mut self, query: &str) -> Result<Box<dyn Solutions + 'a>, EngineError>;

    fn redirect_output(&mut self, sink: OutputSink);

    fn restore_output(&mut self);

    fn add_listener(&mut self, listener: Arc<dyn EngineListener>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Call,
    Redo,
    Exit,
    Fail,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Call => "CALL",
            EventKind::Redo => "REDO",
            EventKind::Exit => "EXIT",
            EventKind::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub source_id: String,
    pub description: String,
}

pub trait EngineListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
    fn on_warn(&self, message: &str);
    fn on_info(&self, message: &str);
}

#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write_str(&self, text: &str) {
        self.lock().extend_from_slice(text.as_bytes());
    }

    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
