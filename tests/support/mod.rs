#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lptest::{
    Engine, EngineError, EngineEvent, EngineListener, EventKind, OutputSink, Solutions, TermView,
    TestQuery, collect_queries_from_text,
};

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn read_fixture(relative: &str) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture should be readable")
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir script dir");
    }
    fs::write(&path, body).expect("write script");
    path
}

/// The single query declared by `markup`.
pub fn parse_query(markup: &str) -> TestQuery {
    let mut queries =
        collect_queries_from_text(Path::new("inline.pl"), markup).expect("markup should parse");
    assert_eq!(queries.len(), 1, "expected exactly one query in {markup:?}");
    queries.remove(0)
}

/// A solution the mock engine hands out. A binding whose value is `None`
/// stays unbound and prints as the variable name.
#[derive(Debug, Clone, Default)]
pub struct MockSolution {
    pub bindings: Vec<(String, Option<String>)>,
    pub output: String,
    pub events: Vec<(EventKind, String, String)>,
}

impl MockSolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, var: &str, value: &str) -> Self {
        self.bindings.push((var.to_string(), Some(value.to_string())));
        self
    }

    pub fn unbound(mut self, var: &str) -> Self {
        self.bindings.push((var.to_string(), None));
        self
    }

    pub fn output(mut self, text: &str) -> Self {
        self.output.push_str(text);
        self
    }

    pub fn event(mut self, kind: EventKind, source: &str, description: &str) -> Self {
        self.events
            .push((kind, source.to_string(), description.to_string()));
        self
    }
}

/// How the mock engine answers one query text.
#[derive(Debug, Clone, Default)]
pub struct MockQuery {
    pub vars: BTreeSet<String>,
    pub solutions: Vec<MockSolution>,
    /// Whether `is_exhausted` turns true as soon as the last solution is
    /// handed out. Otherwise one more failing `advance` is needed.
    pub exhausts_eagerly: bool,
    /// Thrown by the `advance` after the last solution.
    pub throws: Option<String>,
    /// Claims exhaustion from the start, whatever is left.
    pub lies_about_exhaustion: bool,
    /// Trailing output written by the final, failing `advance`.
    pub final_output: String,
}

impl MockQuery {
    pub fn new(vars: &[&str]) -> Self {
        Self {
            vars: vars.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn solution(mut self, solution: MockSolution) -> Self {
        self.solutions.push(solution);
        self
    }

    pub fn eager(mut self) -> Self {
        self.exhausts_eagerly = true;
        self
    }

    pub fn throws(mut self, message: &str) -> Self {
        self.throws = Some(message.to_string());
        self
    }

    pub fn lying(mut self) -> Self {
        self.lies_about_exhaustion = true;
        self
    }

    pub fn final_output(mut self, text: &str) -> Self {
        self.final_output.push_str(text);
        self
    }
}

/// Engine double driven entirely by pre-scripted answers keyed on the query
/// text.
#[derive(Default)]
pub struct MockEngine {
    queries: HashMap<String, MockQuery>,
    consult_error: Option<String>,
    sink: Option<OutputSink>,
    listeners: Vec<Arc<dyn EngineListener>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, text: &str, query: MockQuery) -> Self {
        self.queries.insert(text.to_string(), query);
        self
    }

    pub fn failing_consult(mut self, message: &str) -> Self {
        self.consult_error = Some(message.to_string());
        self
    }
}

impl Engine for MockEngine {
    fn consult(&mut self, _script: &Path) -> Result<(), EngineError> {
        match &self.consult_error {
            Some(message) => Err(EngineError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn prepare<'a>(&'a mut self, query: &str) -> Result<Box<dyn Solutions + 'a>, EngineError> {
        let Some(scripted) = self.queries.get(query).cloned() else {
            return Err(EngineError::new(format!("Unknown query: {query}")));
        };
        Ok(Box::new(MockSolutions {
            engine: self,
            query: scripted,
            next: 0,
        }))
    }

    fn redirect_output(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    fn restore_output(&mut self) {
        self.sink = None;
    }

    fn add_listener(&mut self, listener: Arc<dyn EngineListener>) {
        self.listeners.push(listener);
    }
}

struct MockSolutions<'a> {
    engine: &'a mut MockEngine,
    query: MockQuery,
    next: usize,
}

impl MockSolutions<'_> {
    fn write(&self, text: &str) {
        if let Some(sink) = &self.engine.sink {
            sink.write_str(text);
        }
    }

    fn current(&self) -> Option<&MockSolution> {
        self.next
            .checked_sub(1)
            .and_then(|idx| self.query.solutions.get(idx))
    }
}

impl Solutions for MockSolutions<'_> {
    fn advance(&mut self) -> Result<bool, EngineError> {
        let Some(solution) = self.query.solutions.get(self.next).cloned() else {
            self.next = self.query.solutions.len() + 1;
            self.write(&self.query.final_output);
            if let Some(message) = self.query.throws.take() {
                return Err(EngineError::new(message));
            }
            return Ok(false);
        };
        self.next += 1;
        for (kind, source, description) in &solution.events {
            let event = EngineEvent {
                kind: *kind,
                source_id: source.clone(),
                description: description.clone(),
            };
            for listener in &self.engine.listeners {
                listener.on_event(&event);
            }
        }
        self.write(&solution.output);
        Ok(true)
    }

    fn is_exhausted(&self) -> bool {
        if self.query.lies_about_exhaustion {
            return true;
        }
        self.query.exhausts_eagerly
            && self.query.throws.is_none()
            && self.next >= self.query.solutions.len()
    }

    fn variable_ids(&self) -> BTreeSet<String> {
        self.query.vars.clone()
    }

    fn value_of(&self, id: &str) -> Option<TermView> {
        let solution = self.current()?;
        let (_, value) = solution.bindings.iter().find(|(var, _)| var == id)?;
        Some(match value {
            Some(value) => TermView {
                formatted: value.clone(),
                unbound: false,
            },
            None => TermView {
                formatted: id.to_string(),
                unbound: true,
            },
        })
    }
}
