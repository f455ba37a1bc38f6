use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::collect_queries;
use crate::config::RunnerConfig;
use crate::content::{Answer, TestQuery, UNBOUND_SENTINEL, format_id_set};
use crate::engine::{Engine, EngineError, EngineEvent, EngineListener, OutputSink, Solutions};
use crate::error::{HarnessError, QueryError};
use crate::text::equal_ignoring_line_endings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResult {
    path: PathBuf,
    query_count: usize,
    errors: Vec<String>,
    duration: Duration,
}

impl ScriptResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            query_count: 0,
            errors: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn query_count(&self) -> usize {
        self.query_count
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}\nCompleted {} queries with {} failures in: {}ms\n",
            self.path.display(),
            self.query_count,
            self.error_count(),
            self.duration.as_millis()
        )
    }
}

/// Writes spy events into the captured output as `[n] KIND description`.
#[derive(Debug)]
pub struct SpyRecorder {
    sink: OutputSink,
    source_ids: Mutex<HashMap<String, usize>>,
}

impl SpyRecorder {
    pub fn new(sink: OutputSink) -> Self {
        Self {
            sink,
            source_ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn reset(&self) {
        self.source_ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl EngineListener for SpyRecorder {
    fn on_event(&self, event: &EngineEvent) {
        let mut ids = self
            .source_ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = ids.len() + 1;
        let n = *ids.entry(event.source_id.clone()).or_insert(next);
        self.sink.write_str(&format!(
            "[{n}] {} {}\n",
            event.kind.as_str(),
            event.description
        ));
    }

    // warnings and info messages are not part of any expectation
    fn on_warn(&self, message: &str) {
        warn!("{message}");
    }

    fn on_info(&self, message: &str) {
        info!("{message}");
    }
}

pub struct ScriptExecutor<E: Engine> {
    path: PathBuf,
    engine: E,
    sink: OutputSink,
    recorder: Arc<SpyRecorder>,
    ignore_failed_retries: bool,
}

impl<E: Engine> ScriptExecutor<E> {
    pub fn new(path: &Path, mut engine: E, config: &RunnerConfig) -> Self {
        let sink = OutputSink::new();
        let recorder = Arc::new(SpyRecorder::new(sink.clone()));
        engine.add_listener(recorder.clone());
        Self {
            path: path.to_path_buf(),
            engine,
            sink,
            recorder,
            ignore_failed_retries: config.ignore_failed_retries,
        }
    }

    pub fn check_script(mut self) -> ScriptResult {
        let start = Instant::now();
        let mut result = ScriptResult::new(&self.path);
        info!(script = %self.path.display(), "checking script");
        if let Err(err) = self.check_queries(&mut result) {
            debug!(error = %err, "script aborted");
            result.errors.push(format!("Error checking script: {err}"));
        }
        result.duration = start.elapsed();
        info!(
            script = %self.path.display(),
            queries = result.query_count,
            failures = result.error_count(),
            "finished script"
        );
        result
    }

    fn check_queries(&mut self, result: &mut ScriptResult) -> Result<(), HarnessError> {
        self.engine
            .consult(&self.path)
            .map_err(HarnessError::Engine)?;
        let queries = collect_queries(&self.path)?;
        for query in &queries {
            result.query_count += 1;
            if let Err(err) = self.check_query(query) {
                debug!(query = %query.query, error = %err, "query failed");
                result
                    .errors
                    .push(format!("Query: {} Error: {err}", query.query));
            }
        }
        Ok(())
    }

    pub fn check_query(&mut self, query: &TestQuery) -> Result<(), QueryError> {
        debug!(query = %query.query, "evaluating");
        self.sink.clear();
        self.engine.redirect_output(self.sink.clone());
        let outcome = self.enumerate(query);
        self.engine.restore_output();
        self.sink.clear();
        match outcome {
            Err(QueryError::Engine(err)) => check_thrown_error(query, &err),
            other => other,
        }
    }

    fn enumerate(&mut self, query: &TestQuery) -> Result<(), QueryError> {
        let Self {
            engine,
            sink,
            recorder,
            ignore_failed_retries,
            ..
        } = self;

        let mut solutions = engine.prepare(&query.query)?;
        let mut expected = query.answers.iter();

        let mut is_exhausted = solutions.is_exhausted();
        recorder.reset();
        while solutions.advance()? {
            if is_exhausted {
                return Err(QueryError::Protocol(
                    "isExhausted() was true when there were still more answers available"
                        .to_string(),
                ));
            }
            let Some(answer) = expected.next() else {
                if query.quits {
                    return Ok(());
                }
                return Err(mismatch("More answers than expected"));
            };
            check_output(sink, &answer.expected_output)?;
            check_answer(&*solutions, answer)?;

            is_exhausted = solutions.is_exhausted();
            recorder.reset();
        }

        if expected.len() > 0 {
            return Err(mismatch("Fewer answers than expected"));
        }
        if query.quits {
            return Err(mismatch("Found all answers before quit"));
        }
        let continues = query.continues_until_exhausted();
        if is_exhausted && continues {
            return Err(mismatch(
                "Did not have to fail before determining there were no more answers",
            ));
        }
        if !is_exhausted && !continues && !*ignore_failed_retries {
            return Err(mismatch(
                "Had to fail to determine there were no more answers",
            ));
        }
        if continues {
            check_output(sink, &query.expected_output)?;
        }
        if let Some(expected_error) = &query.expected_error {
            return Err(mismatch(format!(
                "Query did not produce the expected error: {expected_error}"
            )));
        }
        Ok(())
    }
}

fn mismatch(message: impl Into<String>) -> QueryError {
    QueryError::Mismatch(message.into())
}

fn check_thrown_error(query: &TestQuery, err: &EngineError) -> Result<(), QueryError> {
    let actual = err.message();
    match &query.expected_error {
        Some(expected) if expected == actual => Ok(()),
        Some(expected) => Err(mismatch(format!(
            "Expected: >{expected}< but got: >{actual}<"
        ))),
        None => Err(mismatch(format!(
            "Expected no error but got: >{actual}<"
        ))),
    }
}

fn check_output(sink: &OutputSink, expected: &str) -> Result<(), QueryError> {
    let actual = sink.take();
    if equal_ignoring_line_endings(expected, &actual) {
        Ok(())
    } else {
        Err(mismatch(format!(
            "Expected: >\n{expected}\n< but got: >\n{actual}\n<"
        )))
    }
}

fn check_answer(solutions: &dyn Solutions, answer: &Answer) -> Result<(), QueryError> {
    let ids = solutions.variable_ids();
    if ids.len() != answer.assignments_count() {
        return Err(mismatch(format!(
            "Different number of variables than expected. Actual: {} Expected: {}",
            format_id_set(&ids),
            answer.describe_assignments()
        )));
    }

    for id in &ids {
        let Some(value) = solutions.value_of(id) else {
            return Err(QueryError::Protocol(format!(
                "no value available for reported variable: {id}"
            )));
        };
        let actual = &value.formatted;
        match answer.assigned_value(id) {
            None => {
                return Err(mismatch(format!(
                    "{id} was not expected to be assigned to anything but was to: {actual} {}",
                    answer.describe_assignments()
                )));
            }
            Some(UNBOUND_SENTINEL) => {
                if !value.unbound {
                    return Err(mismatch(format!(
                        "{id} assigned to: {actual} but expected: {UNBOUND_SENTINEL} {}",
                        answer.describe_assignments()
                    )));
                }
            }
            Some(expected) if expected != actual => {
                return Err(mismatch(format!(
                    "{id} assigned to: {actual} not: {expected} {}",
                    answer.describe_assignments()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
