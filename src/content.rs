use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub const UNBOUND_SENTINEL: &str = "UNINSTANTIATED VARIABLE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Code { text: String },
    Comment { text: String },
    Link { target: String },
    Query(TestQuery),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationMode {
    #[default]
    StopsAfterFirstAnswer,
    ContinuesUntilExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Answer {
    pub expected_output: String,
    pub assignments: BTreeMap<String, String>,
}

impl Answer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable_ids(&self) -> BTreeSet<String> {
        self.assignments.keys().cloned().collect()
    }

    pub fn has_variable_id(&self, id: &str) -> bool {
        self.assignments.contains_key(id)
    }

    pub fn assigned_value(&self, id: &str) -> Option<&str> {
        self.assignments.get(id).map(String::as_str)
    }

    pub fn assignments_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn describe_assignments(&self) -> String {
        let parts: Vec<String> = self
            .assignments
            .iter()
            .map(|(id, value)| format!("{id}={value}"))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestQuery {
    pub query: String,
    pub answers: Vec<Answer>,
    /// Output of the final, failing retry. Only checked when the query
    /// continues until exhausted.
    pub expected_output: String,
    pub expected_error: Option<String>,
    pub continuation: ContinuationMode,
    pub quits: bool,
}

impl TestQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answers: Vec::new(),
            expected_output: String::new(),
            expected_error: None,
            continuation: ContinuationMode::default(),
            quits: false,
        }
    }

    pub fn continues_until_exhausted(&self) -> bool {
        self.continuation == ContinuationMode::ContinuesUntilExhausted
    }
}

pub fn format_id_set<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    let ids: Vec<&str> = ids.into_iter().map(String::as_str).collect();
    format!("[{}]", ids.join(", "))
}
