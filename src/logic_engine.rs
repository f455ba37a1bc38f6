use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::engine::{
    Engine, EngineError, EngineEvent, EngineListener, EventKind, OutputSink, Solutions, TermView,
};
use crate::reader::{Sentence, read_program, read_query};
use crate::types::{Clause, Goals, Term, VarId, render};

type Bindings = HashMap<VarId, Term>;

#[derive(Default)]
pub struct LogicEngine {
    clauses: Vec<Clause>,
    spied: HashSet<String>,
    output: Option<OutputSink>,
    listeners: Vec<Arc<dyn EngineListener>>,
}

impl LogicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consult_text(&mut self, src: &str) -> Result<(), EngineError> {
        for sentence in read_program(src)? {
            match sentence {
                Sentence::Clause(clause) => self.clauses.push(clause),
                Sentence::Directive(goals) => self.run_directive(goals)?,
            }
        }
        Ok(())
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    fn run_directive(&mut self, goals: Goals) -> Result<(), EngineError> {
        let text = goals
            .goals
            .iter()
            .map(|g| render(g, &goals.var_names))
            .collect::<Vec<_>>()
            .join(", ");
        let succeeded = LogicSolutions::new(self, goals).advance()?;
        if !succeeded {
            let message = format!("Directive failed: {text}");
            for listener in &self.listeners {
                listener.on_warn(&message);
            }
        }
        Ok(())
    }

    fn write_output(&self, text: &str) {
        match &self.output {
            Some(sink) => sink.write_str(text),
            None => {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(text.as_bytes());
            }
        }
    }

    fn emit(&self, kind: EventKind, source_id: &str, description: String) {
        let event = EngineEvent {
            kind,
            source_id: source_id.to_string(),
            description,
        };
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

impl Engine for LogicEngine {
    fn consult(&mut self, script: &Path) -> Result<(), EngineError> {
        let src = fs::read_to_string(script).map_err(|err| {
            EngineError::new(format!("Could not read: {} ({err})", script.display()))
        })?;
        self.consult_text(&src)?;
        debug!(
            script = %script.display(),
            clauses = self.clauses.len(),
            "consulted"
        );
        Ok(())
    }

    fn prepare<'a>(&'a mut self, query: &str) -> Result<Box<dyn Solutions + 'a>, EngineError> {
        let goals = read_query(query)?;
        Ok(Box::new(LogicSolutions::new(self, goals)))
    }

    fn redirect_output(&mut self, sink: OutputSink) {
        self.output = Some(sink);
    }

    fn restore_output(&mut self) {
        self.output = None;
    }

    fn add_listener(&mut self, listener: Arc<dyn EngineListener>) {
        self.listeners.push(listener);
    }
}

#[derive(Debug, Clone)]
enum Goal {
    Call(Term),
    Exit { goal: Term, source_id: String },
}

#[derive(Debug, Clone)]
struct ChoicePoint {
    goals: Vec<Goal>,
    bindings: Bindings,
    redo: Option<(String, String)>,
}

enum Step {
    Continue(ChoicePoint),
    Stop,
}

pub struct LogicSolutions<'a> {
    engine: &'a mut LogicEngine,
    query: Goals,
    stack: Vec<ChoicePoint>,
    next_var: VarId,
    current: Option<Bindings>,
}

impl<'a> LogicSolutions<'a> {
    fn new(engine: &'a mut LogicEngine, query: Goals) -> Self {
        let goals = query.goals.iter().rev().cloned().map(Goal::Call).collect();
        let next_var = query.var_count;
        Self {
            engine,
            query,
            stack: vec![ChoicePoint {
                goals,
                bindings: Bindings::new(),
                redo: None,
            }],
            next_var,
            current: None,
        }
    }

    fn describe(&self, term: &Term, bindings: &Bindings) -> String {
        render(&resolve(term, bindings), &self.query.var_names)
    }

    fn resume(&mut self, mut point: ChoicePoint) -> Result<Option<Bindings>, EngineError> {
        if let Some((source_id, description)) = point.redo.take() {
            self.engine.emit(EventKind::Redo, &source_id, description);
        }
        loop {
            let Some(goal) = point.goals.pop() else {
                return Ok(Some(point.bindings));
            };
            match goal {
                Goal::Exit { goal, source_id } => {
                    let description = self.describe(&goal, &point.bindings);
                    self.engine.emit(EventKind::Exit, &source_id, description);
                }
                Goal::Call(term) => {
                    let term = deref(&term, &point.bindings);
                    match self.call(term, point)? {
                        Step::Continue(next) => point = next,
                        Step::Stop => return Ok(None),
                    }
                }
            }
        }
    }

    fn call(&mut self, term: Term, mut point: ChoicePoint) -> Result<Step, EngineError> {
        let (name, arity) = match &term {
            Term::Var(_) => {
                return Err(EngineError::new("Cannot call an unbound variable"));
            }
            Term::Int(i) => return Err(EngineError::new(format!("Cannot call: {i}"))),
            other => other.indicator().unwrap_or_default(),
        };
        let args: &[Term] = match &term {
            Term::Compound { args, .. } => args,
            _ => &[],
        };

        match (name, arity) {
            ("true", 0) => return Ok(Step::Continue(point)),
            ("fail" | "false", 0) => return Ok(Step::Stop),
            ("nl", 0) => {
                self.engine.write_output("\n");
                return Ok(Step::Continue(point));
            }
            ("write", 1) => {
                let text = self.describe(&args[0], &point.bindings);
                self.engine.write_output(&text);
                return Ok(Step::Continue(point));
            }
            ("throw", 1) => {
                return Err(EngineError::new(self.describe(&args[0], &point.bindings)));
            }
            ("=", 2) => {
                return Ok(if unify(&args[0], &args[1], &mut point.bindings) {
                    Step::Continue(point)
                } else {
                    Step::Stop
                });
            }
            (",", 2) => {
                point.goals.push(Goal::Call(args[1].clone()));
                point.goals.push(Goal::Call(args[0].clone()));
                return Ok(Step::Continue(point));
            }
            ("spy", 1) => {
                let Term::Atom(target) = deref(&args[0], &point.bindings) else {
                    return Err(EngineError::new("spy/1 expects a predicate name"));
                };
                self.engine.spied.insert(target);
                return Ok(Step::Continue(point));
            }
            _ => {}
        }

        let source_id = format!("{name}/{arity}");
        let spied = self.engine.spied.contains(name);
        let mut defined = false;
        let mut alternatives = Vec::new();
        for clause in &self.engine.clauses {
            if clause.head.indicator() != Some((name, arity)) {
                continue;
            }
            defined = true;
            let offset = self.next_var;
            self.next_var += clause.var_count;
            let mut bindings = point.bindings.clone();
            if !unify(&clause.head.renamed(offset), &term, &mut bindings) {
                continue;
            }
            let mut goals = point.goals.clone();
            if spied {
                goals.push(Goal::Exit {
                    goal: term.clone(),
                    source_id: source_id.clone(),
                });
            }
            goals.extend(
                clause
                    .body
                    .iter()
                    .rev()
                    .map(|g| Goal::Call(g.renamed(offset))),
            );
            alternatives.push(ChoicePoint {
                goals,
                bindings,
                redo: None,
            });
        }
        if !defined {
            return Err(EngineError::new(format!("Unknown predicate: {source_id}")));
        }

        if spied {
            let description = self.describe(&term, &point.bindings);
            self.engine.emit(EventKind::Call, &source_id, description.clone());
            if alternatives.is_empty() {
                self.engine.emit(EventKind::Fail, &source_id, description);
            } else {
                for alternative in alternatives.iter_mut().skip(1) {
                    alternative.redo = Some((source_id.clone(), description.clone()));
                }
            }
        }
        self.stack.extend(alternatives.into_iter().rev());
        Ok(Step::Stop)
    }
}

impl Solutions for LogicSolutions<'_> {
    fn advance(&mut self) -> Result<bool, EngineError> {
        while let Some(point) = self.stack.pop() {
            if let Some(bindings) = self.resume(point)? {
                self.current = Some(bindings);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn is_exhausted(&self) -> bool {
        self.stack.is_empty()
    }

    fn variable_ids(&self) -> BTreeSet<String> {
        self.query
            .visible_vars()
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn value_of(&self, id: &str) -> Option<TermView> {
        let (var, _) = self.query.visible_vars().find(|(_, name)| *name == id)?;
        let empty = Bindings::new();
        let bindings = self.current.as_ref().unwrap_or(&empty);
        let value = resolve(&Term::Var(*var), bindings);
        Some(TermView {
            formatted: render(&value, &self.query.var_names),
            unbound: value.is_var(),
        })
    }
}

fn deref(term: &Term, bindings: &Bindings) -> Term {
    let mut current = term;
    while let Term::Var(id) = current {
        match bindings.get(id) {
            Some(next) => current = next,
            None => break,
        }
    }
    current.clone()
}

fn resolve(term: &Term, bindings: &Bindings) -> Term {
    match deref(term, bindings) {
        Term::Compound { name, args } => Term::Compound {
            name,
            args: args.iter().map(|a| resolve(a, bindings)).collect(),
        },
        other => other,
    }
}

fn occurs(var: VarId, term: &Term, bindings: &Bindings) -> bool {
    match deref(term, bindings) {
        Term::Var(id) => id == var,
        Term::Compound { args, .. } => args.iter().any(|a| occurs(var, a, bindings)),
        _ => false,
    }
}

/// Unification with occurs check; `bindings` is only meaningful on success.
fn unify(left: &Term, right: &Term, bindings: &mut Bindings) -> bool {
    let left = deref(left, bindings);
    let right = deref(right, bindings);
    match (&left, &right) {
        (Term::Var(a), Term::Var(b)) if a == b => true,
        (Term::Var(v), other) | (other, Term::Var(v)) => {
            if occurs(*v, other, bindings) {
                return false;
            }
            bindings.insert(*v, other.clone());
            true
        }
        (Term::Atom(a), Term::Atom(b)) => a == b,
        (Term::Int(a), Term::Int(b)) => a == b,
        (
            Term::Compound { name: n1, args: a1 },
            Term::Compound { name: n2, args: a2 },
        ) => {
            n1 == n2
                && a1.len() == a2.len()
                && a1.iter().zip(a2).all(|(x, y)| unify(x, y, bindings))
        }
        _ => false,
    }
}
