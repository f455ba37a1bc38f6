use std::sync::{Arc, Mutex};

use lptest::{Engine, EngineEvent, EngineListener, LogicEngine, OutputSink};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl EngineListener for Recorder {
    fn on_event(&self, event: &EngineEvent) {
        self.events.lock().expect("events").push(format!(
            "{} {} {}",
            event.kind.as_str(),
            event.source_id,
            event.description
        ));
    }

    fn on_warn(&self, message: &str) {
        self.warnings.lock().expect("warnings").push(message.to_string());
    }

    fn on_info(&self, _message: &str) {}
}

fn engine_with(program: &str) -> LogicEngine {
    let mut engine = LogicEngine::new();
    engine.consult_text(program).expect("program should load");
    engine
}

/// Every solution of `query`, rendered as `X=value` pairs.
fn all_solutions(engine: &mut LogicEngine, query: &str) -> Vec<String> {
    let mut solutions = engine.prepare(query).expect("query should compile");
    let mut found = Vec::new();
    while solutions.advance().expect("evaluation") {
        let rendered: Vec<String> = solutions
            .variable_ids()
            .iter()
            .map(|id| {
                let value = solutions.value_of(id).expect("value");
                format!("{id}={}", value.formatted)
            })
            .collect();
        found.push(rendered.join(" "));
    }
    found
}

const FAMILY: &str = "\
parent(tom, bob).
parent(tom, liz).
parent(bob, ann).
grandparent(X, Z) :- parent(X, Y), parent(Y, Z).
";

#[test]
fn enumerates_facts_in_clause_order() {
    let mut engine = engine_with(FAMILY);
    assert_eq!(engine.clause_count(), 4);
    assert_eq!(all_solutions(&mut engine, "parent(tom, X)"), vec!["X=bob", "X=liz"]);
}

#[test]
fn rules_join_through_shared_variables() {
    let mut engine = engine_with(FAMILY);
    assert_eq!(
        all_solutions(&mut engine, "grandparent(G, C)"),
        vec!["C=ann G=tom"]
    );
}

#[test]
fn exhaustion_is_known_without_a_failing_retry() {
    let mut engine = engine_with(FAMILY);

    let mut solutions = engine.prepare("parent(bob, X)").expect("compile");
    assert!(!solutions.is_exhausted());
    assert!(solutions.advance().expect("first"));
    assert!(solutions.is_exhausted());
    assert!(!solutions.advance().expect("no more"));
    drop(solutions);

    let mut solutions = engine.prepare("parent(tom, X)").expect("compile");
    assert!(solutions.advance().expect("first"));
    assert!(!solutions.is_exhausted());
    assert!(solutions.advance().expect("second"));
    assert!(solutions.is_exhausted());
}

#[test]
fn formats_lists_compounds_and_unbound_variables() {
    let mut engine = LogicEngine::new();
    let mut solutions = engine
        .prepare("X = [a, f(b, c)|T], Y = [1, 2], Z = Q")
        .expect("compile");
    assert!(solutions.advance().expect("unify"));
    let x = solutions.value_of("X").expect("X");
    assert_eq!(x.formatted, "[a,f(b, c)|T]");
    assert!(!x.unbound);
    assert_eq!(solutions.value_of("Y").expect("Y").formatted, "[1,2]");
    let z = solutions.value_of("Z").expect("Z");
    assert!(z.unbound);
    let t = solutions.value_of("T").expect("T");
    assert!(t.unbound);
    assert_eq!(t.formatted, "T");
}

#[test]
fn unknown_predicates_raise_errors() {
    let mut engine = engine_with(FAMILY);
    let mut solutions = engine.prepare("sibling(X, Y)").expect("compile");
    let err = solutions.advance().expect_err("unknown predicate");
    assert_eq!(err.message(), "Unknown predicate: sibling/2");
}

#[test]
fn throw_surfaces_the_rendered_term() {
    let mut engine = LogicEngine::new();
    let mut solutions = engine.prepare("X = oops, throw(error(X))").expect("compile");
    let err = solutions.advance().expect_err("thrown");
    assert_eq!(err.message(), "error(oops)");
}

#[test]
fn write_goes_to_the_redirected_sink() {
    let mut engine = engine_with("greet(N) :- write(hello), write(' '), write(N), nl.\n");
    let sink = OutputSink::new();
    engine.redirect_output(sink.clone());
    {
        let mut solutions = engine.prepare("greet(world)").expect("compile");
        assert!(solutions.advance().expect("greet"));
    }
    engine.restore_output();
    assert_eq!(sink.take(), "hello world\n");
}

#[test]
fn spied_predicates_report_their_ports() {
    let mut engine = engine_with("p(a).\np(b).\n:- spy(p).\n");
    let recorder = Arc::new(Recorder::default());
    engine.add_listener(recorder.clone());

    assert_eq!(all_solutions(&mut engine, "p(X)"), vec!["X=a", "X=b"]);
    let events = recorder.events.lock().expect("events").clone();
    assert_eq!(
        events,
        vec![
            "CALL p/1 p(X)",
            "EXIT p/1 p(a)",
            "REDO p/1 p(X)",
            "EXIT p/1 p(b)",
        ]
    );

    recorder.events.lock().expect("events").clear();
    assert!(all_solutions(&mut engine, "p(c)").is_empty());
    let events = recorder.events.lock().expect("events").clone();
    assert_eq!(events, vec!["CALL p/1 p(c)", "FAIL p/1 p(c)"]);
}

#[test]
fn failing_directive_warns_instead_of_aborting() {
    let mut engine = LogicEngine::new();
    let recorder = Arc::new(Recorder::default());
    engine.add_listener(recorder.clone());
    engine
        .consult_text("q(a).\n:- q(b).\nq(c).\n")
        .expect("consult continues");
    assert_eq!(engine.clause_count(), 2);
    let warnings = recorder.warnings.lock().expect("warnings").clone();
    assert_eq!(warnings, vec!["Directive failed: q(b)"]);
}

#[test]
fn syntax_errors_fail_the_consult() {
    let mut engine = LogicEngine::new();
    let err = engine.consult_text("p(a).\np(b\n").expect_err("bad syntax");
    assert!(err.message().starts_with("Syntax error at line "), "{err}");
}
