mod support;

use lptest::{HarnessError, HarnessReport, LogicEngine, RunnerConfig, run_tests};
use support::{fixture_path, write_script};
use tempfile::tempdir;

fn run(root: &std::path::Path, config: &RunnerConfig) -> HarnessReport {
    run_tests(root, config, LogicEngine::new).expect("harness should run")
}

/// Everything in a report except timings.
fn comparable(report: &HarnessReport) -> (Vec<(String, usize, Vec<String>)>, usize, usize, String) {
    let results = report
        .results()
        .iter()
        .map(|r| {
            (
                r.path().display().to_string(),
                r.query_count(),
                r.errors().to_vec(),
            )
        })
        .collect();
    (
        results,
        report.query_count(),
        report.error_count(),
        report.error_messages().to_string(),
    )
}

#[test]
fn passing_fixtures_have_no_failures() {
    let report = run(&fixture_path("passing"), &RunnerConfig::default());
    assert_eq!(report.scripts_count(), 4);
    assert_eq!(report.query_count(), 11);
    assert_eq!(report.error_messages(), "");
    report.assert_success().expect("all fixtures should pass");
    assert!(
        report
            .summary()
            .starts_with("Completed 11 queries from 4 files with 0 failures in: ")
    );
}

#[test]
fn scripts_are_reported_in_path_order() {
    let report = run(&fixture_path("passing"), &RunnerConfig::default());
    let names: Vec<String> = report
        .results()
        .iter()
        .map(|r| {
            r.path()
                .file_name()
                .expect("file name")
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(names, vec!["errors.pl", "family.pl", "output.pl", "unify.pl"]);
}

#[test]
fn failing_fixtures_are_collected_per_script() {
    let root = fixture_path("failing");
    let report = run(&root, &RunnerConfig::default());
    assert_eq!(report.scripts_count(), 2);
    assert_eq!(report.error_count(), 2);

    let bad_markup = root.join("bad_markup.pl");
    let wrong_answer = root.join("wrong_answer.pl");
    let messages: Vec<&str> = report.error_messages().lines().collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with(&format!(
        "{} Error checking script: ",
        bad_markup.display()
    )));
    assert!(messages[0].contains("Unknown sys-test markup: %QWERTY at line 2"));
    assert_eq!(
        messages[1],
        format!(
            "{} Query: colour(X) Error: X assigned to: green not: blue {{X=blue}}",
            wrong_answer.display()
        )
    );

    let summary = report.summary();
    assert!(summary.contains("\n ***** Failed: 2 tests!!! *****\n\n"));
    assert!(summary.ends_with(report.error_messages()));

    let err = report.assert_success().expect_err("failures should be raised");
    assert!(matches!(err, HarnessError::Failures { count: 2, .. }));
    assert!(err.to_string().starts_with("2 test failures:\n"));
}

#[test]
fn serial_and_parallel_runs_agree() {
    let root = fixture_path("");
    let serial = run(&root, &RunnerConfig::default());
    let parallel = run(
        &root,
        &RunnerConfig {
            parallel: true,
            ..RunnerConfig::default()
        },
    );
    assert_eq!(comparable(&serial), comparable(&parallel));
    assert_eq!(serial.scripts_count(), 7);
}

#[test]
fn every_script_gets_a_fresh_engine() {
    let dir = tempdir().expect("tempdir");
    write_script(dir.path(), "a.pl", "p(a).\n%?- p(X)\n% X=a\n");
    write_script(dir.path(), "b.pl", "p(b).\n%?- p(X)\n% X=b\n");
    for parallel in [false, true] {
        let config = RunnerConfig {
            parallel,
            ..RunnerConfig::default()
        };
        run(dir.path(), &config)
            .assert_success()
            .expect("clauses must not leak between scripts");
    }
}

#[test]
fn single_file_root() {
    let report = run(
        &fixture_path("passing/family.pl"),
        &RunnerConfig::default(),
    );
    assert_eq!(report.scripts_count(), 1);
    assert_eq!(report.query_count(), 5);
    assert!(!report.has_failures());
}

#[test]
fn ignored_retry_toggle_changes_only_verification() {
    let dir = tempdir().expect("tempdir");
    write_script(
        dir.path(),
        "retry.pl",
        "q(a).\nq(b).\nr(X) :- q(X), X = a.\n%TRUE r(_)\n%TRUE_NO r(_)\n",
    );

    let strict = run(dir.path(), &RunnerConfig::default());
    assert_eq!(strict.query_count(), 2);
    assert_eq!(strict.error_count(), 1);
    assert!(
        strict
            .error_messages()
            .contains("Query: r(_) Error: Had to fail to determine there were no more answers")
    );

    let lenient = run(
        dir.path(),
        &RunnerConfig {
            ignore_failed_retries: true,
            ..RunnerConfig::default()
        },
    );
    assert_eq!(lenient.error_count(), 0);
    assert_eq!(lenient.query_count(), strict.query_count());
}

#[test]
fn only_configured_extensions_are_scanned() {
    let dir = tempdir().expect("tempdir");
    write_script(dir.path(), "notes.txt", "%QWERTY\n");
    write_script(dir.path(), "nested/ok.PRO", "%TRUE true\n");
    let report = run(dir.path(), &RunnerConfig::default());
    assert_eq!(report.scripts_count(), 1);
    assert!(!report.has_failures());

    let custom = RunnerConfig {
        extensions: vec!["txt".to_string()],
        ..RunnerConfig::default()
    };
    let report = run(dir.path(), &custom);
    assert_eq!(report.scripts_count(), 1);
    assert!(report.has_failures());
}

#[test]
fn missing_root_aborts_the_run() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("nowhere");
    let err = run_tests(&missing, &RunnerConfig::default(), LogicEngine::new)
        .expect_err("missing path");
    assert!(matches!(err, HarnessError::MissingPath(_)));
    assert_eq!(err.to_string(), format!("{} not found", missing.display()));
}
