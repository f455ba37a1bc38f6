pub mod catalog;
pub mod config;
pub mod content;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod executor;
pub mod harness;
pub mod legacy;
pub mod line_source;
pub mod logic_engine;
pub mod markup;
pub mod parser;
pub mod reader;
pub mod text;
pub mod types;

pub use catalog::{collect_queries, collect_queries_from_text};
pub use config::{DEFAULT_CONFIG_FILENAME, RunnerConfig};
pub use content::{Answer, Content, ContinuationMode, TestQuery, UNBOUND_SENTINEL};
pub use diagnostics::Diagnostic;
pub use engine::{
    Engine, EngineError, EngineEvent, EngineListener, EventKind, OutputSink, Solutions, TermView,
};
pub use error::{HarnessError, QueryError};
pub use executor::{ScriptExecutor, ScriptResult};
pub use harness::{HarnessReport, ScriptFilter, find_scripts, is_script, run_scripts, run_tests};
pub use legacy::{Upgrade, upgrade_path, upgrade_text};
pub use line_source::LineSource;
pub use logic_engine::LogicEngine;
pub use markup::Markup;
pub use parser::{ContentParser, parse_text};
