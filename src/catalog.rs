use std::path::Path;

use crate::content::{Content, TestQuery};
use crate::diagnostics::Diagnostic;
use crate::parser::ContentParser;

pub fn collect_queries(path: &Path) -> Result<Vec<TestQuery>, Diagnostic> {
    collect_from(ContentParser::open(path)?)
}

pub fn collect_queries_from_text(path: &Path, text: &str) -> Result<Vec<TestQuery>, Diagnostic> {
    collect_from(ContentParser::from_text(path, text))
}

fn collect_from(parser: ContentParser) -> Result<Vec<TestQuery>, Diagnostic> {
    let source = parser.path().display().to_string();
    let mut queries = Vec::new();
    let mut has_links = false;
    for content in parser {
        match content? {
            Content::Query(query) => queries.push(query),
            Content::Link { .. } => has_links = true,
            Content::Code { .. } | Content::Comment { .. } => {}
        }
    }
    if queries.is_empty() && !has_links {
        return Err(
            Diagnostic::new("E-CATALOG", "Could not find any tests or links").with_source(source),
        );
    }
    Ok(queries)
}
