use std::path::Path;

use tracing::debug;

use crate::content::{Answer, Content, ContinuationMode, TestQuery, format_id_set};
use crate::diagnostics::Diagnostic;
use crate::line_source::LineSource;
use crate::markup::{self, Markup};

#[derive(Debug)]
pub struct ContentParser {
    source: LineSource,
    failed: bool,
}

impl ContentParser {
    pub fn new(source: LineSource) -> Self {
        Self {
            source,
            failed: false,
        }
    }

    pub fn open(path: &Path) -> Result<Self, Diagnostic> {
        Ok(Self::new(LineSource::open(path)?))
    }

    pub fn from_text(path: impl AsRef<Path>, text: &str) -> Self {
        Self::new(LineSource::from_text(path.as_ref(), text))
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn next_content(&mut self) -> Result<Option<Content>, Diagnostic> {
        self.read_content().map_err(|diag| self.locate(diag))
    }

    fn locate(&self, diag: Diagnostic) -> Diagnostic {
        let text = self.source.current_line().unwrap_or_default().to_string();
        diag.at_line(self.source.line_number(), text)
            .with_source(self.source.path().display().to_string())
    }

    fn read_line(&mut self) -> Option<String> {
        self.source.read_line().map(str::to_string)
    }

    fn read_content(&mut self) -> Result<Option<Content>, Diagnostic> {
        let Some(line) = self.read_line() else {
            return Ok(None);
        };

        if Markup::Link.is_match(&line)? {
            return Ok(Some(Content::Link {
                target: Markup::Link.parse_text(&line),
            }));
        }
        if Markup::True.is_match(&line)? {
            let query = single_answer_query(&line, Markup::True);
            return Ok(Some(Content::Query(query)));
        }
        if Markup::TrueNo.is_match(&line)? {
            let mut query = single_answer_query(&line, Markup::TrueNo);
            query.continuation = ContinuationMode::ContinuesUntilExhausted;
            return Ok(Some(Content::Query(query)));
        }
        if Markup::Fail.is_match(&line)? {
            let mut query = TestQuery::new(Markup::Fail.parse_text(&line));
            query.continuation = ContinuationMode::ContinuesUntilExhausted;
            return Ok(Some(Content::Query(query)));
        }
        if Markup::Query.is_match(&line)? {
            return self.read_query(&line).map(|q| Some(Content::Query(q)));
        }
        if markup::is_illegal_markup(&line) {
            return Err(Diagnostic::new(
                "E-PARSE",
                format!("Unknown sys-test markup: {line}"),
            ));
        }
        if markup::is_standard_comment(&line) {
            return Ok(Some(Content::Comment {
                text: self.read_comment(&line),
            }));
        }
        Ok(Some(Content::Code { text: line }))
    }

    fn read_comment(&mut self, first: &str) -> String {
        let mut comment = first[1..].trim().to_string();
        loop {
            self.source.mark();
            match self.read_line() {
                Some(next)
                    if markup::is_standard_comment(&next)
                        && !markup::is_illegal_markup(&next) =>
                {
                    comment.push(' ');
                    comment.push_str(next[1..].trim());
                }
                _ => {
                    self.source.reset();
                    break;
                }
            }
        }
        comment.trim().to_string()
    }

    fn read_query(&mut self, line: &str) -> Result<TestQuery, Diagnostic> {
        let mut query = TestQuery::new(Markup::Query.parse_text(line));
        query.answers = self.read_answers()?;

        self.source.mark();
        let mut next = self.read_line();
        if let Some(candidate) = next.clone() {
            if Markup::Output.is_match(&candidate)? {
                query.expected_output = self.read_block(&candidate, Markup::Output)?;
                query.continuation = ContinuationMode::ContinuesUntilExhausted;
                self.source.mark();
                next = self.read_line();
            }
        }

        match next {
            Some(l) if Markup::Quit.is_match(&l)? => query.quits = true,
            Some(l) if Markup::No.is_match(&l)? => {
                query.continuation = ContinuationMode::ContinuesUntilExhausted;
            }
            Some(l) if Markup::Error.is_match(&l)? => {
                query.expected_error = Some(self.read_block(&l, Markup::Error)?);
            }
            _ => self.source.reset(),
        }

        debug!(
            query = %query.query,
            answers = query.answers.len(),
            "parsed query"
        );
        Ok(query)
    }

    fn read_answers(&mut self) -> Result<Vec<Answer>, Diagnostic> {
        let mut answers: Vec<Answer> = Vec::new();
        while let Some(answer) = self.read_answer()? {
            if let Some(first) = answers.first() {
                let expected = first.variable_ids();
                let actual = answer.variable_ids();
                if expected != actual {
                    return Err(Diagnostic::new(
                        "E-PARSE",
                        format!(
                            "Answers have different variable Ids: {} versus: {}",
                            format_id_set(&expected),
                            format_id_set(&actual)
                        ),
                    ));
                }
            }
            answers.push(answer);
        }
        Ok(answers)
    }

    fn read_answer(&mut self) -> Result<Option<Answer>, Diagnostic> {
        self.source.mark();
        let Some(mut line) = self.read_line() else {
            return Ok(None);
        };
        let mut answer = Answer::new();

        if Markup::Output.is_match(&line)? {
            let output = self.read_block(&line, Markup::Output)?;
            match self.read_line() {
                Some(next) => line = next,
                None => {
                    self.source.reset();
                    return Ok(None);
                }
            }
            answer.expected_output = output;
        }

        if Markup::Yes.is_match(&line)? {
            return Ok(Some(answer));
        }

        let Some((id, value)) = markup::parse_assignment(&line)? else {
            // not part of this query: leave it for the caller
            self.source.reset();
            return Ok(None);
        };
        answer.assignments.insert(id, value);

        // a repeated identifier opens the next answer
        loop {
            self.source.mark();
            let Some(next) = self.read_line() else {
                self.source.reset();
                break;
            };
            match markup::parse_assignment(&next)? {
                Some((id, value)) if !answer.has_variable_id(&id) => {
                    answer.assignments.insert(id, value);
                }
                _ => {
                    self.source.reset();
                    break;
                }
            }
        }
        Ok(Some(answer))
    }

    fn read_block(&mut self, line: &str, tag: Markup) -> Result<String, Diagnostic> {
        let inline = tag.parse_text(line);
        if !inline.is_empty() {
            return Ok(inline);
        }

        let mut block = String::new();
        let mut first = true;
        loop {
            let Some(next) = self.read_line() else {
                return Err(Diagnostic::new(
                    "E-PARSE",
                    format!("unterminated {} block", tag.prefix()),
                ));
            };
            if tag.is_match(&next)? {
                break;
            }
            let body = match next.find(markup::COMMENT_SIGIL) {
                Some(idx) => &next[idx + 1..],
                None => next.as_str(),
            };
            // an empty first line stands for a leading newline
            if !first || body.is_empty() {
                block.push('\n');
            }
            block.push_str(body);
            first = false;
        }
        Ok(block)
    }
}

impl Iterator for ContentParser {
    type Item = Result<Content, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_content() {
            Ok(Some(content)) => Some(Ok(content)),
            Ok(None) => None,
            Err(diag) => {
                self.failed = true;
                Some(Err(diag))
            }
        }
    }
}

fn single_answer_query(line: &str, tag: Markup) -> TestQuery {
    let mut query = TestQuery::new(tag.parse_text(line));
    query.answers.push(Answer::new());
    query
}

pub fn parse_text(path: impl AsRef<Path>, text: &str) -> Result<Vec<Content>, Diagnostic> {
    ContentParser::from_text(path, text).collect()
}
