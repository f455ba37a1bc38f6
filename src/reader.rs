use std::collections::HashMap;

use crate::engine::EngineError;
use crate::types::{Clause, EMPTY_LIST, Goals, Term, VarId};

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Name(String),
    Var(String),
    Int(i64),
    Punct(char),
    Neck,
    Equals,
    End,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => name.clone(),
            TokenKind::Var(name) => name.clone(),
            TokenKind::Int(i) => i.to_string(),
            TokenKind::Punct(c) => c.to_string(),
            TokenKind::Neck => ":-".to_string(),
            TokenKind::Equals => "=".to_string(),
            TokenKind::End => "end of clause".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentence {
    Clause(Clause),
    Directive(Goals),
}

pub fn read_program(src: &str) -> Result<Vec<Sentence>, EngineError> {
    let tokens = lex(src)?;
    let mut reader = Reader::new(src, &tokens);
    let mut sentences = Vec::new();
    while !reader.at_eof() {
        sentences.push(reader.sentence()?);
    }
    Ok(sentences)
}

pub fn read_query(src: &str) -> Result<Goals, EngineError> {
    let tokens = lex(src)?;
    let mut reader = Reader::new(src, &tokens);
    if reader.at_eof() {
        return Err(EngineError::new("Empty query"));
    }
    let goals = reader.body()?;
    if reader.peek() == Some(&TokenKind::End) {
        reader.idx += 1;
    }
    if let Some(token) = reader.tokens.get(reader.idx) {
        return Err(reader.error_at(
            token.start,
            format!("unexpected {} after query", token.kind.describe()),
        ));
    }
    Ok(reader.finish_goals(goals))
}

fn lex(src: &str) -> Result<Vec<Token>, EngineError> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if ch == '%' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        let start = i;
        if matches!(ch, '(' | ')' | '[' | ']' | '|' | ',') {
            tokens.push(Token {
                kind: TokenKind::Punct(ch),
                start,
            });
            i += 1;
            continue;
        }
        if ch == ':' && bytes.get(i + 1) == Some(&b'-') {
            tokens.push(Token {
                kind: TokenKind::Neck,
                start,
            });
            i += 2;
            continue;
        }
        if ch == '=' {
            tokens.push(Token {
                kind: TokenKind::Equals,
                start,
            });
            i += 1;
            continue;
        }
        if ch == '.' {
            let next = bytes.get(i + 1).copied();
            if next.is_none_or(|b| b.is_ascii_whitespace() || b == b'%') {
                tokens.push(Token {
                    kind: TokenKind::End,
                    start,
                });
                i += 1;
                continue;
            }
            return Err(error_at(src, start, "unexpected '.'".to_string()));
        }
        if ch == '\'' {
            let mut text = String::new();
            i += 1;
            loop {
                let Some(c) = src[i..].chars().next() else {
                    return Err(error_at(src, start, "unterminated quoted atom".to_string()));
                };
                i += c.len_utf8();
                if c == '\'' {
                    if bytes.get(i) == Some(&b'\'') {
                        text.push('\'');
                        i += 1;
                        continue;
                    }
                    break;
                }
                text.push(c);
            }
            tokens.push(Token {
                kind: TokenKind::Name(text),
                start,
            });
            continue;
        }
        let negative = ch == '-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if ch.is_ascii_digit() || negative {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let text = &src[start..i];
            let value = text.parse::<i64>().map_err(|_| {
                error_at(src, start, format!("integer out of range: {text}"))
            })?;
            tokens.push(Token {
                kind: TokenKind::Int(value),
                start,
            });
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let text = src[start..i].to_string();
            let kind = if ch.is_ascii_lowercase() {
                TokenKind::Name(text)
            } else {
                TokenKind::Var(text)
            };
            tokens.push(Token { kind, start });
            continue;
        }
        let found = src[i..].chars().next().unwrap_or(ch);
        return Err(error_at(src, start, format!("unexpected character: {found}")));
    }

    Ok(tokens)
}

fn error_at(src: &str, offset: usize, message: String) -> EngineError {
    let line = src[..offset].matches('\n').count() + 1;
    EngineError::new(format!("Syntax error at line {line}: {message}"))
}

struct Reader<'a> {
    src: &'a str,
    tokens: &'a [Token],
    idx: usize,
    vars: HashMap<String, VarId>,
    next_var: VarId,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            src,
            tokens,
            idx: 0,
            vars: HashMap::new(),
            next_var: 0,
        }
    }

    fn at_eof(&self) -> bool {
        self.idx >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn error_at(&self, offset: usize, message: String) -> EngineError {
        error_at(self.src, offset, message)
    }

    fn unexpected(&self, wanted: &str) -> EngineError {
        match self.tokens.get(self.idx) {
            Some(token) => self.error_at(
                token.start,
                format!("expected {wanted} but found {}", token.kind.describe()),
            ),
            None => self.error_at(
                self.src.len(),
                format!("expected {wanted} but reached end of input"),
            ),
        }
    }

    fn expect(&mut self, kind: TokenKind, wanted: &str) -> Result<(), EngineError> {
        if self.peek() == Some(&kind) {
            self.idx += 1;
            Ok(())
        } else {
            Err(self.unexpected(wanted))
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&TokenKind::Punct(c)) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn sentence(&mut self) -> Result<Sentence, EngineError> {
        self.vars.clear();
        self.next_var = 0;

        if self.peek() == Some(&TokenKind::Neck) {
            self.idx += 1;
            let goals = self.body()?;
            self.expect(TokenKind::End, "'.'")?;
            return Ok(Sentence::Directive(self.finish_goals(goals)));
        }

        let head = self.term()?;
        if head.indicator().is_none() {
            return Err(self.unexpected("a callable clause head"));
        }
        let body = if self.peek() == Some(&TokenKind::Neck) {
            self.idx += 1;
            self.body()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::End, "'.'")?;
        Ok(Sentence::Clause(Clause {
            head,
            body,
            var_count: self.next_var,
        }))
    }

    fn finish_goals(&mut self, goals: Vec<Term>) -> Goals {
        let var_names = self
            .vars
            .drain()
            .map(|(name, id)| (id, name))
            .collect();
        Goals {
            goals,
            var_names,
            var_count: self.next_var,
        }
    }

    fn body(&mut self) -> Result<Vec<Term>, EngineError> {
        let mut goals = vec![self.argument()?];
        while self.eat_punct(',') {
            goals.push(self.argument()?);
        }
        Ok(goals)
    }

    fn argument(&mut self) -> Result<Term, EngineError> {
        let left = self.term()?;
        if self.peek() == Some(&TokenKind::Equals) {
            self.idx += 1;
            let right = self.term()?;
            return Ok(Term::compound("=", vec![left, right]));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Term, EngineError> {
        let tokens = self.tokens;
        let Some(token) = tokens.get(self.idx) else {
            return Err(self.unexpected("a term"));
        };
        match &token.kind {
            TokenKind::Int(i) => {
                self.idx += 1;
                Ok(Term::Int(*i))
            }
            TokenKind::Var(name) => {
                self.idx += 1;
                Ok(self.variable(name))
            }
            TokenKind::Name(name) => {
                self.idx += 1;
                if self.eat_punct('(') {
                    let mut args = vec![self.argument()?];
                    while self.eat_punct(',') {
                        args.push(self.argument()?);
                    }
                    self.expect(TokenKind::Punct(')'), "',' or ')'")?;
                    Ok(Term::compound(name.clone(), args))
                } else {
                    Ok(Term::atom(name.clone()))
                }
            }
            TokenKind::Punct('[') => {
                self.idx += 1;
                if self.eat_punct(']') {
                    return Ok(Term::atom(EMPTY_LIST));
                }
                let mut items = vec![self.argument()?];
                while self.eat_punct(',') {
                    items.push(self.argument()?);
                }
                let tail = if self.eat_punct('|') {
                    self.argument()?
                } else {
                    Term::atom(EMPTY_LIST)
                };
                self.expect(TokenKind::Punct(']'), "',', '|' or ']'")?;
                Ok(Term::list(items, tail))
            }
            _ => Err(self.unexpected("a term")),
        }
    }

    fn variable(&mut self, name: &str) -> Term {
        if name == "_" {
            let id = self.next_var;
            self.next_var += 1;
            return Term::Var(id);
        }
        if let Some(id) = self.vars.get(name) {
            return Term::Var(*id);
        }
        let id = self.next_var;
        self.next_var += 1;
        self.vars.insert(name.to_string(), id);
        Term::Var(id)
    }
}
