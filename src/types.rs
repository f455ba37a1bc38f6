use std::collections::HashMap;

pub type VarId = usize;

pub const EMPTY_LIST: &str = "[]";
pub const LIST_CONS: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Atom(String),
    Int(i64),
    Var(VarId),
    Compound { name: String, args: Vec<Term> },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn compound(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound {
            name: name.into(),
            args,
        }
    }

    pub fn list(items: Vec<Term>, tail: Term) -> Self {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::compound(LIST_CONS, vec![item, acc]))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn indicator(&self) -> Option<(&str, usize)> {
        match self {
            Term::Atom(name) => Some((name, 0)),
            Term::Compound { name, args } => Some((name, args.len())),
            Term::Int(_) | Term::Var(_) => None,
        }
    }

    pub fn renamed(&self, offset: VarId) -> Term {
        match self {
            Term::Var(id) => Term::Var(id + offset),
            Term::Compound { name, args } => Term::Compound {
                name: name.clone(),
                args: args.iter().map(|a| a.renamed(offset)).collect(),
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Term,
    pub body: Vec<Term>,
    pub var_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goals {
    pub goals: Vec<Term>,
    pub var_names: HashMap<VarId, String>,
    pub var_count: usize,
}

impl Goals {
    pub fn visible_vars(&self) -> impl Iterator<Item = (&VarId, &String)> {
        self.var_names.iter().filter(|(_, name)| !name.starts_with('_'))
    }
}

pub fn render(term: &Term, names: &HashMap<VarId, String>) -> String {
    let mut out = String::new();
    render_into(term, names, &mut out);
    out
}

fn render_into(term: &Term, names: &HashMap<VarId, String>, out: &mut String) {
    match term {
        Term::Atom(name) => out.push_str(name),
        Term::Int(i) => out.push_str(&i.to_string()),
        Term::Var(id) => match names.get(id) {
            Some(name) => out.push_str(name),
            None => out.push_str(&format!("_G{id}")),
        },
        Term::Compound { name, args } if name == LIST_CONS && args.len() == 2 => {
            out.push('[');
            render_into(&args[0], names, out);
            let mut tail = &args[1];
            loop {
                match tail {
                    Term::Compound { name, args } if name == LIST_CONS && args.len() == 2 => {
                        out.push(',');
                        render_into(&args[0], names, out);
                        tail = &args[1];
                    }
                    Term::Atom(name) if name == EMPTY_LIST => break,
                    other => {
                        out.push('|');
                        render_into(other, names, out);
                        break;
                    }
                }
            }
            out.push(']');
        }
        Term::Compound { name, args } if name == "=" && args.len() == 2 => {
            render_into(&args[0], names, out);
            out.push_str(" = ");
            render_into(&args[1], names, out);
        }
        Term::Compound { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(arg, names, out);
            }
            out.push(')');
        }
    }
}
