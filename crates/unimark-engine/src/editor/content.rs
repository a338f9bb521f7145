//! Content expressions: the little language a node type uses to declare
//! which children it accepts (`"inline*"`, `"paragraph block*"`,
//! `"(heading | paragraph)+"`).
//!
//! Atoms are node type names or group names. Matching is done over the
//! sequence of child type names with a set-of-positions walk, so it handles
//! any nesting of sequences, alternatives and quantifiers without backtracking
//! blow-ups on realistic grammars.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentExpr {
    /// A node type or group name.
    Name(String),
    /// Items in order. An empty sequence only matches no children.
    Seq(Vec<ContentExpr>),
    /// Any one of the alternatives.
    Choice(Vec<ContentExpr>),
    Repeat {
        inner: Box<ContentExpr>,
        min: usize,
        max: Option<usize>,
    },
}

impl ContentExpr {
    /// Parses an expression. The error string describes what went wrong.
    pub fn parse(source: &str) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        if parser.tokens.is_empty() {
            return Ok(ContentExpr::Seq(vec![]));
        }
        let expr = parser.choice()?;
        if let Some(tok) = parser.tokens.get(parser.pos) {
            return Err(format!("unexpected '{tok}'"));
        }
        Ok(expr)
    }

    /// Every atom name used anywhere in the expression.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ContentExpr::Name(name) => out.push(name),
            ContentExpr::Seq(items) | ContentExpr::Choice(items) => {
                items.iter().for_each(|i| i.collect_names(out))
            }
            ContentExpr::Repeat { inner, .. } => inner.collect_names(out),
        }
    }

    /// True when the whole child sequence satisfies the expression.
    ///
    /// `is_a(atom, child_type)` decides whether a child of `child_type`
    /// satisfies the atom (same name, or member of the group).
    pub fn matches<F>(&self, children: &[&str], is_a: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        self.ends(children, 0, &is_a).contains(&children.len())
    }

    /// All positions at which a match starting at `start` can end.
    fn ends<F>(&self, children: &[&str], start: usize, is_a: &F) -> BTreeSet<usize>
    where
        F: Fn(&str, &str) -> bool,
    {
        match self {
            ContentExpr::Name(name) => match children.get(start) {
                Some(child) if is_a(name, child) => BTreeSet::from([start + 1]),
                _ => BTreeSet::new(),
            },
            ContentExpr::Seq(items) => {
                let mut positions = BTreeSet::from([start]);
                for item in items {
                    positions = positions
                        .iter()
                        .flat_map(|&p| item.ends(children, p, is_a))
                        .collect();
                    if positions.is_empty() {
                        break;
                    }
                }
                positions
            }
            ContentExpr::Choice(alternatives) => alternatives
                .iter()
                .flat_map(|alt| alt.ends(children, start, is_a))
                .collect(),
            ContentExpr::Repeat { inner, min, max } => {
                let mut reached = BTreeSet::new();
                let mut frontier = BTreeSet::from([start]);
                let mut count = 0;
                loop {
                    if count >= *min {
                        reached.extend(frontier.iter().copied());
                    }
                    if max.is_some_and(|m| count >= m) || frontier.is_empty() {
                        break;
                    }
                    let next: BTreeSet<usize> = frontier
                        .iter()
                        .flat_map(|&p| inner.ends(children, p, is_a))
                        .collect();
                    count += 1;
                    // Every position in `next` was already expanded at an
                    // accepted repetition count, so nothing new can appear.
                    if count > *min && next.is_subset(&reached) {
                        break;
                    }
                    frontier = next;
                }
                reached
            }
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if "()|*+?{},".contains(c) {
            tokens.push(c.to_string());
            chars.next();
        } else if c.is_alphanumeric() || c == '_' {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(source[i..end].to_string());
        } else {
            return Err(format!("unexpected character '{c}'"));
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<String>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn choice(&mut self) -> Result<ContentExpr, String> {
        let mut alternatives = vec![self.seq()?];
        while self.peek() == Some("|") {
            self.bump();
            alternatives.push(self.seq()?);
        }
        Ok(if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            ContentExpr::Choice(alternatives)
        })
    }

    fn seq(&mut self) -> Result<ContentExpr, String> {
        let mut items = Vec::new();
        while let Some(tok) = self.peek() {
            if tok == "|" || tok == ")" {
                break;
            }
            items.push(self.quantified()?);
        }
        match items.len() {
            0 => Err("expected a type name".to_string()),
            1 => Ok(items.remove(0)),
            _ => Ok(ContentExpr::Seq(items)),
        }
    }

    fn quantified(&mut self) -> Result<ContentExpr, String> {
        let mut expr = self.atom()?;
        loop {
            let (min, max) = match self.peek() {
                Some("*") => (0, None),
                Some("+") => (1, None),
                Some("?") => (0, Some(1)),
                Some("{") => {
                    self.bump();
                    let range = self.range()?;
                    expr = ContentExpr::Repeat {
                        inner: Box::new(expr),
                        min: range.0,
                        max: range.1,
                    };
                    continue;
                }
                _ => return Ok(expr),
            };
            self.bump();
            expr = ContentExpr::Repeat {
                inner: Box::new(expr),
                min,
                max,
            };
        }
    }

    /// Parses `n}`, `n,}` or `n,m}` after an opening brace.
    fn range(&mut self) -> Result<(usize, Option<usize>), String> {
        let min = self.number()?;
        let max = match self.bump().as_deref() {
            Some("}") => return Ok((min, Some(min))),
            Some(",") => {
                if self.peek() == Some("}") {
                    None
                } else {
                    Some(self.number()?)
                }
            }
            other => return Err(format!("unexpected '{}' in range", other.unwrap_or("end"))),
        };
        match self.bump().as_deref() {
            Some("}") => Ok((min, max)),
            _ => Err("unclosed range".to_string()),
        }
    }

    fn number(&mut self) -> Result<usize, String> {
        let tok = self.bump().unwrap_or_default();
        tok.parse().map_err(|_| format!("expected a number, found '{tok}'"))
    }

    fn atom(&mut self) -> Result<ContentExpr, String> {
        match self.bump() {
            Some(tok) if tok == "(" => {
                let inner = self.choice()?;
                match self.bump().as_deref() {
                    Some(")") => Ok(inner),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(tok) if tok.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                Ok(ContentExpr::Name(tok))
            }
            Some(tok) => Err(format!("unexpected '{tok}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
