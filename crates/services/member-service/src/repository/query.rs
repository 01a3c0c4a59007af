//! Query text with named (`:name`) or positional (`?1`) parameters.
//!
//! Templates are written once in portable SQL and rendered per backend:
//! PostgreSQL gets `$n` placeholders, SQLite and MySQL get `?`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{DbBackend, Statement, Value};

use common::{AppError, AppResult};

// String literals and `::` casts are matched first and kept as plain text.
static PARAMETER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'|::|:([A-Za-z_][A-Za-z0-9_]*)|\?([0-9]+)")
        .expect("parameter pattern is valid")
});

/// Named queries available to the repositories, keyed `Entity.queryName`.
static NAMED_QUERIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "Member.findByUsername",
            "SELECT * FROM member WHERE username = :username ORDER BY id",
        ),
        (
            "Member.findUser",
            "SELECT * FROM member WHERE username = :username AND age = :age ORDER BY id",
        ),
        (
            "Member.findUserByPosition",
            "SELECT * FROM member WHERE username = ?1 AND age = ?2 ORDER BY id",
        ),
        ("Member.findAllCustom", "SELECT * FROM member ORDER BY id"),
    ])
});

/// Look up and parse a named query
pub fn named_query(name: &str) -> AppResult<QueryTemplate> {
    let text = NAMED_QUERIES
        .get(name)
        .ok_or_else(|| AppError::invalid_query(format!("No query named '{name}'")))?;
    QueryTemplate::parse(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Named(String),
    Positional(usize),
}

/// Parsed query text
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    segments: Vec<Segment>,
}

impl QueryTemplate {
    /// Split query text into literal text and parameters.
    ///
    /// Named and positional parameters cannot be mixed in one query.
    pub fn parse(text: &str) -> AppResult<Self> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PARAMETER.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.as_str() == "::" || whole.as_str().starts_with('\'') {
                continue;
            }
            if whole.start() > last {
                segments.push(Segment::Text(text[last..whole.start()].to_string()));
            }
            if let Some(name) = caps.get(1) {
                segments.push(Segment::Named(name.as_str().to_string()));
            } else if let Some(position) = caps.get(2) {
                let position: usize = position
                    .as_str()
                    .parse()
                    .map_err(|_| AppError::invalid_query("positional parameter out of range"))?;
                if position == 0 {
                    return Err(AppError::invalid_query("positional parameters start at ?1"));
                }
                segments.push(Segment::Positional(position));
            }
            last = whole.end();
        }
        if last < text.len() {
            segments.push(Segment::Text(text[last..].to_string()));
        }

        let template = Self { segments };
        if template.has_named() && template.has_positional() {
            return Err(AppError::invalid_query(
                "named and positional parameters cannot be mixed",
            ));
        }
        Ok(template)
    }

    fn has_named(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Named(_)))
    }

    fn has_positional(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Positional(_)))
    }

    /// Distinct parameter names in order of first appearance
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Named(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Bind `:name` parameters. Every parameter must be bound and every
    /// binding used.
    pub fn bind_named(&self, backend: DbBackend, params: &[(&str, Value)]) -> AppResult<Statement> {
        if self.has_positional() {
            return Err(AppError::invalid_query(
                "query uses positional parameters; bind by position",
            ));
        }
        let lookup: HashMap<&str, &Value> = params.iter().map(|(k, v)| (*k, v)).collect();

        for name in lookup.keys() {
            if !self.parameter_names().contains(name) {
                return Err(AppError::invalid_query(format!(
                    "parameter ':{name}' is not used by the query"
                )));
            }
        }

        self.render(backend, |segment| match segment {
            Segment::Named(name) => lookup
                .get(name.as_str())
                .map(|v| (*v).clone())
                .ok_or_else(|| AppError::invalid_query(format!("no value bound for ':{name}'"))),
            _ => Err(AppError::internal("unexpected parameter kind")),
        })
    }

    /// Bind `?N` parameters; `values[0]` is `?1`.
    pub fn bind_positional(&self, backend: DbBackend, values: Vec<Value>) -> AppResult<Statement> {
        if self.has_named() {
            return Err(AppError::invalid_query(
                "query uses named parameters; bind by name",
            ));
        }
        for index in 1..=values.len() {
            let used = self
                .segments
                .iter()
                .any(|s| matches!(s, Segment::Positional(p) if *p == index));
            if !used {
                return Err(AppError::invalid_query(format!(
                    "parameter ?{index} is not used by the query"
                )));
            }
        }

        self.render(backend, |segment| match segment {
            Segment::Positional(position) => values
                .get(position - 1)
                .cloned()
                .ok_or_else(|| AppError::invalid_query(format!("no value bound for ?{position}"))),
            _ => Err(AppError::internal("unexpected parameter kind")),
        })
    }

    fn render<F>(&self, backend: DbBackend, mut value_for: F) -> AppResult<Statement>
    where
        F: FnMut(&Segment) -> AppResult<Value>,
    {
        let mut sql = String::new();
        let mut values = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                param => {
                    values.push(value_for(param)?);
                    match backend {
                        DbBackend::Postgres => sql.push_str(&format!("${}", values.len())),
                        _ => sql.push('?'),
                    }
                }
            }
        }

        Ok(Statement::from_sql_and_values(backend, sql, values))
    }
}
