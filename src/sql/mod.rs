//! SQL fragment builders used by the filter endpoints.
//!
//! Conditions are kept structured until rendering so the same clause can be
//! emitted with bound `?N` placeholders (what the database sees) or with
//! inline quoted literals (what the logs show).

pub mod predicate;
pub mod projection;

use regex::Regex;
use rusqlite::types::Value;
use std::sync::OnceLock;

/// Errors raised while turning request options into SQL text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SqlError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("invalid identifier for {param}: {value:?}")]
    InvalidIdentifier { param: &'static str, value: String },
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// True for bare identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_plain_ident(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"))
        .is_match(name)
}

/// A column reference with an optional table alias, e.g. `p."date_debut"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub alias: Option<&'static str>,
    pub name: &'static str,
}

impl ColumnRef {
    pub const fn aliased(alias: &'static str, name: &'static str) -> Self {
        Self {
            alias: Some(alias),
            name,
        }
    }

    pub fn qualified(&self) -> String {
        qualify(self.alias, self.name)
    }
}

/// Qualify a (quoted) column with an optional table alias.
pub fn qualify(alias: Option<&str>, column: &str) -> String {
    match alias {
        Some(alias) if !alias.is_empty() => format!("{alias}.{}", quote_ident(column)),
        _ => quote_ident(column),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column IN (v1, v2, ...)`
    In { column: String, values: Vec<String> },
    /// `column >= bound` / `column <= bound`
    Compare {
        column: String,
        op: Comparison,
        bound: f64,
    },
}

/// An AND-joined list of conditions. Renders to an empty string when there
/// are no conditions so the base query matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<Condition>,
}

impl WhereClause {
    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render with `?N` placeholders. Returns `(clause, bound values)`.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut parts = Vec::with_capacity(self.conditions.len());
        let mut params: Vec<Value> = Vec::new();

        for condition in &self.conditions {
            match condition {
                Condition::In { column, values } => {
                    let mut placeholders = Vec::with_capacity(values.len());
                    for value in values {
                        params.push(Value::Text(value.clone()));
                        placeholders.push(format!("?{}", params.len()));
                    }
                    parts.push(format!("{column} IN ({})", placeholders.join(", ")));
                }
                Condition::Compare { column, op, bound } => {
                    params.push(Value::Real(*bound));
                    parts.push(format!("{column} {} ?{}", op.operator(), params.len()));
                }
            }
        }

        if parts.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", parts.join(" AND ")), params)
        }
    }

    /// Render with inline literals, for logs and diagnostics only.
    pub fn render_inline(&self) -> String {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| match condition {
                Condition::In { column, values } => {
                    let literals: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
                    format!("{column} IN ({})", literals.join(","))
                }
                Condition::Compare { column, op, bound } => {
                    format!("{column} {} {bound}", op.operator())
                }
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", parts.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_ident("Title"), "\"Title\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(qualify(Some("b"), "Author"), "b.\"Author\"");
        assert_eq!(qualify(None, "nom"), "\"nom\"");
    }

    #[test]
    fn plain_identifiers() {
        assert!(is_plain_ident("date_debut"));
        assert!(is_plain_ident("_x1"));
        assert!(!is_plain_ident("1abc"));
        assert!(!is_plain_ident("periodes; DROP TABLE x"));
        assert!(!is_plain_ident(""));
    }

    #[test]
    fn empty_clause_renders_nothing() {
        let clause = WhereClause::default();
        assert_eq!(clause.to_sql(), (String::new(), vec![]));
        assert_eq!(clause.render_inline(), "");
    }

    #[test]
    fn placeholders_number_across_conditions() {
        let mut clause = WhereClause::default();
        clause.push(Condition::In {
            column: "c.\"caracterisation\"".into(),
            values: vec!["mur".into(), "colonnade".into()],
        });
        clause.push(Condition::Compare {
            column: "p.\"date_debut\"".into(),
            op: Comparison::AtLeast,
            bound: -300.0,
        });

        let (sql, params) = clause.to_sql();
        assert_eq!(
            sql,
            "WHERE c.\"caracterisation\" IN (?1, ?2) AND p.\"date_debut\" >= ?3"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("mur".into()),
                Value::Text("colonnade".into()),
                Value::Real(-300.0),
            ]
        );
        assert_eq!(
            clause.render_inline(),
            "WHERE c.\"caracterisation\" IN ('mur','colonnade') AND p.\"date_debut\" >= -300"
        );
    }
}
