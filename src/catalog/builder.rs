//! SQL assembly for report definitions.
//!
//! One `SelectBuilder` descriptor (table, columns, predicates, grouping,
//! having, ordering, limit) covers every report in the catalog, so each
//! report declares shape instead of hand-rolling query text. Rendering is
//! deterministic: identical inputs produce byte-identical text and binds.

use crate::warehouse::{SqlParam, SqlQuery};

/// Builder for a single SELECT statement with `$n` bind placeholders.
#[derive(Debug, Default)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    predicates: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<String>,
    limit: Option<String>,
    params: Vec<SqlParam>,
}

impl SelectBuilder {
    /// Creates a builder over the given (already validated) table reference.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Registers a bind value and returns its placeholder (`$1`, `$2`, ...).
    ///
    /// Postgres permits reusing a placeholder, so one bound value can
    /// appear at several points in the statement.
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Adds a select-list expression (with alias where the report declares one).
    pub fn column(&mut self, expr: impl Into<String>) -> &mut Self {
        self.columns.push(expr.into());
        self
    }

    /// Adds a WHERE predicate; predicates are AND-joined in insertion order.
    pub fn filter(&mut self, predicate: impl Into<String>) -> &mut Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Adds a GROUP BY expression.
    pub fn group(&mut self, expr: impl Into<String>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    /// Adds a HAVING predicate; AND-joined like WHERE.
    pub fn having(&mut self, predicate: impl Into<String>) -> &mut Self {
        self.having.push(predicate.into());
        self
    }

    /// Adds an ORDER BY term (expression plus direction).
    pub fn order(&mut self, expr: impl Into<String>) -> &mut Self {
        self.order_by.push(expr.into());
        self
    }

    /// Sets the row limit, bound as a parameter.
    pub fn limit(&mut self, limit: u32) -> &mut Self {
        let placeholder = self.bind(SqlParam::Int(limit as i64));
        self.limit = Some(placeholder);
        self
    }

    /// Renders the statement.
    pub fn build(self) -> SqlQuery {
        let mut text = String::from("SELECT ");
        text.push_str(&self.columns.join(", "));
        text.push_str("\nFROM ");
        text.push_str(&self.table);

        if !self.predicates.is_empty() {
            text.push_str("\nWHERE ");
            text.push_str(&self.predicates.join("\n  AND "));
        }
        if !self.group_by.is_empty() {
            text.push_str("\nGROUP BY ");
            text.push_str(&self.group_by.join(", "));
        }
        if !self.having.is_empty() {
            text.push_str("\nHAVING ");
            text.push_str(&self.having.join("\n  AND "));
        }
        if !self.order_by.is_empty() {
            text.push_str("\nORDER BY ");
            text.push_str(&self.order_by.join(", "));
        }
        if let Some(placeholder) = &self.limit {
            text.push_str("\nLIMIT ");
            text.push_str(placeholder);
        }

        SqlQuery {
            text,
            params: self.params,
        }
    }
}

/// Escapes LIKE metacharacters so a bound pattern fragment matches
/// literally. Patterns built from these fragments must carry `ESCAPE '\'`.
pub fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Returns true if the string is usable as a schema/table identifier.
///
/// Identifiers cannot be bound as parameters, so anything destined for an
/// identifier position must pass this check instead.
pub fn is_safe_ident(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.chars().next().unwrap_or('0').is_ascii_digit()
}
