//! Structured OData `$filter` builder.
//!
//! Clauses are kept as `{field, op, value}` triples and only rendered in
//! [`ODataFilter::render`], where every value is quoted and embedded single
//! quotes are doubled.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
    Le,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "eq"),
            Self::Ge => write!(f, "ge"),
            Self::Le => write!(f, "le"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

/// Conjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataFilter {
    clauses: Vec<FilterClause>,
}

impl ODataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, field: &str, op: FilterOp, value: impl Into<String>) -> Self {
        self.clauses.push(FilterClause {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<String>) -> Self {
        self.clause(field, FilterOp::Eq, value)
    }

    pub fn ge(self, field: &str, value: impl Into<String>) -> Self {
        self.clause(field, FilterOp::Ge, value)
    }

    pub fn le(self, field: &str, value: impl Into<String>) -> Self {
        self.clause(field, FilterOp::Le, value)
    }

    /// Render as `field op 'value' and ...`. `None` when there are no clauses.
    pub fn render(&self) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }
        let rendered = self
            .clauses
            .iter()
            .map(|c| format!("{} {} '{}'", c.field, c.op, c.value.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(" and ");
        Some(rendered)
    }
}
