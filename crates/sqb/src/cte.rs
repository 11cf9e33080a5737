//! Common table expressions.
//!
//! A [`Cte`] is a named query usable as a table. Referencing it in FROM,
//! JOIN or USING is enough to have it emitted in the statement's WITH
//! clause; [`Ctes`] collects explicit and referenced CTEs, keeping the
//! first occurrence of each name.

use crate::dialect::SqlWriter;
use crate::field::CustomField;
use crate::query::Query;
use crate::table::Table;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Cte {
    name: String,
    alias: String,
    recursive: bool,
    query: Arc<dyn Query>,
}

impl Cte {
    pub fn new(name: &str, query: impl Query + 'static) -> Self {
        Self {
            name: name.to_string(),
            alias: String::new(),
            recursive: false,
            query: Arc::new(query),
        }
    }

    /// `WITH RECURSIVE`. The query usually unions a base case with a
    /// self-reference built from [`Cte::column`].
    pub fn recursive(name: &str, query: impl Query + 'static) -> Self {
        Self {
            recursive: true,
            ..Self::new(name, query)
        }
    }

    /// Re-alias the CTE for use in FROM or JOIN.
    ///
    /// The WITH clause keeps the original name; the reference renders as
    /// `name AS alias` and columns are qualified with the alias.
    pub fn as_(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    /// A column of the CTE, qualified with its alias if set, else its name.
    pub fn column(&self, name: &str) -> CustomField {
        let qualifier = if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        };
        CustomField::column(qualifier, name)
    }

    pub fn query(&self) -> &Arc<dyn Query> {
        &self.query
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    fn append_definition(&self, w: &mut SqlWriter) {
        w.push_ident(&self.name);
        w.push_str(" AS (");
        self.query.append_sql(w);
        w.push(')');
    }
}

impl Table for Cte {
    fn append_sql(&self, w: &mut SqlWriter) {
        w.push_ident(&self.name);
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_cte(&self) -> Option<&Cte> {
        Some(self)
    }
}

/// The CTE list of one statement.
#[derive(Debug, Clone, Default)]
pub struct Ctes(pub Vec<Cte>);

impl Ctes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, cte: Cte) {
        if !self.0.iter().any(|c| c.name == cte.name) {
            self.0.push(cte);
        }
    }

    /// Explicit CTEs followed by any CTE referenced from `tables`.
    pub(crate) fn collect<'a>(
        &self,
        tables: impl IntoIterator<Item = &'a (dyn Table + 'static)>,
    ) -> Ctes {
        let mut all = self.clone();
        for table in tables {
            if let Some(cte) = table.as_cte() {
                all.push(cte.clone());
            }
        }
        all
    }

    /// `WITH [RECURSIVE] a AS (...), b AS (...) ` including the trailing
    /// space, or nothing.
    pub fn append_sql(&self, w: &mut SqlWriter) {
        if self.0.is_empty() {
            return;
        }
        w.push_str("WITH ");
        if self.0.iter().any(|c| c.recursive) {
            w.push_str("RECURSIVE ");
        }
        for (i, cte) in self.0.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            cte.append_definition(w);
        }
        w.push(' ');
    }
}
