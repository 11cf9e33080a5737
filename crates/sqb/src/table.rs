//! Table sources: physical tables, joins, and the rendering shared by FROM,
//! JOIN and USING.

use crate::cte::Cte;
use crate::dialect::SqlWriter;
use crate::predicate::{Predicate, VariadicPredicate};
use crate::query::Query;
use std::fmt;
use std::sync::Arc;

/// Anything that can appear in FROM, JOIN or USING.
pub trait Table: Send + Sync + fmt::Debug {
    /// Render the table reference (without the trailing alias).
    fn append_sql(&self, w: &mut SqlWriter);

    fn alias(&self) -> &str;

    fn name(&self) -> &str;

    /// Set when the table is a subquery; it is then parenthesized.
    fn as_query(&self) -> Option<&dyn Query> {
        None
    }

    /// Set when the table is a CTE; it is then registered in WITH.
    fn as_cte(&self) -> Option<&Cte> {
        None
    }
}

impl<T: Table + ?Sized> Table for Arc<T> {
    fn append_sql(&self, w: &mut SqlWriter) {
        (**self).append_sql(w)
    }

    fn alias(&self) -> &str {
        (**self).alias()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn as_query(&self) -> Option<&dyn Query> {
        (**self).as_query()
    }

    fn as_cte(&self) -> Option<&Cte> {
        (**self).as_cte()
    }
}

/// A physical table, optionally schema-qualified and aliased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseTable {
    pub schema: String,
    pub name: String,
    pub alias: String,
}

impl BaseTable {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            alias: String::new(),
        }
    }

    pub fn as_(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    /// The name columns of this table are qualified with.
    pub fn qualifier(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

impl Table for BaseTable {
    fn append_sql(&self, w: &mut SqlWriter) {
        if !self.schema.is_empty() {
            w.push_ident(&self.schema);
            w.push('.');
        }
        w.push_ident(&self.name);
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Render a table reference with its ` AS alias` suffix.
///
/// Subqueries are parenthesized. The alias is omitted when it equals the
/// table name.
pub(crate) fn append_table_ref(w: &mut SqlWriter, table: &dyn Table) {
    match table.as_query() {
        Some(query) => {
            w.push('(');
            query.append_sql(w);
            w.push(')');
        }
        None => table.append_sql(w),
    }
    let alias = table.alias();
    if !alias.is_empty() && alias != table.name() {
        w.push_str(" AS ");
        w.push_ident(alias);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Verbatim join keyword, e.g. `NATURAL JOIN`.
    Custom(String),
}

impl JoinType {
    pub fn as_str(&self) -> &str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
            JoinType::Custom(s) => s,
        }
    }
}

/// One `JOIN table ON predicates` clause.
#[derive(Debug, Clone)]
pub struct JoinTable {
    pub join_type: JoinType,
    pub table: Arc<dyn Table>,
    pub on: VariadicPredicate,
}

impl JoinTable {
    pub fn new(join_type: JoinType, table: impl Table + 'static, on: Vec<Arc<dyn Predicate>>) -> Self {
        Self {
            join_type,
            table: Arc::new(table),
            on: crate::predicate::and(on),
        }
    }

    pub fn append_sql(&self, w: &mut SqlWriter) {
        w.push_str(self.join_type.as_str());
        w.push(' ');
        append_table_ref(w, &*self.table);
        if !self.on.is_empty() {
            w.push_str(" ON ");
            crate::field::Field::append_sql(&self.on, w, &[]);
        }
    }
}

/// Ordered join clauses, rendered space-separated.
#[derive(Debug, Clone, Default)]
pub struct JoinTables(pub Vec<JoinTable>);

impl JoinTables {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, join: JoinTable) {
        self.0.push(join);
    }

    pub fn tables(&self) -> impl Iterator<Item = &(dyn Table + 'static)> {
        self.0.iter().map(|j| &*j.table)
    }

    pub fn append_sql(&self, w: &mut SqlWriter) {
        for (i, join) in self.0.iter().enumerate() {
            if i > 0 {
                w.push(' ');
            }
            join.append_sql(w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::field::NumberField;

    #[test]
    fn schema_and_alias() {
        let t = BaseTable::new("public", "users").as_("u");
        let mut w = SqlWriter::new(Dialect::Postgres);
        append_table_ref(&mut w, &t);
        assert_eq!(w.sql(), "public.users AS u");
        assert_eq!(t.qualifier(), "u");
    }

    #[test]
    fn alias_equal_to_name_is_omitted() {
        let t = BaseTable::new("", "users").as_("users");
        let mut w = SqlWriter::new(Dialect::Postgres);
        append_table_ref(&mut w, &t);
        assert_eq!(w.sql(), "users");
    }

    #[test]
    fn join_with_compound_condition() {
        let u = BaseTable::new("", "users").as_("u");
        let o = BaseTable::new("", "orders").as_("o");
        let join = JoinTable::new(
            JoinType::Left,
            o.clone(),
            vec![
                Arc::new(NumberField::new("user_id", &o).eq(&NumberField::new("id", &u)))
                    as Arc<dyn Predicate>,
                Arc::new(NumberField::new("total", &o).gt_int(0)),
            ],
        );
        let mut w = SqlWriter::new(Dialect::MySql);
        join.append_sql(&mut w);
        assert_eq!(w.sql(), "LEFT JOIN orders AS o ON (o.user_id = u.id AND o.total > ?)");
    }

    #[test]
    fn join_single_condition_unwrapped() {
        let u = BaseTable::new("", "users");
        let o = BaseTable::new("", "orders");
        let join = JoinTable::new(
            JoinType::Inner,
            o.clone(),
            vec![Arc::new(NumberField::new("user_id", &o).eq(&NumberField::new("id", &u))) as Arc<dyn Predicate>],
        );
        let mut w = SqlWriter::new(Dialect::MySql);
        join.append_sql(&mut w);
        assert_eq!(w.sql(), "JOIN orders ON orders.user_id = users.id");
    }
}
