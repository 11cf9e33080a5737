use super::{
    QueryMeta, append_limit, append_order_by, append_returning, append_where, impl_query,
    non_negative,
};
use crate::dialect::{Dialect, SqlWriter};
use crate::field::Fields;
use crate::predicate::{Predicate, VariadicPredicate};
use crate::table::{BaseTable, JoinTable, JoinTables, JoinType, Table, append_table_ref};
use std::sync::Arc;

/// `DELETE` statement.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    pub(crate) meta: QueryMeta,
    from_tables: Vec<BaseTable>,
    using_table: Option<Arc<dyn Table>>,
    joins: JoinTables,
    where_predicate: VariadicPredicate,
    order_by: Fields,
    limit: Option<i64>,
    returning: Fields,
}

impl_query!(DeleteQuery, returning);
super::exec::impl_fetch!(DeleteQuery);
super::exec::impl_exec!(DeleteQuery, "Deleted");

impl DeleteQuery {
    pub(crate) fn new(meta: QueryMeta, table: BaseTable) -> Self {
        Self {
            meta,
            from_tables: vec![table],
            using_table: None,
            joins: JoinTables::default(),
            where_predicate: VariadicPredicate::toplevel_and(),
            order_by: Fields::new(),
            limit: None,
            returning: Fields::new(),
        }
    }

    /// Add another target table (MySQL multi-table delete).
    pub fn delete_from(mut self, table: BaseTable) -> Self {
        self.from_tables.push(table);
        self
    }

    /// `USING table`. A subquery is parenthesized and aliased.
    pub fn using(mut self, table: impl Table + 'static) -> Self {
        self.using_table = Some(Arc::new(table));
        self
    }

    fn push_join(mut self, join_type: JoinType, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.joins.push(JoinTable::new(join_type, table, vec![Arc::new(on)]));
        self
    }

    pub fn join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Inner, table, on)
    }

    pub fn left_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Left, table, on)
    }

    pub fn right_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Right, table, on)
    }

    pub fn full_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Full, table, on)
    }

    pub fn where_(mut self, predicate: impl Predicate + 'static) -> Self {
        self.where_predicate.push(predicate);
        self
    }

    /// MySQL `DELETE ... ORDER BY`
    pub fn order_by(mut self, fields: Fields) -> Self {
        self.order_by.extend(fields);
        self
    }

    /// MySQL `DELETE ... LIMIT`. Negative values are treated as their
    /// absolute value.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(non_negative(limit));
        self
    }

    pub fn returning(mut self, fields: Fields) -> Self {
        self.returning.extend(fields);
        self
    }

    fn render(&self, w: &mut SqlWriter) {
        self.meta
            .ctes
            .collect(self.using_table.as_deref().into_iter().chain(self.joins.tables()))
            .append_sql(w);

        w.push_str("DELETE FROM ");
        let targets: Vec<&BaseTable> = self.from_tables.iter().filter(|t| !t.name.is_empty()).collect();
        if targets.is_empty() {
            w.push_str("NULL");
        }
        let mysql_using = w.dialect() == Dialect::MySql && self.using_table.is_some();
        for (i, table) in targets.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            // MySQL multi-table targets refer to tables defined in USING.
            if mysql_using && !table.alias.is_empty() {
                w.push_ident(&table.alias);
            } else if mysql_using {
                table.append_sql(w);
            } else {
                append_table_ref(w, *table);
            }
        }

        if let Some(table) = &self.using_table {
            w.push_str(" USING ");
            append_table_ref(w, &**table);
        }
        if !self.joins.is_empty() {
            w.push(' ');
            self.joins.append_sql(w);
        }
        append_where(w, "WHERE", &self.where_predicate);
        append_order_by(w, &self.order_by);
        append_limit(w, self.limit);
        append_returning(w, &self.returning);
    }
}
