use super::{
    QueryMeta, append_limit, append_order_by, append_returning, append_where, impl_query,
    non_negative,
};
use crate::dialect::{Dialect, SqlWriter};
use crate::field::{FieldAssignment, FieldAssignments, Fields};
use crate::predicate::{Predicate, VariadicPredicate};
use crate::table::{BaseTable, JoinTable, JoinTables, JoinType, Table, append_table_ref};
use std::sync::Arc;

/// `UPDATE` statement.
///
/// MySQL renders joins between the table and SET; PostgreSQL renders
/// `FROM` and joins after SET.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    pub(crate) meta: QueryMeta,
    update_table: BaseTable,
    assignments: FieldAssignments,
    from_table: Option<Arc<dyn Table>>,
    joins: JoinTables,
    where_predicate: VariadicPredicate,
    order_by: Fields,
    limit: Option<i64>,
    returning: Fields,
}

impl_query!(UpdateQuery, returning);
super::exec::impl_fetch!(UpdateQuery);
super::exec::impl_exec!(UpdateQuery, "Updated");

impl UpdateQuery {
    pub(crate) fn new(meta: QueryMeta, table: BaseTable) -> Self {
        Self {
            meta,
            update_table: table,
            assignments: FieldAssignments::default(),
            from_table: None,
            joins: JoinTables::default(),
            where_predicate: VariadicPredicate::toplevel_and(),
            order_by: Fields::new(),
            limit: None,
            returning: Fields::new(),
        }
    }

    pub fn set(mut self, assignments: Vec<FieldAssignment>) -> Self {
        self.assignments.0.extend(assignments);
        self
    }

    /// PostgreSQL `UPDATE ... SET ... FROM table`
    pub fn from(mut self, table: impl Table + 'static) -> Self {
        self.from_table = Some(Arc::new(table));
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

    /// MySQL `UPDATE ... ORDER BY`
    pub fn order_by(mut self, fields: Fields) -> Self {
        self.order_by.extend(fields);
        self
    }

    /// MySQL `UPDATE ... LIMIT`. Negative values are treated as their
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
            .collect(self.from_table.as_deref().into_iter().chain(self.joins.tables()))
            .append_sql(w);

        w.push_str("UPDATE ");
        if self.update_table.name.is_empty() {
            w.push_str("NULL");
        } else {
            append_table_ref(w, &self.update_table);
        }

        let postgres = w.dialect() == Dialect::Postgres;
        if !postgres && !self.joins.is_empty() {
            w.push(' ');
            self.joins.append_sql(w);
        }

        if !self.assignments.is_empty() {
            w.push_str(" SET ");
            let excluded = if postgres || self.joins.is_empty() {
                vec![self.update_table.qualifier().to_string()]
            } else {
                Vec::new()
            };
            self.assignments.append_sql(w, &excluded);
        }

        if postgres {
            if let Some(table) = &self.from_table {
                w.push_str(" FROM ");
                append_table_ref(w, &**table);
            }
            if !self.joins.is_empty() {
                w.push(' ');
                self.joins.append_sql(w);
            }
        }

        append_where(w, "WHERE", &self.where_predicate);
        append_order_by(w, &self.order_by);
        append_limit(w, self.limit);
        append_returning(w, &self.returning);
    }
}
