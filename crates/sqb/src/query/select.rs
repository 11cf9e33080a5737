use super::{QueryMeta, append_limit, append_order_by, append_where, impl_query, non_negative};
use crate::cte::Cte;
use crate::dialect::SqlWriter;
use crate::field::Fields;
use crate::predicate::{Predicate, VariadicPredicate};
use crate::table::{JoinTable, JoinTables, JoinType, Table, append_table_ref};
use std::sync::Arc;

/// `SELECT` statement.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub(crate) meta: QueryMeta,
    distinct: bool,
    distinct_on: Fields,
    select_fields: Fields,
    from_table: Option<Arc<dyn Table>>,
    joins: JoinTables,
    where_predicate: VariadicPredicate,
    group_by: Fields,
    having: VariadicPredicate,
    order_by: Fields,
    limit: Option<i64>,
    offset: Option<i64>,
    unions: Vec<(&'static str, SelectQuery)>,
}

impl_query!(SelectQuery, select_fields);
super::exec::impl_fetch!(SelectQuery);

impl SelectQuery {
    pub(crate) fn new(meta: QueryMeta) -> Self {
        Self {
            meta,
            distinct: false,
            distinct_on: Fields::new(),
            select_fields: Fields::new(),
            from_table: None,
            joins: JoinTables::default(),
            where_predicate: VariadicPredicate::toplevel_and(),
            group_by: Fields::new(),
            having: VariadicPredicate::toplevel_and(),
            order_by: Fields::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
        }
    }

    /// Append to the select list.
    pub fn select(mut self, fields: Fields) -> Self {
        self.select_fields.extend(fields);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// PostgreSQL `SELECT DISTINCT ON (fields)`
    pub fn distinct_on(mut self, fields: Fields) -> Self {
        self.distinct_on.extend(fields);
        self
    }

    pub fn from(mut self, table: impl Table + 'static) -> Self {
        self.from_table = Some(Arc::new(table));
        self
    }

    fn push_join(mut self, join_type: JoinType, table: impl Table + 'static, on: Vec<Arc<dyn Predicate>>) -> Self {
        self.joins.push(JoinTable::new(join_type, table, on));
        self
    }

    pub fn join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Inner, table, vec![Arc::new(on)])
    }

    pub fn left_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Left, table, vec![Arc::new(on)])
    }

    pub fn right_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Right, table, vec![Arc::new(on)])
    }

    pub fn full_join(self, table: impl Table + 'static, on: impl Predicate + 'static) -> Self {
        self.push_join(JoinType::Full, table, vec![Arc::new(on)])
    }

    pub fn cross_join(self, table: impl Table + 'static) -> Self {
        self.push_join(JoinType::Cross, table, Vec::new())
    }

    /// Join with a verbatim keyword such as `NATURAL JOIN`.
    pub fn custom_join(self, keyword: &str, table: impl Table + 'static, on: Vec<Arc<dyn Predicate>>) -> Self {
        self.push_join(JoinType::Custom(keyword.to_string()), table, on)
    }

    /// Add a WHERE predicate. Repeated calls are joined with AND.
    pub fn where_(mut self, predicate: impl Predicate + 'static) -> Self {
        self.where_predicate.push(predicate);
        self
    }

    pub fn group_by(mut self, fields: Fields) -> Self {
        self.group_by.extend(fields);
        self
    }

    /// Add a HAVING predicate. Repeated calls are joined with AND.
    pub fn having(mut self, predicate: impl Predicate + 'static) -> Self {
        self.having.push(predicate);
        self
    }

    pub fn order_by(mut self, fields: Fields) -> Self {
        self.order_by.extend(fields);
        self
    }

    /// Negative values are treated as their absolute value.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(non_negative(limit));
        self
    }

    /// Negative values are treated as their absolute value.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(non_negative(offset));
        self
    }

    /// `UNION` with another SELECT.
    ///
    /// ORDER BY, LIMIT and OFFSET set on this query apply to the combined
    /// result. A member with its own ordering, limit or unions is
    /// parenthesized. CTEs referenced by members are hoisted into this
    /// query's WITH clause. A row mapper replaces only this query's select
    /// list, so members must produce matching columns.
    pub fn union(mut self, other: SelectQuery) -> Self {
        self.unions.push(("UNION", other));
        self
    }

    /// `UNION ALL` with another SELECT. See [`Self::union`].
    pub fn union_all(mut self, other: SelectQuery) -> Self {
        self.unions.push(("UNION ALL", other));
        self
    }

    /// Stored LIMIT, after normalization.
    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    /// Stored OFFSET, after normalization.
    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    /// Wrap this query as a CTE named `name`.
    pub fn cte(&self, name: &str) -> Cte {
        Cte::new(name, self.clone())
    }

    fn referenced_tables<'a>(&'a self, out: &mut Vec<&'a (dyn Table + 'static)>) {
        out.extend(self.from_table.as_deref());
        out.extend(self.joins.tables());
        for (_, member) in &self.unions {
            member.referenced_tables(out);
        }
    }

    fn render(&self, w: &mut SqlWriter) {
        let mut tables = Vec::new();
        self.referenced_tables(&mut tables);
        let mut ctes = self.meta.ctes.collect(tables);
        for (_, member) in &self.unions {
            for cte in &member.meta.ctes.0 {
                ctes.push(cte.clone());
            }
        }
        ctes.append_sql(w);

        self.render_compound(w);
        self.render_tail(w);
    }

    fn has_tail(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some()
    }

    /// The SELECT itself followed by its union members, without WITH or
    /// the trailing ORDER BY/LIMIT/OFFSET.
    fn render_compound(&self, w: &mut SqlWriter) {
        self.render_select(w);
        for (keyword, member) in &self.unions {
            w.push(' ');
            w.push_str(keyword);
            w.push(' ');
            if member.has_tail() || !member.unions.is_empty() {
                w.push('(');
                member.render_compound(w);
                member.render_tail(w);
                w.push(')');
            } else {
                member.render_compound(w);
            }
        }
    }

    fn render_tail(&self, w: &mut SqlWriter) {
        append_order_by(w, &self.order_by);
        append_limit(w, self.limit);
        if let Some(offset) = self.offset {
            w.push_str(" OFFSET ");
            w.push_arg(offset);
        }
    }

    fn render_select(&self, w: &mut SqlWriter) {
        w.push_str("SELECT ");
        if !self.distinct_on.is_empty() {
            w.push_str("DISTINCT ON (");
            self.distinct_on.append_sql(w, &[]);
            w.push_str(") ");
        } else if self.distinct {
            w.push_str("DISTINCT ");
        }
        if self.select_fields.is_empty() {
            w.push_str("NULL");
        } else {
            self.select_fields.append_sql_with_alias(w, &[]);
        }

        if let Some(table) = &self.from_table {
            w.push_str(" FROM ");
            append_table_ref(w, &**table);
        }
        if !self.joins.is_empty() {
            w.push(' ');
            self.joins.append_sql(w);
        }
        append_where(w, "WHERE", &self.where_predicate);
        if !self.group_by.is_empty() {
            w.push_str(" GROUP BY ");
            self.group_by.append_sql(w, &[]);
        }
        append_where(w, "HAVING", &self.having);
    }
}
