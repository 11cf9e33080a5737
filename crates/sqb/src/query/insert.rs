use super::{QueryMeta, SelectQuery, append_returning, append_where, impl_query};
use crate::dialect::{Dialect, SqlWriter};
use crate::field::{Arg, Field, FieldAssignment, FieldAssignments, Fields};
use crate::predicate::{Predicate, VariadicPredicate};
use crate::table::{BaseTable, Table};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum ConflictAction {
    Nothing,
    Update(FieldAssignments),
}

#[derive(Debug, Clone)]
struct Conflict {
    fields: Fields,
    constraint: String,
    predicate: VariadicPredicate,
    action: ConflictAction,
}

/// `INSERT` statement.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    pub(crate) meta: QueryMeta,
    ignore: bool,
    into_table: BaseTable,
    insert_columns: Fields,
    rows: Vec<Vec<Arg>>,
    select_query: Option<Box<SelectQuery>>,
    conflict: Option<Conflict>,
    /// `DO UPDATE SET ... WHERE`
    resolution_predicate: VariadicPredicate,
    duplicate_key_update: FieldAssignments,
    returning: Fields,
}

impl_query!(InsertQuery, returning);
super::exec::impl_fetch!(InsertQuery);
super::exec::impl_exec!(InsertQuery, "Inserted");

/// Collects column/value pairs for one row in [`InsertQuery::values_from`].
#[derive(Debug, Default)]
pub struct Column {
    declare: bool,
    fields: Fields,
    values: Vec<Arg>,
}

impl Column {
    /// Bind `value` to `field` in the current row.
    pub fn set<F: Field + Clone + 'static>(&mut self, field: &F, value: impl Into<Value>) {
        self.set_arg(field, Arg::Value(value.into()));
    }

    /// Assign an expression to `field` in the current row.
    pub fn set_to<F: Field + Clone + 'static>(&mut self, field: &F, expr: impl Field + 'static) {
        self.set_arg(field, Arg::field(expr));
    }

    fn set_arg<F: Field + Clone + 'static>(&mut self, field: &F, value: Arg) {
        if self.declare {
            self.fields.push(Arc::new(field.clone()));
        }
        self.values.push(value);
    }
}

/// Pending `ON CONFLICT` clause; finish it with
/// [`InsertConflict::do_nothing`] or [`InsertConflict::do_update_set`].
#[derive(Debug, Clone)]
pub struct InsertConflict {
    query: InsertQuery,
    conflict: Conflict,
}

impl InsertConflict {
    /// Partial-index predicate: `ON CONFLICT (fields) WHERE ...`
    pub fn where_(mut self, predicate: impl Predicate + 'static) -> Self {
        self.conflict.predicate.push(predicate);
        self
    }

    pub fn do_nothing(mut self) -> InsertQuery {
        self.conflict.action = ConflictAction::Nothing;
        self.query.conflict = Some(self.conflict);
        self.query
    }

    pub fn do_update_set(mut self, assignments: Vec<FieldAssignment>) -> InsertQuery {
        self.conflict.action = ConflictAction::Update(assignments.into());
        self.query.conflict = Some(self.conflict);
        self.query
    }
}

impl InsertQuery {
    pub(crate) fn new(meta: QueryMeta, table: BaseTable, ignore: bool) -> Self {
        Self {
            meta,
            ignore,
            into_table: table,
            insert_columns: Fields::new(),
            rows: Vec::new(),
            select_query: None,
            conflict: None,
            resolution_predicate: VariadicPredicate::toplevel_and(),
            duplicate_key_update: FieldAssignments::default(),
            returning: Fields::new(),
        }
    }

    pub fn columns(mut self, fields: Fields) -> Self {
        self.insert_columns.extend(fields);
        self
    }

    /// Append one row of bound values.
    pub fn values(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row.into_iter().map(Arg::Value).collect());
        self
    }

    /// Append one row of arbitrary expressions.
    pub fn values_args(mut self, row: Vec<Arg>) -> Self {
        self.rows.push(row);
        self
    }

    /// Append one row per item. The columns are taken from the first item
    /// unless already set with [`InsertQuery::columns`].
    ///
    /// ```rust,ignore
    /// let q = postgres::insert_into(u.table())
    ///     .values_from(&users, |col, user| {
    ///         col.set(&u.displayname, &user.name);
    ///         col.set(&u.email, &user.email);
    ///     });
    /// ```
    pub fn values_from<I, T>(mut self, items: I, mut mapper: impl FnMut(&mut Column, T)) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            let mut col = Column {
                declare: self.insert_columns.is_empty(),
                ..Column::default()
            };
            mapper(&mut col, item);
            if col.declare {
                self.insert_columns = col.fields;
            }
            self.rows.push(col.values);
        }
        self
    }

    /// `INSERT INTO ... SELECT ...`
    pub fn select(mut self, query: SelectQuery) -> Self {
        self.select_query = Some(Box::new(query));
        self
    }

    /// PostgreSQL `ON CONFLICT (fields)`
    pub fn on_conflict(self, fields: Fields) -> InsertConflict {
        InsertConflict {
            query: self,
            conflict: Conflict {
                fields,
                constraint: String::new(),
                predicate: VariadicPredicate::toplevel_and(),
                action: ConflictAction::Nothing,
            },
        }
    }

    /// PostgreSQL `ON CONFLICT ON CONSTRAINT name`
    pub fn on_conflict_on_constraint(self, name: &str) -> InsertConflict {
        InsertConflict {
            query: self,
            conflict: Conflict {
                fields: Fields::new(),
                constraint: name.to_string(),
                predicate: VariadicPredicate::toplevel_and(),
                action: ConflictAction::Nothing,
            },
        }
    }

    /// Condition on `ON CONFLICT ... DO UPDATE SET ... WHERE`.
    pub fn where_(mut self, predicate: impl Predicate + 'static) -> Self {
        self.resolution_predicate.push(predicate);
        self
    }

    /// MySQL `ON DUPLICATE KEY UPDATE`
    pub fn on_duplicate_key_update(mut self, assignments: Vec<FieldAssignment>) -> Self {
        self.duplicate_key_update.0.extend(assignments);
        self
    }

    pub fn returning(mut self, fields: Fields) -> Self {
        self.returning.extend(fields);
        self
    }

    fn render(&self, w: &mut SqlWriter) {
        self.meta.ctes.append_sql(w);

        w.push_str("INSERT ");
        if self.ignore {
            w.push_str("IGNORE ");
        }
        w.push_str("INTO ");
        let excluded = [self.into_table.qualifier().to_string()];
        if self.into_table.name.is_empty() {
            w.push_str("NULL");
        } else {
            self.into_table.append_sql(w);
            let alias = &self.into_table.alias;
            if w.dialect() == Dialect::Postgres && !alias.is_empty() && *alias != self.into_table.name {
                w.push_str(" AS ");
                w.push_ident(alias);
            }
        }

        if !self.insert_columns.is_empty() {
            w.push_str(" (");
            self.insert_columns.append_sql(w, &excluded);
            w.push(')');
        }

        if !self.rows.is_empty() {
            w.push_str(" VALUES ");
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                w.push('(');
                for (j, arg) in row.iter().enumerate() {
                    if j > 0 {
                        w.push_str(", ");
                    }
                    arg.append_sql(w, &[]);
                }
                w.push(')');
            }
        } else if let Some(select) = &self.select_query {
            w.push(' ');
            Table::append_sql(&**select, w);
        }

        if let Some(conflict) = &self.conflict {
            w.push_str(" ON CONFLICT");
            if !conflict.fields.is_empty() {
                w.push_str(" (");
                conflict.fields.append_sql(w, &excluded);
                w.push(')');
            } else if !conflict.constraint.is_empty() {
                w.push_str(" ON CONSTRAINT ");
                w.push_ident(&conflict.constraint);
            }
            append_where(w, "WHERE", &conflict.predicate);
            match &conflict.action {
                ConflictAction::Nothing => w.push_str(" DO NOTHING"),
                ConflictAction::Update(set) => {
                    w.push_str(" DO UPDATE SET ");
                    set.append_sql(w, &excluded);
                    append_where(w, "WHERE", &self.resolution_predicate);
                }
            }
        }

        if !self.duplicate_key_update.is_empty() {
            w.push_str(" ON DUPLICATE KEY UPDATE ");
            self.duplicate_key_update.append_sql(w, &excluded);
        }

        append_returning(w, &self.returning);
    }
}
