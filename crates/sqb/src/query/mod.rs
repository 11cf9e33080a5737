//! Statement builders.
//!
//! Every builder consumes `self` and returns the updated query, so chains
//! read top to bottom:
//!
//! ```rust,ignore
//! let (sql, args) = sqb::postgres::from(u.table())
//!     .select(fields![u.user_id, u.email])
//!     .where_(u.user_id.lt_int(5))
//!     .order_by(fields![u.user_id.clone().desc()])
//!     .limit(10)
//!     .to_sql();
//! ```
//!
//! Compiling never fails. Missing pieces render as `NULL` and are left
//! for the database to reject.

mod delete;
mod exec;
mod insert;
mod select;
mod update;


pub use delete::DeleteQuery;
pub use insert::{Column, InsertConflict, InsertQuery};
pub use select::SelectQuery;
pub use update::UpdateQuery;

use crate::client::Db;
use crate::cte::{Cte, Ctes};
use crate::dialect::{Dialect, SqlWriter};
use crate::field::{Field, Fields, FieldLiteral};
use crate::monitor::{self, LogFlags, Logger};
use crate::table::{BaseTable, Table};
use crate::value::Value;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// A compilable statement.
pub trait Query: Table {
    fn dialect(&self) -> Dialect;

    /// A copy flagged as nested: compiling it is never logged.
    fn nest_this(&self) -> Arc<dyn Query>;

    /// Render the statement and its positional arguments.
    ///
    /// Logged once when a logger is attached and the query is not nested.
    #[track_caller]
    fn to_sql(&self) -> (String, Vec<Value>);
}

/// State shared by every statement type.
#[derive(Clone, Default)]
pub(crate) struct QueryMeta {
    pub(crate) dialect: Dialect,
    pub(crate) nested: bool,
    pub(crate) alias: String,
    pub(crate) ctes: Ctes,
    pub(crate) db: Option<Arc<dyn Db>>,
    pub(crate) logger: Option<Arc<dyn Logger>>,
    pub(crate) log_flags: LogFlags,
}

impl fmt::Debug for QueryMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryMeta")
            .field("dialect", &self.dialect)
            .field("nested", &self.nested)
            .field("alias", &self.alias)
            .field("ctes", &self.ctes)
            .field("db", &self.db.is_some())
            .field("logger", &self.logger.is_some())
            .field("log_flags", &self.log_flags)
            .finish()
    }
}

impl QueryMeta {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            alias: random_alias(),
            ..Self::default()
        }
    }

    pub(crate) fn compile(
        &self,
        query: &dyn Table,
        caller: &'static Location<'static>,
        tag: Option<&str>,
    ) -> (String, Vec<Value>) {
        let mut w = SqlWriter::new(self.dialect);
        query.append_sql(&mut w);
        let (sql, args) = w.into_parts();
        if !self.nested {
            self.log(
                caller,
                tag,
                &monitor::query_message(self.log_flags, &sql, &args, self.dialect),
            );
        }
        (sql, args)
    }

    pub(crate) fn log(&self, caller: &'static Location<'static>, tag: Option<&str>, message: &str) {
        let Some(logger) = &self.logger else {
            return;
        };
        let result = match tag {
            Some(tag) => logger.output(caller, &format!("[{tag}] {message}")),
            None => logger.output(caller, message),
        };
        if let Err(_err) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!(target: "sqb", error = %_err, "query logger failed");
        }
    }
}

/// Eight random lowercase letters, used as the default query alias.
pub(crate) fn random_alias() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(8)
        .map(|b| char::from(b'a' + b % 26))
        .collect()
}

/// Queries whose output columns can be replaced by a row mapper's fields.
pub(crate) trait Projection: Query + Clone {
    fn meta(&self) -> &QueryMeta;

    fn project(&self, fields: Fields) -> Self;
}

/// `LIMIT` and `OFFSET` take the absolute value of their argument.
pub(crate) fn non_negative(n: i64) -> i64 {
    n.checked_abs().unwrap_or(i64::MAX)
}

pub(crate) fn append_limit(w: &mut SqlWriter, limit: Option<i64>) {
    if let Some(limit) = limit {
        w.push_str(" LIMIT ");
        w.push_arg(limit);
    }
}

pub(crate) fn append_order_by(w: &mut SqlWriter, order_by: &Fields) {
    if !order_by.is_empty() {
        w.push_str(" ORDER BY ");
        order_by.append_sql(w, &[]);
    }
}

pub(crate) fn append_where(w: &mut SqlWriter, keyword: &str, predicate: &crate::predicate::VariadicPredicate) {
    if !predicate.is_empty() {
        w.push(' ');
        w.push_str(keyword);
        w.push(' ');
        predicate.append_sql(w, &[]);
    }
}

pub(crate) fn append_returning(w: &mut SqlWriter, returning: &Fields) {
    if !returning.is_empty() {
        w.push_str(" RETURNING ");
        returning.append_sql_with_alias(w, &[]);
    }
}

/// Table, Query and shared builder impls for a statement type with a
/// `meta: QueryMeta` field and a `render(&self, &mut SqlWriter)` method.
/// `$projection` is the field list a row mapper replaces.
macro_rules! impl_query {
    ($ty:ident, $projection:ident) => {
        impl $crate::table::Table for $ty {
            fn append_sql(&self, w: &mut $crate::dialect::SqlWriter) {
                self.render(w)
            }

            fn alias(&self) -> &str {
                &self.meta.alias
            }

            fn name(&self) -> &str {
                ""
            }

            fn as_query(&self) -> Option<&dyn $crate::query::Query> {
                Some(self)
            }
        }

        impl $crate::query::Query for $ty {
            fn dialect(&self) -> $crate::dialect::Dialect {
                self.meta.dialect
            }

            fn nest_this(&self) -> ::std::sync::Arc<dyn $crate::query::Query> {
                let mut nested = self.clone();
                nested.meta.nested = true;
                ::std::sync::Arc::new(nested)
            }

            #[track_caller]
            fn to_sql(&self) -> (String, Vec<$crate::value::Value>) {
                self.meta.compile(self, ::std::panic::Location::caller(), None)
            }
        }

        impl $crate::query::Projection for $ty {
            fn meta(&self) -> &$crate::query::QueryMeta {
                &self.meta
            }

            fn project(&self, fields: $crate::field::Fields) -> Self {
                let mut projected = self.clone();
                projected.$projection = fields;
                projected
            }
        }

        impl $ty {
            /// Alias used when this query is a subquery in FROM/JOIN/USING.
            pub fn as_(mut self, alias: &str) -> Self {
                self.meta.alias = alias.to_string();
                self
            }

            /// Default database handle for the execution methods.
            pub fn with_db(mut self, db: ::std::sync::Arc<dyn $crate::client::Db>) -> Self {
                self.meta.db = Some(db);
                self
            }

            pub fn with_log(
                mut self,
                logger: ::std::sync::Arc<dyn $crate::monitor::Logger>,
                flags: $crate::monitor::LogFlags,
            ) -> Self {
                self.meta.logger = Some(logger);
                self.meta.log_flags = flags;
                self
            }

            /// Register CTEs for the WITH clause, in addition to those
            /// referenced as tables.
            pub fn with(mut self, ctes: impl IntoIterator<Item = $crate::cte::Cte>) -> Self {
                for cte in ctes {
                    self.meta.ctes.push(cte);
                }
                self
            }
        }
    };
}

pub(crate) use impl_query;

/// Configuration carried into the statement builders: dialect, database
/// handle, logger and CTEs.
#[derive(Debug, Clone)]
pub struct BaseQuery {
    meta: QueryMeta,
}

impl BaseQuery {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            meta: QueryMeta::new(dialect),
        }
    }

    pub fn with_db(mut self, db: Arc<dyn Db>) -> Self {
        self.meta.db = Some(db);
        self
    }

    pub fn with_log(mut self, logger: Arc<dyn Logger>, flags: LogFlags) -> Self {
        self.meta.logger = Some(logger);
        self.meta.log_flags = flags;
        self
    }

    pub fn with(mut self, ctes: impl IntoIterator<Item = Cte>) -> Self {
        for cte in ctes {
            self.meta.ctes.push(cte);
        }
        self
    }

    /// `SELECT ... FROM table`
    pub fn from(self, table: impl Table + 'static) -> SelectQuery {
        SelectQuery::new(self.meta).from(table)
    }

    pub fn select(self, fields: Fields) -> SelectQuery {
        SelectQuery::new(self.meta).select(fields)
    }

    /// `SELECT 1`
    pub fn select_one(self) -> SelectQuery {
        self.select_literal("1")
    }

    /// `SELECT *`
    pub fn select_all(self) -> SelectQuery {
        self.select_literal("*")
    }

    /// `SELECT COUNT(*)`
    pub fn select_count(self) -> SelectQuery {
        self.select_literal("COUNT(*)")
    }

    /// `SELECT DISTINCT fields`
    pub fn select_distinct(self, fields: Fields) -> SelectQuery {
        SelectQuery::new(self.meta).distinct().select(fields)
    }

    fn select_literal(self, sql: &str) -> SelectQuery {
        let literal: Arc<dyn Field> = Arc::new(FieldLiteral::new(sql));
        SelectQuery::new(self.meta).select(Fields(vec![literal]))
    }

    pub fn insert_into(self, table: BaseTable) -> InsertQuery {
        InsertQuery::new(self.meta, table, false)
    }

    /// MySQL `INSERT IGNORE INTO`
    pub fn insert_ignore_into(self, table: BaseTable) -> InsertQuery {
        InsertQuery::new(self.meta, table, true)
    }

    pub fn update(self, table: BaseTable) -> UpdateQuery {
        UpdateQuery::new(self.meta, table)
    }

    pub fn delete_from(self, table: BaseTable) -> DeleteQuery {
        DeleteQuery::new(self.meta, table)
    }
}

/// Free-function entry points for one dialect (`sqb::mysql::from(...)`).
macro_rules! entry_points {
    ($dialect:expr) => {
        use $crate::client::Db;
        use $crate::cte::Cte;
        use $crate::field::Fields;
        use $crate::monitor::{LogFlags, Logger};
        use $crate::query::{BaseQuery, DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};
        use $crate::table::{BaseTable, Table};
        use ::std::sync::Arc;

        /// Empty builder for this dialect.
        pub fn base() -> BaseQuery {
            BaseQuery::new($dialect)
        }

        pub fn with_db(db: Arc<dyn Db>) -> BaseQuery {
            base().with_db(db)
        }

        pub fn with_log(logger: Arc<dyn Logger>, flags: LogFlags) -> BaseQuery {
            base().with_log(logger, flags)
        }

        pub fn with(ctes: impl IntoIterator<Item = Cte>) -> BaseQuery {
            base().with(ctes)
        }

        pub fn from(table: impl Table + 'static) -> SelectQuery {
            base().from(table)
        }

        pub fn select(fields: Fields) -> SelectQuery {
            base().select(fields)
        }

        pub fn select_one() -> SelectQuery {
            base().select_one()
        }

        pub fn select_all() -> SelectQuery {
            base().select_all()
        }

        pub fn select_count() -> SelectQuery {
            base().select_count()
        }

        pub fn select_distinct(fields: Fields) -> SelectQuery {
            base().select_distinct(fields)
        }

        pub fn insert_into(table: BaseTable) -> InsertQuery {
            base().insert_into(table)
        }

        pub fn update(table: BaseTable) -> UpdateQuery {
            base().update(table)
        }

        pub fn delete_from(table: BaseTable) -> DeleteQuery {
            base().delete_from(table)
        }
    };
}

pub(crate) use entry_points;
