//! # sqb
//!
//! Typed SQL query construction for MySQL and PostgreSQL.
//!
//! ## Features
//!
//! - **Typed columns**: `NumberField`, `StringField`, `TimeField` and `BooleanField` only offer comparisons that make sense for their type
//! - **Composable predicates**: `and!` / `or!` / `not()` nest with correct parenthesization
//! - **Dialect aware**: `?` placeholders for MySQL, `$1, $2, ...` for PostgreSQL
//! - **CTEs**: referencing a `Cte` in FROM or JOIN emits it in the WITH clause
//! - **Two-pass row mapping**: one closure both declares the SELECT list and builds each result
//! - **Query logging**: SQL, interpolated arguments, row dumps and timings through a pluggable `Logger`
//!
//! ## Example
//!
//! ```ignore
//! use sqb::{fields, postgres, BaseTable, NumberField, StringField};
//!
//! let users = BaseTable::new("public", "users").as_("u");
//! let user_id = NumberField::new("user_id", &users);
//! let email = StringField::new("email", &users);
//!
//! let (sql, args) = postgres::select(fields![user_id, email])
//!     .from(users.clone())
//!     .where_(user_id.lt_int(5))
//!     .to_sql();
//! // SELECT u.user_id, u.email FROM public.users AS u WHERE u.user_id < $1
//!
//! let emails = postgres::from(users.clone())
//!     .where_(user_id.lt_int(5))
//!     .fetch_all(Some(&client), |row| (row.int64(&user_id), row.string(&email)))
//!     .await?;
//! ```

pub mod client;
pub mod cte;
pub mod dialect;
pub mod error;
pub mod field;
pub mod monitor;
pub mod mysql;
pub mod pg_client;
pub mod postgres;
pub mod predicate;
pub mod query;
pub mod row;
pub mod table;
pub mod value;

pub use client::{Affected, Db, ExecOutcome, ExecResult, QueryCtx, Rows, VecRows};
pub use cte::{Cte, Ctes};
pub use dialect::{Dialect, SqlWriter};
pub use error::{SqError, SqResult};
pub use field::{
    Arg, BooleanField, CustomField, Field, FieldAssignment, FieldLiteral, Fields, NumberField,
    StringField, TimeField, excluded, fieldf, values,
};
pub use monitor::{ExecFlags, LogFlags, Logger, StdLogger, interpolate};
#[cfg(feature = "tracing")]
pub use monitor::TracingLogger;
pub use predicate::{
    CustomPredicate, Predicate, VariadicPredicate, exists, not, not_exists, predicatef,
};
pub use query::{
    BaseQuery, Column, DeleteQuery, InsertConflict, InsertQuery, Query, SelectQuery, UpdateQuery,
};
pub use row::{Phase, Row};
pub use table::{BaseTable, JoinTable, JoinType, Table};
pub use value::{FromValue, Json, ScanKind, Value};
