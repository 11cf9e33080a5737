//! Execution of compiled statements against a [`Db`].
//!
//! Each public method captures its caller's location synchronously and
//! returns the future, so log lines and scan errors point at user code.

use super::{Projection, QueryMeta};
use crate::client::{Db, ExecOutcome, QueryCtx};
use crate::error::{SqError, SqResult};
use crate::monitor::{self, ExecFlags, LOGGED_ROWS, LogFlags};
use crate::row::{Row, RowShape};
use crate::table::Table;
use std::ops::ControlFlow;
use std::panic::Location;
use std::time::Instant;

fn resolve_db<'a>(db: Option<&'a dyn Db>, meta: &'a QueryMeta) -> SqResult<&'a dyn Db> {
    match db {
        Some(db) => Ok(db),
        None => meta.db.as_deref().ok_or(SqError::MissingDb),
    }
}

pub(crate) async fn exec_query(
    query: &dyn Table,
    meta: &QueryMeta,
    db: Option<&dyn Db>,
    ctx: Option<&QueryCtx>,
    flags: ExecFlags,
    verb: &str,
    caller: &'static Location<'static>,
) -> SqResult<ExecOutcome> {
    let db = resolve_db(db, meta)?;
    let tag = ctx.and_then(|c| c.tag.as_deref());
    let (sql, args) = meta.compile(query, caller, tag);

    let start = Instant::now();
    let result = match ctx {
        Some(ctx) => db.exec_context(ctx, &sql, &args).await?,
        None => db.exec(&sql, &args).await?,
    };

    let mut outcome = ExecOutcome::default();
    if flags.contains(ExecFlags::ROWS_AFFECTED) {
        outcome.rows_affected = result.rows_affected()?;
    }
    if flags.contains(ExecFlags::LAST_INSERT_ID) {
        outcome.last_insert_id = result.last_insert_id()?;
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "sqb.exec",
        verb,
        rows_affected = outcome.rows_affected,
        elapsed_us = start.elapsed().as_micros() as u64,
        "statement executed"
    );
    if meta.log_flags.contains(LogFlags::STATS) && flags.contains(ExecFlags::ROWS_AFFECTED) {
        meta.log(
            caller,
            tag,
            &monitor::stats_message(verb, outcome.rows_affected, start.elapsed()),
        );
    }
    Ok(outcome)
}

/// Declare pass, then one value pass per row until the cursor is
/// exhausted or `accumulate` breaks. Returns the number of rows read.
pub(crate) async fn fetch_query<Q, T, M, A>(
    query: &Q,
    db: Option<&dyn Db>,
    ctx: Option<&QueryCtx>,
    mut mapper: M,
    mut accumulate: A,
    caller: &'static Location<'static>,
) -> SqResult<usize>
where
    Q: Projection,
    M: FnMut(&mut Row) -> T,
    A: FnMut(T) -> ControlFlow<()>,
{
    let meta = query.meta();
    let db = resolve_db(db, meta)?;
    let tag = ctx.and_then(|c| c.tag.as_deref());

    let shape = RowShape::declare(&mut mapper);
    let labels = shape.labels();
    if meta.log_flags.contains(LogFlags::PARSE) {
        meta.log(caller, tag, &monitor::parse_message(&labels));
    }

    let projected = if shape.is_empty() {
        query.clone()
    } else {
        query.project(shape.fields.clone())
    };
    let (sql, args) = meta.compile(&projected, caller, tag);

    let start = Instant::now();
    let deadline = ctx
        .and_then(|c| c.timeout)
        .map(|timeout| (tokio::time::Instant::now() + timeout, timeout));
    let mut rows = match ctx {
        Some(ctx) => db.query_context(ctx, &sql, &args).await?,
        None => db.query(&sql, &args).await?,
    };

    let mut count = 0usize;
    loop {
        let next = match deadline {
            Some((at, timeout)) => match tokio::time::timeout_at(at, rows.next()).await {
                Ok(next) => next,
                Err(_) => {
                    db.on_timeout();
                    return Err(SqError::Timeout(timeout));
                }
            },
            None => rows.next().await,
        };
        let values = match next {
            Ok(Some(values)) => values,
            Ok(None) | Err(SqError::ExitPeacefully) => break,
            Err(err) => return Err(err),
        };
        count += 1;
        if meta.log_flags.contains(LogFlags::RESULTS) && count <= LOGGED_ROWS {
            meta.log(caller, tag, &monitor::row_message(count, &labels, &values));
        }
        let slots = if shape.is_empty() {
            Vec::new()
        } else {
            shape.scan(values, caller)?
        };
        let item = shape.materialize(slots, &mut mapper, caller)?;
        if accumulate(item).is_break() {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "sqb.exec",
        rows = count,
        elapsed_us = start.elapsed().as_micros() as u64,
        "query fetched"
    );
    if meta.log_flags.contains(LogFlags::STATS) {
        meta.log(
            caller,
            tag,
            &monitor::stats_message("Fetched", count as i64, start.elapsed()),
        );
    }
    Ok(count)
}

/// Row-mapper execution methods.
macro_rules! impl_fetch {
    ($ty:ident) => {
        impl $ty {
            /// Run the query, feeding each mapped row to `accumulate` until
            /// it returns `ControlFlow::Break`. Returns the number of rows
            /// read.
            ///
            /// `db` overrides the handle set with `with_db`.
            #[track_caller]
            pub fn fetch_each<'a, T, M, A>(
                &'a self,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
                accumulate: A,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<usize>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
                A: FnMut(T) -> ::std::ops::ControlFlow<()> + 'a,
            {
                let caller = ::std::panic::Location::caller();
                $crate::query::exec::fetch_query(self, db, None, mapper, accumulate, caller)
            }

            /// [`Self::fetch_each`] with a timeout and log tag.
            #[track_caller]
            pub fn fetch_each_context<'a, T, M, A>(
                &'a self,
                ctx: &'a $crate::client::QueryCtx,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
                accumulate: A,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<usize>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
                A: FnMut(T) -> ::std::ops::ControlFlow<()> + 'a,
            {
                let caller = ::std::panic::Location::caller();
                $crate::query::exec::fetch_query(self, db, Some(ctx), mapper, accumulate, caller)
            }

            /// First mapped row, if any. Stops reading after it.
            #[track_caller]
            pub fn fetch_one<'a, T, M>(
                &'a self,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<Option<T>>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
            {
                self.fetch_one_inner(None, db, mapper, ::std::panic::Location::caller())
            }

            #[track_caller]
            pub fn fetch_one_context<'a, T, M>(
                &'a self,
                ctx: &'a $crate::client::QueryCtx,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<Option<T>>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
            {
                self.fetch_one_inner(Some(ctx), db, mapper, ::std::panic::Location::caller())
            }

            /// Every mapped row, in cursor order.
            #[track_caller]
            pub fn fetch_all<'a, T, M>(
                &'a self,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<Vec<T>>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
            {
                self.fetch_all_inner(None, db, mapper, ::std::panic::Location::caller())
            }

            #[track_caller]
            pub fn fetch_all_context<'a, T, M>(
                &'a self,
                ctx: &'a $crate::client::QueryCtx,
                db: Option<&'a dyn $crate::client::Db>,
                mapper: M,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<Vec<T>>> + 'a
            where
                T: 'a,
                M: FnMut(&mut $crate::row::Row) -> T + 'a,
            {
                self.fetch_all_inner(Some(ctx), db, mapper, ::std::panic::Location::caller())
            }

            async fn fetch_one_inner<T, M>(
                &self,
                ctx: Option<&$crate::client::QueryCtx>,
                db: Option<&dyn $crate::client::Db>,
                mapper: M,
                caller: &'static ::std::panic::Location<'static>,
            ) -> $crate::error::SqResult<Option<T>>
            where
                M: FnMut(&mut $crate::row::Row) -> T,
            {
                let mut first = None;
                $crate::query::exec::fetch_query(
                    self,
                    db,
                    ctx,
                    mapper,
                    |item| {
                        first = Some(item);
                        ::std::ops::ControlFlow::Break(())
                    },
                    caller,
                )
                .await?;
                Ok(first)
            }

            async fn fetch_all_inner<T, M>(
                &self,
                ctx: Option<&$crate::client::QueryCtx>,
                db: Option<&dyn $crate::client::Db>,
                mapper: M,
                caller: &'static ::std::panic::Location<'static>,
            ) -> $crate::error::SqResult<Vec<T>>
            where
                M: FnMut(&mut $crate::row::Row) -> T,
            {
                let mut items = Vec::new();
                $crate::query::exec::fetch_query(
                    self,
                    db,
                    ctx,
                    mapper,
                    |item| {
                        items.push(item);
                        ::std::ops::ControlFlow::Continue(())
                    },
                    caller,
                )
                .await?;
                Ok(items)
            }
        }
    };
}

/// Write-statement execution methods. `$verb` names the operation in the
/// stats log line.
macro_rules! impl_exec {
    ($ty:ident, $verb:literal) => {
        impl $ty {
            /// Execute the statement, collecting the counts named in `flags`.
            ///
            /// `db` overrides the handle set with `with_db`.
            #[track_caller]
            pub fn exec<'a>(
                &'a self,
                db: Option<&'a dyn $crate::client::Db>,
                flags: $crate::monitor::ExecFlags,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<$crate::client::ExecOutcome>> + 'a
            {
                let caller = ::std::panic::Location::caller();
                $crate::query::exec::exec_query(self, &self.meta, db, None, flags, $verb, caller)
            }

            /// [`Self::exec`] with a timeout and log tag.
            #[track_caller]
            pub fn exec_context<'a>(
                &'a self,
                ctx: &'a $crate::client::QueryCtx,
                db: Option<&'a dyn $crate::client::Db>,
                flags: $crate::monitor::ExecFlags,
            ) -> impl ::std::future::Future<Output = $crate::error::SqResult<$crate::client::ExecOutcome>> + 'a
            {
                let caller = ::std::panic::Location::caller();
                $crate::query::exec::exec_query(self, &self.meta, db, Some(ctx), flags, $verb, caller)
            }
        }
    };
}

pub(crate) use impl_exec;
pub(crate) use impl_fetch;
