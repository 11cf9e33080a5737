//! Database handle abstraction used by the execution methods.
//!
//! [`Db`] is the only seam between compiled queries and a driver. The
//! crate ships an implementation for `tokio_postgres` (see `pg_client`);
//! anything else, including test fakes, implements the three traits here.

use crate::error::{SqError, SqResult};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

/// Per-call execution options.
#[derive(Debug, Clone, Default)]
pub struct QueryCtx {
    /// Abort the call with [`SqError::Timeout`] after this long.
    ///
    /// For fetches the deadline covers opening the cursor and reading
    /// every row, measured from the start of the call.
    pub timeout: Option<Duration>,
    /// Free-form label attached to log lines.
    pub tag: Option<String>,
}

impl QueryCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Outcome of a statement that returns no rows.
pub trait ExecResult: Send {
    fn rows_affected(&self) -> SqResult<i64>;

    /// Drivers without the concept return an error.
    fn last_insert_id(&self) -> SqResult<i64>;
}

/// Forward-only cursor over result rows.
#[async_trait]
pub trait Rows: Send {
    /// Next row as one value per selected column, or `None` when exhausted.
    ///
    /// Returning [`SqError::ExitPeacefully`] ends iteration without error.
    async fn next(&mut self) -> SqResult<Option<Vec<Value>>>;
}

/// A database connection, pool handle or transaction.
#[async_trait]
pub trait Db: Send + Sync {
    async fn exec(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn ExecResult>>;

    async fn query(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn Rows>>;

    /// Called when a context timeout fires, for best-effort server-side
    /// cancellation.
    fn on_timeout(&self) {}

    async fn exec_context(
        &self,
        ctx: &QueryCtx,
        sql: &str,
        args: &[Value],
    ) -> SqResult<Box<dyn ExecResult>> {
        with_timeout(self, ctx, self.exec(sql, args)).await
    }

    async fn query_context(
        &self,
        ctx: &QueryCtx,
        sql: &str,
        args: &[Value],
    ) -> SqResult<Box<dyn Rows>> {
        with_timeout(self, ctx, self.query(sql, args)).await
    }
}

pub(crate) async fn with_timeout<D, T, F>(db: &D, ctx: &QueryCtx, future: F) -> SqResult<T>
where
    D: Db + ?Sized,
    F: Future<Output = SqResult<T>> + Send,
{
    match ctx.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                db.on_timeout();
                Err(SqError::Timeout(timeout))
            }
        },
        None => future.await,
    }
}

/// Plain [`ExecResult`] for drivers that report counts eagerly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Affected {
    pub rows_affected: i64,
    pub last_insert_id: Option<i64>,
}

impl Affected {
    pub fn rows(rows_affected: i64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

impl ExecResult for Affected {
    fn rows_affected(&self) -> SqResult<i64> {
        Ok(self.rows_affected)
    }

    fn last_insert_id(&self) -> SqResult<i64> {
        self.last_insert_id
            .ok_or_else(|| SqError::Other("LastInsertId is not supported by this driver".into()))
    }
}

/// In-memory cursor over already-fetched rows.
#[derive(Debug, Clone, Default)]
pub struct VecRows {
    rows: VecDeque<Vec<Value>>,
}

impl VecRows {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows: rows.into() }
    }
}

#[async_trait]
impl Rows for VecRows {
    async fn next(&mut self) -> SqResult<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

/// Result counts reported by the execution methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Set when `ExecFlags::ROWS_AFFECTED` was requested.
    pub rows_affected: i64,
    /// Set when `ExecFlags::LAST_INSERT_ID` was requested.
    pub last_insert_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SlowDb {
        cancelled: AtomicBool,
    }

    #[async_trait]
    impl Db for SlowDb {
        async fn exec(&self, _sql: &str, _args: &[Value]) -> SqResult<Box<dyn ExecResult>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Box::new(Affected::rows(1)))
        }

        async fn query(&self, _sql: &str, _args: &[Value]) -> SqResult<Box<dyn Rows>> {
            Ok(Box::new(VecRows::default()))
        }

        fn on_timeout(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let db = SlowDb {
            cancelled: AtomicBool::new(false),
        };
        let ctx = QueryCtx::new().with_timeout(Duration::from_millis(10));
        let err = db.exec_context(&ctx, "SELECT 1", &[]).await.err().unwrap();
        assert!(err.is_timeout());
        assert!(db.cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn vec_rows_drains_in_order() {
        let mut rows = VecRows::new(vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        assert_eq!(rows.next().await.unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(rows.next().await.unwrap(), Some(vec![Value::Int(2)]));
        assert_eq!(rows.next().await.unwrap(), None);
    }

    #[test]
    fn affected_without_insert_id_errors() {
        assert_eq!(Affected::rows(3).rows_affected().unwrap(), 3);
        assert!(Affected::rows(3).last_insert_id().is_err());
        assert_eq!(Affected::rows(1).with_last_insert_id(9).last_insert_id().unwrap(), 9);
    }
}
