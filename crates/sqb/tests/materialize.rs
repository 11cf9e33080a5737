//! Execution methods against an in-memory `Db`.

use async_trait::async_trait;
use sqb::{
    Affected, BaseTable, Db, ExecFlags, ExecResult, LogFlags, Logger, NumberField, QueryCtx, Rows,
    SqError, SqResult, StringField, Value, VecRows, fields, mysql, postgres,
};
use std::collections::VecDeque;
use std::io;
use std::ops::ControlFlow;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeDb {
    rows: Vec<Vec<Value>>,
    affected: Affected,
    /// Yield `ExitPeacefully` once the rows run out instead of `None`.
    exit_at_end: bool,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
}

impl FakeDb {
    fn with_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn last_sql(&self) -> String {
        self.statements
            .lock()
            .unwrap()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }
}

struct ExitingRows {
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl Rows for ExitingRows {
    async fn next(&mut self) -> SqResult<Option<Vec<Value>>> {
        match self.rows.pop_front() {
            Some(row) => Ok(Some(row)),
            None => Err(SqError::ExitPeacefully),
        }
    }
}

#[async_trait]
impl Db for FakeDb {
    async fn exec(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn ExecResult>> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
        Ok(Box::new(self.affected))
    }

    async fn query(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn Rows>> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
        if self.exit_at_end {
            return Ok(Box::new(ExitingRows {
                rows: self.rows.clone().into(),
            }));
        }
        Ok(Box::new(VecRows::new(self.rows.clone())))
    }
}

/// Hands out one row, then never produces another.
struct StallingRows {
    sent: bool,
}

#[async_trait]
impl Rows for StallingRows {
    async fn next(&mut self) -> SqResult<Option<Vec<Value>>> {
        if !self.sent {
            self.sent = true;
            return Ok(Some(vec![Value::Int(1)]));
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}

#[derive(Default)]
struct StallingDb {
    cancelled: AtomicBool,
}

#[async_trait]
impl Db for StallingDb {
    async fn exec(&self, _sql: &str, _args: &[Value]) -> SqResult<Box<dyn ExecResult>> {
        Ok(Box::new(Affected::rows(0)))
    }

    async fn query(&self, _sql: &str, _args: &[Value]) -> SqResult<Box<dyn Rows>> {
        Ok(Box::new(StallingRows { sent: false }))
    }

    fn on_timeout(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Logger for CaptureLogger {
    fn output(&self, _caller: &'static Location<'static>, message: &str) -> io::Result<()> {
        self.lines.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

struct Users {
    table: BaseTable,
    user_id: NumberField,
    name: StringField,
    email: StringField,
}

fn users() -> Users {
    let table = BaseTable::new("public", "users").as_("u");
    Users {
        user_id: NumberField::new("user_id", &table),
        name: StringField::new("name", &table),
        email: StringField::new("email", &table),
        table,
    }
}

#[derive(Debug, PartialEq)]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
}

fn two_users() -> Vec<Vec<Value>> {
    vec![
        vec![Value::Int(1), Value::Text("ann".into()), Value::Null],
        vec![
            Value::Int(2),
            Value::Text("bo".into()),
            Value::Text("bo@example.com".into()),
        ],
    ]
}

fn ids() -> Vec<Vec<Value>> {
    vec![vec![Value::Int(1)], vec![Value::Int(2)]]
}

fn names() -> Vec<Vec<Value>> {
    vec![vec![Value::Text("ann".into())], vec![Value::Text("bo".into())]]
}

fn ids_and_names() -> Vec<Vec<Value>> {
    vec![
        vec![Value::Int(1), Value::Text("ann".into())],
        vec![Value::Int(2), Value::Text("bo".into())],
    ]
}

#[tokio::test]
async fn fetch_all_selects_mapper_fields() -> SqResult<()> {
    let u = users();
    let db = FakeDb::with_rows(two_users());
    let conn: &dyn Db = &db;

    let q = postgres::from(u.table.clone()).where_(u.user_id.lt_int(5));
    let got = q
        .fetch_all(Some(conn), |row| User {
            id: row.int64(&u.user_id),
            name: row.string(&u.name),
            email: row.null_string(&u.email),
        })
        .await?;

    assert_eq!(
        got,
        vec![
            User {
                id: 1,
                name: "ann".into(),
                email: None
            },
            User {
                id: 2,
                name: "bo".into(),
                email: Some("bo@example.com".into())
            },
        ]
    );
    let statements = db.statements.lock().unwrap();
    assert_eq!(
        statements[0].0,
        "SELECT u.user_id, u.name, u.email FROM public.users AS u WHERE u.user_id < $1"
    );
    assert_eq!(statements[0].1, vec![Value::Int(5)]);
    Ok(())
}

#[tokio::test]
async fn fetch_one_returns_first_row() -> SqResult<()> {
    let u = users();
    let db = FakeDb::with_rows(names());
    let conn: &dyn Db = &db;

    let first = postgres::from(u.table.clone())
        .fetch_one(Some(conn), |row| row.string(&u.name))
        .await?;
    assert_eq!(first.as_deref(), Some("ann"));

    let empty = FakeDb::default();
    let none = postgres::from(u.table.clone())
        .fetch_one(Some(&empty as &dyn Db), |row| row.string(&u.name))
        .await?;
    assert_eq!(none, None);
    Ok(())
}

#[tokio::test]
async fn fetch_each_stops_on_break() -> SqResult<()> {
    let u = users();
    let db = FakeDb::with_rows(ids());
    let conn: &dyn Db = &db;

    let mut seen = Vec::new();
    let read = mysql::from(u.table.clone())
        .fetch_each(
            Some(conn),
            |row| row.int64(&u.user_id),
            |id| {
                seen.push(id);
                ControlFlow::Break(())
            },
        )
        .await?;
    assert_eq!(read, 1);
    assert_eq!(seen, vec![1]);
    assert_eq!(db.last_sql(), "SELECT u.user_id FROM public.users AS u");
    Ok(())
}

#[tokio::test]
async fn exit_peacefully_ends_iteration_without_error() -> SqResult<()> {
    let u = users();
    let db = FakeDb {
        exit_at_end: true,
        ..FakeDb::with_rows(ids())
    };
    let conn: &dyn Db = &db;

    let ids = postgres::from(u.table.clone())
        .fetch_all(Some(conn), |row| row.int64(&u.user_id))
        .await?;
    assert_eq!(ids, vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn missing_db_is_an_error() {
    let u = users();
    let err = postgres::from(u.table.clone())
        .fetch_all(None, |row| row.int64(&u.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, SqError::MissingDb));
    assert_eq!(err.to_string(), "DB cannot be nil");

    let err = postgres::delete_from(u.table.clone())
        .exec(None, ExecFlags::ROWS_AFFECTED)
        .await
        .unwrap_err();
    assert!(matches!(err, SqError::MissingDb));
}

#[tokio::test]
async fn stored_db_is_used_when_none_is_passed() -> SqResult<()> {
    let u = users();
    let db = Arc::new(FakeDb::with_rows(names()));

    let names = postgres::with_db(db.clone())
        .from(u.table.clone())
        .fetch_all(None, |row| row.string(&u.name))
        .await?;
    assert_eq!(names, vec!["ann".to_string(), "bo".to_string()]);
    assert_eq!(db.statements.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn scan_error_points_at_the_mapper() {
    let u = users();
    let db = FakeDb::with_rows(vec![vec![Value::Text("not a number".into())]]);
    let conn: &dyn Db = &db;

    let err = postgres::from(u.table.clone())
        .fetch_all(Some(conn), |row| row.int64(&u.user_id))
        .await
        .unwrap_err();
    assert!(err.is_scan());
    assert!(err.to_string().contains("materialize.rs"), "{err}");
}

#[tokio::test]
async fn mapper_without_fields_keeps_query_projection() -> SqResult<()> {
    let u = users();
    let db = FakeDb::with_rows(vec![vec![Value::Int(1)], vec![Value::Int(1)]]);
    let conn: &dyn Db = &db;

    let rows = mysql::select_one()
        .from(u.table.clone())
        .fetch_all(Some(conn), |_row| ())
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(db.last_sql(), "SELECT 1 FROM public.users AS u");
    Ok(())
}

#[tokio::test]
async fn insert_returning_goes_through_the_mapper() -> SqResult<()> {
    let u = users();
    let db = FakeDb::with_rows(vec![vec![Value::Int(7)]]);
    let conn: &dyn Db = &db;

    let id = postgres::insert_into(u.table.clone())
        .columns(fields![u.name])
        .values(vec!["cy".into()])
        .fetch_one(Some(conn), |row| row.int64(&u.user_id))
        .await?;
    assert_eq!(id, Some(7));
    assert_eq!(
        db.last_sql(),
        "INSERT INTO public.users AS u (name) VALUES ($1) RETURNING u.user_id"
    );
    Ok(())
}

#[tokio::test]
async fn exec_collects_requested_counts() -> SqResult<()> {
    let u = users();
    let db = FakeDb {
        affected: Affected::rows(3),
        ..FakeDb::default()
    };
    let conn: &dyn Db = &db;

    let outcome = postgres::delete_from(u.table.clone())
        .where_(u.user_id.gt_int(10))
        .exec(Some(conn), ExecFlags::ROWS_AFFECTED)
        .await?;
    assert_eq!(outcome.rows_affected, 3);
    assert_eq!(outcome.last_insert_id, 0);

    let err = postgres::delete_from(u.table.clone())
        .exec(Some(conn), ExecFlags::LAST_INSERT_ID)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("LastInsertId"));

    let db = FakeDb {
        affected: Affected::rows(1).with_last_insert_id(42),
        ..FakeDb::default()
    };
    let t = BaseTable::new("", "users");
    let name = StringField::new("name", &t);
    let outcome = mysql::insert_into(t.clone())
        .columns(fields![name])
        .values(vec!["dee".into()])
        .exec(
            Some(&db as &dyn Db),
            ExecFlags::ROWS_AFFECTED | ExecFlags::LAST_INSERT_ID,
        )
        .await?;
    assert_eq!(outcome.rows_affected, 1);
    assert_eq!(outcome.last_insert_id, 42);
    Ok(())
}

#[tokio::test]
async fn verbose_logging_dumps_rows_and_stats() -> SqResult<()> {
    let u = users();
    let logger = Arc::new(CaptureLogger::default());
    let db = FakeDb::with_rows(ids_and_names());
    let conn: &dyn Db = &db;

    postgres::with_log(logger.clone(), LogFlags::VERBOSE)
        .from(u.table.clone())
        .fetch_all(Some(conn), |row| (row.int64(&u.user_id), row.string(&u.name)))
        .await?;

    let lines = logger.lines.lock().unwrap();
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert!(lines[0].starts_with("\n----[ Executing query ]----\nSELECT u.user_id, u.name"));
    assert!(lines[1].contains("----[ Row 1 ]----\nu.user_id: 1\nu.name: 'ann'"));
    assert!(lines[2].contains("----[ Row 2 ]----"));
    assert!(lines[3].starts_with("\n(Fetched 2 rows in "));
    Ok(())
}

#[tokio::test]
async fn exec_stats_and_tags() -> SqResult<()> {
    let u = users();
    let logger = Arc::new(CaptureLogger::default());
    let db = FakeDb {
        affected: Affected::rows(1),
        ..FakeDb::default()
    };
    let conn: &dyn Db = &db;
    let ctx = QueryCtx::new().with_tag("cleanup");

    postgres::with_log(logger.clone(), LogFlags::STATS)
        .update(u.table.clone())
        .set(vec![u.name.set("x")])
        .exec_context(&ctx, Some(conn), ExecFlags::ROWS_AFFECTED)
        .await?;

    let lines = logger.lines.lock().unwrap();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines.iter().all(|l| l.starts_with("[cleanup] ")));
    assert!(lines[1].starts_with("[cleanup] \n(Updated 1 row in "));
    Ok(())
}

#[tokio::test]
async fn timeout_covers_reading_rows() {
    let u = users();
    let db = StallingDb::default();
    let conn: &dyn Db = &db;
    let ctx = QueryCtx::new().with_timeout(Duration::from_millis(20));

    let err = postgres::from(u.table.clone())
        .fetch_all_context(&ctx, Some(conn), |row| row.int64(&u.user_id))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(db.cancelled.load(Ordering::SeqCst));
}
