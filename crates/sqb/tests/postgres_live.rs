//! Round trip against a real PostgreSQL server.
//!
//! Set DATABASE_URL in .env or the environment; the test is skipped
//! otherwise.

use rust_decimal::Decimal;
use sqb::{
    Arg, BaseTable, Db, ExecFlags, NumberField, SqError, SqResult, StringField, fieldf, fields,
    postgres,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

#[tokio::test]
async fn insert_select_delete_roundtrip() -> SqResult<()> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping insert_select_delete_roundtrip");
            return Ok(());
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(SqError::driver)?
        .as_nanos();
    let name = format!("sqb_test_{}_{}", std::process::id(), nanos);
    client
        .batch_execute(&format!(
            "CREATE TEMP TABLE {name} (id BIGSERIAL PRIMARY KEY, label TEXT NOT NULL, note TEXT)"
        ))
        .await?;

    let table = BaseTable::new("", &name).as_("t");
    let id = NumberField::new("id", &table);
    let label = StringField::new("label", &table);
    let note = StringField::new("note", &table);
    let conn: &dyn Db = &client;

    let ids = postgres::insert_into(table.clone())
        .values_from(["a", "b", "c"], |col, l| {
            col.set(&label, l);
            col.set(&note, Option::<String>::None);
        })
        .fetch_all(Some(conn), |row| row.int64(&id))
        .await?;
    assert_eq!(ids.len(), 3);

    let rows = postgres::from(table.clone())
        .where_(label.ne_string("b"))
        .order_by(fields![id])
        .fetch_all(Some(conn), |row| (row.string(&label), row.null_string(&note)))
        .await?;
    assert_eq!(rows, vec![("a".to_string(), None), ("c".to_string(), None)]);

    // SUM over BIGINT comes back as NUMERIC.
    let sum = fieldf("SUM(?)", vec![Arg::field(id.clone())]).as_("total");
    let total = postgres::from(table.clone())
        .fetch_one(Some(conn), |row| {
            let mut total = Decimal::ZERO;
            row.scan_into(&mut total, &sum);
            total
        })
        .await?;
    assert_eq!(total, Some(ids.iter().copied().map(Decimal::from).sum()));

    let outcome = postgres::delete_from(table.clone())
        .where_(label.eq_string("a"))
        .exec(Some(conn), ExecFlags::ROWS_AFFECTED)
        .await?;
    assert_eq!(outcome.rows_affected, 1);
    Ok(())
}
