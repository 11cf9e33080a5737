//! [`Db`] for `tokio_postgres` clients and transactions.
//!
//! ```ignore
//! let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
//! tokio::spawn(connection);
//!
//! let users = postgres::from(u.table())
//!     .fetch_all(Some(&client), |row| row.string(&u.email))
//!     .await?;
//! ```

use crate::client::{Affected, Db, ExecResult, Rows};
use crate::error::{SqError, SqResult};
use crate::value::Value;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use rust_decimal::Decimal;
use std::net::IpAddr;
use std::pin::Pin;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Row, RowStream};

/// Streaming cursor over a `query_raw` result.
struct PgRows {
    stream: Pin<Box<RowStream>>,
}

#[async_trait]
impl Rows for PgRows {
    async fn next(&mut self) -> SqResult<Option<Vec<Value>>> {
        match self.stream.next().await {
            Some(row) => Ok(Some(decode_row(&row?)?)),
            None => Ok(None),
        }
    }
}

/// Convert every column of `row` into a [`Value`] based on its type.
pub(crate) fn decode_row(row: &Row) -> SqResult<Vec<Value>> {
    (0..row.len()).map(|idx| decode_column(row, idx)).collect()
}

fn decode_column(row: &Row, idx: usize) -> SqResult<Value> {
    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::Float)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?.map(Value::Time)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?.map(Value::from)
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)?.map(Value::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)?.map(Value::Json)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes)
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx)?.map(Value::from)
    } else if *ty == Type::NUMERIC {
        row.try_get::<_, Option<Decimal>>(idx)?.map(Value::from)
    } else if *ty == Type::TIME {
        row.try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::Text(t.to_string()))
    } else if *ty == Type::INET {
        row.try_get::<_, Option<IpAddr>>(idx)?
            .map(|ip| Value::Text(ip.to_string()))
    } else if <String as FromSql>::accepts(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    } else {
        return Err(unsupported_column(row.columns()[idx].name(), ty));
    };
    Ok(value.unwrap_or(Value::Null))
}

fn unsupported_column(name: &str, ty: &Type) -> SqError {
    SqError::Scan {
        location: format!("column {name}"),
        message: format!("unsupported PostgreSQL type {ty}; cast it in the select list"),
    }
}

macro_rules! impl_pg_db {
    ($ty:ty) => {
        #[async_trait]
        impl Db for $ty {
            async fn exec(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn ExecResult>> {
                let n = Self::execute_raw(self, sql, args.iter()).await?;
                Ok(Box::new(Affected::rows(n as i64)))
            }

            async fn query(&self, sql: &str, args: &[Value]) -> SqResult<Box<dyn Rows>> {
                let stream = Self::query_raw(self, sql, args.iter()).await?;
                Ok(Box::new(PgRows {
                    stream: Box::pin(stream),
                }))
            }

            /// Cancel runs on a spawned task; a failed cancel is only logged.
            fn on_timeout(&self) {
                let token = Self::cancel_token(self);
                tokio::spawn(async move {
                    if let Err(_err) = token.cancel_query(tokio_postgres::NoTls).await {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(target: "sqb.exec", error = %_err, "query cancel failed");
                    }
                });
            }
        }
    };
}

impl_pg_db!(tokio_postgres::Client);
impl_pg_db!(tokio_postgres::Transaction<'_>);
