//! Query logging.
//!
//! Every query carries an optional [`Logger`] and a set of [`LogFlags`]. The
//! compiled SQL is logged once per top-level compile; row results and
//! execution stats are logged by the execution methods when the matching
//! flags are set.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqb::monitor::{LogFlags, StdLogger};
//! use std::sync::Arc;
//!
//! let q = sqb::postgres::with_log(Arc::new(StdLogger::stdout()), LogFlags::VERBOSE)
//!     .from(u.table())
//!     .select(fields![u.user_id]);
//! ```

mod interpolate;
mod loggers;

pub use interpolate::interpolate;
pub use loggers::StdLogger;

#[cfg(feature = "tracing")]
pub use loggers::TracingLogger;

use crate::dialect::Dialect;
use crate::value::Value;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::panic::Location;
use std::time::Duration;

/// Sink for query log lines.
///
/// `caller` is the user call site that triggered the log line (the place
/// `to_sql`, `fetch_*` or `exec*` was called from).
pub trait Logger: Send + Sync {
    fn output(&self, caller: &'static Location<'static>, message: &str) -> io::Result<()>;
}

/// Which details to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LogFlags(u32);

impl LogFlags {
    pub const NONE: LogFlags = LogFlags(0);
    /// Log the query with its arguments inlined.
    pub const INTERPOLATE: LogFlags = LogFlags(1);
    /// Log both raw and interpolated forms, plus timing and row counts.
    pub const STATS: LogFlags = LogFlags(1 << 1);
    /// Log the first few result rows.
    pub const RESULTS: LogFlags = LogFlags(1 << 2);
    /// Log the fields declared by a row mapper.
    pub const PARSE: LogFlags = LogFlags(1 << 3);
    pub const VERBOSE: LogFlags = LogFlags(Self::STATS.0 | Self::RESULTS.0);

    pub fn contains(self, other: LogFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LogFlags {
    type Output = LogFlags;

    fn bitor(self, rhs: LogFlags) -> LogFlags {
        LogFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogFlags {
    fn bitor_assign(&mut self, rhs: LogFlags) {
        self.0 |= rhs.0;
    }
}

/// Which counts to collect from a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExecFlags(u32);

impl ExecFlags {
    pub const NONE: ExecFlags = ExecFlags(0);
    pub const LAST_INSERT_ID: ExecFlags = ExecFlags(1);
    pub const ROWS_AFFECTED: ExecFlags = ExecFlags(1 << 1);

    pub fn contains(self, other: ExecFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitOr for ExecFlags {
    type Output = ExecFlags;

    fn bitor(self, rhs: ExecFlags) -> ExecFlags {
        ExecFlags(self.0 | rhs.0)
    }
}

/// Number of result rows echoed by [`LogFlags::RESULTS`].
pub(crate) const LOGGED_ROWS: usize = 5;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn format_args_list(args: &[Value]) -> String {
    let items: Vec<String> = args.iter().map(Value::to_sql_literal).collect();
    format!("[{}]", items.join(" "))
}

pub(crate) fn query_message(flags: LogFlags, sql: &str, args: &[Value], dialect: Dialect) -> String {
    if flags.contains(LogFlags::STATS) {
        format!(
            "\n----[ Executing query ]----\n{sql} {}\n----[ with bind values ]----\n{}",
            format_args_list(args),
            interpolate(sql, args, dialect)
        )
    } else if flags.contains(LogFlags::INTERPOLATE) {
        format!("Executing query: {}", interpolate(sql, args, dialect))
    } else {
        format!("Executing query: {sql} {}", format_args_list(args))
    }
}

pub(crate) fn row_message(index: usize, labels: &[String], values: &[Value]) -> String {
    let mut out = format!("\n----[ Row {index} ]----");
    for (label, value) in labels.iter().zip(values) {
        out.push('\n');
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&value.to_sql_literal());
    }
    out
}

pub(crate) fn parse_message(labels: &[String]) -> String {
    format!("Declared fields: {}", labels.join(", "))
}

pub(crate) fn stats_message(verb: &str, count: i64, elapsed: Duration) -> String {
    let noun = if count == 1 { "row" } else { "rows" };
    format!("\n({verb} {count} {noun} in {elapsed:?})")
}
