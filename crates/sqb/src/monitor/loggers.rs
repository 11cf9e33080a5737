use super::{Logger, truncate_sql_bytes};
use std::io::{self, Write};
use std::panic::Location;
use std::path::Path;
use std::sync::Mutex;

/// Writes `date time file:line: prefix message` lines to a writer.
pub struct StdLogger {
    /// Prefix for log messages.
    pub prefix: String,
    /// Truncate long messages (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for StdLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdLogger")
            .field("prefix", &self.prefix)
            .field("max_sql_length", &self.max_sql_length)
            .finish_non_exhaustive()
    }
}

impl StdLogger {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            prefix: "[sqb] ".to_string(),
            max_sql_length: None,
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Set prefix for log messages.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set maximum message length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    fn truncate<'a>(&self, message: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if message.len() > max => {
                format!("{}...", truncate_sql_bytes(message, max)).into()
            }
            _ => message.into(),
        }
    }
}

impl Logger for StdLogger {
    fn output(&self, caller: &'static Location<'static>, message: &str) -> io::Result<()> {
        let file = Path::new(caller.file())
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(caller.file());
        let line = format!(
            "{} {}:{}: {}{}\n",
            chrono::Local::now().format("%Y/%m/%d %H:%M:%S"),
            file,
            caller.line(),
            self.prefix,
            self.truncate(message)
        );
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("logger mutex poisoned"))?;
        out.write_all(line.as_bytes())
    }
}

/// A `tracing`-based logger that emits every log line as an event.
///
/// Enable via the crate feature: `sqb = { features = ["tracing"] }`.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone)]
pub struct TracingLogger {
    /// Tracing event level to emit at.
    pub level: tracing::Level,
}

#[cfg(feature = "tracing")]
impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            level: tracing::Level::DEBUG,
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }
}

#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
    fn output(&self, caller: &'static Location<'static>, message: &str) -> io::Result<()> {
        use tracing::Level;

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        emit_at_level!(
            self.level,
            target: "sqb.sql",
            file = caller.file(),
            line = caller.line(),
            "{}",
            message.trim_start()
        );
        Ok(())
    }
}
