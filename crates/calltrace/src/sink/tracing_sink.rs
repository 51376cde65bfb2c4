use super::{CALL_TARGET, STATEMENT_TARGET, StatementTrace, TraceSink};
use crate::call::CallRecord;
use crate::truncate_chars;
use std::time::Duration;
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            _ => tracing::trace!($($field)*),
        }
    };
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A `tracing`-based sink: one event per statement or call.
///
/// Statements go to target `calltrace::statement`, calls to `calltrace::call`,
/// at the level configured on the interceptor. Subscriber filtering on these
/// targets decides whether the interceptors do any work at all.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    /// Truncate long statements (in chars). `None` (default) logs them whole.
    pub max_sql_length: Option<usize>,
}

impl TracingSink {
    /// Create a new sink with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum statement length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    fn display_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) => truncate_chars(sql, max, "..."),
            None => std::borrow::Cow::Borrowed(sql),
        }
    }
}

impl TraceSink for TracingSink {
    fn on_statement(&self, level: Level, trace: &StatementTrace) {
        let sql = self.display_sql(&trace.sql);
        emit_at_level!(
            level,
            target: STATEMENT_TARGET,
            elapsed_ms = saturating_millis(trace.elapsed),
            "\n------------------------------------\n\n{}\n\n------------------------------------ cost {}ms\n",
            sql,
            trace.elapsed_ms(),
        );
    }

    fn on_slow_statement(&self, trace: &StatementTrace, threshold: Duration) {
        let sql = self.display_sql(&trace.sql);
        tracing::warn!(
            target: STATEMENT_TARGET,
            elapsed_ms = saturating_millis(trace.elapsed),
            threshold_ms = saturating_millis(threshold),
            sql = %sql,
            "slow statement",
        );
    }

    fn on_call(&self, level: Level, record: &CallRecord) {
        let request = record.request_line.as_deref().unwrap_or("-");
        let result = record.result.as_deref().unwrap_or("-");
        match (&record.failure, &record.command) {
            (Some(failure), _) => emit_at_level!(
                level,
                target: CALL_TARGET,
                site = %record.site,
                request,
                args = %record.args_display(),
                elapsed_ms = record.elapsed_ms,
                failure = %failure,
                "handler call failed",
            ),
            (None, Some(command)) => emit_at_level!(
                level,
                target: CALL_TARGET,
                site = %record.site,
                request,
                args = %record.args_display(),
                result,
                elapsed_ms = record.elapsed_ms,
                command = %command,
                "handler call completed",
            ),
            (None, None) => emit_at_level!(
                level,
                target: CALL_TARGET,
                site = %record.site,
                request,
                args = %record.args_display(),
                result,
                elapsed_ms = record.elapsed_ms,
                "handler call completed",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate_instead_of_wrapping() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }
}
