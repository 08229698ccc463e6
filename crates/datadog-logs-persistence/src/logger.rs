// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracing formatter for the SDK's own diagnostics.
//!
//! Lines are prefixed with `DD_LOGS` so they can be told apart from the host
//! application's output:
//!
//! ```text
//! DD_LOGS | WARN | PERSISTENCE | Write queue is full, dropping event
//! DD_LOGS | DEBUG | upload{attempt=2}: UPLOAD | Uploaded batch of 512 bytes
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "DD_LOGS | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs a global subscriber using [`Formatter`].
///
/// `level` is an `EnvFilter` directive such as `"info"` or
/// `"datadog_logs_persistence=debug"`; `RUST_LOG` is not consulted. Returns
/// `false` when the directive is invalid or a global subscriber already exists,
/// in which case the existing one is left untouched.
pub fn init(level: &str) -> bool {
    let filter = match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(_) => return false,
    };
    tracing_subscriber::fmt()
        .event_format(Formatter)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(Formatter)
            .with_writer(buffer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_prefixes_level() {
        let output = capture(|| tracing::warn!("UPLOAD | retrying"));
        assert_eq!(output, "DD_LOGS | WARN | UPLOAD | retrying\n");
    }

    #[test]
    fn test_includes_span_context() {
        let output = capture(|| {
            let span = tracing::debug_span!("upload", attempt = 2);
            let _guard = span.enter();
            tracing::info!(bytes = 10, "sent");
        });
        assert_eq!(output, "DD_LOGS | INFO | upload{attempt=2}: sent bytes=10\n");
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        assert!(!init("datadog_logs_persistence=loud"));
    }
}
