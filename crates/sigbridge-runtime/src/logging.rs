//! Log output for the bridge.
//!
//! Everything is logged through `tracing`. The subscriber is installed once per
//! process, normally by the supervisor during bootstrap:
//!
//! ```rust,ignore
//! use sigbridge_runtime::{config::ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! With `logging.output = "file"` lines go to daily-rolling files in
//! `logging.directory`. That is the directory the management endpoint lists, so
//! operators can fetch logs over `GET /api/logs/{name}`.
//!
//! Embedders that want a different setup install their own subscriber first;
//! the supervisor then leaves it alone.
//!
//! ```rust,ignore
//! use sigbridge_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("sigbridge_runtime::executive=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::path::PathBuf;

use tracing::subscriber::NoSubscriber;
use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Dependencies that are chatty at `info` and below.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "axum=warn"];

/// Installs the subscriber described by `config`.
///
/// A subscriber that is already installed (by an earlier start, an embedding
/// application or a test harness) is left in place.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Installs plain stderr output unless a subscriber, global or scoped, is
/// already in effect.
///
/// Bootstrap failures that happen before the configured subscriber is up
/// still need somewhere to go.
pub fn init_fallback() {
    let unset = tracing::dispatcher::get_default(|dispatch| dispatch.is::<NoSubscriber>());
    if unset {
        LoggingBuilder::new().sink(LogSink::Stderr).init();
    }
}

/// Which span lifecycle events produce log lines.
///
/// The transfer worker runs every cycle inside a `transfer_cycle` span, so
/// [`SpanEvents::LIFECYCLE`] logs one line per cycle with its duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn fmt_span(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FmtSpan::NONE, |acc, (_, flag)| acc | flag)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

/// Where formatted lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
    /// Daily-rolling files named `{prefix}.{date}` inside `path`.
    Directory { path: PathBuf, prefix: String },
}

impl LogSink {
    pub fn from_config(config: &LoggingConfig) -> Self {
        match config.output {
            LogOutput::Stdout => Self::Stdout,
            LogOutput::Stderr => Self::Stderr,
            LogOutput::File => Self::Directory {
                path: config.directory.clone(),
                prefix: config.file_name.clone(),
            },
        }
    }

    fn make_writer(&self) -> Result<BoxMakeWriter, InitError> {
        Ok(match self {
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
            Self::Stderr => BoxMakeWriter::new(std::io::stderr),
            Self::Directory { path, prefix } => BoxMakeWriter::new(
                RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(prefix)
                    .build(path)?,
            ),
        })
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Directory { .. })
    }
}

/// Builder for the process-wide `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    format: LogFormat,
    sink: LogSink,
    span_events: SpanEvents,
    with_target: bool,
    with_thread_ids: bool,
    with_source_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Compact `info` output on stdout.
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            format: LogFormat::Compact,
            sink: LogSink::Stdout,
            span_events: SpanEvents::NONE,
            with_target: true,
            with_thread_ids: false,
            with_source_location: false,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.to_tracing_level(),
            directives: config
                .filters
                .iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            format: config.format,
            sink: LogSink::from_config(config),
            span_events: SpanEvents::from(&config.span_events),
            with_target: true,
            with_thread_ids: config.thread_ids,
            with_source_location: config.file_location,
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds an `EnvFilter` directive such as `sigbridge_runtime::pipeline=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.with_source_location = enabled;
        self
    }

    /// `RUST_LOG` when set, otherwise the configured level; then the quiet
    /// targets and the configured directives, in that order.
    fn filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));

        let mut rejected = Vec::new();
        let directives = QUIET_TARGETS
            .iter()
            .copied()
            .chain(self.directives.iter().map(String::as_str));
        for directive in directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => rejected.push(directive.to_string()),
            }
        }
        (filter, rejected)
    }

    fn layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.sink.is_terminal())
            .with_span_events(self.span_events.fmt_span())
            .with_target(self.with_target)
            .with_thread_ids(self.with_thread_ids)
            .with_file(self.with_source_location)
            .with_line_number(self.with_source_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        }
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// If the log directory cannot be used, lines go to stderr instead and a
    /// warning is logged once the subscriber is up.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.filter();
        let (writer, sink_error) = match self.sink.make_writer() {
            Ok(writer) => (writer, None),
            Err(e) => (BoxMakeWriter::new(std::io::stderr), Some(e)),
        };

        tracing_subscriber::registry()
            .with(self.layer(writer))
            .with(filter)
            .try_init()?;

        if let Some(e) = sink_error {
            warn!(sink = ?self.sink, error = %e, "Log directory unusable, logging to stderr");
        }
        for directive in rejected {
            warn!(%directive, "Ignoring invalid log filter directive");
        }
        Ok(())
    }
}
