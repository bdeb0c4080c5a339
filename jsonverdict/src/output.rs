// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup and stderr output for the CLI.

use camino::Utf8Path;
use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, BufWriter, Stderr, Write},
    marker::PhantomData,
    sync::Once,
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Events logged to this target are printed without the `error: ` style heading.
pub(crate) const NO_HEADING_TARGET: &str = "jsonverdict::no_heading";

const LOG_ENV: &str = "JSONVERDICT_LOG";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Log debug messages
    #[arg(long, short, global = true, env = "JSONVERDICT_VERBOSE")]
    verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(long, value_enum, default_value_t, global = true, value_name = "WHEN")]
    color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        init_logger(self.color, self.verbose);
        OutputContext { color: self.color }
    }
}

/// The resolved output settings for this invocation.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    color: Color,
}

impl OutputContext {
    /// Returns styles for messages written directly to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        if self.color.colorize_stderr() {
            StderrStyles {
                bold: style().bold(),
                separator: style().dimmed(),
            }
        } else {
            StderrStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    fn colorize_stderr(self) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(supports_color::Stream::Stderr).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

static INIT_LOGGER: Once = Once::new();

fn init_logger(color: Color, verbose: bool) {
    INIT_LOGGER.call_once(|| {
        let default_level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let targets = match std::env::var(LOG_ENV) {
            Ok(filter) if !filter.is_empty() => filter.parse().unwrap_or_else(|error| {
                eprintln!("warning: ignoring invalid {LOG_ENV} `{filter}`: {error}");
                Targets::new().with_default(default_level)
            }),
            _ => Targets::new().with_default(default_level),
        };

        let formatter = HeadingFormatter {
            colorize: color.colorize_stderr(),
        };
        let layer = tracing_subscriber::fmt::layer()
            .event_format(formatter)
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();
    });
}

/// Formats events as `level: message`.
struct HeadingFormatter {
    colorize: bool,
}

impl HeadingFormatter {
    fn heading(&self, level: Level) -> (&'static str, Style) {
        let (name, colored) = match level {
            Level::ERROR => ("error", style().red().bold()),
            Level::WARN => ("warning", style().yellow().bold()),
            Level::INFO => ("info", style().bold()),
            Level::DEBUG => ("debug", style().bold()),
            Level::TRACE => ("trace", style().dimmed()),
        };
        (name, if self.colorize { colored } else { Style::new() })
    }
}

impl<S, N> FormatEvent<S, N> for HeadingFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (name, heading_style) = self.heading(*metadata.level());
            write!(writer, "{}: ", name.style(heading_style))?;
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            result: Ok(()),
        };
        event.record(&mut visitor);
        visitor.result?;

        writeln!(writer)
    }
}

/// Writes only the `message` field: structured fields are for debugging, not for the terminal.
struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    result: fmt::Result,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" && self.result.is_ok() {
            self.result = write!(self.writer, "{value:?}");
        }
    }
}

/// Styles for messages written directly to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
    pub(crate) separator: Style,
}

/// Where user-facing output goes.
///
/// The capturing variant is gated by `#[cfg(test)]` so the binary only ever writes to stderr.
#[derive(Debug, Default)]
pub enum OutputWriter {
    /// Write to the process's stderr.
    #[default]
    Normal,

    /// Capture output in memory.
    #[cfg(test)]
    Test {
        /// Captured stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stderr_writer(&mut self) -> StderrWriter<'_> {
        match self {
            Self::Normal => StderrWriter::Normal {
                buf: BufWriter::new(io::stderr()),
                _lifetime: PhantomData,
            },
            #[cfg(test)]
            Self::Test { stderr } => StderrWriter::Test { buf: stderr },
        }
    }
}

pub(crate) enum StderrWriter<'a> {
    Normal {
        buf: BufWriter<Stderr>,
        _lifetime: PhantomData<&'a ()>,
    },
    #[cfg(test)]
    Test { buf: &'a mut Vec<u8> },
}

impl Write for StderrWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            Self::Normal { buf, .. } => buf.write(data),
            #[cfg(test)]
            Self::Test { buf } => buf.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Normal { buf, .. } => buf.flush(),
            #[cfg(test)]
            Self::Test { buf } => buf.flush(),
        }
    }
}

const SEPARATOR_WIDTH: usize = 80;

/// Writes `---- generated json file: <path> ----`, padded with dashes to the terminal width.
pub(crate) fn write_generated_line(
    path: &Utf8Path,
    styles: &StderrStyles,
    mut writer: impl Write,
) -> io::Result<()> {
    let message = format!("generated json file: {path}");
    // Two spaces around the message.
    let fill = SEPARATOR_WIDTH.saturating_sub(message.len() + 2);
    let left = (fill / 2).max(1);
    let right = (fill - fill / 2).max(1);

    writeln!(
        writer,
        "{} generated json file: {} {}",
        "-".repeat(left).style(styles.separator),
        path.style(styles.bold),
        "-".repeat(right).style(styles.separator),
    )?;
    writer.flush()
}
