// GNU AGPL v3 License

//! Route FFMPEG's log output into tracing.
//!
//! Every FFMPEG child is started with `-loglevel level+info`, which prefixes
//! each line with its severity in brackets. We read that tag back and emit the
//! line at the matching level.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Forward one line of FFMPEG stderr to tracing, returning the level used.
pub(crate) fn forward_ffmpeg_line(line: &str) -> Level {
    let (level, message) = split_level(line);

    match level {
        Some(Level::ERROR) => tracing::error!("ffmpeg: {}", message),
        Some(Level::WARN) => tracing::warn!("ffmpeg: {}", message),
        Some(Level::INFO) | None => tracing::info!("ffmpeg: {}", message),
        Some(Level::DEBUG) => tracing::debug!("ffmpeg: {}", message),
        Some(_) => tracing::trace!("ffmpeg: {}", message),
    };

    level.unwrap_or(Level::INFO)
}

/// Find the severity tag of a line and strip it.
///
/// The tag may follow a `[context @ 0x...]` prefix, which is kept.
fn split_level(line: &str) -> (Option<Level>, String) {
    let line = line.trim_end();
    let mut rest = line;
    let mut offset = 0;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        let tag = &rest[open + 1..open + close];

        if let Some(level) = tag_level(tag) {
            let start = offset + open;
            let end = start + close + 1;
            let message = format!("{}{}", &line[..start], line[end..].trim_start());
            return (Some(level), message);
        }

        offset += open + close + 1;
        rest = &rest[open + close + 1..];
    }

    (None, line.to_string())
}

fn tag_level(tag: &str) -> Option<Level> {
    match tag {
        "panic" | "fatal" | "error" => Some(Level::ERROR),
        "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "verbose" | "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Log to stderr when there is no terminal UI to collect events.
///
/// `RUST_LOG` overrides the default `info` filter.
pub(crate) fn init_headless_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;

    Ok(())
}
