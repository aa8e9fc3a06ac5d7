// GNU AGPL v3 License

//! Run the FFMPEG children: silence detection and the final export.

use crate::{export::ExportCommand, log, silence::SilenceConfig};
use anyhow::{anyhow, Result};
use camino::Utf8Path;
use std::{future::Future, process::Stdio};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::Level;

/// Arguments every FFMPEG child gets, so stderr stays parseable.
const QUIET: [&str; 4] = ["-hide_banner", "-nostats", "-loglevel", "level+info"];

/// Where an export run stands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExportStatus {
    /// Percentage done, when the output length is known.
    Processing(f64),
    Canceled,
    Error(String),
    End,
}

/// Run `silencedetect` over the audio of `path` and return FFMPEG's log.
pub(crate) async fn detect_silence(path: &Utf8Path, config: &SilenceConfig) -> Result<String> {
    let filter = config.detect_filter();
    tracing::info!("Detecting silence in {} with {}", path, filter);

    let output = Command::new(ExportCommand::PROGRAM)
        .args(QUIET)
        .arg("-i")
        .arg(path)
        .arg("-af")
        .arg(&filter)
        .args(["-vn", "-f", "null", "-"])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        let reason = stderr.lines().last().unwrap_or_default().to_string();
        return Err(anyhow!("silence detection failed: {}", reason));
    }

    tracing::debug!("silencedetect produced {} lines", stderr.lines().count());
    Ok(stderr)
}

/// Run an export, reporting progress through `on_status` until the child
/// exits or `halt` resolves.
///
/// The final status is both reported and returned.
pub(crate) async fn run_export(
    command: &ExportCommand,
    mut on_status: impl FnMut(ExportStatus),
    halt: impl Future<Output = ()>,
) -> Result<ExportStatus> {
    tracing::info!("Running {}", command.command_line());

    let mut child = Command::new(ExportCommand::PROGRAM)
        .args(QUIET)
        .args(["-progress", "pipe:1"])
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("ffmpeg stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("ffmpeg stderr was not captured"))?;

    // forward stderr, remembering the last complaint for the error status
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut last_error = None;
        while let Ok(Some(line)) = lines.next_line().await {
            if log::forward_ffmpeg_line(&line) == Level::ERROR {
                last_error = Some(line);
            }
        }
        last_error
    });

    let mut tracker = ProgressTracker::new(command.expected_duration());
    on_status(tracker.started());

    tokio::pin!(halt);
    let mut progress = BufReader::new(stdout).lines();

    let exit = loop {
        tokio::select! {
            _ = &mut halt => {
                tracing::warn!("Export canceled, stopping ffmpeg");
                child.kill().await.ok();
                on_status(ExportStatus::Canceled);
                return Ok(ExportStatus::Canceled);
            }
            line = progress.next_line() => match line? {
                Some(line) => {
                    if let Some(status) = tracker.update(&line) {
                        on_status(status);
                    }
                }
                None => break child.wait().await?,
            },
        }
    };

    let last_error = stderr_task.await.ok().flatten();
    let status = if exit.success() {
        tracing::info!("Wrote {}", command.output());
        ExportStatus::End
    } else {
        let reason = last_error.unwrap_or_else(|| format!("ffmpeg exited with {}", exit));
        tracing::error!("Export failed: {}", reason);
        ExportStatus::Error(reason)
    };

    on_status(status.clone());
    Ok(status)
}

/// Turns `-progress` output into the status updates worth reporting.
struct ProgressTracker {
    expected: Option<f64>,
    last: f64,
}

impl ProgressTracker {
    fn new(expected: Option<f64>) -> Self {
        Self {
            expected,
            last: 0.0,
        }
    }

    /// Reported as soon as the child runs, before any output arrives.
    fn started(&self) -> ExportStatus {
        ExportStatus::Processing(0.0)
    }

    /// A new percentage, or `None` if nothing changed.
    fn update(&mut self, line: &str) -> Option<ExportStatus> {
        let pct = match parse_progress(line, self.expected)? {
            Progress::Percent(pct) => pct,
            Progress::End => 100.0,
        };
        if pct == self.last {
            return None;
        }

        self.last = pct;
        Some(ExportStatus::Processing(pct))
    }
}

#[derive(Debug, PartialEq)]
enum Progress {
    Percent(f64),
    End,
}

/// Interpret one `key=value` line of `-progress` output.
fn parse_progress(line: &str, expected: Option<f64>) -> Option<Progress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        // both are microseconds, despite the name
        "out_time_us" | "out_time_ms" => {
            let micros = value.parse::<i64>().ok()?;
            let expected = expected.filter(|e| *e > 0.0)?;
            let seconds = micros.max(0) as f64 / 1_000_000.0;
            let pct = (seconds / expected * 100.0).clamp(0.0, 100.0);
            Some(Progress::Percent(pct.floor()))
        }
        "progress" if value == "end" => Some(Progress::End),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_out_time() {
        assert_eq!(
            parse_progress("out_time_us=1500000", Some(3.0)),
            Some(Progress::Percent(50.0))
        );
        assert_eq!(
            parse_progress("out_time_ms=2999999\n", Some(3.0)),
            Some(Progress::Percent(99.0))
        );
    }

    #[test]
    fn clamps_percentage() {
        assert_eq!(
            parse_progress("out_time_us=9000000", Some(3.0)),
            Some(Progress::Percent(100.0))
        );
        assert_eq!(
            parse_progress("out_time_us=-23000", Some(3.0)),
            Some(Progress::Percent(0.0))
        );
    }

    #[test]
    fn needs_known_length() {
        assert_eq!(parse_progress("out_time_us=1000000", None), None);
        assert_eq!(parse_progress("out_time_us=1000000", Some(0.0)), None);
    }

    #[test]
    fn reports_start_then_changes_only() {
        let mut tracker = ProgressTracker::new(Some(3.0));
        let statuses = Some(tracker.started())
            .into_iter()
            .chain(
                [
                    "frame=1",
                    "out_time_us=0",
                    "out_time_us=1500000",
                    "out_time_us=1500000",
                    "progress=continue",
                    "progress=end",
                ]
                .iter()
                .filter_map(|line| tracker.update(line)),
            )
            .collect::<Vec<_>>();

        assert_eq!(
            statuses,
            [
                ExportStatus::Processing(0.0),
                ExportStatus::Processing(50.0),
                ExportStatus::Processing(100.0),
            ]
        );
    }

    #[test]
    fn unknown_length_still_reports_start_and_end() {
        let mut tracker = ProgressTracker::new(None);
        assert_eq!(tracker.started(), ExportStatus::Processing(0.0));
        assert_eq!(tracker.update("out_time_us=4000000"), None);
        assert_eq!(
            tracker.update("progress=end"),
            Some(ExportStatus::Processing(100.0))
        );
        assert_eq!(tracker.update("progress=end"), None);
    }

    #[test]
    fn ignores_other_keys() {
        assert_eq!(parse_progress("out_time_us=N/A", Some(1.0)), None);
        assert_eq!(parse_progress("frame=12", Some(1.0)), None);
        assert_eq!(parse_progress("progress=continue", Some(1.0)), None);
        assert_eq!(parse_progress("garbage", Some(1.0)), None);
        assert_eq!(parse_progress("progress=end", None), Some(Progress::End));
    }
}
