// GNU AGPL v3 License

//! Build the FFMPEG invocation that renders the selected segments to a GIF.

use crate::timeline::Segment;
use camino::{Utf8Path, Utf8PathBuf};

mod filters;
mod inputs;

/// Extra media read on both sides of every segment so no boundary frame is lost.
pub(crate) const SEGMENT_PADDING: f64 = 0.1;

/// Crop rectangle in percent of the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Crop {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl Crop {
    pub(crate) const FULL: Crop = Crop {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
    };

    pub(crate) fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl Default for Crop {
    fn default() -> Self {
        Self::FULL
    }
}

/// Output settings chosen by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConvertOption {
    pub(crate) output_path: Utf8PathBuf,
    /// Trim window applied to the stitched result, in seconds.
    pub(crate) start_time: Option<f64>,
    pub(crate) end_time: Option<f64>,
    pub(crate) fps: Option<u32>,
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) crop: Crop,
    pub(crate) palette: bool,
}

/// A fully specified FFMPEG run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExportCommand {
    args: Vec<String>,
    output: Utf8PathBuf,
    expected_duration: Option<f64>,
}

impl ExportCommand {
    pub(crate) const PROGRAM: &'static str = "ffmpeg";

    /// Assemble the arguments for exporting `segments` of `source`.
    ///
    /// With no segments the whole source is used.
    pub(crate) fn build(source: &Utf8Path, segments: &[Segment], option: &ConvertOption) -> Self {
        let mut args = vec!["-y".to_string()];

        let input_count = if segments.is_empty() {
            args.extend(inputs::whole_input(source));
            1
        } else {
            args.extend(inputs::segment_inputs(source, segments));
            segments.len()
        };

        let chain = filters::video_filters(option);
        args.extend(filters::filter_args(input_count, &chain));
        args.extend(trim_window(option));

        args.extend(
            ["-an", "-f", "gif", option.output_path.as_str()]
                .into_iter()
                .map(String::from),
        );

        Self {
            args,
            output: option.output_path.clone(),
            expected_duration: expected_duration(segments, option),
        }
    }

    pub(crate) fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn output(&self) -> &Utf8Path {
        &self.output
    }

    /// Length of the rendered GIF, when it can be known up front.
    pub(crate) fn expected_duration(&self) -> Option<f64> {
        self.expected_duration
    }

    /// The command as a shell would show it, for logging.
    pub(crate) fn command_line(&self) -> String {
        let mut line = String::from(Self::PROGRAM);
        for arg in &self.args {
            line.push(' ');
            if arg.contains(|c: char| c.is_whitespace() || c == ';' || c == '[') {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// `-ss`/`-t` output options for the global trim window.
fn trim_window(option: &ConvertOption) -> Vec<String> {
    let start = option.start_time.filter(|s| *s > 0.0);
    let mut args = Vec::new();

    if let Some(start) = start {
        args.push("-ss".to_string());
        args.push(start.to_string());
    }

    let from = start.unwrap_or(0.0);
    if let Some(end) = option.end_time.filter(|e| *e > from) {
        args.push("-t".to_string());
        args.push((end - from).to_string());
    }

    args
}

fn expected_duration(segments: &[Segment], option: &ConvertOption) -> Option<f64> {
    let total = if segments.is_empty() {
        None
    } else {
        Some(
            segments
                .iter()
                .map(|s| {
                    let (start, end) = inputs::padded(*s);
                    end - start
                })
                .sum::<f64>(),
        )
    };

    let from = option.start_time.filter(|s| *s > 0.0).unwrap_or(0.0);
    let window = option.end_time.filter(|e| *e > from).map(|e| e - from);

    match (total, window) {
        (Some(total), Some(window)) => Some(total.min(window).max(0.0)),
        (Some(total), None) => Some((total - from).max(0.0)),
        (None, window) => window,
    }
}
