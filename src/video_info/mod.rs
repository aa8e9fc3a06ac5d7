// GNU AGPL v3 License

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::process::Command;

/// Why a file cannot be worked on.
#[derive(Debug, Error)]
pub(crate) enum InspectError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe rejected the file: {0}")]
    Probe(String),
    #[error("ffprobe output could not be read: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no video stream found")]
    NoVideoStream,
    #[error("unparsable frame rate `{0}`")]
    FrameRate(String),
    #[error("the file has no usable duration")]
    NoDuration,
}

/// What we need to know about a source before touching it.
#[derive(Clone, PartialEq, Serialize)]
pub(crate) struct VideoInfo {
    /// Seconds.
    pub(crate) duration: f64,
    /// Bytes.
    pub(crate) size: u64,
    pub(crate) codec: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) fps: f64,
}

impl fmt::Debug for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoInfo")
            .field("duration", &self.duration)
            .field("codec", &self.codec)
            .field("size", &(self.width, self.height))
            .field("fps", &self.fps)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// Probe `path` with `ffprobe`.
pub(crate) async fn inspect(path: &Utf8Path) -> Result<VideoInfo, InspectError> {
    tracing::info!("Inspecting file: {}", path);

    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!("ffprobe failed on {}: {}", path, reason);
        return Err(InspectError::Probe(reason));
    }

    let info = parse_probe(&output.stdout)?;
    tracing::debug!("{:?}", info);
    Ok(info)
}

/// Pick the facts out of `ffprobe -print_format json` output.
pub(crate) fn parse_probe(json: &[u8]) -> Result<VideoInfo, InspectError> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(InspectError::NoVideoStream)?;

    let rate = video.avg_frame_rate.as_deref().unwrap_or("");
    let fps = parse_frame_rate(rate).ok_or_else(|| InspectError::FrameRate(rate.to_string()))?;

    let format = probe.format.as_ref();
    // ffprobe writes "N/A" for unknown durations
    let seconds = |d: Option<&str>| {
        d.and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    };
    let duration = seconds(format.and_then(|f| f.duration.as_deref()))
        .or_else(|| seconds(video.duration.as_deref()))
        .ok_or(InspectError::NoDuration)?;

    let size = format
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);

    Ok(VideoInfo {
        duration,
        size,
        codec: video.codec_name.clone().unwrap_or_default(),
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps,
    })
}

/// Frame rates come as a `numerator/denominator` fraction.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (numerator, denominator) = rate.trim().split_once('/')?;
    let numerator = numerator.parse::<u64>().ok()?;
    let denominator = denominator.parse::<u64>().ok()?;
    if denominator == 0 {
        return None;
    }

    Some(numerator as f64 / denominator as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "audio", "codec_name": "aac" },
            {
                "index": 1,
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30000/1001",
                "duration": "9.5"
            }
        ],
        "format": { "duration": "10.010000", "size": "1048576" }
    }"#;

    #[test]
    fn reads_first_video_stream() {
        let info = parse_probe(PROBE.as_bytes()).unwrap();
        assert_eq!(info.codec, "h264");
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.duration, 10.01);
        assert_eq!(info.size, 1_048_576);
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let json = PROBE.replace(r#""duration": "10.010000", "#, "");
        let info = parse_probe(json.as_bytes()).unwrap();
        assert_eq!(info.duration, 9.5);
    }

    #[test]
    fn unknown_container_duration_falls_back_to_stream() {
        let json = PROBE.replace("10.010000", "N/A");
        let info = parse_probe(json.as_bytes()).unwrap();
        assert_eq!(info.duration, 9.5);
    }

    #[test]
    fn audio_only_is_invalid() {
        let json = r#"{ "streams": [ { "codec_type": "audio" } ], "format": { "duration": "3.0" } }"#;
        assert!(matches!(
            parse_probe(json.as_bytes()),
            Err(InspectError::NoVideoStream)
        ));
    }

    #[test]
    fn bad_frame_rate_is_invalid() {
        let json = PROBE.replace("30000/1001", "0/0");
        assert!(matches!(
            parse_probe(json.as_bytes()),
            Err(InspectError::FrameRate(rate)) if rate == "0/0"
        ));
        assert_eq!(parse_frame_rate("25"), None);
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
    }

    #[test]
    fn zero_duration_is_invalid() {
        let json = PROBE
            .replace("10.010000", "0.000000")
            .replace(r#""duration": "9.5""#, r#""duration": "0""#);
        assert!(matches!(
            parse_probe(json.as_bytes()),
            Err(InspectError::NoDuration)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            parse_probe(b"not json"),
            Err(InspectError::Json(_))
        ));
    }
}
