// GNU AGPL v3 License

use crate::{
    activate::ActivePolicy,
    export::{ConvertOption, Crop},
    silence::{
        SilenceConfig, DEFAULT_BUFFER, DEFAULT_MAX_GAP, DEFAULT_MIN_BLOCK, DEFAULT_MIN_SILENCE,
        DEFAULT_THRESHOLD_DB,
    },
};
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "gifcut")]
#[command(about = "Cut the silent parts out of a clip and export the rest as a GIF")]
pub(crate) struct Args {
    /// Video to work on
    pub(crate) input: Utf8PathBuf,

    /// Where to write the GIF. Defaults to the input with a `.gif` extension
    #[arg(short, long)]
    pub(crate) output: Option<Utf8PathBuf>,

    /// Skip the terminal UI, print the timeline as JSON and export if `--output` is given
    #[arg(long)]
    pub(crate) headless: bool,

    /// Start of the exported window (SS, MM:SS or HH:MM:SS.fff)
    #[arg(long, value_parser = parse_time)]
    pub(crate) start: Option<f64>,

    /// End of the exported window (SS, MM:SS or HH:MM:SS.fff)
    #[arg(long, value_parser = parse_time)]
    pub(crate) end: Option<f64>,

    /// Output frame rate
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Output width in pixels; the height follows the aspect ratio if unset
    #[arg(long)]
    pub(crate) width: Option<u32>,

    /// Output height in pixels; the width follows the aspect ratio if unset
    #[arg(long)]
    pub(crate) height: Option<u32>,

    /// Crop rectangle as `x,y,width,height`, in percent of the frame
    #[arg(long, value_parser = parse_crop)]
    pub(crate) crop: Option<Crop>,

    /// Generate a palette for better colors, at the cost of a slower export
    #[arg(long)]
    pub(crate) palette: bool,

    /// Noise floor under which audio counts as silence, in dB
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_DB, allow_hyphen_values = true)]
    pub(crate) threshold: f64,

    /// Shortest silence worth cutting, in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_SILENCE)]
    pub(crate) min_silence: f64,

    /// Padding kept after each stretch of sound, in seconds
    #[arg(long, default_value_t = DEFAULT_BUFFER)]
    pub(crate) buffer: f64,

    /// Shortest block of sound to keep, in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_BLOCK)]
    pub(crate) min_block: f64,

    /// Silent gaps up to this long are bridged, in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_GAP)]
    pub(crate) max_gap: f64,

    /// Which blocks start out included in the export
    #[arg(long, value_enum, default_value_t = ActivePolicy::default())]
    pub(crate) active: ActivePolicy,
}

impl Args {
    pub(crate) fn silence_config(&self) -> SilenceConfig {
        SilenceConfig {
            threshold_db: self.threshold,
            min_silence_duration: self.min_silence,
            non_silence_buffer: self.buffer,
            min_non_silence_duration: self.min_block,
            max_gap_to_bridge: self.max_gap,
            active_policy: self.active,
        }
    }

    pub(crate) fn convert_option(&self) -> ConvertOption {
        let output_path = self
            .output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("gif"));

        ConvertOption {
            output_path,
            start_time: self.start,
            end_time: self.end,
            fps: self.fps.filter(|f| *f > 0),
            width: self.width.filter(|w| *w > 0),
            height: self.height.filter(|h| *h > 0),
            crop: self.crop.unwrap_or_default(),
            palette: self.palette,
        }
    }
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS`, each optionally with a fraction.
pub(crate) fn parse_time(s: &str) -> Result<f64, String> {
    let parts = s.trim().split(':').collect::<Vec<_>>();
    if parts.len() > 3 {
        return Err(format!("`{}` has too many fields", s));
    }

    let mut seconds = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        let value = if last {
            part.parse::<f64>().ok()
        } else {
            part.parse::<u32>().ok().map(f64::from)
        }
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| format!("`{}` is not a valid time", s))?;

        if i > 0 && value >= 60.0 {
            return Err(format!("`{}` has a field of 60 or more", s));
        }
        seconds = seconds * 60.0 + value;
    }

    Ok(seconds)
}

/// Parse `x,y,width,height` in percent.
fn parse_crop(s: &str) -> Result<Crop, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("`{}`: {}", s, e))?;

    let [x, y, width, height] = values[..] else {
        return Err(format!("`{}` needs exactly four values", s));
    };

    let in_range = |v: f64| (0.0..=100.0).contains(&v);
    if !(in_range(x) && in_range(y) && width > 0.0 && height > 0.0)
        || x + width > 100.0
        || y + height > 100.0
    {
        return Err(format!("`{}` does not fit inside the frame", s));
    }

    Ok(Crop {
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times() {
        assert_eq!(parse_time("12"), Ok(12.0));
        assert_eq!(parse_time("1.5"), Ok(1.5));
        assert_eq!(parse_time("01:30"), Ok(90.0));
        assert_eq!(parse_time("1:02:03.25"), Ok(3723.25));
        assert!(parse_time("").is_err());
        assert!(parse_time("1:75").is_err());
        assert!(parse_time("1.5:00").is_err());
        assert!(parse_time("-3").is_err());
        assert!(parse_time("1:2:3:4").is_err());
    }

    #[test]
    fn crops() {
        assert_eq!(
            parse_crop("10, 20, 50, 40"),
            Ok(Crop {
                x: 10.0,
                y: 20.0,
                width: 50.0,
                height: 40.0
            })
        );
        assert!(parse_crop("0,0,100").is_err());
        assert!(parse_crop("60,0,50,50").is_err());
        assert!(parse_crop("0,0,0,50").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["gifcut", "clip.mp4"]);
        assert_eq!(args.silence_config(), SilenceConfig::default());

        let option = args.convert_option();
        assert_eq!(option.output_path, "clip.gif");
        assert!(option.crop.is_full());
        assert_eq!(option.start_time, None);
    }

    #[test]
    fn negative_threshold_and_zero_sizes() {
        let args = Args::parse_from([
            "gifcut",
            "clip.mp4",
            "--threshold",
            "-30",
            "--width",
            "0",
            "--start",
            "0:05",
            "-o",
            "out.gif",
        ]);
        assert_eq!(args.silence_config().threshold_db, -30.0);

        let option = args.convert_option();
        assert_eq!(option.width, None);
        assert_eq!(option.start_time, Some(5.0));
        assert_eq!(option.output_path, "out.gif");
    }
}
