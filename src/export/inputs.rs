// GNU AGPL v3 License

use super::SEGMENT_PADDING;
use crate::timeline::Segment;
use camino::Utf8Path;

/// Input options reading the entire source.
pub(super) fn whole_input(source: &Utf8Path) -> impl Iterator<Item = String> {
    ["-i".to_string(), source.to_string()].into_iter()
}

/// One trimmed, stream-copied input per segment.
pub(super) fn segment_inputs<'a>(
    source: &'a Utf8Path,
    segments: &'a [Segment],
) -> impl Iterator<Item = String> + 'a {
    segments.iter().flat_map(move |segment| {
        let (start, end) = padded(*segment);
        [
            "-ss".to_string(),
            start.to_string(),
            "-to".to_string(),
            end.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
            "-i".to_string(),
            source.to_string(),
        ]
    })
}

/// The range actually read for a segment.
pub(super) fn padded(segment: Segment) -> (f64, f64) {
    (
        (segment.start - SEGMENT_PADDING).max(0.0),
        segment.end + SEGMENT_PADDING,
    )
}
