// GNU AGPL v3 License

//! Read `silencedetect` markers out of FFMPEG's log output.

use super::SilenceRange;

const START_MARKER: &str = "silence_start:";
const END_MARKER: &str = "silence_end:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    Start,
    End,
}

/// A single marker found in the detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SilenceEvent {
    pub(crate) kind: EventKind,
    /// Seconds from the start of the media.
    pub(crate) time: f64,
}

/// Lazily scan `raw` for silence markers, in the order they appear.
pub(crate) fn events(raw: &str) -> impl Iterator<Item = SilenceEvent> + '_ {
    raw.lines().flat_map(line_events)
}

/// Pair up start and end markers into ranges.
///
/// A start waits for the next end. A second start before that end replaces
/// the first one, an end at or before its start drops the pair, and a start
/// that is never closed is dropped as well.
pub(crate) fn parse_ranges(raw: &str) -> Vec<SilenceRange> {
    let mut ranges = Vec::new();
    let mut pending: Option<f64> = None;

    for event in events(raw) {
        match event.kind {
            EventKind::Start => {
                if let Some(dangling) = pending.replace(event.time) {
                    tracing::trace!("Dropping unmatched silence_start at {}", dangling);
                }
            }
            EventKind::End => match pending.take() {
                Some(start) if event.time > start => ranges.push(SilenceRange {
                    start,
                    end: event.time,
                }),
                Some(start) => {
                    tracing::trace!("Dropping reversed silence pair {} -> {}", start, event.time);
                }
                None => {
                    tracing::trace!("Ignoring silence_end at {} with no start", event.time);
                }
            },
        }
    }

    if let Some(dangling) = pending {
        tracing::debug!("Silence starting at {} never ended", dangling);
    }

    ranges
}

fn line_events(line: &str) -> impl Iterator<Item = SilenceEvent> {
    let mut found = [(START_MARKER, EventKind::Start), (END_MARKER, EventKind::End)]
        .into_iter()
        .filter_map(|(marker, kind)| {
            let at = line.find(marker)?;
            let time = parse_time(&line[at + marker.len()..])?;
            Some((at, SilenceEvent { kind, time }))
        })
        .collect::<Vec<_>>();

    // both markers on one line still count in reading order
    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, event)| event)
}

/// The number right after a marker, up to whitespace or a `|` separator.
fn parse_time(rest: &str) -> Option<f64> {
    rest.trim_start()
        .split(|c: char| c.is_whitespace() || c == '|')
        .next()?
        .parse::<f64>()
        .ok()
        .filter(|time| time.is_finite())
}
