// GNU AGPL v3 License

use super::SilenceRange;
use ordered_float::OrderedFloat;

/// Clean up detector ranges into an ascending, non-overlapping list.
///
/// Ranges are clamped to the media, sorted, unioned where they overlap or
/// touch, and finally dropped if shorter than `min_silence`.
pub(crate) fn normalize(
    ranges: &[SilenceRange],
    duration: f64,
    min_silence: f64,
) -> Vec<SilenceRange> {
    let mut clamped = ranges
        .iter()
        .map(|r| SilenceRange {
            start: r.start.max(0.0),
            end: r.end.min(duration),
        })
        .filter(|r| r.start < r.end)
        .collect::<Vec<_>>();
    clamped.sort_by_key(|r| (OrderedFloat(r.start), OrderedFloat(r.end)));

    let mut merged: Vec<SilenceRange> = Vec::with_capacity(clamped.len());
    for range in clamped {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }

    let before = merged.len();
    merged.retain(|r| r.len() >= min_silence);
    if merged.len() != before {
        tracing::debug!(
            "Dropped {} silences shorter than {}s",
            before - merged.len(),
            min_silence
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: f64, end: f64) -> SilenceRange {
        SilenceRange { start, end }
    }

    #[test]
    fn sorts_and_unions_overlaps() {
        let ranges = [range(5.0, 6.0), range(1.0, 2.0), range(1.5, 3.0), range(3.0, 4.0)];
        assert_eq!(
            normalize(&ranges, 10.0, 0.1),
            vec![range(1.0, 4.0), range(5.0, 6.0)]
        );
    }

    #[test]
    fn drops_degenerate_and_short_ranges() {
        let ranges = [range(2.0, 2.0), range(4.0, 3.0), range(5.0, 5.05), range(7.0, 8.0)];
        assert_eq!(normalize(&ranges, 10.0, 0.1), vec![range(7.0, 8.0)]);
    }

    #[test]
    fn clamps_to_media() {
        let ranges = [range(-0.02, 1.0), range(9.5, 12.0), range(11.0, 12.0)];
        assert_eq!(
            normalize(&ranges, 10.0, 0.1),
            vec![range(0.0, 1.0), range(9.5, 10.0)]
        );
    }

    #[test]
    fn is_idempotent() {
        let ranges = [range(3.0, 3.05), range(0.5, 1.0), range(0.75, 2.0), range(6.0, 9.0)];
        let once = normalize(&ranges, 8.0, 0.1);
        assert_eq!(normalize(&once, 8.0, 0.1), once);
    }

    #[test]
    fn output_is_monotonic_for_any_order() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let ranges = (0..rng.usize(0..12))
                .map(|_| {
                    let start = rng.f64() * 20.0;
                    range(start, start + rng.f64() * 3.0)
                })
                .collect::<Vec<_>>();

            let mut shuffled = ranges.clone();
            rng.shuffle(&mut shuffled);

            let normalized = normalize(&ranges, 20.0, 0.1);
            assert_eq!(normalize(&shuffled, 20.0, 0.1), normalized);
            for pair in normalized.windows(2) {
                assert!(pair[0].end < pair[1].start, "{:?}", pair);
            }
            for r in &normalized {
                assert!(r.start < r.end);
            }
        }
    }
}
