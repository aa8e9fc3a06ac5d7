// GNU AGPL v3 License

use super::SilenceRange;
use crate::timeline::{Block, BlockKind};

/// Turn normalized silences into candidate blocks covering `[0, duration]`.
///
/// Each stretch of sound between two silences becomes a block padded by
/// `buffer` into the following silence. Blocks shorter than `min_len` are
/// dropped. Padding may make neighbours overlap; that is left for the merger.
pub(crate) fn build_candidates(
    silences: &[SilenceRange],
    duration: f64,
    buffer: f64,
    min_len: f64,
) -> Vec<Block> {
    if silences.is_empty() {
        return vec![Block::new(0.0, duration, BlockKind::Audible)];
    }

    let mut blocks: Vec<Block> = Vec::with_capacity(silences.len() + 2);
    let mut last_end = 0.0;

    for silence in silences {
        if silence.start > last_end {
            let candidate = Block::new(
                last_end,
                (silence.start + buffer).min(duration),
                BlockKind::Audible,
            );
            if candidate.len() >= min_len {
                blocks.push(candidate);
            } else {
                tracing::trace!(
                    "Dropping short block {:.3}-{:.3}",
                    candidate.start,
                    candidate.end
                );
            }
        }
        last_end = silence.end;
    }

    // the sound after the last silence
    if last_end < duration {
        let trailing = Block::new((last_end - buffer).max(0.0), duration, BlockKind::Audible);
        if trailing.len() >= min_len {
            blocks.push(trailing);
        } else if let Some(last) = blocks.last_mut() {
            last.end = duration;
        }
    }

    let first_start = match blocks.first() {
        Some(first) => first.start,
        None => {
            // nothing audible survived: the whole clip is one silence
            return vec![Block::new(0.0, duration, BlockKind::Silent)];
        }
    };

    if first_start > 0.0 {
        blocks.insert(0, Block::new(0.0, first_start, BlockKind::Silent));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(blocks: &[Block]) -> Vec<(f64, f64)> {
        blocks.iter().map(|b| (b.start, b.end)).collect()
    }

    fn silence(start: f64, end: f64) -> SilenceRange {
        SilenceRange { start, end }
    }

    #[test]
    fn no_silence_is_one_block() {
        let blocks = build_candidates(&[], 12.5, 0.3, 0.3);
        assert_eq!(spans(&blocks), vec![(0.0, 12.5)]);
        assert_eq!(blocks[0].kind, BlockKind::Audible);
    }

    #[test]
    fn pads_blocks_into_silence() {
        let blocks = build_candidates(&[silence(2.0, 4.0)], 10.0, 0.5, 0.3);
        assert_eq!(spans(&blocks), vec![(0.0, 2.5), (3.5, 10.0)]);
    }

    #[test]
    fn drops_short_blocks() {
        // 0.25s of sound between the silences is under the minimum even padded
        let silences = [silence(1.0, 3.0), silence(3.25, 6.0)];
        let blocks = build_candidates(&silences, 10.0, 0.0, 0.5);
        assert_eq!(spans(&blocks), vec![(0.0, 1.0), (6.0, 10.0)]);
    }

    #[test]
    fn short_tail_extends_previous_block() {
        let blocks = build_candidates(&[silence(2.0, 9.875)], 10.0, 0.0, 0.5);
        assert_eq!(spans(&blocks), vec![(0.0, 10.0)]);
    }

    #[test]
    fn leading_silence_gets_a_block() {
        let blocks = build_candidates(&[silence(0.0, 3.0)], 10.0, 0.5, 0.3);
        assert_eq!(spans(&blocks), vec![(0.0, 2.5), (2.5, 10.0)]);
        assert_eq!(blocks[0].kind, BlockKind::Silent);
        assert_eq!(blocks[1].kind, BlockKind::Audible);
    }

    #[test]
    fn all_silence_is_one_silent_block() {
        let blocks = build_candidates(&[silence(0.0, 10.0)], 10.0, 0.5, 0.3);
        assert_eq!(spans(&blocks), vec![(0.0, 10.0)]);
        assert_eq!(blocks[0].kind, BlockKind::Silent);
    }

    #[test]
    fn padding_is_clamped_to_media() {
        let blocks = build_candidates(&[silence(9.5, 10.0)], 10.0, 1.0, 0.3);
        assert_eq!(spans(&blocks), vec![(0.0, 10.0)]);
    }
}
