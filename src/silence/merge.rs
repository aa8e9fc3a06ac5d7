// GNU AGPL v3 License

use crate::timeline::{Block, BlockKind};

/// Merge candidate blocks into a contiguous sequence covering `[0, duration]`.
///
/// In one left-to-right pass, a block overlapping the previous one is folded
/// into it, a block after a gap of at most `max_gap` is bridged over, and a
/// block after a longer gap gets a silent filler in front of it. Blocks that
/// already touch the previous one are kept as they are, so merging the output
/// again changes nothing.
pub(crate) fn merge_blocks(candidates: Vec<Block>, duration: f64, max_gap: f64) -> Vec<Block> {
    let mut merged: Vec<Block> = Vec::with_capacity(candidates.len() * 2);

    for mut candidate in candidates {
        candidate.end = candidate.end.min(duration);
        if !(candidate.start < candidate.end) {
            continue;
        }

        let Some(prev) = merged.last_mut() else {
            merged.push(candidate);
            continue;
        };

        // overlap always wins over bridging
        if candidate.start < prev.end {
            prev.end = prev.end.max(candidate.end);
            continue;
        }

        let gap = candidate.start - prev.end;
        if gap > 0.0 && gap <= max_gap {
            prev.end = candidate.end;
            continue;
        }

        if gap > 0.0 {
            let filler = Block::new(prev.end, candidate.start, BlockKind::Silent);
            merged.push(filler);
        }
        merged.push(candidate);
    }

    match merged.first() {
        Some(first) if first.start > 0.0 => {
            let filler = Block::new(0.0, first.start, BlockKind::Silent);
            merged.insert(0, filler);
        }
        Some(_) => {}
        None if duration > 0.0 => {
            return vec![Block::new(0.0, duration, BlockKind::Silent)];
        }
        None => return merged,
    }

    if let Some(last) = merged.last_mut() {
        if last.end < duration {
            last.end = duration;
        }
    }

    merged.retain(|b| b.start < b.end);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(start: f64, end: f64) -> Block {
        Block::new(start, end, BlockKind::Audible)
    }

    fn spans(blocks: &[Block]) -> Vec<(f64, f64, BlockKind)> {
        blocks.iter().map(|b| (b.start, b.end, b.kind)).collect()
    }

    #[test]
    fn folds_overlaps() {
        let blocks = merge_blocks(
            vec![candidate(0.0, 3.0), candidate(2.0, 5.0), candidate(4.0, 4.5)],
            5.0,
            1.0,
        );
        assert_eq!(spans(&blocks), vec![(0.0, 5.0, BlockKind::Audible)]);
    }

    #[test]
    fn bridges_gap_at_threshold() {
        let blocks = merge_blocks(vec![candidate(0.0, 2.0), candidate(3.0, 6.0)], 6.0, 1.0);
        assert_eq!(spans(&blocks), vec![(0.0, 6.0, BlockKind::Audible)]);
    }

    #[test]
    fn fills_gap_past_threshold() {
        let blocks = merge_blocks(vec![candidate(0.0, 2.0), candidate(3.25, 6.0)], 6.0, 1.0);
        assert_eq!(
            spans(&blocks),
            vec![
                (0.0, 2.0, BlockKind::Audible),
                (2.0, 3.25, BlockKind::Silent),
                (3.25, 6.0, BlockKind::Audible),
            ]
        );
    }

    #[test]
    fn fills_gap_just_past_threshold() {
        let start = 3.0 + 1e-9;
        let blocks = merge_blocks(vec![candidate(0.0, 2.0), candidate(start, 6.0)], 6.0, 1.0);
        assert_eq!(
            spans(&blocks),
            vec![
                (0.0, 2.0, BlockKind::Audible),
                (2.0, start, BlockKind::Silent),
                (start, 6.0, BlockKind::Audible),
            ]
        );
    }

    #[test]
    fn keeps_touching_blocks_apart() {
        let input = vec![
            Block::new(0.0, 1.5, BlockKind::Silent),
            candidate(1.5, 4.0),
        ];
        let blocks = merge_blocks(input.clone(), 4.0, 1.0);
        assert_eq!(blocks, input);
    }

    #[test]
    fn restores_coverage_at_both_ends() {
        let blocks = merge_blocks(vec![candidate(2.0, 5.0)], 8.0, 1.0);
        assert_eq!(
            spans(&blocks),
            vec![
                (0.0, 2.0, BlockKind::Silent),
                (2.0, 8.0, BlockKind::Audible),
            ]
        );
    }

    #[test]
    fn drops_degenerate_candidates() {
        let blocks = merge_blocks(
            vec![candidate(0.0, 2.0), candidate(2.5, 2.5), candidate(4.0, 3.0)],
            2.0,
            1.0,
        );
        assert_eq!(spans(&blocks), vec![(0.0, 2.0, BlockKind::Audible)]);
    }

    #[test]
    fn empty_input_still_covers_media() {
        let blocks = merge_blocks(vec![], 3.0, 1.0);
        assert_eq!(spans(&blocks), vec![(0.0, 3.0, BlockKind::Silent)]);
        assert!(merge_blocks(vec![], 0.0, 1.0).is_empty());
    }

    #[test]
    fn merging_twice_changes_nothing() {
        let once = merge_blocks(
            vec![
                candidate(0.0, 2.3),
                candidate(3.7, 5.0),
                candidate(5.5, 6.0),
                candidate(5.8, 7.0),
            ],
            10.0,
            1.0,
        );
        assert_eq!(merge_blocks(once.clone(), 10.0, 1.0), once);
    }
}
