// GNU AGPL v3 License

//! The editable block list for one detection run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presentation color given to every freshly detected block.
pub(crate) const DEFAULT_COLOR: &str = "#4CAF50";

/// Boundaries cannot be dragged closer than this to a neighbour.
const MIN_BLOCK_LEN: f64 = 0.05;

/// What a block was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BlockKind {
    /// Media with sound in it, possibly padded into the surrounding silence.
    Audible,
    /// Filler covering a silent stretch.
    Silent,
}

/// A labeled time interval, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Block {
    pub(crate) start: f64,
    pub(crate) end: f64,
    /// Whether this block's media is included in the export.
    pub(crate) active: bool,
    pub(crate) label: String,
    pub(crate) color: String,
    pub(crate) kind: BlockKind,
}

impl Block {
    pub(crate) fn new(start: f64, end: f64, kind: BlockKind) -> Self {
        Self {
            start,
            end,
            active: false,
            label: String::new(),
            color: DEFAULT_COLOR.to_string(),
            kind,
        }
    }

    pub(crate) fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment, `[start, end)`.
    pub(crate) fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub(crate) fn segment(&self) -> Segment {
        Segment {
            start: self.start,
            end: self.end,
        }
    }
}

/// The part of a block the export cares about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct Segment {
    pub(crate) start: f64,
    pub(crate) end: f64,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum TimelineError {
    #[error("the timeline has no blocks")]
    Empty,
    #[error("block index {index} is out of range ({len} blocks)")]
    OutOfRange { index: usize, len: usize },
    #[error("block {index} has no following block")]
    NoNextBlock { index: usize },
    #[error("the timeline starts at {0} instead of 0")]
    BadStart(f64),
    #[error("the timeline ends at {found} instead of {expected}")]
    BadEnd { found: f64, expected: f64 },
    #[error("block {index} is empty or reversed")]
    Degenerate { index: usize },
    #[error("block {index} does not start where the previous block ends")]
    Discontinuous { index: usize },
    #[error("block {index} and its successor are too short to move their boundary")]
    NoRoom { index: usize },
}

/// Editing session over a validated block list.
///
/// Every mutation keeps the blocks covering `[0, duration]` without gaps or
/// overlaps, so the list can be handed to the export at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Timeline {
    duration: f64,
    blocks: Vec<Block>,
}

impl Timeline {
    pub(crate) fn new(blocks: Vec<Block>, duration: f64) -> Result<Self, TimelineError> {
        check_invariants(&blocks, duration)?;
        Ok(Self { duration, blocks })
    }

    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn duration(&self) -> f64 {
        self.duration
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Swap in the result of a new detection run.
    pub(crate) fn replace(&mut self, blocks: Vec<Block>) -> Result<(), TimelineError> {
        check_invariants(&blocks, self.duration)?;
        self.blocks = blocks;
        Ok(())
    }

    /// Index of the block playing at `time`.
    pub(crate) fn block_at(&self, time: f64) -> Option<usize> {
        if !(0.0..=self.duration).contains(&time) {
            return None;
        }

        let index = self.blocks.partition_point(|b| b.end <= time);
        if index < self.blocks.len() {
            Some(index)
        } else {
            // exactly at the end of the media
            self.blocks.len().checked_sub(1)
        }
    }

    /// Where playback should continue when skipping inactive blocks, or
    /// `None` if `time` is already inside an active block.
    pub(crate) fn next_audible_after(&self, time: f64) -> Option<f64> {
        let index = self.block_at(time)?;
        if self.blocks[index].active {
            return None;
        }

        let resume = self.blocks[index..]
            .iter()
            .find(|b| b.active)
            .map_or(self.duration, |b| b.start);
        Some(resume)
    }

    pub(crate) fn toggle_active(&mut self, index: usize) -> Result<bool, TimelineError> {
        let block = self.block_mut(index)?;
        block.active = !block.active;
        Ok(block.active)
    }

    pub(crate) fn set_label(
        &mut self,
        index: usize,
        label: impl Into<String>,
    ) -> Result<(), TimelineError> {
        self.block_mut(index)?.label = label.into();
        Ok(())
    }

    pub(crate) fn set_color(
        &mut self,
        index: usize,
        color: impl Into<String>,
    ) -> Result<(), TimelineError> {
        self.block_mut(index)?.color = color.into();
        Ok(())
    }

    /// Absorb block `index + 1` into block `index`.
    ///
    /// The merged block keeps the first block's label, color and active flag.
    pub(crate) fn merge_with_next(&mut self, index: usize) -> Result<(), TimelineError> {
        self.check_index(index)?;
        if index + 1 >= self.blocks.len() {
            return Err(TimelineError::NoNextBlock { index });
        }

        let next = self.blocks.remove(index + 1);
        let block = &mut self.blocks[index];
        block.end = next.end;
        if next.kind == BlockKind::Audible {
            block.kind = BlockKind::Audible;
        }

        Ok(())
    }

    /// Move the boundary between block `index` and its successor.
    ///
    /// The new end is clamped so that neither block shrinks below a minimum
    /// length. Returns the boundary actually applied.
    pub(crate) fn resize(&mut self, index: usize, new_end: f64) -> Result<f64, TimelineError> {
        self.check_index(index)?;
        if index + 1 >= self.blocks.len() {
            return Err(TimelineError::NoNextBlock { index });
        }

        let lo = self.blocks[index].start + MIN_BLOCK_LEN;
        let hi = self.blocks[index + 1].end - MIN_BLOCK_LEN;
        if lo > hi {
            return Err(TimelineError::NoRoom { index });
        }

        let boundary = new_end.clamp(lo, hi);
        self.blocks[index].end = boundary;
        self.blocks[index + 1].start = boundary;

        Ok(boundary)
    }

    /// The ranges to export, in timeline order.
    pub(crate) fn active_segments(&self) -> Vec<Segment> {
        self.blocks
            .iter()
            .filter(|b| b.active)
            .map(Block::segment)
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<(), TimelineError> {
        check_invariants(&self.blocks, self.duration)
    }

    fn check_index(&self, index: usize) -> Result<(), TimelineError> {
        if index < self.blocks.len() {
            Ok(())
        } else {
            Err(TimelineError::OutOfRange {
                index,
                len: self.blocks.len(),
            })
        }
    }

    fn block_mut(&mut self, index: usize) -> Result<&mut Block, TimelineError> {
        let len = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or(TimelineError::OutOfRange { index, len })
    }
}

/// Check full coverage of `[0, duration]` with contiguous, non-empty blocks.
pub(crate) fn check_invariants(blocks: &[Block], duration: f64) -> Result<(), TimelineError> {
    let (first, last) = match (blocks.first(), blocks.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(TimelineError::Empty),
    };

    if first.start != 0.0 {
        return Err(TimelineError::BadStart(first.start));
    }
    if last.end != duration {
        return Err(TimelineError::BadEnd {
            found: last.end,
            expected: duration,
        });
    }

    for (index, block) in blocks.iter().enumerate() {
        if !(block.start < block.end) {
            return Err(TimelineError::Degenerate { index });
        }
        if index > 0 && block.start != blocks[index - 1].end {
            return Err(TimelineError::Discontinuous { index });
        }
    }

    Ok(())
}
