// GNU AGPL v3 License

//! Turn `silencedetect` output into a timeline of blocks.

mod events;
mod merge;
mod ranges;
mod segments;

use crate::{
    activate::{self, ActivePolicy},
    timeline::{Block, DEFAULT_COLOR},
};
use serde::Serialize;

pub(crate) use events::parse_ranges;

pub(crate) const DEFAULT_THRESHOLD_DB: f64 = -40.0;
pub(crate) const DEFAULT_MIN_SILENCE: f64 = 0.1;
pub(crate) const DEFAULT_BUFFER: f64 = 0.3;
pub(crate) const DEFAULT_MIN_BLOCK: f64 = 0.3;
pub(crate) const DEFAULT_MAX_GAP: f64 = 1.0;

/// A confirmed stretch of silence, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SilenceRange {
    pub(crate) start: f64,
    pub(crate) end: f64,
}

impl SilenceRange {
    pub(crate) fn len(self) -> f64 {
        self.end - self.start
    }
}

/// Tunables for detection and segmentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SilenceConfig {
    /// Noise floor handed to the detector, in dB.
    pub(crate) threshold_db: f64,
    /// Silences shorter than this are not worth cutting.
    pub(crate) min_silence_duration: f64,
    /// Padding added after each stretch of sound.
    pub(crate) non_silence_buffer: f64,
    /// Sound blocks shorter than this (after padding) are dropped.
    pub(crate) min_non_silence_duration: f64,
    /// Gaps up to this long are bridged instead of getting their own block.
    pub(crate) max_gap_to_bridge: f64,
    pub(crate) active_policy: ActivePolicy,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            min_silence_duration: DEFAULT_MIN_SILENCE,
            non_silence_buffer: DEFAULT_BUFFER,
            min_non_silence_duration: DEFAULT_MIN_BLOCK,
            max_gap_to_bridge: DEFAULT_MAX_GAP,
            active_policy: ActivePolicy::default(),
        }
    }
}

impl SilenceConfig {
    /// The `silencedetect` filter expression for these settings.
    pub(crate) fn detect_filter(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={}",
            self.threshold_db, self.min_silence_duration
        )
    }
}

/// Run the whole pipeline on raw detector output.
pub(crate) fn detect_blocks(raw: &str, duration: f64, config: &SilenceConfig) -> Vec<Block> {
    segment(&parse_ranges(raw), duration, config)
}

/// Build the final block list from already parsed silences.
///
/// An empty or unusable range list yields a single block spanning the media.
pub(crate) fn segment(
    silences: &[SilenceRange],
    duration: f64,
    config: &SilenceConfig,
) -> Vec<Block> {
    if !(duration.is_finite() && duration > 0.0) {
        tracing::warn!("Refusing to segment media with duration {}", duration);
        return Vec::new();
    }

    let silences = ranges::normalize(silences, duration, config.min_silence_duration);
    tracing::info!("{} silences after normalization", silences.len());

    let candidates = segments::build_candidates(
        &silences,
        duration,
        config.non_silence_buffer,
        config.min_non_silence_duration,
    );
    tracing::debug!("{} candidate blocks", candidates.len());

    let blocks = merge::merge_blocks(candidates, duration, config.max_gap_to_bridge);
    tracing::info!("Generated {} blocks", blocks.len());

    finalize(blocks, config.active_policy)
}

/// Label, color and activate a fresh block list.
fn finalize(mut blocks: Vec<Block>, policy: ActivePolicy) -> Vec<Block> {
    for (i, block) in blocks.iter_mut().enumerate() {
        block.label = format!("Segment {}", i + 1);
        block.color = DEFAULT_COLOR.to_string();
    }
    activate::activate(&mut blocks, policy);
    blocks
}
