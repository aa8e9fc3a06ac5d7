// GNU AGPL v3 License

use crate::timeline::{Block, BlockKind};
use clap::ValueEnum;
use serde::Serialize;

/// Which blocks of a fresh detection run start out included in the export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ActivePolicy {
    /// Only the first block; the user opts everything else in.
    #[default]
    FirstBlock,
    /// Every block with sound in it, none of the silent fillers.
    Audible,
    /// Everything.
    All,
}

/// Set the `active` flag of every block according to `policy`.
pub(crate) fn activate(blocks: &mut [Block], policy: ActivePolicy) {
    for (i, block) in blocks.iter_mut().enumerate() {
        block.active = match policy {
            ActivePolicy::FirstBlock => i == 0,
            ActivePolicy::Audible => block.kind == BlockKind::Audible,
            ActivePolicy::All => true,
        };
    }
}
