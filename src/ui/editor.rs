// GNU AGPL v3 License

//! Keyboard handling for the timeline editor.

use super::{textbox::TextBoxState, UiMessage};
use crate::{silence::SilenceConfig, timeline::Timeline};
use crossterm::event::{KeyCode, KeyEvent};

/// How far `,` and `.` move a boundary, in seconds.
const NUDGE: f64 = 0.1;
/// How much `+` and `-` change the bridging threshold, in seconds.
const GAP_STEP: f64 = 0.25;
/// Colors `c` cycles a block through.
const PALETTE: [&str; 4] = ["#4CAF50", "#2196F3", "#FF9800", "#9C27B0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    /// Keys act on the block structure.
    Cut,
    /// Digits set quick labels.
    Label,
}

pub(super) struct EditorState {
    selected: usize,
    mode: Mode,
    label: TextBoxState,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            selected: 0,
            mode: Mode::Cut,
            label: TextBoxState::default(),
        }
    }
}

impl EditorState {
    pub(super) fn selected(&self) -> usize {
        self.selected
    }

    pub(super) fn mode(&self) -> Mode {
        self.mode
    }

    pub(super) fn label_box(&mut self) -> &mut TextBoxState {
        &mut self.label
    }

    /// Keep the selection valid after the block list changed under us.
    pub(super) fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Apply a key press to the timeline.
    ///
    /// Returns a message for the processing side when the key asks for
    /// something the UI cannot do itself.
    pub(super) fn handle_key(
        &mut self,
        key: KeyEvent,
        timeline: &mut Timeline,
        config: &mut SilenceConfig,
    ) -> Option<UiMessage> {
        self.clamp(timeline.len());

        if self.label.focused() {
            self.edit_label(key, timeline);
            return None;
        }

        let index = self.selected;
        let result = match key.code {
            KeyCode::Left => {
                self.selected = index.saturating_sub(1);
                Ok(())
            }
            KeyCode::Right => {
                self.selected = (index + 1).min(timeline.len().saturating_sub(1));
                Ok(())
            }
            KeyCode::Char(' ') => timeline.toggle_active(index).map(|active| {
                tracing::debug!("Block {} active: {}", index + 1, active);
            }),
            KeyCode::Tab => {
                self.mode = match self.mode {
                    Mode::Cut => Mode::Label,
                    Mode::Label => Mode::Cut,
                };
                Ok(())
            }
            KeyCode::Char(digit @ '1'..='9') if self.mode == Mode::Label => {
                timeline.set_label(index, format!("Label {}", digit))
            }
            KeyCode::Char('l') => {
                let current = timeline.blocks()[index].label.clone();
                self.label = TextBoxState::new(current);
                self.label.focus(true);
                Ok(())
            }
            KeyCode::Char('M') => timeline.merge_with_next(index),
            KeyCode::Char('c') => {
                let current = &timeline.blocks()[index].color;
                let next = PALETTE
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(current))
                    .map_or(0, |i| (i + 1) % PALETTE.len());
                timeline.set_color(index, PALETTE[next])
            }
            KeyCode::Char(',') | KeyCode::Char('.') => {
                let delta = if key.code == KeyCode::Char(',') {
                    -NUDGE
                } else {
                    NUDGE
                };
                let end = timeline.blocks()[index].end;
                timeline.resize(index, end + delta).map(|_| ())
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                config.max_gap_to_bridge += GAP_STEP;
                return Some(UiMessage::Resegment(config.clone()));
            }
            KeyCode::Char('-') => {
                config.max_gap_to_bridge = (config.max_gap_to_bridge - GAP_STEP).max(0.0);
                return Some(UiMessage::Resegment(config.clone()));
            }
            KeyCode::Enter => return Some(UiMessage::Export),
            KeyCode::Char('q') | KeyCode::Esc => return Some(UiMessage::Halt),
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!("{}", e);
        }
        None
    }

    fn edit_label(&mut self, key: KeyEvent, timeline: &mut Timeline) {
        match key.code {
            KeyCode::Char(c) => self.label.push(c),
            KeyCode::Backspace => self.label.pop(),
            KeyCode::Enter => {
                self.label.focus(false);
                let label = self.label.take();
                if let Err(e) = timeline.set_label(self.selected, label) {
                    tracing::warn!("{}", e);
                }
            }
            KeyCode::Esc => {
                self.label.focus(false);
                self.label.take();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Block, BlockKind};
    use crossterm::event::KeyModifiers;

    fn timeline() -> Timeline {
        let mut blocks = vec![
            Block::new(0.0, 2.0, BlockKind::Audible),
            Block::new(2.0, 3.0, BlockKind::Silent),
            Block::new(3.0, 6.0, BlockKind::Audible),
        ];
        blocks[0].active = true;
        Timeline::new(blocks, 6.0).unwrap()
    }

    fn press(
        editor: &mut EditorState,
        timeline: &mut Timeline,
        config: &mut SilenceConfig,
        keys: &[KeyCode],
    ) -> Vec<UiMessage> {
        keys.iter()
            .filter_map(|code| {
                editor.handle_key(KeyEvent::new(*code, KeyModifiers::NONE), timeline, config)
            })
            .collect()
    }

    #[test]
    fn selects_and_toggles() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[
                KeyCode::Left,
                KeyCode::Right,
                KeyCode::Right,
                KeyCode::Right,
                KeyCode::Char(' '),
            ],
        );
        assert_eq!(editor.selected(), 2);
        assert!(timeline.blocks()[2].active);
    }

    #[test]
    fn quick_labels_only_in_label_mode() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        press(&mut editor, &mut timeline, &mut config, &[KeyCode::Char('3')]);
        assert_eq!(timeline.blocks()[0].label, "");

        press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[KeyCode::Tab, KeyCode::Char('3')],
        );
        assert_eq!(editor.mode(), Mode::Label);
        assert_eq!(timeline.blocks()[0].label, "Label 3");
    }

    #[test]
    fn edits_label_in_textbox() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        let messages = press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[
                KeyCode::Char('l'),
                KeyCode::Char('i'),
                KeyCode::Char('n'),
                KeyCode::Char('q'),
                KeyCode::Backspace,
                KeyCode::Char('t'),
                KeyCode::Char('r'),
                KeyCode::Char('o'),
                KeyCode::Enter,
            ],
        );
        // `q` was typed, not a quit
        assert!(messages.is_empty());
        assert_eq!(timeline.blocks()[0].label, "intro");
        assert!(!editor.label_box().focused());
    }

    #[test]
    fn merges_and_nudges() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[KeyCode::Char('M'), KeyCode::Char('.')],
        );
        assert_eq!(timeline.len(), 2);
        assert!((timeline.blocks()[0].end - 3.1).abs() < 1e-9);
        assert_eq!(timeline.blocks()[1].start, timeline.blocks()[0].end);

        // last block has nothing to merge with
        press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[KeyCode::Right, KeyCode::Char('M')],
        );
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn asks_for_resegment_export_and_halt() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        let messages = press(
            &mut editor,
            &mut timeline,
            &mut config,
            &[
                KeyCode::Char('+'),
                KeyCode::Char('-'),
                KeyCode::Char('-'),
                KeyCode::Enter,
                KeyCode::Char('q'),
            ],
        );
        assert_eq!(messages.len(), 5);
        assert!(matches!(&messages[0], UiMessage::Resegment(c) if c.max_gap_to_bridge == 1.25));
        assert!(matches!(&messages[2], UiMessage::Resegment(c) if c.max_gap_to_bridge == 0.75));
        assert!(matches!(messages[3], UiMessage::Export));
        assert!(matches!(messages[4], UiMessage::Halt));
        assert_eq!(config.max_gap_to_bridge, 0.75);
    }

    #[test]
    fn cycles_colors() {
        let (mut editor, mut timeline, mut config) =
            (EditorState::default(), timeline(), SilenceConfig::default());
        press(&mut editor, &mut timeline, &mut config, &[KeyCode::Char('c')]);
        assert_eq!(timeline.blocks()[0].color, "#2196F3");

        timeline.set_color(0, "#123456").unwrap();
        press(&mut editor, &mut timeline, &mut config, &[KeyCode::Char('c')]);
        assert_eq!(timeline.blocks()[0].color, PALETTE[0]);
    }

    #[test]
    fn selection_follows_shrinking_timeline() {
        let mut editor = EditorState::default();
        editor.selected = 5;
        editor.clamp(2);
        assert_eq!(editor.selected(), 1);
        editor.clamp(0);
        assert_eq!(editor.selected(), 0);
    }
}
