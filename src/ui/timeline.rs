// GNU AGPL v3 License

//! Drawing the timeline bar and block list.

use crate::timeline::{BlockKind, Timeline};
use tui::{
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::ListItem,
};

/// Blocks left out of the export are drawn in this color.
const INACTIVE_COLOR: Color = Color::Rgb(0xFF, 0x52, 0x52);

/// One row of cells, each block taking a share proportional to its length.
pub(super) fn bar(timeline: &Timeline, selected: usize, width: u16) -> Spans<'static> {
    let width = f64::from(width);
    let duration = timeline.duration();
    let cell = |t: f64| (t / duration * width).round() as usize;

    let spans = timeline
        .blocks()
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let cells = cell(block.end).saturating_sub(cell(block.start));
            let color = if block.active {
                parse_hex(&block.color).unwrap_or(Color::Green)
            } else {
                INACTIVE_COLOR
            };

            let (glyph, style) = if i == selected {
                ("▀", Style::default().fg(color).bg(Color::White))
            } else {
                ("█", Style::default().fg(color))
            };
            Span::styled(glyph.repeat(cells), style)
        })
        .collect::<Vec<_>>();

    Spans::from(spans)
}

/// One list entry per block.
pub(super) fn items(timeline: &Timeline) -> Vec<ListItem<'static>> {
    timeline
        .blocks()
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let marker = if block.active { "[x]" } else { "[ ]" };
            let kind = match block.kind {
                BlockKind::Audible => "sound",
                BlockKind::Silent => "silence",
            };
            let mut style = Style::default();
            if !block.active {
                style = style.fg(Color::DarkGray);
            }

            ListItem::new(Spans::from(vec![
                Span::styled(
                    format!("{:>3} {} ", i + 1, marker),
                    style.add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "{:>8.2}s - {:>8.2}s  {:<16} {}",
                        block.start, block.end, block.label, kind
                    ),
                    style,
                ),
            ]))
        })
        .collect()
}

/// `#RRGGBB` to a terminal color.
pub(super) fn parse_hex(color: &str) -> Option<Color> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
