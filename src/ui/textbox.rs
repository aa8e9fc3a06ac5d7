// GNU AGPL v3 License

use std::mem;
use tui::{
    style::{Modifier, Style},
    text::{Span, Spans},
    widgets::{Block as Panel, Borders, Paragraph, StatefulWidget, Widget},
};

/// Single line text entry, used for block labels.
#[derive(Default)]
pub(super) struct TextBox {
    header: Option<String>,
}

impl TextBox {
    pub(super) fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

/// State for a textbox.
#[derive(Default)]
pub(super) struct TextBoxState {
    text: String,
    focused: bool,
}

impl TextBoxState {
    pub(super) fn new(text: String) -> Self {
        Self {
            text,
            focused: false,
        }
    }

    pub(super) fn text(&self) -> &str {
        &self.text
    }

    /// Empty the box, returning what was typed.
    pub(super) fn take(&mut self) -> String {
        mem::take(&mut self.text)
    }

    pub(super) fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub(super) fn pop(&mut self) {
        self.text.pop();
    }

    pub(super) fn focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub(super) fn focused(&self) -> bool {
        self.focused
    }
}

impl StatefulWidget for TextBox {
    type State = TextBoxState;

    fn render(
        self,
        area: tui::layout::Rect,
        buf: &mut tui::buffer::Buffer,
        state: &mut Self::State,
    ) {
        let style = Style::default().add_modifier(Modifier::BOLD);
        let spans = Some(Span::from(state.text()))
            .into_iter()
            .chain(state.focused.then(|| Span::styled("_", style)))
            .collect::<Vec<_>>();

        let mut panel = Panel::default().borders(Borders::ALL);
        if let Some(header) = self.header {
            panel = panel.title(Span::styled(header, style));
        }

        Paragraph::new(Spans::from(spans)).block(panel).render(area, buf)
    }
}
