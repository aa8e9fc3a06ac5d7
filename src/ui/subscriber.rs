// GNU AGPL v3 License

use super::UiDirective;
use std::{
    fmt::Write as _,
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::mpsc;
use tracing::{field::Visit, level_filters::LevelFilter, span, Id, Level, Subscriber};
use tui::{
    style::{Color, Modifier, Style},
    text::{Span, Spans},
};

/// Older lines are dropped once the pane holds this many.
const MAX_LINES: usize = 500;

/// A subscriber that listens for events and records them for use in the UI.
pub(crate) struct UiSubscriber {
    inner: Arc<Mutex<Inner>>,
    /// Lines lost because the pane was being drawn.
    dropped: Arc<AtomicUsize>,
    notify: mpsc::Sender<UiDirective>,
    max_level: Level,
}

pub(super) struct Inner {
    pub(super) lines: Vec<Spans<'static>>,
}

impl UiSubscriber {
    pub(crate) fn new(notify: mpsc::Sender<UiDirective>, max_level: Level) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { lines: Vec::new() })),
            dropped: Arc::new(AtomicUsize::new(0)),
            notify,
            max_level,
        }
    }

    pub(super) fn inner(&self) -> &Arc<Mutex<Inner>> {
        &self.inner
    }

    pub(super) fn dropped(&self) -> &Arc<AtomicUsize> {
        &self.dropped
    }
}

impl Subscriber for UiSubscriber {
    fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(LevelFilter::from_level(self.max_level))
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
        let md = event.metadata();

        let level_span = match *md.level() {
            Level::ERROR => Span::styled(
                "ERROR ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Level::WARN => Span::styled(
                "WARN  ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Level::INFO => Span::styled("INFO  ", Style::default().fg(Color::Green)),
            Level::DEBUG => Span::styled("DEBUG ", Style::default().fg(Color::Cyan)),
            _ => Span::styled("TRACE ", Style::default().fg(Color::Blue)),
        };

        let mut buffer = String::new();
        event.record(&mut BufferVisitor {
            buffer: &mut buffer,
        });

        // never block the thread that logs, but count what we lose
        let mut inner = match self.inner.try_lock() {
            Ok(inner) => inner,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        inner.lines.push(Spans(vec![level_span, Span::from(buffer)]));
        if inner.lines.len() > MAX_LINES {
            let excess = inner.lines.len() - MAX_LINES;
            inner.lines.drain(..excess);
        }
        mem::drop(inner);

        // send a notification to the UI to refresh
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let notify = self.notify.clone();
            handle.spawn(async move {
                notify.send(UiDirective::Refresh).await.ok();
            });
        }
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

struct BufferVisitor<'a> {
    buffer: &'a mut String,
}

impl<'a> Visit for BufferVisitor<'a> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.buffer.push_str(value);
        } else {
            write!(self.buffer, " {}={}", field.name(), value).ok();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            write!(self.buffer, "{:?}", value).ok();
        } else {
            write!(self.buffer, " {}={:?}", field.name(), value).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_lost_while_drawing() {
        let (notify, _recv) = mpsc::channel(1);
        let sub = UiSubscriber::new(notify, Level::INFO);
        let inner = sub.inner().clone();
        let dropped = sub.dropped().clone();

        tracing::subscriber::with_default(sub, || {
            let held = inner.lock().unwrap();
            tracing::info!("lost");
            mem::drop(held);
            assert_eq!(dropped.load(Ordering::Relaxed), 1);

            tracing::info!("kept");
            tracing::debug!("filtered");
        });

        assert_eq!(dropped.load(Ordering::Relaxed), 1);
        let lines = &inner.lock().unwrap().lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0[1].content, "kept");
    }
}
