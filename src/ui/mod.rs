// GNU AGPL v3 License

use crate::{process::ExportStatus, silence::SilenceConfig, timeline::Timeline};
use anyhow::{anyhow, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{
    io::{self, Write},
    mem, process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::Duration,
};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tracing::Level;
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block as Panel, Borders, Gauge, List, ListState, Paragraph},
    Frame, Terminal,
};

mod editor;
mod subscriber;
mod textbox;
mod timeline;

use editor::{EditorState, Mode};
use textbox::TextBox;

/// Run the UI thread.
///
/// Communicates with the rest of the program via a channel.
pub(crate) async fn ui_thread(
    send_data: mpsc::Receiver<UiDirective>,
    sender: mpsc::Sender<UiDirective>,
    ui_data: broadcast::Sender<UiMessage>,
) -> Result<()> {
    // establish our backend
    let mut terminal = tokio::task::spawn_blocking(|| {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        anyhow::Ok(terminal)
    })
    .await??;

    let mut cleanup = Cleanup {
        terminal: &mut terminal,
        cleaned: false,
    };

    run_ui(cleanup.terminal, send_data, sender, ui_data).await?;

    // restore the terminal that was there before
    tokio::task::block_in_place(move || cleanup.cleanup())?;

    Ok(())
}

struct Cleanup<'a, W: Write> {
    terminal: &'a mut Terminal<CrosstermBackend<W>>,
    cleaned: bool,
}

impl<'a, W: Write> Cleanup<'a, W> {
    fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        self.cleaned = true;

        anyhow::Ok(())
    }
}

impl<'a, W: Write> Drop for Cleanup<'a, W> {
    fn drop(&mut self) {
        if !self.cleaned {
            let _ = self.cleanup();
        }
    }
}

async fn run_ui<B: Backend + Send + 'static>(
    terminal: &mut Terminal<B>,
    mut send_data: mpsc::Receiver<UiDirective>,
    sender: mpsc::Sender<UiDirective>,
    ui_data: broadcast::Sender<UiMessage>,
) -> Result<()> {
    // set up an event stream
    let mut event_stream = EventStream::new();

    // open up a tracing channel
    let sub = subscriber::UiSubscriber::new(sender, Level::INFO);
    let span_events = sub.inner().clone();
    let dropped_events = sub.dropped().clone();
    tracing::subscriber::set_global_default(sub)?;

    // state for the UI drawing
    let mut state = DrawState {
        last_directive: UiDirective::DisplayText("Loading...".to_string()),
        tracing_events: span_events,
        dropped_events,
        editor: EditorState::default(),
        finished: false,
    };

    loop {
        // block in place while we draw the UI
        tokio::task::block_in_place(|| terminal.draw(|frame| draw_ui(frame, &mut state)))?;

        // wait for an event from either the UI or the channel from the main program
        tokio::select! {
            directive = send_data.recv() => {
                match directive {
                    Some(UiDirective::Stop) | None => state.finished = true,
                    Some(UiDirective::Refresh) => {},
                    Some(dir) => if !state.finished { state.last_directive = dir; },
                }
            },
            event = event_stream.next() => {
                let event = match event {
                    Some(event) => event?,
                    None => return Ok(()),
                };

                if let Event::Key(key) = event {
                    if state.finished {
                        return Ok(());
                    }

                    // if the user hits ctrl-c, stop the program
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        ui_data.send(UiMessage::Halt).ok();

                        // spawn a task that exits the process after 5 seconds if something
                        // is hanging
                        tokio::spawn(async {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            process::exit(1);
                        });

                        return Err(anyhow!("User requested exit"));
                    }

                    let message = match &mut state.last_directive {
                        UiDirective::Timeline { timeline, config } => {
                            let mut timeline = timeline.write().unwrap_or_else(PoisonError::into_inner);
                            state.editor.handle_key(key, &mut timeline, config)
                        }
                        // during an export only cancellation is possible
                        UiDirective::Export(ExportStatus::Processing(_))
                            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) =>
                        {
                            Some(UiMessage::Halt)
                        }
                        _ => None,
                    };

                    if let Some(message) = message {
                        tracing::debug!("Sending {:?}", message);
                        ui_data.send(message).ok();
                    }
                }
            }
        }
    }
}

fn draw_ui(frame: &mut Frame<'_, impl Backend>, state: &mut DrawState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
        .split(frame.size());

    let title = if state.finished {
        "Press any key to exit"
    } else {
        "Message"
    };

    match &state.last_directive {
        UiDirective::Timeline { timeline, config } => {
            let timeline = timeline.read().unwrap_or_else(PoisonError::into_inner);
            draw_timeline(frame, chunks[0], &timeline, config, &mut state.editor);
        }
        UiDirective::Export(status) => draw_export(frame, chunks[0], status, title),
        UiDirective::DisplayText(text) => draw_text(frame, chunks[0], text, title),
        UiDirective::Stop | UiDirective::Refresh => {}
    }

    let height = chunks[1].height.saturating_sub(2);
    let events = state
        .tracing_events
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let text = events
        .lines
        .iter()
        .rev()
        .take(height as usize)
        .rev()
        .cloned()
        .collect::<Vec<_>>();
    mem::drop(events);

    let p = Paragraph::new(text)
        .alignment(Alignment::Left)
        .block(Panel::default().borders(Borders::ALL).title(log_title(
            state.dropped_events.load(Ordering::Relaxed),
        )));
    frame.render_widget(p, chunks[1]);
}

fn log_title(dropped: usize) -> String {
    match dropped {
        0 => "Tracing".to_string(),
        n => format!("Tracing ({} dropped)", n),
    }
}

fn draw_text(frame: &mut Frame<'_, impl Backend>, area: Rect, text: &str, title: &str) {
    let spans = Spans::from(Span::styled(
        text,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let p = Paragraph::new(spans)
        .alignment(Alignment::Left)
        .block(Panel::default().borders(Borders::ALL).title(title));
    frame.render_widget(p, area);
}

fn draw_export(frame: &mut Frame<'_, impl Backend>, area: Rect, status: &ExportStatus, title: &str) {
    match status {
        ExportStatus::Processing(pct) => {
            let gauge = Gauge::default()
                .block(Panel::default().borders(Borders::ALL).title("Exporting (q to cancel)"))
                .gauge_style(Style::default().fg(Color::Green))
                .percent(pct.clamp(0.0, 100.0) as u16);
            frame.render_widget(gauge, area);
        }
        ExportStatus::Canceled => draw_text(frame, area, "Export canceled.", title),
        ExportStatus::Error(msg) => {
            draw_text(frame, area, &format!("Export failed: {}", msg), title)
        }
        ExportStatus::End => draw_text(frame, area, "Export finished.", title),
    }
}

fn draw_timeline(
    frame: &mut Frame<'_, impl Backend>,
    area: Rect,
    timeline: &Timeline,
    config: &SilenceConfig,
    editor: &mut EditorState,
) {
    editor.clamp(timeline.len());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let mode = match editor.mode() {
        Mode::Cut => "cut",
        Mode::Label => "label",
    };
    let title = format!(
        "Timeline {:.2}s | {} mode | bridge gaps <= {:.2}s",
        timeline.duration(),
        mode,
        config.max_gap_to_bridge
    );
    let bar_width = chunks[0].width.saturating_sub(2);
    let bar = Paragraph::new(timeline::bar(timeline, editor.selected(), bar_width))
        .block(Panel::default().borders(Borders::ALL).title(title));
    frame.render_widget(bar, chunks[0]);

    let list = List::new(timeline::items(timeline))
        .block(Panel::default().borders(Borders::ALL).title("Blocks"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default();
    list_state.select(Some(editor.selected()));
    frame.render_stateful_widget(list, chunks[1], &mut list_state);

    if editor.label_box().focused() {
        frame.render_stateful_widget(
            TextBox::default().header("Label (Enter to save, Esc to cancel)"),
            chunks[2],
            editor.label_box(),
        );
    } else {
        let help = "←/→ select  space toggle  tab mode  l label  c color  M merge  ,/. move end  \
                    +/- bridge  enter export  q quit";
        let p = Paragraph::new(help).block(Panel::default().borders(Borders::ALL));
        frame.render_widget(p, chunks[2]);
    }
}

struct DrawState {
    last_directive: UiDirective,
    tracing_events: Arc<Mutex<subscriber::Inner>>,
    dropped_events: Arc<AtomicUsize>,
    editor: EditorState,
    /// The processing side is done; the next key press exits.
    finished: bool,
}

#[derive(Debug)]
pub(crate) enum UiDirective {
    /// Request the UI to display some text.
    DisplayText(String),
    /// Hand the timeline over for editing.
    Timeline {
        timeline: Arc<RwLock<Timeline>>,
        config: SilenceConfig,
    },
    /// Report on a running export.
    Export(ExportStatus),
    /// Request the UI to stop gracefully.
    Stop,
    /// We just need to refresh.
    Refresh,
}

#[derive(Debug, Clone)]
pub(crate) enum UiMessage {
    /// Halt the program as gracefully as possible.
    Halt,
    /// Rebuild the blocks with new settings.
    Resegment(SilenceConfig),
    /// Export the active blocks.
    Export,
}
