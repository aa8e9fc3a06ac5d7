// GNU AGPL v3 License

#![forbid(unsafe_code)]

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use clap::Parser;
use export::ExportCommand;
use process::ExportStatus;
use serde::Serialize;
use silence::{SilenceConfig, SilenceRange};
use std::{
    future::Future,
    process as proc,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use timeline::Timeline;
use tokio::{
    sync::{broadcast, mpsc},
    task::{JoinError, JoinHandle},
    time::interval,
};
use video_info::VideoInfo;

mod activate;
mod cli;
mod export;
mod log;
mod process;
mod silence;
mod timeline;
mod ui;
mod video_info;

fn main() {
    let args = cli::Args::parse();

    // spawn the tokio runtime
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Unable to start the Tokio runtime: {:?}", e);
            eprintln!("Cannot continue, exiting...");
            proc::exit(1);
        }
    };

    // run the main function
    if let Err(e) = runtime.block_on(entry(args)) {
        eprintln!("Encountered a fatal error: {:?}", e);

        // if it's a join panic, resume it
        if let Ok(jh) = e.downcast::<JoinError>() {
            if let Ok(pn) = jh.try_into_panic() {
                match pn.downcast::<String>() {
                    Ok(s) => eprintln!("Panic message: {}", s),
                    Err(pn) => {
                        if let Ok(s) = pn.downcast::<&'static str>() {
                            eprintln!("Panic message: {}", s);
                        }
                    }
                }
            }
        }

        proc::exit(1);
    }
}

/// Intended to wrap the real main function (`processing`) with
/// a terminal UI, unless we run headless.
async fn entry(args: cli::Args) -> Result<()> {
    if args.headless {
        log::init_headless_logging()?;
        return headless(&args).await;
    }

    // spawn the terminal UI thread
    let (mut send_data, recv_data) = mpsc::channel(10);
    let (send_ui, mut recv_ui) = broadcast::channel(16);

    let sd_clone = send_data.clone();
    let ui_thread = tokio::spawn(async move {
        ui::ui_thread(recv_data, sd_clone, send_ui)
            .await
            .map_err(|e| {
                tracing::error!("UI thread failed: {}", e);
                e
            })
    });

    let res = processing(&args, &mut send_data, &mut recv_ui).await;
    tracing::info!("Reached end of processing execution");
    if let Err(ref err) = res {
        tracing::error!("Processing failed: {}", err);
    }

    // even if the main system failed, we should let the UI thread
    // stop gracefully to avoid corrupting the current
    // terminal env
    let _ = send_data.send(ui::UiDirective::Stop).await;

    ui_thread.await??;

    res
}

async fn processing(
    args: &cli::Args,
    send_data: &mut mpsc::Sender<ui::UiDirective>,
    recv_ui: &mut broadcast::Receiver<ui::UiMessage>,
) -> Result<()> {
    let input = args.input.as_path();

    let info = {
        let _ui_guard = spawn_ellipses_task(send_data, "Inspecting video file");
        let path = input.to_owned();
        let handle = tokio::spawn(async move { video_info::inspect(&path).await });
        finish_task(handle, recv_ui).await??
    };
    tracing::info!("{:?}", info);

    let mut config = args.silence_config();
    let mut silences = detect(input, &config, send_data, recv_ui).await?;

    let blocks = silence::segment(&silences, info.duration, &config);
    let timeline = Arc::new(RwLock::new(Timeline::new(blocks, info.duration)?));

    loop {
        send_data
            .send(ui::UiDirective::Timeline {
                timeline: timeline.clone(),
                config: config.clone(),
            })
            .await?;

        // wait for a UI response
        match recv_ui.recv().await? {
            ui::UiMessage::Halt => return Ok(()),
            ui::UiMessage::Resegment(new_config) => {
                // only the detector settings require another ffmpeg run
                if new_config.detect_filter() != config.detect_filter() {
                    silences = detect(input, &new_config, send_data, recv_ui).await?;
                }
                config = new_config;

                let blocks = silence::segment(&silences, info.duration, &config);
                timeline
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .replace(blocks)?;
            }
            ui::UiMessage::Export => break,
        }
    }

    let segments = {
        let timeline = timeline.read().unwrap_or_else(PoisonError::into_inner);
        timeline.validate()?;
        timeline.active_segments()
    };
    tracing::info!("Exporting {} segments", segments.len());
    let command = ExportCommand::build(input, &segments, &args.convert_option());

    // leave the editor before ffmpeg says anything
    send_data
        .send(ui::UiDirective::Export(ExportStatus::Processing(0.0)))
        .await?;

    let progress = send_data.clone();
    let status = process::run_export(
        &command,
        move |status| {
            progress.try_send(ui::UiDirective::Export(status)).ok();
        },
        halted(recv_ui),
    )
    .await
    .unwrap_or_else(|e| ExportStatus::Error(e.to_string()));

    // progress updates may have been dropped, the final state must not be
    send_data.send(ui::UiDirective::Export(status)).await?;

    Ok(())
}

/// Run silence detection and parse its output.
///
/// A failed detection run counts as "no silence found".
async fn detect(
    input: &Utf8Path,
    config: &SilenceConfig,
    send_data: &mut mpsc::Sender<ui::UiDirective>,
    recv_ui: &mut broadcast::Receiver<ui::UiMessage>,
) -> Result<Vec<SilenceRange>> {
    let _ui_guard = spawn_ellipses_task(send_data, "Detecting silence");

    let path = input.to_owned();
    let config = config.clone();
    let handle = tokio::spawn(async move { process::detect_silence(&path, &config).await });

    let raw = finish_task(handle, recv_ui).await?.unwrap_or_else(|e| {
        tracing::warn!("{}", e);
        String::new()
    });

    let silences = silence::parse_ranges(&raw);
    tracing::info!("Found {} silences", silences.len());
    Ok(silences)
}

/// Resolves once the UI asks to halt or goes away.
async fn halted(recv_ui: &mut broadcast::Receiver<ui::UiMessage>) {
    loop {
        match recv_ui.recv().await {
            Ok(ui::UiMessage::Halt) | Err(broadcast::error::RecvError::Closed) => return,
            _ => {}
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    video: &'a VideoInfo,
    config: &'a SilenceConfig,
    timeline: &'a Timeline,
}

/// Print the detected timeline as JSON and export it if an output was given.
async fn headless(args: &cli::Args) -> Result<()> {
    let input = args.input.as_path();
    let info = video_info::inspect(input).await?;
    let config = args.silence_config();

    let raw = process::detect_silence(input, &config)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            String::new()
        });
    let blocks = silence::detect_blocks(&raw, info.duration, &config);
    let timeline = Timeline::new(blocks, info.duration)?;

    let report = Report {
        video: &info,
        config: &config,
        timeline: &timeline,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.output.is_none() {
        return Ok(());
    }

    let command = ExportCommand::build(input, &timeline.active_segments(), &args.convert_option());
    let status = process::run_export(
        &command,
        |status| {
            if let ExportStatus::Processing(pct) = status {
                tracing::info!("Exporting: {}%", pct);
            }
        },
        ctrl_c(),
    )
    .await?;

    match status {
        ExportStatus::End => Ok(()),
        ExportStatus::Canceled => Err(anyhow!("Export canceled")),
        ExportStatus::Error(msg) => Err(anyhow!("Export failed: {}", msg)),
        ExportStatus::Processing(_) => Err(anyhow!("Export ended without a result")),
    }
}

fn ctrl_c() -> impl Future<Output = ()> {
    async {
        if tokio::signal::ctrl_c().await.is_err() {
            // no signal handler, so never cancel
            std::future::pending::<()>().await;
        }
    }
}

/// Begin a message that has an ellipses after it.
fn spawn_ellipses_task(
    send_data: &mut mpsc::Sender<ui::UiDirective>,
    text: &'static str,
) -> mpsc::Sender<()> {
    let (stop_send, mut stop_recv) = mpsc::channel(1);
    let mut timer = interval(Duration::from_millis(300));

    let mut dots = 2;
    let mut update = move || {
        dots = dots % 3 + 1;
        format!("{}{}", text, ".".repeat(dots))
    };

    let send_data = send_data.clone();

    // spawn a detached task with a timer
    tokio::spawn(async move {
        loop {
            // wait to be dropped or for the timer to fire
            tokio::select! {
                _ = timer.tick() => {
                    let msg = update();
                    send_data.send(ui::UiDirective::DisplayText(msg)).await.ok();
                }
                _ = stop_recv.recv() => break,
            }
        }
    });

    stop_send
}

/// Either complete a task defined by a `JoinHandle` or halt when the user requests.
async fn finish_task<J>(
    mut jh: JoinHandle<J>,
    ui_data: &mut broadcast::Receiver<ui::UiMessage>,
) -> Result<J> {
    loop {
        tokio::select! {
            data = &mut jh => {
                return Ok(data?);
            }
            msg = ui_data.recv() => {
                if let Ok(ui::UiMessage::Halt) = msg {
                    // dropping the task kills its ffmpeg child
                    jh.abort();
                    return Err(anyhow!("User requested stop"));
                }
            }
        }
    }
}
