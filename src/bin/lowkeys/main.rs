//! lowkeys - sub-bass keyboard for the terminal
//!
//! Run with: cargo run -- --help

mod app;
mod config;
mod ui;

use std::{fs::File, io::stdout, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::{open_audio, AudioSetup};
use config::Args;
use lowkeys::input::InputRouter;
use ui::UiApp;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(&args)?;

    // Audio first: a missing device is reported in the UI, not fatal.
    let (setup, audio_error) = match open_audio() {
        Ok(setup) => (setup, None),
        Err(err) => {
            warn!(error = ?err, "audio output unavailable");
            (AudioSetup::silent(), Some(format!("{err:#}")))
        }
    };
    let AudioSetup {
        graph,
        scope,
        output,
    } = setup;
    let sample_rate = output.as_ref().map(|o| o.sample_rate);

    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    info!(release_events, "terminal key reporting");

    let mut router = InputRouter::new(graph)
        .with_controls(args.controls())
        .with_release_events(release_events);
    if let Some(reason) = audio_error {
        router.disable_audio(reason);
    }

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture).wrap_err("failed to enable mouse capture")?;
    if release_events {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .wrap_err("failed to enable key release reporting")?;
    }

    let res = UiApp::new(router, scope, sample_rate).run(&mut terminal);

    if release_events {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();

    // Keep the stream alive until the UI is gone.
    drop(output);
    res
}

fn init_logging(args: &Args) -> EyreResult<()> {
    let path = args.log_path();
    let file = File::create(&path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_new(&args.log_level)
        .wrap_err_with(|| format!("invalid log filter '{}'", args.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    info!(log = %path.display(), "lowkeys starting");
    Ok(())
}
