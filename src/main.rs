mod audio;
mod audio_api;
mod config;
mod tone;
mod generator;
mod logging;
mod middle;
mod pipeline;
mod player;
mod shared;
mod theory;
mod tui;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use config::Config;
use generator::ChatCompletionGenerator;
use middle::Middle;
use pipeline::persistence::CustomStore;
use pipeline::progression::Catalog;
use pipeline::provider::BuiltinProvider;
use shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log_file())?;
    info!(data_dir = %config.data_dir().display(), "starting chordtty");

    // a corrupt slot stops us here, before the terminal is touched
    let store = CustomStore::new(config.custom_file());
    let custom = store.load()?;

    let generator = ChatCompletionGenerator::new(&config.endpoint, &config.model, config.api_key.clone())
        .context("building HTTP client")?;
    let mut middle = Middle::new(
        Catalog::with_custom(custom),
        store,
        Arc::new(BuiltinProvider::new(config.fetch_latency())),
        Arc::new(generator),
    );
    middle.refetch();

    let audio = audio::start_audio(Some(&config.impulse))?;
    info!(sample_rate = audio.sample_rate(), "audio ready");

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        for cmd in middle.poll_workers() {
            audio.send(cmd);
        }

        let ds = middle.display_state();
        tui_state.sync(&ds);
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                info!("quitting");
                return Ok(());
            }
            for cmd in middle.handle_input(event) {
                audio.send(cmd);
            }
        }

        let elapsed = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        for cmd in middle.tick(elapsed) {
            audio.send(cmd);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
