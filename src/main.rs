// ============================================================================
// CYBERNOTES - Terminal Note-taking with AI Writing Tools
// ============================================================================
//
// MODULE STRUCTURE:
// 1. note / store / storage   - Note model, collection and persistence slot
// 2. search / editor          - List filtering and debounced edit buffers
// 3. ai / assistant / dispatch - Gemini client, suggestion workflow, task runner
// 4. config / logging         - Environment settings and file logging
// 5. app / ui                 - Event handling and rendering
// 6. Main Loop (this file)    - Terminal setup and event loop
// ============================================================================

mod ai;
mod app;
mod assistant;
mod config;
mod dispatch;
mod editor;
mod logging;
mod note;
mod search;
mod storage;
mod store;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::ai::TextGenerator;
use crate::ai::gemini::GeminiClient;
use crate::app::App;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::editor::EditorBuffer;
use crate::storage::{FileSlot, KeyValueSlot};
use crate::store::NoteStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
    }
}

fn run() -> Result<()> {
    let config = Config::from_env()?;
    if let Err(err) = logging::init(&config) {
        eprintln!("warning: logging disabled: {err:?}");
    }
    info!(data_dir = %config.data_dir.display(), "Starting cybernotes");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        config.api_base.clone(),
        config.model.clone(),
        config.api_key.clone(),
        config.ai_timeout,
    )?);
    let dispatcher = Dispatcher::new(generator, runtime.handle().clone());

    let slot: Box<dyn KeyValueSlot> = Box::new(FileSlot::new(config.data_dir.clone()));
    let store = NoteStore::load(slot);
    let mut app = App::new(store, EditorBuffer::new(config.debounce), dispatcher);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);
    // commit pending edits even when the loop bailed out on an error
    app.shutdown();

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    info!("Shutting down");
    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        let mut timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));
        // wake up in time to commit a pending edit
        if let Some(due) = app.editor.time_until_due(Instant::now()) {
            timeout = timeout.min(due);
        }

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key, Instant::now()) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        app.tick(Instant::now());

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}
