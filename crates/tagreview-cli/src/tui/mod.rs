//! Terminal user interface (TUI) for tagreview.
//!
//! ## Entry points
//!
//! - [`run_review`] opens the full-screen review table over a remote store.

pub mod review;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tagreview_core::config::EffectiveConfig;
use tagreview_core::store::RemoteStore;

use review::ReviewView;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run the review table until the operator quits.
///
/// Rows are fetched after the first frame so the loading screen shows while
/// the request is in flight. Saves work the same way behind a saving status.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up, drawn to, or restored.
/// Store failures are shown inside the UI and do not end the session.
pub fn run_review<S: RemoteStore>(config: &EffectiveConfig, store: S) -> Result<()> {
    let mut view = ReviewView::new(
        store,
        config.project.save.reconciler(),
        config.project.review.toast_ttl(),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = event_loop(&mut terminal, &mut view);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<S: RemoteStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut ReviewView<S>,
) -> Result<()> {
    terminal.draw(|frame| {
        let area = frame.area();
        view.render(frame, area);
    })?;
    view.reload();

    while !view.should_quit() {
        terminal.draw(|frame| {
            let area = frame.area();
            view.render(frame, area);
        })?;

        if view.has_pending_save() {
            view.run_pending_save();
            continue;
        }

        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            view.handle_key(key);
        }
        view.tick();
    }
    Ok(())
}
