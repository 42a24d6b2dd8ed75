mod app;
mod ui;

use crate::library::{LibraryStore, editor};
use crate::search::SearchEngine;
use anyhow::Result;
use app::{App, Request};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

type Term = Terminal<CrosstermBackend<Stdout>>;

pub fn run(
    store: LibraryStore,
    engine: Arc<SearchEngine>,
    output_path: PathBuf,
    initial_query: Option<String>,
) -> Result<()> {
    let mut terminal = enter()?;
    terminal.clear()?;

    // Index builds in the background; the first search runs when it is ready
    let mut app = App::new(store, engine, output_path);
    if let Some(query) = initial_query {
        app.set_query(&query);
    }

    let result = run_app(&mut terminal, &mut app);

    leave(&mut terminal)?;
    result
}

fn enter() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Hand the terminal to the editor, then take it back and refresh
fn run_editor(terminal: &mut Term, app: &mut App, file: PathBuf) -> Result<()> {
    leave(terminal)?;
    let outcome = editor::open(&file);
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;

    match outcome {
        Ok(()) => app.reindex(),
        Err(e) => app.status_message = format!("Editor failed: {e}"),
    }
    Ok(())
}

fn run_app(terminal: &mut Term, app: &mut App) -> Result<()> {
    loop {
        app.poll_index_load();
        app.poll_search();

        if let Some(Request::Edit(file)) = app.take_request() {
            run_editor(terminal, app, file)?;
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        // Only handle key press events, not release or repeat
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Ok(()),
            (KeyModifiers::CONTROL, KeyCode::Char('q')) => return Ok(()),
            _ => {}
        }

        match app.mode {
            // Any key closes help
            app::Mode::Help => app.hide_help(),
            app::Mode::Search => {
                match (key.modifiers, key.code) {
                    (KeyModifiers::CONTROL, KeyCode::Char('j'))
                    | (KeyModifiers::CONTROL, KeyCode::Char('n')) => app.select_next(),
                    (KeyModifiers::CONTROL, KeyCode::Char('k')) => app.select_prev(),
                    (KeyModifiers::CONTROL, KeyCode::Char('d')) => app.select_page_down(),
                    (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.select_page_up(),
                    (KeyModifiers::CONTROL, KeyCode::Char('w')) => app.delete_word(),
                    (KeyModifiers::CONTROL, KeyCode::Char('h')) => {
                        app.query.pop();
                    }
                    (KeyModifiers::CONTROL, KeyCode::Char('a')) => app.select_first(),
                    (KeyModifiers::CONTROL, KeyCode::Char('e')) => app.select_last(),
                    (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.toggle_preview(),
                    (KeyModifiers::CONTROL, KeyCode::Char('o')) => app.edit_selected(),
                    (KeyModifiers::CONTROL, KeyCode::Char('y')) => app.activate_selected(),
                    (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
                        KeyCode::Esc => {
                            if app.query.is_empty() {
                                return Ok(());
                            }
                            app.clear_query();
                        }
                        KeyCode::Enter => app.execute_search(),
                        KeyCode::Down | KeyCode::Tab => app.select_next(),
                        KeyCode::Up | KeyCode::BackTab => app.select_prev(),
                        KeyCode::PageDown => app.select_page_down(),
                        KeyCode::PageUp => app.select_page_up(),
                        KeyCode::Char('?') if app.query.is_empty() => app.show_help(),
                        KeyCode::Char(c) => app.query.push(c),
                        KeyCode::Backspace => {
                            app.query.pop();
                        }
                        KeyCode::F(1) => app.show_help(),
                        KeyCode::F(5) => app.reindex(),
                        _ => {}
                    },
                    _ => {}
                }
            }
            app::Mode::Preview => {
                if app.pending_key == Some('g') {
                    app.clear_pending_key();
                    if key.code == KeyCode::Char('g') {
                        app.scroll_preview_to_top();
                        continue;
                    }
                }

                match (key.modifiers, key.code) {
                    (KeyModifiers::CONTROL, KeyCode::Char('d')) => app.scroll_preview_page_down(),
                    (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.scroll_preview_page_up(),
                    (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.toggle_preview(),
                    (KeyModifiers::CONTROL, KeyCode::Char('o')) => app.edit_selected(),
                    (KeyModifiers::CONTROL, KeyCode::Char('y')) => app.activate_selected(),
                    (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
                        KeyCode::Esc | KeyCode::Char('q') => app.toggle_preview(),
                        KeyCode::Down | KeyCode::Char('j') => app.scroll_preview_down(),
                        KeyCode::Up | KeyCode::Char('k') => app.scroll_preview_up(),
                        KeyCode::PageDown => app.scroll_preview_page_down(),
                        KeyCode::PageUp => app.scroll_preview_page_up(),
                        KeyCode::Enter | KeyCode::Char('e') => app.edit_selected(),
                        KeyCode::Char('a') => app.activate_selected(),
                        KeyCode::Char('g') => app.pending_key = Some('g'),
                        KeyCode::Char('G') => app.scroll_preview_to_bottom(),
                        KeyCode::Char('n') => app.select_next(),
                        KeyCode::Char('N') | KeyCode::Char('p') => app.select_prev(),
                        KeyCode::Char('?') | KeyCode::F(1) => app.show_help(),
                        KeyCode::F(5) => app.reindex(),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }
}
