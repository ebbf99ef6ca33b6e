//! rterm: a small Unix terminal emulator.
//!
//! This program:
//! 1. Spawns the user's shell on a pseudo-terminal
//! 2. Decodes the shell's output stream into a character grid
//! 3. Repaints changed grid rows onto the host terminal via crossterm
//! 4. Encodes host keystrokes into the bytes the shell expects

mod keys;
mod parser;
mod pty;
mod renderer;
mod terminal;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEvent as CtKeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc::error::TryRecvError;

use crate::keys::{KeyCode, KeyEvent};
use crate::pty::PtySession;
use crate::renderer::Renderer;
use crate::terminal::Terminal;

/// A small Unix terminal emulator.
#[derive(Parser, Debug)]
#[command(name = "rterm", version, about)]
struct Cli {
    /// Shell to run (defaults to $SHELL, then /bin/sh).
    #[arg(long)]
    shell: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let shell = cli
        .shell
        .or_else(|| std::env::var("SHELL").ok())
        .unwrap_or_else(|| "/bin/sh".to_string());

    let (cols, rows) = crossterm::terminal::size().context("querying terminal size")?;
    let (cols, rows) = (cols as usize, rows as usize);

    let mut term = Terminal::new(cols, rows);
    let (mut session, mut output_rx) = PtySession::spawn(&shell, cols, rows)?;

    Renderer::init().context("initializing host terminal")?;

    // Guard to ensure cleanup on exit
    let _cleanup = CleanupGuard;
    let mut render = Renderer::new(rows);

    log::info!("running {} on a {}x{} grid", shell, cols, rows);

    // Main event loop
    let render_interval = Duration::from_millis(16); // ~60fps max
    let mut last_render = std::time::Instant::now();

    loop {
        // 1. Drain pending child output into the grid.
        loop {
            match output_rx.try_recv() {
                Ok(chunk) => {
                    for row in term.process_input(&chunk) {
                        render.mark_row_dirty(row);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = Renderer::cleanup();
                    println!("rterm: child process exited");
                    return Ok(());
                }
            }
        }

        // 2. Process user input (keyboard and host resize events).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key_event) => {
                    if let Some(key) = translate_key(&key_event) {
                        let bytes = term.process_key(key);
                        if !bytes.is_empty() {
                            session.write_all(&bytes)?;
                        }
                    }
                }
                Event::Resize(new_cols, new_rows) => {
                    let (w, h) = (new_cols as usize, new_rows as usize);
                    term.resize(w, h);
                    render.resize(h);
                    session.resize(w, h)?;
                }
                _ => {}
            }
        }

        // 3. Render at a capped frame rate.
        if last_render.elapsed() >= render_interval {
            render.render(term.screen())?;
            last_render = std::time::Instant::now();
        }

        // Wait for more child output or a short timer, so the loop neither
        // busy-spins nor lets keyboard polls go stale.
        tokio::select! {
            chunk = output_rx.recv() => match chunk {
                Some(chunk) => {
                    for row in term.process_input(&chunk) {
                        render.mark_row_dirty(row);
                    }
                }
                None => {
                    let _ = Renderer::cleanup();
                    println!("rterm: child process exited");
                    return Ok(());
                }
            },
            _ = tokio::time::sleep(Duration::from_millis(3)) => {}
        }
    }
}

/// Convert a crossterm key event to the logical key the encoder expects.
/// Crossterm delivers already-shifted characters (Shift+a arrives as 'A'),
/// which is exactly the contract the encoder assumes.
fn translate_key(event: &CtKeyEvent) -> Option<KeyEvent> {
    // Act on keydown/autorepeat only.
    if !matches!(event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }

    use crossterm::event::KeyCode as Ct;
    let code = match event.code {
        Ct::Char(c) => KeyCode::Character(c),
        Ct::Enter => KeyCode::Enter,
        Ct::Backspace => KeyCode::Backspace,
        Ct::Tab => KeyCode::Tab,
        Ct::Esc => KeyCode::Escape,
        Ct::Up => KeyCode::Up,
        Ct::Down => KeyCode::Down,
        Ct::Left => KeyCode::Left,
        Ct::Right => KeyCode::Right,
        Ct::Home => KeyCode::Home,
        Ct::End => KeyCode::End,
        Ct::Insert => KeyCode::Insert,
        Ct::Delete => KeyCode::Delete,
        Ct::PageUp => KeyCode::PageUp,
        Ct::PageDown => KeyCode::PageDown,
        Ct::F(n) => KeyCode::F(n),
        _ => return None,
    };

    Some(KeyEvent {
        code,
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
    })
}

/// Guard that ensures terminal cleanup on drop (normal exit or panic).
struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = Renderer::cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode as Ct, KeyEventState};

    fn key(code: Ct, modifiers: KeyModifiers, kind: KeyEventKind) -> CtKeyEvent {
        CtKeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_ignores_key_release_events() {
        let release = key(Ct::Char('a'), KeyModifiers::NONE, KeyEventKind::Release);
        assert!(translate_key(&release).is_none());
    }

    #[test]
    fn test_accepts_press_and_repeat() {
        let press = key(Ct::Char('a'), KeyModifiers::NONE, KeyEventKind::Press);
        let repeat = key(Ct::Char('a'), KeyModifiers::NONE, KeyEventKind::Repeat);
        assert_eq!(
            translate_key(&press),
            Some(KeyEvent::plain(KeyCode::Character('a')))
        );
        assert_eq!(
            translate_key(&repeat),
            Some(KeyEvent::plain(KeyCode::Character('a')))
        );
    }

    #[test]
    fn test_modifier_flags_are_forwarded() {
        let ctrl_c = key(Ct::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(
            translate_key(&ctrl_c),
            Some(KeyEvent::ctrl(KeyCode::Character('c')))
        );

        let shift_a = key(Ct::Char('A'), KeyModifiers::SHIFT, KeyEventKind::Press);
        let translated = translate_key(&shift_a).unwrap();
        assert!(translated.shift);
        assert_eq!(translated.code, KeyCode::Character('A'));
    }

    #[test]
    fn test_special_keys_map_to_logical_codes() {
        let up = key(Ct::Up, KeyModifiers::NONE, KeyEventKind::Press);
        assert_eq!(translate_key(&up), Some(KeyEvent::plain(KeyCode::Up)));

        let f5 = key(Ct::F(5), KeyModifiers::NONE, KeyEventKind::Press);
        assert_eq!(translate_key(&f5), Some(KeyEvent::plain(KeyCode::F(5))));
    }

    #[test]
    fn test_unsupported_keys_are_dropped() {
        let caps = key(Ct::CapsLock, KeyModifiers::NONE, KeyEventKind::Press);
        assert!(translate_key(&caps).is_none());
    }
}
