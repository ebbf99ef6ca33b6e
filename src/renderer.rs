//! Terminal renderer using crossterm.
//!
//! Repaints only the rows the core reported dirty, batching attribute
//! changes within a row so a line of uniform text costs one color switch.
//! The emulated grid carries full RGB attributes; crossterm forwards them
//! as 24-bit colors.

use std::io::{self, Write};

use crossterm::{
    cursor, execute, queue,
    style::{self, Attribute, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::terminal::{CharAttr, RgbColor, Screen};

fn to_crossterm_color(color: RgbColor) -> style::Color {
    style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Paints the screen grid onto the host terminal.
pub struct Renderer {
    /// Rows needing a repaint on the next render call.
    dirty_lines: Vec<bool>,
}

impl Renderer {
    /// Create a renderer for a grid of the given height. Everything is
    /// dirty until the first paint.
    pub fn new(rows: usize) -> Self {
        Self {
            dirty_lines: vec![true; rows],
        }
    }

    /// Resize to a new grid height (forces a full repaint).
    pub fn resize(&mut self, rows: usize) {
        self.dirty_lines = vec![true; rows];
    }

    /// Flag one row for repainting.
    pub fn mark_row_dirty(&mut self, row: usize) {
        if row < self.dirty_lines.len() {
            self.dirty_lines[row] = true;
        }
    }

    /// Repaint dirty rows and park the hardware cursor on the grid cursor.
    pub fn render(&mut self, screen: &Screen) -> io::Result<()> {
        let mut stdout = io::stdout();

        // Hide the cursor while painting to avoid flicker.
        queue!(stdout, cursor::Hide)?;

        let mut last_attr: Option<CharAttr> = None;
        for row in 0..screen.rows().min(self.dirty_lines.len()) {
            if !self.dirty_lines[row] {
                continue;
            }
            self.dirty_lines[row] = false;

            queue!(stdout, cursor::MoveTo(0, row as u16))?;
            for cell in screen.row(row) {
                if last_attr != Some(cell.attr) {
                    Self::apply_attr(&mut stdout, &cell.attr)?;
                    last_attr = Some(cell.attr);
                }
                queue!(stdout, style::Print(cell.ch))?;
            }
        }

        if last_attr.is_some() {
            queue!(stdout, style::ResetColor, SetAttribute(Attribute::Reset))?;
        }

        // The grid cursor may sit one past the right margin awaiting a
        // wrap; the hardware cursor stays on the last column.
        let cursor = screen.cursor();
        let col = cursor.col.min(screen.cols().saturating_sub(1));
        queue!(
            stdout,
            cursor::MoveTo(col as u16, cursor.row as u16),
            cursor::Show
        )?;

        stdout.flush()
    }

    /// Switch the output style to `attr`.
    fn apply_attr(stdout: &mut io::Stdout, attr: &CharAttr) -> io::Result<()> {
        queue!(
            stdout,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(to_crossterm_color(attr.fg)),
            SetBackgroundColor(to_crossterm_color(attr.bg)),
        )?;
        if attr.bold {
            queue!(stdout, SetAttribute(Attribute::Bold))?;
        }
        if attr.underline {
            queue!(stdout, SetAttribute(Attribute::Underlined))?;
        }
        if attr.reverse {
            queue!(stdout, SetAttribute(Attribute::Reverse))?;
        }
        if attr.blink {
            queue!(stdout, SetAttribute(Attribute::SlowBlink))?;
        }
        Ok(())
    }

    /// Put the host terminal into raw mode on the alternate screen.
    pub fn init() -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0),
        )?;
        Ok(())
    }

    /// Restore the host terminal to its original state.
    pub fn cleanup() -> io::Result<()> {
        execute!(
            io::stdout(),
            style::ResetColor,
            SetAttribute(Attribute::Reset),
            LeaveAlternateScreen,
            cursor::Show,
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}
