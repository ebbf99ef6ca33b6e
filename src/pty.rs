//! PTY multiplexer: spawns the child shell on a pseudo-terminal pair and
//! moves bytes between it and the terminal core.
//!
//! A dedicated thread performs blocking reads from the PTY master and
//! forwards each chunk over a channel; the channel closing is how the event
//! loop learns that the child exited.

use std::io::{Read, Write};
use std::thread;

use anyhow::{Context, Result};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

/// A running child shell attached to a pseudo-terminal.
pub struct PtySession {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtySession {
    /// Spawn `shell` on a fresh pseudo-terminal of the given size. Returns
    /// the session plus the receiving end of the child's output stream.
    pub fn spawn(
        shell: &str,
        cols: usize,
        rows: usize,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Vec<u8>>)> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(cols, rows))
            .context("opening PTY pair")?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("spawning {shell}"))?;
        // The master keeps the only handle we need; the slave side now
        // belongs to the child.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .context("cloning PTY reader")?;
        let writer = pair.master.take_writer().context("taking PTY writer")?;

        log::debug!("spawned {shell} on a {cols}x{rows} PTY");

        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
            log::debug!("PTY reader finished; child side closed");
        });

        Ok((
            Self {
                master: pair.master,
                writer,
                child,
            },
            rx,
        ))
    }

    /// Write encoded keystrokes to the child.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).context("writing to PTY")?;
        self.writer.flush().context("flushing PTY")?;
        Ok(())
    }

    /// Propagate a new window size to the child.
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<()> {
        self.master
            .resize(pty_size(cols, rows))
            .context("resizing PTY")
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn pty_size(cols: usize, rows: usize) -> PtySize {
    PtySize {
        rows: rows as u16,
        cols: cols as u16,
        pixel_width: 0,
        pixel_height: 0,
    }
}
