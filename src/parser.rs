//! VT byte-stream decoder: a three-mode state machine over raw child
//! output.
//!
//! Bytes arrive in arbitrary chunks, so every piece of in-flight state
//! (partial UTF-8 sequence, escape mode, CSI parameter buffer) lives in the
//! parser and survives across [`Parser::advance`] calls. Malformed input is
//! absorbed by state transitions; the decoder never fails.

use crate::terminal::Screen;

/// Decoder mode. Outside `Normal`, no grid mutation is pending; the mode
/// fully determines how the next byte is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Normal,
    Escape,
    Csi,
}

/// Outcome of feeding a continuation byte to the UTF-8 accumulator.
enum Utf8Step {
    /// More continuation bytes expected.
    Pending,
    /// Sequence complete; `None` means the bytes did not form a valid
    /// scalar value (overlong form, surrogate) and are dropped.
    Complete(Option<char>),
    /// The byte was not a continuation. The partial sequence is discarded
    /// and the byte must be reclassified from scratch.
    Rejected,
}

/// Accumulator for one in-progress UTF-8 sequence. Holds at most three
/// bytes: a lead plus up to two continuations while awaiting the final one.
#[derive(Debug, Default)]
struct Utf8Accumulator {
    buf: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Accumulator {
    fn in_progress(&self) -> bool {
        self.len > 0
    }

    fn clear(&mut self) {
        self.len = 0;
        self.need = 0;
    }

    /// Start a sequence from a lead byte. Returns false for bytes that
    /// cannot lead a sequence (stray continuations, 0xF8..): the caller
    /// discards them.
    fn start(&mut self, byte: u8) -> bool {
        let need = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return false,
        };
        self.buf[0] = byte;
        self.len = 1;
        self.need = need;
        true
    }

    fn push(&mut self, byte: u8) -> Utf8Step {
        if byte & 0xC0 != 0x80 {
            self.clear();
            return Utf8Step::Rejected;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < self.need {
            return Utf8Step::Pending;
        }
        // std validation rejects overlong encodings and surrogates.
        let ch = std::str::from_utf8(&self.buf[..self.len])
            .ok()
            .and_then(|s| s.chars().next());
        self.clear();
        Utf8Step::Complete(ch)
    }
}

/// The escape-sequence parser. Feed it one byte at a time; it drives the
/// screen's primitive mutations.
#[derive(Debug, Default)]
pub struct Parser {
    mode: Mode,
    utf8: Utf8Accumulator,
    /// CSI parameter accumulator: ASCII digits, `;`, optional leading `?`.
    csi_params: String,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one input byte, mutating `screen` as the stream dictates.
    pub fn advance(&mut self, screen: &mut Screen, byte: u8) {
        match self.mode {
            Mode::Normal => self.advance_normal(screen, byte),
            Mode::Escape => self.advance_escape(screen, byte),
            Mode::Csi => self.advance_csi(screen, byte),
        }
    }

    fn advance_normal(&mut self, screen: &mut Screen, byte: u8) {
        if self.utf8.in_progress() {
            match self.utf8.push(byte) {
                Utf8Step::Pending => {}
                Utf8Step::Complete(Some(ch)) => screen.put_char(ch),
                Utf8Step::Complete(None) => {}
                // Partial sequence dropped; the byte gets a fresh
                // classification (it may be a control, printable or lead).
                Utf8Step::Rejected => self.dispatch_normal(screen, byte),
            }
            return;
        }
        self.dispatch_normal(screen, byte);
    }

    fn dispatch_normal(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            // ESC - begin escape sequence
            0x1B => {
                self.mode = Mode::Escape;
                self.csi_params.clear();
            }
            // BEL - the renderer's bell, nothing to draw
            0x07 => {}
            // BS
            0x08 => screen.backspace(),
            // HT
            0x09 => screen.tab(),
            // LF
            0x0A => screen.newline(),
            // CR
            0x0D => screen.carriage_return(),
            // Printable ASCII
            0x20..=0x7E => screen.put_char(byte as char),
            // Remaining C0 controls and DEL
            0x00..=0x1F | 0x7F => {}
            // UTF-8 lead byte; invalid leads and stray continuations are
            // dropped.
            0x80..=0xFF => {
                if !self.utf8.start(byte) {
                    log::trace!("discarding stray byte {byte:#04x}");
                }
            }
        }
    }

    fn advance_escape(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            b'[' => {
                self.mode = Mode::Csi;
                self.csi_params.clear();
            }
            // RIS - full reset, including all decoder state
            b'c' => {
                screen.reset();
                self.utf8.clear();
                self.csi_params.clear();
                self.mode = Mode::Normal;
            }
            _ => {
                log::trace!("ignoring ESC {byte:#04x}");
                self.mode = Mode::Normal;
            }
        }
    }

    fn advance_csi(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            b'0'..=b'9' | b';' => self.csi_params.push(byte as char),
            b'?' if self.csi_params.is_empty() => self.csi_params.push('?'),
            // Final byte terminates the sequence
            0x40..=0x7E => {
                self.dispatch_csi(screen, byte);
                self.mode = Mode::Normal;
            }
            _ => {
                log::trace!("ignoring CSI byte {byte:#04x}");
            }
        }
    }

    fn dispatch_csi(&mut self, screen: &mut Screen, final_byte: u8) {
        let private = self.csi_params.starts_with('?');
        let raw = self.csi_params.trim_start_matches('?');
        // Missing or empty parameters default to 0; oversized ones too.
        let params: Vec<u16> = raw.split(';').map(|p| p.parse().unwrap_or(0)).collect();
        let p1 = params.first().copied().unwrap_or(0);
        let p2 = params.get(1).copied().unwrap_or(0);

        match final_byte {
            // CUU - Cursor Up
            b'A' => screen.cursor_up(one_based(p1)),
            // CUD - Cursor Down
            b'B' => screen.cursor_down(one_based(p1)),
            // CUF - Cursor Forward
            b'C' => screen.cursor_forward(one_based(p1)),
            // CUB - Cursor Backward
            b'D' => screen.cursor_back(one_based(p1)),
            // CUP / HVP - Cursor Position (1-based row;col)
            b'H' | b'f' => screen.move_to(one_based(p1) - 1, one_based(p2) - 1),
            // ED - Erase in Display
            b'J' => screen.erase_in_display(p1),
            // EL - Erase in Line
            b'K' => screen.erase_in_line(p1),
            // SGR - Select Graphic Rendition
            b'm' => screen.apply_sgr(&params),
            // DECSET/DECRST - private modes acknowledged, no effect
            b'h' | b'l' if private => {}
            _ => {
                log::trace!(
                    "unhandled CSI {:?} final {:?}",
                    self.csi_params,
                    final_byte as char
                );
            }
        }
    }
}

/// CSI count parameters treat 0 (and absence) as 1.
fn one_based(param: u16) -> usize {
    if param == 0 { 1 } else { param as usize }
}
