//! Logical key events and their encoding into the byte sequences an
//! interactive shell expects.
//!
//! The keyboard reader delivers already-shifted code points (Shift+a
//! arrives as 'A'), so the encoder never interprets the shift flag itself;
//! it only folds Ctrl combinations and expands special keys to their xterm
//! sequences.

/// A logical key, as produced by the keyboard reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Character(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Function key F1..F12.
    F(u8),
}

/// A key press with its modifier flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub shift: bool,
    pub ctrl: bool,
}

impl KeyEvent {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            shift: false,
            ctrl: false,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            shift: false,
            ctrl: true,
        }
    }
}

/// Encode a key event into the bytes to write to the child PTY. Unknown
/// combinations encode to an empty vector and the caller writes nothing.
pub fn encode_key(key: KeyEvent) -> Vec<u8> {
    if key.ctrl {
        if let KeyCode::Character(c) = key.code {
            if let Some(byte) = encode_ctrl_char(c) {
                return vec![byte];
            }
        }
    }

    match key.code {
        KeyCode::Character(c) => {
            let mut buf = [0u8; 4];
            c.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        KeyCode::Enter => vec![0x0D],
        KeyCode::Backspace => vec![0x7F],
        KeyCode::Tab => vec![0x09],
        KeyCode::Escape => vec![0x1B],
        KeyCode::Up => b"\x1B[A".to_vec(),
        KeyCode::Down => b"\x1B[B".to_vec(),
        KeyCode::Right => b"\x1B[C".to_vec(),
        KeyCode::Left => b"\x1B[D".to_vec(),
        KeyCode::Home => b"\x1B[H".to_vec(),
        KeyCode::End => b"\x1B[F".to_vec(),
        KeyCode::Insert => b"\x1B[2~".to_vec(),
        KeyCode::Delete => b"\x1B[3~".to_vec(),
        KeyCode::PageUp => b"\x1B[5~".to_vec(),
        KeyCode::PageDown => b"\x1B[6~".to_vec(),
        KeyCode::F(n) => match n {
            1 => b"\x1BOP".to_vec(),
            2 => b"\x1BOQ".to_vec(),
            3 => b"\x1BOR".to_vec(),
            4 => b"\x1BOS".to_vec(),
            5 => b"\x1B[15~".to_vec(),
            6 => b"\x1B[17~".to_vec(),
            7 => b"\x1B[18~".to_vec(),
            8 => b"\x1B[19~".to_vec(),
            9 => b"\x1B[20~".to_vec(),
            10 => b"\x1B[21~".to_vec(),
            11 => b"\x1B[23~".to_vec(),
            12 => b"\x1B[24~".to_vec(),
            _ => Vec::new(),
        },
    }
}

/// Fold Ctrl+key into a single control byte: the uppercase column of the
/// ASCII table minus '@' (Ctrl+A = 0x01 .. Ctrl+Z = 0x1A, Ctrl+@ = 0x00).
fn encode_ctrl_char(c: char) -> Option<u8> {
    match c {
        '@'..='_' => Some(c as u8 - b'@'),
        'a'..='z' => Some(c as u8 - b'a' + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii_character() {
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Character('a'))), b"a");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Character('Z'))), b"Z");
    }

    #[test]
    fn test_unicode_character_encodes_utf8() {
        assert_eq!(
            encode_key(KeyEvent::plain(KeyCode::Character('\u{042F}'))),
            "\u{042F}".as_bytes()
        );
        assert_eq!(
            encode_key(KeyEvent::plain(KeyCode::Character('\u{1F600}'))),
            "\u{1F600}".as_bytes()
        );
    }

    #[test]
    fn test_shift_flag_is_not_interpreted() {
        // The keyboard reader already delivered the shifted glyph.
        let event = KeyEvent {
            code: KeyCode::Character('!'),
            shift: true,
            ctrl: false,
        };
        assert_eq!(encode_key(event), b"!");
    }

    #[test]
    fn test_ctrl_letter_folds_to_control_byte() {
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('a'))),
            vec![0x01]
        );
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('z'))),
            vec![0x1A]
        );
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('C'))),
            vec![0x03]
        );
    }

    #[test]
    fn test_ctrl_symbol_range() {
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('@'))),
            vec![0x00]
        );
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('['))),
            vec![0x1B]
        );
        assert_eq!(
            encode_key(KeyEvent::ctrl(KeyCode::Character('_'))),
            vec![0x1F]
        );
    }

    #[test]
    fn test_ctrl_outside_fold_range_encodes_plain() {
        assert_eq!(encode_key(KeyEvent::ctrl(KeyCode::Character('1'))), b"1");
    }

    #[test]
    fn test_editing_keys() {
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Enter)), vec![0x0D]);
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Backspace)), vec![0x7F]);
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Tab)), vec![0x09]);
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Escape)), vec![0x1B]);
    }

    #[test]
    fn test_arrow_keys_use_csi_forms() {
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Up)), b"\x1B[A");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Down)), b"\x1B[B");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Right)), b"\x1B[C");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Left)), b"\x1B[D");
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Home)), b"\x1B[H");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::End)), b"\x1B[F");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Insert)), b"\x1B[2~");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::Delete)), b"\x1B[3~");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::PageUp)), b"\x1B[5~");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::PageDown)), b"\x1B[6~");
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::F(1))), b"\x1BOP");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::F(4))), b"\x1BOS");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::F(5))), b"\x1B[15~");
        assert_eq!(encode_key(KeyEvent::plain(KeyCode::F(12))), b"\x1B[24~");
    }

    #[test]
    fn test_unknown_function_key_encodes_nothing() {
        assert!(encode_key(KeyEvent::plain(KeyCode::F(13))).is_empty());
        assert!(encode_key(KeyEvent::plain(KeyCode::F(0))).is_empty());
    }
}
