//! Key mapping for synthesized input
//!
//! Accessibility cursor moves are delivered to the program as the key presses
//! a user would make. This converts those keys to VT sequences.

use crossterm::event::KeyCode;

use super::grid::TerminalModes;

/// Key mapper for converting cursor keys to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a horizontal cursor key to bytes, `None` for keys we never synthesize
    pub fn map(code: KeyCode, modes: &TerminalModes) -> Option<Vec<u8>> {
        match code {
            KeyCode::Right => Some(Self::arrow_key(b'C', modes)),
            KeyCode::Left => Some(Self::arrow_key(b'D', modes)),
            _ => None,
        }
    }

    /// Bytes that move a line editor's cursor by `delta` characters
    pub fn horizontal_motion(delta: isize, modes: &TerminalModes) -> Vec<u8> {
        let code = if delta < 0 { KeyCode::Left } else { KeyCode::Right };
        let Some(step) = Self::map(code, modes) else {
            return Vec::new();
        };
        step.repeat(delta.unsigned_abs())
    }

    /// Arrow key sequence
    fn arrow_key(key: u8, modes: &TerminalModes) -> Vec<u8> {
        if modes.application_cursor {
            // Application mode: ESC O <key>
            vec![0x1B, b'O', key]
        } else {
            // Normal mode: ESC [ <key>
            vec![0x1B, b'[', key]
        }
    }
}
