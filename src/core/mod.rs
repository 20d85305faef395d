//! Core terminal components.
//!
//! - **grid**: cell grid with scrollback, wide characters and selection
//! - **text**: projection of the grid into accessibility text and offsets
//! - **keymapper**: key events to VT input sequences
//! - **session**: grid plus input channel, exposed as a terminal surface
//!
//! # Architecture
//!
//! ```text
//! TerminalSession (TerminalSurface)
//! ├── Grid
//! │   ├── ScreenBuffer (primary + scrollback, alternate)
//! │   ├── CursorState
//! │   └── Selection
//! ├── TextSnapshot (captured per query)
//! └── input channel ── KeyMapper (cursor moves)
//! ```

pub mod grid;
pub mod keymapper;
pub mod session;
pub mod text;
