//! Session management
//!
//! A terminal session owns the cell grid the program draws into and the input
//! channel that carries keystrokes back to it. It is the surface the
//! accessibility layer reads from.
//!
//! Queries never format text with the grid locked: the lock is held only to
//! copy a [`GridView`], and the projection happens after it is released. The
//! last projection is kept and reused until the grid changes.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::grid::{Grid, GridView};
use super::keymapper::KeyMapper;
use super::text::TextSnapshot;
use crate::accessibility::{TerminalSurface, TextRange};

/// Projection tagged with the grid generation it was built from
struct CachedSnapshot {
    generation: u64,
    snapshot: Arc<TextSnapshot>,
}

/// A terminal session backed by an in-process grid
pub struct TerminalSession {
    /// Session ID
    pub id: u64,
    grid: Mutex<Grid>,
    cache: Mutex<Option<CachedSnapshot>>,
    /// Input headed for the running program
    input_tx: Mutex<Sender<Vec<u8>>>,
}

impl TerminalSession {
    /// Create a session and the receiving end of its input channel
    pub fn new(id: u64, cols: u16, rows: u16, scrollback_limit: usize) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let session = Self {
            id,
            grid: Mutex::new(Grid::with_scrollback(cols, rows, scrollback_limit)),
            cache: Mutex::new(None),
            input_tx: Mutex::new(tx),
        };
        (session, rx)
    }

    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedSnapshot>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write program output into the grid
    pub fn draw(&self, text: &str) {
        self.grid().draw(text);
    }

    /// Run `f` with the grid locked. The grid counts as changed afterwards.
    pub fn with_grid<R>(&self, f: impl FnOnce(&mut Grid) -> R) -> R {
        let mut grid = self.grid();
        let result = f(&mut *grid);
        grid.touch();
        result
    }

    /// Copy of the active screen; the grid lock is released on return
    pub fn view(&self) -> GridView {
        self.grid().view()
    }

    /// Text projection of the active screen, reused while the grid is unchanged
    pub fn snapshot(&self) -> Arc<TextSnapshot> {
        let view = {
            let grid = self.grid();
            if let Some(snapshot) = self.cached(grid.generation()) {
                return snapshot;
            }
            grid.view()
        };

        let snapshot = Arc::new(TextSnapshot::project(&view));
        trace!(session = self.id, generation = view.generation, "projected grid text");

        let mut cache = self.cache();
        let newer_cached = cache
            .as_ref()
            .map_or(false, |cached| cached.generation > view.generation);
        if !newer_cached {
            *cache = Some(CachedSnapshot {
                generation: view.generation,
                snapshot: snapshot.clone(),
            });
        }
        snapshot
    }

    fn cached(&self, generation: u64) -> Option<Arc<TextSnapshot>> {
        self.cache()
            .as_ref()
            .filter(|cached| cached.generation == generation)
            .map(|cached| cached.snapshot.clone())
    }

    /// Queue raw bytes for the program. Returns false once the receiver is gone.
    pub fn write(&self, data: &[u8]) -> bool {
        let tx = self.input_tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.send(data.to_vec()).is_err() {
            debug!(session = self.id, "input channel closed, dropping {} bytes", data.len());
            return false;
        }
        true
    }
}

impl TerminalSurface for TerminalSession {
    fn full_text(&self) -> String {
        self.snapshot().text().to_string()
    }

    fn cursor_character_offset(&self) -> usize {
        self.snapshot().cursor_offset()
    }

    fn character_count(&self) -> usize {
        self.snapshot().char_count()
    }

    fn visible_range(&self) -> TextRange {
        self.snapshot().visible_range()
    }

    fn deliver_input(&self, text: &str) {
        trace!(session = self.id, bytes = text.len(), "delivering input");
        self.write(text.as_bytes());
    }

    fn request_cursor_move(&self, offset: usize) {
        let view = self.view();
        let snapshot = TextSnapshot::project(&view);
        let target = offset.min(snapshot.char_count());
        let cursor = snapshot.cursor_offset();

        if target == cursor {
            return;
        }
        if !snapshot.same_logical_line(cursor, target) {
            let (col, row) = snapshot.point_for_offset(&view.screen, target);
            debug!(
                session = self.id,
                cursor,
                target,
                col,
                row,
                "ignoring cursor move across lines"
            );
            return;
        }

        let delta = target as isize - cursor as isize;
        self.write(&KeyMapper::horizontal_motion(delta, &view.modes));
    }

    fn selected_range(&self) -> Option<TextRange> {
        self.snapshot().selection()
    }

    fn selected_text(&self) -> String {
        let snapshot = self.snapshot();
        snapshot
            .selection()
            .map(|range| snapshot.slice(range))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn session(cols: u16, rows: u16) -> (TerminalSession, Receiver<Vec<u8>>) {
        TerminalSession::new(1, cols, rows, 100)
    }

    #[test]
    fn test_surface_reads_grid() {
        let (session, _rx) = session(20, 5);
        session.draw("hello world");
        session.with_grid(|grid| grid.set_cursor(6, 0));

        assert_eq!(session.full_text(), "hello world");
        assert_eq!(session.cursor_character_offset(), 6);
        assert_eq!(session.character_count(), 11);
        assert_eq!(session.visible_range(), TextRange::new(0, 11));
    }

    #[test]
    fn test_deliver_input_passes_bytes_through() {
        let (session, rx) = session(20, 5);
        session.deliver_input("echo $HOME | grep '世界' 🎉");

        let bytes = rx.try_recv().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "echo $HOME | grep '世界' 🎉");
    }

    #[test]
    fn test_cursor_move_left_on_prompt_line() {
        let (session, rx) = session(20, 5);
        session.draw("$ ls -la");

        session.request_cursor_move(4);
        assert_eq!(rx.try_recv().unwrap(), b"\x1b[D\x1b[D\x1b[D\x1b[D".to_vec());
    }

    #[test]
    fn test_cursor_move_right_in_application_mode() {
        let (session, rx) = session(20, 5);
        session.draw("$ ls -la");
        session.with_grid(|grid| {
            grid.set_cursor(2, 0);
            grid.modes.application_cursor = true;
        });

        session.request_cursor_move(4);
        assert_eq!(rx.try_recv().unwrap(), b"\x1bOC\x1bOC".to_vec());
    }

    #[test]
    fn test_cursor_move_is_clamped() {
        let (session, rx) = session(20, 5);
        session.draw("$ pwd");
        session.with_grid(|grid| grid.set_cursor(2, 0));

        session.request_cursor_move(500);
        assert_eq!(rx.try_recv().unwrap(), b"\x1b[C\x1b[C\x1b[C".to_vec());
    }

    #[test]
    fn test_cursor_move_across_lines_is_ignored() {
        let (session, rx) = session(20, 5);
        session.draw("first\r\n$ ");

        session.request_cursor_move(2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cursor_move_to_cursor_sends_nothing() {
        let (session, rx) = session(20, 5);
        session.draw("$ ");

        session.request_cursor_move(2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_write_after_receiver_dropped() {
        let (session, rx) = session(20, 5);
        drop(rx);
        assert!(!session.write(b"x"));
    }

    #[test]
    fn test_selection_is_exposed() {
        let (session, _rx) = session(20, 5);
        session.draw("git status");
        assert_eq!(session.selected_text(), "");

        session.with_grid(|grid| {
            grid.start_selection(4, 0);
            grid.update_selection(9, 0);
        });

        assert_eq!(session.selected_range(), Some(TextRange::new(4, 6)));
        assert_eq!(session.selected_text(), "status");
    }

    #[test]
    fn test_wide_char_wrap_reads_as_written() {
        let (session, _rx) = session(3, 4);
        session.draw("$ 界x");

        assert_eq!(session.full_text(), "$ 界x");
        assert_eq!(session.cursor_character_offset(), 4);
    }

    #[test]
    fn test_snapshot_reused_until_grid_changes() {
        let (session, _rx) = session(20, 5);
        session.draw("$ ls");

        let first = session.snapshot();
        assert!(Arc::ptr_eq(&first, &session.snapshot()));

        session.draw(" -la");
        let second = session.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.text(), "$ ls -la");

        session.with_grid(|grid| grid.modes.application_cursor = true);
        assert!(!Arc::ptr_eq(&second, &session.snapshot()));
    }

    #[test]
    fn test_draw_proceeds_while_a_view_is_projected() {
        let (session, _rx) = session(20, 3);
        session.draw("before");

        let view = session.view();
        // The grid is not locked here, so output keeps flowing
        session.draw("\nafter");

        assert_eq!(TextSnapshot::project(&view).text(), "before");
        assert_eq!(session.full_text(), "before\nafter");
    }

    #[test]
    fn test_concurrent_draw_and_queries() {
        let (session, _rx) = TerminalSession::new(1, 20, 5, 1000);
        let session = Arc::new(session);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = session.snapshot();
                        assert_eq!(snapshot.char_count(), snapshot.text().chars().count());
                        assert!(snapshot.cursor_offset() <= snapshot.char_count());
                        assert!(snapshot.visible_range().end() <= snapshot.char_count());
                        let _ = session.full_text();
                    }
                })
            })
            .collect();

        for n in 0..300 {
            session.draw(&format!("line {}\n", n));
        }
        for reader in readers {
            reader.join().unwrap();
        }

        let text = session.full_text();
        assert!(text.starts_with("line 0\nline 1\n"));
        assert!(text.ends_with("line 299\n"));
    }
}
