//! Terminal cell grid
//!
//! This module defines the screen buffers, cursor state and selection that the
//! accessibility text projection reads from.

use std::sync::Arc;

use unicode_width::UnicodeWidthChar;

/// Default number of scrollback rows kept on the primary screen
pub const DEFAULT_SCROLLBACK_LIMIT: usize = 10_000;

/// Grid holding both screens and their cursors
pub struct Grid {
    pub cols: u16,
    pub rows: u16,
    pub primary_screen: ScreenBuffer,
    pub alternate_screen: ScreenBuffer,
    pub using_alternate: bool,
    pub primary_cursor: CursorState,
    pub alternate_cursor: CursorState,
    pub modes: TerminalModes,
    /// Text selection state
    pub selection: Option<Selection>,
    /// Bumped on every change the text projection can observe
    generation: u64,
}

/// Copy of what the text projection reads, taken while the grid is locked.
///
/// Scrollback rows are shared, so taking a view costs one reference count
/// per scrollback row plus a copy of the live rows.
#[derive(Clone)]
pub struct GridView {
    pub rows: u16,
    pub screen: ScreenBuffer,
    pub cursor: CursorState,
    pub selection: Option<Selection>,
    pub modes: TerminalModes,
    pub generation: u64,
}

/// Text selection
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Start position (col, absolute_row), including scrollback
    pub start: (u16, usize),
    /// End position (col, absolute_row), inclusive
    pub end: (u16, usize),
}

impl Selection {
    /// Return (start, end) with start before end
    pub fn normalized(&self) -> ((u16, usize), (u16, usize)) {
        let (start, end) = (self.start, self.end);
        if start.1 < end.1 || (start.1 == end.1 && start.0 <= end.0) {
            (start, end)
        } else {
            (end, start)
        }
    }
}

impl Grid {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_scrollback(cols, rows, DEFAULT_SCROLLBACK_LIMIT)
    }

    pub fn with_scrollback(cols: u16, rows: u16, scrollback_limit: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            primary_screen: ScreenBuffer::new(cols, rows, scrollback_limit),
            alternate_screen: ScreenBuffer::new(cols, rows, 0),
            using_alternate: false,
            primary_cursor: CursorState::default(),
            alternate_cursor: CursorState::default(),
            modes: TerminalModes::default(),
            selection: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark the grid as changed
    pub fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Detached copy of the active screen for projection outside the lock
    pub fn view(&self) -> GridView {
        GridView {
            rows: self.rows,
            screen: self.active_screen().clone(),
            cursor: self.active_cursor().clone(),
            selection: self.selection.clone(),
            modes: self.modes,
            generation: self.generation,
        }
    }

    pub fn active_screen(&self) -> &ScreenBuffer {
        if self.using_alternate {
            &self.alternate_screen
        } else {
            &self.primary_screen
        }
    }

    pub fn active_screen_mut(&mut self) -> &mut ScreenBuffer {
        if self.using_alternate {
            &mut self.alternate_screen
        } else {
            &mut self.primary_screen
        }
    }

    pub fn active_cursor(&self) -> &CursorState {
        if self.using_alternate {
            &self.alternate_cursor
        } else {
            &self.primary_cursor
        }
    }

    pub fn active_cursor_mut(&mut self) -> &mut CursorState {
        if self.using_alternate {
            &mut self.alternate_cursor
        } else {
            &mut self.primary_cursor
        }
    }

    /// Write program output into the grid.
    ///
    /// `\n` acts as carriage return plus line feed, the way a tty with
    /// `onlcr` presents it. Other control characters besides `\r`, `\t` and
    /// backspace are dropped.
    pub fn draw(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\r' => self.carriage_return(),
                '\n' => {
                    self.carriage_return();
                    self.linefeed();
                }
                '\t' => self.horizontal_tab(),
                '\x08' => self.backspace(),
                c if c.is_control() => {}
                c => self.put_char(c),
            }
        }
        self.active_screen_mut().scroll_to_bottom();
        self.touch();
    }

    /// Put a character at the current cursor position
    pub fn put_char(&mut self, ch: char) {
        let width = ch.width().unwrap_or(0) as u16;

        if width == 0 {
            self.append_to_previous_cell(ch);
            return;
        }

        // Wrap when the character does not fit on the rest of the row
        let cursor_col = self.active_cursor().col;
        if cursor_col + width > self.cols {
            if self.modes.auto_wrap {
                let row = self.active_cursor().row as usize;
                let padding = self.cols.saturating_sub(cursor_col);
                let line = &mut self.active_screen_mut().rows[row];
                line.wrapped = true;
                // Cells skipped because a wide character did not fit
                line.wrap_padding = padding;
                self.active_cursor_mut().col = 0;
                self.linefeed();
            } else {
                self.active_cursor_mut().col = self.cols.saturating_sub(width);
            }
        }

        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        let cols = self.cols as usize;
        if col + width as usize > cols {
            return;
        }

        self.handle_wide_char_overwrite(row, col);

        let line = &mut self.active_screen_mut().rows[row];
        line.cells[col] = Cell {
            grapheme: ch.to_string(),
            width: width as u8,
        };
        if width == 2 {
            line.cells[col + 1] = Cell::continuation();
        }
        if col + line.wrap_padding as usize >= cols {
            line.wrap_padding = 0;
        }

        self.active_cursor_mut().col += width;
    }

    fn append_to_previous_cell(&mut self, ch: char) {
        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        if col == 0 {
            return;
        }

        let cells = &mut self.active_screen_mut().rows[row].cells;
        // Step back over the right half of a wide character
        let mut target = col - 1;
        if target > 0 && cells[target].is_continuation() {
            target -= 1;
        }
        cells[target].grapheme.push(ch);
    }

    fn handle_wide_char_overwrite(&mut self, row: usize, col: usize) {
        let cols = self.cols as usize;
        let cells = &mut self.active_screen_mut().rows[row].cells;

        // Overwriting the right half of a wide char blanks its left half
        if col > 0 && cells[col].is_continuation() {
            cells[col - 1] = Cell::default();
        }
        // Overwriting the left half blanks the orphaned right half
        if cells[col].width == 2 && col + 1 < cols {
            cells[col + 1] = Cell::default();
        }
    }

    /// Carriage return - move cursor to column 0
    pub fn carriage_return(&mut self) {
        self.active_cursor_mut().col = 0;
    }

    /// Line feed - move cursor down, scroll if needed
    pub fn linefeed(&mut self) {
        let rows = self.rows;
        if self.active_cursor().row + 1 >= rows {
            self.scroll_up(1);
        } else {
            self.active_cursor_mut().row += 1;
        }
    }

    /// Backspace - move cursor left
    pub fn backspace(&mut self) {
        let cursor = self.active_cursor_mut();
        cursor.col = cursor.col.saturating_sub(1);
    }

    /// Horizontal tab, stops every 8 columns
    pub fn horizontal_tab(&mut self) {
        let cols = self.cols;
        let cursor = self.active_cursor_mut();
        cursor.col = (((cursor.col / 8) + 1) * 8).min(cols.saturating_sub(1));
    }

    /// Scroll the whole screen up by n lines
    pub fn scroll_up(&mut self, n: u16) {
        let cols = self.cols;
        let screen = self.active_screen_mut();
        for _ in 0..n {
            let removed = screen.rows.remove(0);
            screen.push_to_scrollback(removed);
            screen.rows.push(Row::new(cols));
        }
    }

    /// Place the cursor (0-indexed, clamped)
    pub fn set_cursor(&mut self, col: u16, row: u16) {
        let cols = self.cols;
        let rows = self.rows;
        let cursor = self.active_cursor_mut();
        cursor.col = col.min(cols);
        cursor.row = row.min(rows - 1);
        self.touch();
    }

    /// Switch to or from the alternate screen (DEC mode 1049)
    pub fn set_alternate_screen(&mut self, enable: bool) {
        if enable == self.using_alternate {
            return;
        }
        if enable {
            self.alternate_screen = ScreenBuffer::new(self.cols, self.rows, 0);
            self.alternate_cursor = CursorState::default();
        }
        self.using_alternate = enable;
        self.selection = None;
        self.touch();
    }

    /// Start text selection at a screen position
    pub fn start_selection(&mut self, col: u16, row: u16) {
        let abs_row = self.active_screen().screen_to_buffer_row(row as usize);
        self.selection = Some(Selection {
            start: (col, abs_row),
            end: (col, abs_row),
        });
        self.touch();
    }

    /// Update selection end point
    pub fn update_selection(&mut self, col: u16, row: u16) {
        let abs_row = self.active_screen().screen_to_buffer_row(row as usize);
        if let Some(ref mut sel) = self.selection {
            sel.end = (col, abs_row);
        }
        self.touch();
    }
}

/// Screen buffer with scrollback
#[derive(Clone)]
pub struct ScreenBuffer {
    /// Visible rows
    pub rows: Vec<Row>,
    /// Scrollback history, oldest first. Rows are immutable once scrolled off
    /// and shared with any outstanding [`GridView`].
    pub scrollback: Vec<Arc<Row>>,
    pub scrollback_limit: usize,
    /// Current scroll offset (0 = at bottom, >0 = scrolled up)
    pub scroll_offset: usize,
}

impl ScreenBuffer {
    pub fn new(cols: u16, rows: u16, scrollback_limit: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            scrollback: Vec::new(),
            scrollback_limit,
            scroll_offset: 0,
        }
    }

    /// Add a row to scrollback when scrolling up
    pub fn push_to_scrollback(&mut self, row: Row) {
        if self.scrollback_limit == 0 {
            return;
        }
        self.scrollback.push(Arc::new(row));
        if self.scrollback.len() > self.scrollback_limit {
            self.scrollback.remove(0);
        }
    }

    /// Total number of lines (scrollback + visible)
    pub fn total_lines(&self) -> usize {
        self.scrollback.len() + self.rows.len()
    }

    /// Scroll view up by n lines
    pub fn scroll_view_up(&mut self, n: usize) {
        self.scroll_offset = (self.scroll_offset + n).min(self.scrollback.len());
    }

    /// Reset scroll to bottom (live view)
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Convert a viewport row to an absolute buffer row
    pub fn screen_to_buffer_row(&self, screen_row: usize) -> usize {
        self.scrollback.len().saturating_sub(self.scroll_offset) + screen_row
    }

    /// Absolute row of the live cursor row
    pub fn live_row_to_absolute(&self, live_row: u16) -> usize {
        self.scrollback.len() + live_row as usize
    }

    /// Get a row by absolute buffer position (0 = first scrollback line)
    pub fn get_row_absolute(&self, abs_row: usize) -> Option<&Row> {
        let total_scrollback = self.scrollback.len();
        if abs_row < total_scrollback {
            self.scrollback.get(abs_row).map(Arc::as_ref)
        } else {
            self.rows.get(abs_row - total_scrollback)
        }
    }
}

/// A single row
#[derive(Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Set when the row's content continues on the next row
    pub wrapped: bool,
    /// Trailing cells left empty when a wide character wrapped early
    pub wrap_padding: u16,
}

impl Row {
    pub fn new(cols: u16) -> Self {
        Self {
            cells: vec![Cell::default(); cols as usize],
            wrapped: false,
            wrap_padding: 0,
        }
    }

    /// Index one past the last cell holding visible content
    pub fn content_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|cell| !cell.is_blank())
            .map_or(0, |idx| idx + 1)
    }
}

/// A single cell
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub grapheme: String,
    /// Display width; 0 marks the right half of a wide character
    pub width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            grapheme: String::new(),
            width: 1,
        }
    }
}

impl Cell {
    pub fn continuation() -> Self {
        Self {
            grapheme: String::new(),
            width: 0,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    pub fn is_blank(&self) -> bool {
        !self.is_continuation() && self.grapheme.trim().is_empty()
    }

    /// Text of the cell as it appears in the projection (space if empty)
    pub fn display_str(&self) -> &str {
        if self.grapheme.is_empty() {
            " "
        } else {
            &self.grapheme
        }
    }
}

/// Cursor state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CursorState {
    pub col: u16,
    pub row: u16,
}

/// Terminal modes that affect input encoding and output layout
#[derive(Clone, Copy, Debug)]
pub struct TerminalModes {
    /// DECCKM: arrow keys send SS3 instead of CSI
    pub application_cursor: bool,
    pub auto_wrap: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            application_cursor: false,
            auto_wrap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(grid: &Grid, row: usize) -> String {
        grid.active_screen().rows[row]
            .cells
            .iter()
            .filter(|c| !c.is_continuation())
            .map(|c| c.display_str())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_draw_and_newline() {
        let mut grid = Grid::new(20, 5);
        grid.draw("line one\nline two");

        assert_eq!(row_text(&grid, 0), "line one");
        assert_eq!(row_text(&grid, 1), "line two");
        assert_eq!(grid.active_cursor(), &CursorState { col: 8, row: 1 });
    }

    #[test]
    fn test_auto_wrap_marks_row() {
        let mut grid = Grid::new(4, 3);
        grid.draw("abcdef");

        assert!(grid.active_screen().rows[0].wrapped);
        assert_eq!(row_text(&grid, 0), "abcd");
        assert_eq!(row_text(&grid, 1), "ef");
    }

    #[test]
    fn test_scroll_pushes_scrollback() {
        let mut grid = Grid::new(10, 2);
        grid.draw("one\ntwo\nthree");

        let screen = grid.active_screen();
        assert_eq!(screen.scrollback.len(), 1);
        assert_eq!(screen.total_lines(), 3);
        assert_eq!(screen.scrollback[0].cells[0].grapheme, "o");
    }

    #[test]
    fn test_scrollback_limit() {
        let mut grid = Grid::with_scrollback(10, 1, 2);
        grid.draw("a\nb\nc\nd");

        let screen = grid.active_screen();
        assert_eq!(screen.scrollback.len(), 2);
        assert_eq!(screen.scrollback[0].cells[0].grapheme, "b");
    }

    #[test]
    fn test_wide_char_occupies_two_cells() {
        let mut grid = Grid::new(10, 2);
        grid.draw("世a");

        let cells = &grid.active_screen().rows[0].cells;
        assert_eq!(cells[0].width, 2);
        assert!(cells[1].is_continuation());
        assert_eq!(cells[2].grapheme, "a");
        assert_eq!(grid.active_cursor().col, 3);
    }

    #[test]
    fn test_wide_char_wraps_when_it_does_not_fit() {
        let mut grid = Grid::new(3, 2);
        grid.draw("ab界");

        assert!(grid.active_screen().rows[0].wrapped);
        assert_eq!(grid.active_screen().rows[1].cells[0].grapheme, "界");
    }

    #[test]
    fn test_combining_mark_joins_previous_cell() {
        let mut grid = Grid::new(10, 2);
        grid.draw("e\u{301}x");

        let cells = &grid.active_screen().rows[0].cells;
        assert_eq!(cells[0].grapheme, "e\u{301}");
        assert_eq!(cells[1].grapheme, "x");
    }

    #[test]
    fn test_alternate_screen_is_fresh() {
        let mut grid = Grid::new(10, 3);
        grid.draw("shell");
        grid.set_alternate_screen(true);
        assert_eq!(row_text(&grid, 0), "");
        grid.draw("vim");
        grid.set_alternate_screen(false);
        assert_eq!(row_text(&grid, 0), "shell");
    }

    #[test]
    fn test_selection_normalizes() {
        let sel = Selection {
            start: (5, 2),
            end: (1, 0),
        };
        assert_eq!(sel.normalized(), ((1, 0), (5, 2)));
    }
}
