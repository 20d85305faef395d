//! Text projection of the grid
//!
//! Accessibility clients see the terminal as one flat string. This module
//! turns the active screen (scrollback first, then the live rows) into that
//! string and keeps enough bookkeeping to translate between character offsets
//! and grid positions.
//!
//! Layout rules:
//!
//! - rows are joined with `\n`, except after a row that soft-wrapped
//! - trailing blanks of a row are dropped, but the cursor row keeps every
//!   cell left of the cursor so the insertion point is a real offset
//! - rows after the last non-blank row are dropped unless they hold the cursor
//!
//! Offsets count Unicode scalar values, not bytes and not cells. A wide
//! character is one offset; a base character with a combining mark is two.

use super::grid::{Grid, GridView, Row, ScreenBuffer};
use crate::accessibility::TextRange;

/// Consistent view of the grid as text, projected from a [`GridView`]
#[derive(Debug, Clone, PartialEq)]
pub struct TextSnapshot {
    text: String,
    char_count: usize,
    /// Character offset at which each absolute row starts
    row_starts: Vec<usize>,
    /// Number of cells each row contributed
    row_cells: Vec<usize>,
    /// Number of characters each row contributed, line break excluded
    row_chars: Vec<usize>,
    cursor_offset: usize,
    visible: TextRange,
    selection: Option<TextRange>,
}

impl TextSnapshot {
    /// Project the active screen of `grid`
    pub fn capture(grid: &Grid) -> Self {
        Self::project(&grid.view())
    }

    /// Project a detached view; needs no lock
    pub fn project(view: &GridView) -> Self {
        let screen = &view.screen;
        let cursor = &view.cursor;
        let cursor_row = screen.live_row_to_absolute(cursor.row);

        let last_content_row = (0..screen.total_lines())
            .rev()
            .find(|&abs| screen.get_row_absolute(abs).map_or(false, |r| r.content_len() > 0));
        let last_row = last_content_row.map_or(cursor_row, |r| r.max(cursor_row));

        let mut text = String::new();
        let mut char_count = 0;
        let mut row_starts = Vec::with_capacity(last_row + 1);
        let mut row_cells = Vec::with_capacity(last_row + 1);
        let mut row_chars = Vec::with_capacity(last_row + 1);
        let mut prev_wrapped = false;

        for abs in 0..=last_row {
            let Some(row) = screen.get_row_absolute(abs) else {
                break;
            };
            if abs > 0 && !prev_wrapped {
                text.push('\n');
                char_count += 1;
            }
            row_starts.push(char_count);

            let keep = if abs == cursor_row { cursor.col as usize } else { 0 };
            let cells = projected_cells(row, keep);
            let chars = push_cells(&mut text, row, cells);
            char_count += chars;
            row_cells.push(cells);
            row_chars.push(chars);
            prev_wrapped = row.wrapped;
        }

        let mut snapshot = Self {
            text,
            char_count,
            row_starts,
            row_cells,
            row_chars,
            cursor_offset: 0,
            visible: TextRange::default(),
            selection: None,
        };

        snapshot.cursor_offset = snapshot.offset_for_point(screen, cursor.col as usize, cursor_row);

        let first_visible = screen.screen_to_buffer_row(0);
        let last_visible = first_visible + view.rows as usize - 1;
        let start = snapshot.row_start(first_visible).unwrap_or(snapshot.char_count);
        let end = snapshot
            .row_end(last_visible.min(snapshot.row_starts.len().saturating_sub(1)))
            .unwrap_or(start)
            .max(start);
        snapshot.visible = TextRange::new(start, end - start);

        snapshot.selection = view.selection.as_ref().map(|sel| {
            let ((start_col, start_row), (end_col, end_row)) = sel.normalized();
            let start = snapshot.offset_for_point(screen, start_col as usize, start_row);
            // The end cell is inclusive
            let end = snapshot.offset_for_point(screen, end_col as usize + 1, end_row);
            TextRange::new(start, end.saturating_sub(start))
        });

        snapshot
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn cursor_offset(&self) -> usize {
        self.cursor_offset
    }

    pub fn visible_range(&self) -> TextRange {
        self.visible
    }

    pub fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    /// Text covered by `range`, clamped to the snapshot
    pub fn slice(&self, range: TextRange) -> String {
        self.text
            .chars()
            .skip(range.location)
            .take(range.length)
            .collect()
    }

    /// 0-based line number (by `\n`) of a character offset
    pub fn line_of_offset(&self, offset: usize) -> usize {
        self.text.chars().take(offset).filter(|&c| c == '\n').count()
    }

    /// True when no line break separates the two offsets
    pub fn same_logical_line(&self, a: usize, b: usize) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        !self.text.chars().skip(lo).take(hi - lo).any(|c| c == '\n')
    }

    /// Grid position (col, absolute_row) of a character offset.
    ///
    /// Offsets past the end clamp to the end of the text. An offset that
    /// lands on a line break maps to the end of the row before it.
    pub fn point_for_offset(&self, screen: &ScreenBuffer, offset: usize) -> (u16, usize) {
        let offset = offset.min(self.char_count);
        let abs = self
            .row_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let Some(row) = screen.get_row_absolute(abs) else {
            return (0, 0);
        };

        let mut remaining = offset - self.row_starts[abs];
        let mut col = 0;
        for (idx, cell) in row.cells.iter().enumerate().take(self.row_cells[abs]) {
            if cell.is_continuation() {
                continue;
            }
            if remaining == 0 {
                break;
            }
            let chars = cell.display_str().chars().count();
            if remaining < chars {
                break;
            }
            remaining -= chars;
            col = idx + cell.width.max(1) as usize;
        }
        (col as u16, abs)
    }

    fn row_start(&self, abs: usize) -> Option<usize> {
        self.row_starts.get(abs).copied()
    }

    fn row_end(&self, abs: usize) -> Option<usize> {
        Some(self.row_start(abs)? + self.row_chars[abs])
    }

    /// Character offset of a grid position, clamped to the projected cells
    fn offset_for_point(&self, screen: &ScreenBuffer, col: usize, abs: usize) -> usize {
        let Some(&start) = self.row_starts.get(abs) else {
            return self.char_count;
        };
        let Some(row) = screen.get_row_absolute(abs) else {
            return start;
        };
        let cells = self.row_cells[abs].min(col);
        start + count_chars(row, cells)
    }
}

/// Number of cells of `row` that appear in the projection
fn projected_cells(row: &Row, keep: usize) -> usize {
    if row.wrapped {
        return row.cells.len().saturating_sub(row.wrap_padding as usize);
    }
    row.content_len().max(keep).min(row.cells.len())
}

fn push_cells(text: &mut String, row: &Row, cells: usize) -> usize {
    let mut count = 0;
    for cell in row.cells.iter().take(cells) {
        if cell.is_continuation() {
            continue;
        }
        let s = cell.display_str();
        text.push_str(s);
        count += s.chars().count();
    }
    count
}

fn count_chars(row: &Row, cells: usize) -> usize {
    row.cells
        .iter()
        .take(cells)
        .filter(|cell| !cell.is_continuation())
        .map(|cell| cell.display_str().chars().count())
        .sum()
}
