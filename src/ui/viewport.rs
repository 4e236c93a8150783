use crate::config::UiConfig;
use anyhow::{Context, Result};

/// Rows kept free for the search line, the status line and a spacer.
pub const MARGIN_ROWS: u16 = 3;
/// Width of the ` > ` indicator in front of every cell.
pub const PREFIX_WIDTH: usize = 3;
/// Width of the `|` after every cell.
pub const SEPARATOR_WIDTH: usize = 1;

/// Terminal dimensions captured once when a session starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportConfig {
    pub width: u16,
    pub height: u16,
    pub column_width: usize,
}

impl ViewportConfig {
    /// `column_width` is clamped so one cell always fits the terminal width.
    pub fn new(width: u16, height: u16, column_width: usize) -> Self {
        let widest = (width as usize).saturating_sub(PREFIX_WIDTH + SEPARATOR_WIDTH);
        Self {
            width,
            height,
            column_width: column_width.min(widest).max(1),
        }
    }

    pub fn from_terminal(ui: &UiConfig) -> Result<Self> {
        let (width, height) =
            crossterm::terminal::size().context("Unable to read terminal size")?;
        Ok(Self::new(width, height, ui.column_width))
    }

    pub fn rows_per_column(&self) -> usize {
        self.height.saturating_sub(MARGIN_ROWS).max(1) as usize
    }

    pub fn cell_width(&self) -> usize {
        PREFIX_WIDTH + self.column_width + SEPARATOR_WIDTH
    }

    pub fn max_columns(&self) -> usize {
        (self.width as usize / self.cell_width()).max(1)
    }

    pub fn capacity(&self) -> usize {
        self.max_columns() * self.rows_per_column()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_follows_terminal_size() {
        let viewport = ViewportConfig::new(90, 13, 40);
        assert_eq!(viewport.rows_per_column(), 10);
        assert_eq!(viewport.cell_width(), 44);
        assert_eq!(viewport.max_columns(), 2);
        assert_eq!(viewport.capacity(), 20);
    }

    #[test]
    fn tiny_terminal_still_has_one_cell() {
        let viewport = ViewportConfig::new(5, 2, 0);
        assert_eq!(viewport.rows_per_column(), 1);
        assert_eq!(viewport.max_columns(), 1);
        assert_eq!(viewport.capacity(), 1);
    }

    #[test]
    fn oversized_column_is_clamped_to_terminal() {
        let viewport = ViewportConfig::new(80, 10, 4_000_000_000);
        assert_eq!(viewport.column_width, 76);
        assert_eq!(viewport.cell_width(), 80);
        assert_eq!(viewport.max_columns(), 1);
    }
}
