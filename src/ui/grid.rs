use crate::ui::cursor::{CursorPos, GridShape};
use crate::ui::filter::HostEntry;
use crate::ui::viewport::ViewportConfig;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::collections::BTreeMap;
use std::ops::Range;

const CURSOR: Color = Color::Yellow;
const SEPARATOR: Color = Color::DarkGray;
const ARROW: &str = " > ";
const BLANK: &str = "   ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub is_cursor: bool,
    pub match_range: Option<Range<usize>>,
}

/// Structured grid of hosts, column-major, ready to be styled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridFrame {
    columns: Vec<Vec<Cell>>,
    shape: GridShape,
    cursor: CursorPos,
    hidden: usize,
    column_width: usize,
}

/// Sort `matches`, pack them column-major into the viewport and mark the
/// cell under `cursor`. Entries past the viewport capacity are counted in
/// [`GridFrame::hidden`] and left out.
pub fn layout(
    matches: &BTreeMap<String, HostEntry>,
    cursor: CursorPos,
    viewport: &ViewportConfig,
) -> GridFrame {
    let mut entries: Vec<&HostEntry> = matches.values().collect();
    entries.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    let capacity = viewport.capacity();
    let hidden = entries.len().saturating_sub(capacity);
    entries.truncate(capacity);

    let shape = GridShape::new(viewport.rows_per_column(), entries.len());
    let mut cursor = cursor;
    cursor.clamp(shape);
    let cursor_index = shape.index_of(cursor);

    let mut columns: Vec<Vec<Cell>> = Vec::with_capacity(shape.columns());
    for (index, entry) in entries.into_iter().enumerate() {
        if index % shape.rows_per_column == 0 {
            columns.push(Vec::with_capacity(shape.rows_per_column));
        }
        if let Some(column) = columns.last_mut() {
            column.push(Cell {
                text: entry.hostname.clone(),
                is_cursor: Some(index) == cursor_index,
                match_range: entry.match_range.clone(),
            });
        }
    }

    GridFrame {
        columns,
        shape,
        cursor,
        hidden,
        column_width: viewport.column_width,
    }
}

impl GridFrame {
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn cursor(&self) -> CursorPos {
        self.cursor
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn len(&self) -> usize {
        self.shape.len
    }

    pub fn is_empty(&self) -> bool {
        self.shape.len == 0
    }

    pub fn host_at(&self, pos: CursorPos) -> Option<&str> {
        self.columns
            .get(pos.col)
            .and_then(|column| column.get(pos.row))
            .map(|cell| cell.text.as_str())
    }

    /// Cells in layout order (down each column, then across).
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.columns.iter().flatten()
    }

    fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> {
        (0..self.shape.rows()).map(move |row| {
            self.columns
                .iter()
                .filter_map(|column| column.get(row))
                .collect()
        })
    }

    /// Undecorated text of each grid row.
    pub fn plain_lines(&self) -> Vec<String> {
        self.rows()
            .map(|cells| {
                let mut line = String::new();
                for cell in cells {
                    line.push_str(if cell.is_cursor { ARROW } else { BLANK });
                    line.push_str(&fit(&cell.text, self.column_width));
                    line.push('|');
                }
                line
            })
            .collect()
    }

    pub fn to_lines(&self) -> Vec<Line<'static>> {
        let cursor_style = Style::default().fg(CURSOR).add_modifier(Modifier::BOLD);
        let matched_style = Style::default().add_modifier(Modifier::REVERSED);
        let separator_style = Style::default().fg(SEPARATOR);

        self.rows()
            .map(|cells| {
                let mut spans = Vec::new();
                for cell in cells {
                    let text = fit(&cell.text, self.column_width);
                    if cell.is_cursor {
                        spans.push(Span::styled(ARROW, cursor_style));
                        spans.push(Span::styled(text, cursor_style));
                    } else {
                        spans.push(Span::raw(BLANK));
                        spans.extend(highlight(text, cell.match_range.clone(), matched_style));
                    }
                    spans.push(Span::styled("|", separator_style));
                }
                Line::from(spans)
            })
            .collect()
    }
}

/// Truncate or pad `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut fitted: String = text.chars().take(width).collect();
    let len = fitted.chars().count();
    fitted.extend(std::iter::repeat_n(' ', width - len));
    fitted
}

fn highlight(text: String, range: Option<Range<usize>>, style: Style) -> Vec<Span<'static>> {
    let Some(range) = range else {
        return vec![Span::raw(text)];
    };
    // the match may have been cut off by truncation
    let end = range.end.min(text.trim_end().len());
    if range.start >= end || !text.is_char_boundary(range.start) || !text.is_char_boundary(end) {
        return vec![Span::raw(text)];
    }
    let mut spans = Vec::with_capacity(3);
    if range.start > 0 {
        spans.push(Span::raw(text[..range.start].to_string()));
    }
    spans.push(Span::styled(text[range.start..end].to_string(), style));
    spans.push(Span::raw(text[end..].to_string()));
    spans
}
