/// Column-major grid dimensions: `len` cells split into columns of
/// `rows_per_column`, the last column possibly shorter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub rows_per_column: usize,
    pub len: usize,
}

impl GridShape {
    pub fn new(rows_per_column: usize, len: usize) -> Self {
        Self {
            rows_per_column: rows_per_column.max(1),
            len,
        }
    }

    pub fn columns(&self) -> usize {
        self.len.div_ceil(self.rows_per_column)
    }

    pub fn rows(&self) -> usize {
        self.len.min(self.rows_per_column)
    }

    pub fn column_height(&self, col: usize) -> usize {
        if col >= self.columns() {
            return 0;
        }
        (self.len - col * self.rows_per_column).min(self.rows_per_column)
    }

    pub fn contains(&self, pos: CursorPos) -> bool {
        pos.row < self.column_height(pos.col)
    }

    pub fn index_of(&self, pos: CursorPos) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.col * self.rows_per_column + pos.row)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorPos {
    pub col: usize,
    pub row: usize,
}

impl CursorPos {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Pull the cursor back inside `shape`, column first. An empty grid
    /// resets it to the origin.
    pub fn clamp(&mut self, shape: GridShape) {
        if shape.len == 0 {
            *self = Self::default();
            return;
        }
        self.col = self.col.min(shape.columns() - 1);
        self.row = self.row.min(shape.column_height(self.col) - 1);
    }

    /// Move one cell without wrapping. Moves past an edge are ignored.
    pub fn move_in(&mut self, direction: Move, shape: GridShape) {
        self.clamp(shape);
        if shape.len == 0 {
            return;
        }
        match direction {
            Move::Up => self.row = self.row.saturating_sub(1),
            Move::Down => {
                if self.row + 1 < shape.column_height(self.col) {
                    self.row += 1;
                }
            }
            // every column left of the cursor is full
            Move::Left => self.col = self.col.saturating_sub(1),
            Move::Right => {
                if self.col + 1 < shape.columns() {
                    self.col += 1;
                    self.row = self.row.min(shape.column_height(self.col) - 1);
                }
            }
        }
    }
}
