//! Note grid model: maps a 2-D touch position to a note and row.
//!
//! Pure function of the layout parameters; rebuilt when the configuration
//! changes. Coordinates follow the touch surface convention: origin at the
//! bottom-left, y growing upward, row 0 the bottom row.

use crate::config::{GridConfig, GridLayout, Rgba};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Screen rectangle of one key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyBounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl KeyBounds {
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }
}

/// One cell of the key grid.
///
/// `note` is `None` for dead cells: positions with no playable note, which
/// trigger no MIDI and pass the touch through to the host UI.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCell {
    pub note: Option<u8>,
    pub row: usize,
    pub col: usize,
    pub bounds: KeyBounds,
}

impl KeyCell {
    /// Note name label for display ("C", "C#", ...).
    pub fn label(&self) -> Option<&'static str> {
        self.note.map(|n| NOTE_NAMES[n as usize % 12])
    }

    /// True for the five accidental pitch classes.
    pub fn is_accidental(&self) -> bool {
        matches!(self.note.map(|n| n % 12), Some(1 | 3 | 6 | 8 | 10))
    }

    /// Base key color: black for accidentals, white otherwise.
    pub fn base_color(&self) -> Rgba {
        if self.is_accidental() {
            Rgba::BLACK
        } else {
            Rgba::WHITE
        }
    }
}

/// The full key grid for one configuration.
pub struct NoteGrid {
    cells: Vec<KeyCell>,
    layout: GridLayout,
    rows: usize,
    keys_per_row: usize,
    key_w: f32,
    key_h: f32,
}

impl NoteGrid {
    pub fn new(config: &GridConfig) -> Self {
        let rows = config.rows.max(1);
        let keys_per_row = config.keys_per_row.max(1);
        let key_w = config.key_width();
        let key_h = config.key_height();

        let mut cells = Vec::with_capacity(rows * keys_per_row);
        for row in 0..rows {
            let x_offset = Self::row_offset(config.layout, row, key_w);
            for col in 0..keys_per_row {
                cells.push(KeyCell {
                    note: Self::note_at(config, row, col),
                    row,
                    col,
                    bounds: KeyBounds {
                        x: col as f32 * key_w + x_offset,
                        y: row as f32 * key_h,
                        w: key_w,
                        h: key_h,
                    },
                });
            }
        }

        Self {
            cells,
            layout: config.layout,
            rows,
            keys_per_row,
            key_w,
            key_h,
        }
    }

    /// Horizontal shift of a row: Janko offsets odd rows by half a key.
    #[inline]
    fn row_offset(layout: GridLayout, row: usize, key_w: f32) -> f32 {
        match layout {
            GridLayout::Sonome => 0.0,
            GridLayout::Janko => {
                if row % 2 == 1 {
                    key_w / 2.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Note number for a cell, `None` when it falls outside MIDI range.
    fn note_at(config: &GridConfig, row: usize, col: usize) -> Option<u8> {
        let note = match config.layout {
            // Rows stacked a fixed interval apart, columns by semitone.
            GridLayout::Sonome => {
                config.low_note as usize + row * config.row_interval as usize + col
            }
            // Adjacent rows differ by one semitone, adjacent columns by
            // two, so harmonic neighbors are geometric neighbors.
            GridLayout::Janko => config.low_note as usize + row + 2 * col,
        };
        (note <= 127).then_some(note as u8)
    }

    /// Resolve a touch position to the cell under it, if any.
    pub fn resolve(&self, x: f32, y: f32) -> Option<&KeyCell> {
        if y < 0.0 || x < 0.0 {
            return None;
        }
        let row = (y / self.key_h) as usize;
        if row >= self.rows {
            return None;
        }
        let x_local = x - Self::row_offset(self.layout, row, self.key_w);
        if x_local < 0.0 {
            return None;
        }
        let col = (x_local / self.key_w) as usize;
        if col >= self.keys_per_row {
            return None;
        }
        let cell = &self.cells[row * self.keys_per_row + col];
        cell.bounds.contains(x, y).then_some(cell)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&KeyCell> {
        (row < self.rows && col < self.keys_per_row)
            .then(|| &self.cells[row * self.keys_per_row + col])
    }

    pub fn cells(&self) -> &[KeyCell] {
        &self.cells
    }

    #[inline]
    pub fn key_width(&self) -> f32 {
        self.key_w
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }
}
