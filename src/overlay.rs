use std::fmt;

use bevy_math::IVec2;

use crate::grid::{line_of_sight, Passability, TileMap, CHUNK_SIZE};

/// Chunks per overlay edge.
pub const OVERLAY_CHUNKS: i32 = 3;

/// Cells per overlay edge.
pub const OVERLAY_SIZE: i32 = OVERLAY_CHUNKS * CHUNK_SIZE;

const ROW_COUNT: usize = (OVERLAY_SIZE * OVERLAY_CHUNKS) as usize;

/// A 48x48 scratch bitmap holding the dynamic view of the world for one
/// route solve: a 3x3 chunk window of the static map with agent occupancy
/// OR-ed on top.
///
/// Rows are interleaved so that filling from a chunk touches every third
/// `u16`: the packed row for cell `(x, y)` lives at
/// `(y / 16) * 48 + (y % 16) * 3 + x / 16`. Coordinates are local to the
/// window; anything outside `0..48` reads as blocked.
///
/// The overlay is reused across solves via [Overlay::fill], which rewrites
/// every row. Callers must not treat its contents as meaningful once the
/// next solve begins.
#[derive(Debug, Clone)]
pub struct Overlay {
    rows: [u16; ROW_COUNT],
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    /// Create a fully passable overlay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: [0; ROW_COUNT],
        }
    }

    /// Returns true if the given local coordinates fall within the window.
    #[inline]
    #[must_use]
    pub fn contains(x: i32, y: i32) -> bool {
        x >= 0 && x < OVERLAY_SIZE && y >= 0 && y < OVERLAY_SIZE
    }

    /// Rewrite the overlay from the 3x3 chunk window of `map` whose lower
    /// left chunk is `(ox, oy)` in chunk coordinates. Window chunks that fall
    /// outside the map are filled as fully blocked.
    pub fn fill(&mut self, map: &TileMap, ox: i32, oy: i32) {
        for i in 0..OVERLAY_CHUNKS {
            for j in 0..OVERLAY_CHUNKS {
                let base = (j * OVERLAY_SIZE + i) as usize;
                match map.chunk(ox + i, oy + j) {
                    Some(chunk) => {
                        for p in 0..CHUNK_SIZE {
                            self.rows[base + (3 * p) as usize] = chunk.row(p);
                        }
                    }
                    None => {
                        for p in 0..CHUNK_SIZE {
                            self.rows[base + (3 * p) as usize] = 0xffff;
                        }
                    }
                }
            }
        }
    }

    /// Mark one cell blocked. Coordinates outside the window are ignored.
    #[inline]
    pub fn block(&mut self, x: i32, y: i32) {
        if Self::contains(x, y) {
            self.rows[Self::row_index(x, y)] |= 1 << (x % CHUNK_SIZE);
        }
    }

    /// Clear one cell previously blocked. Coordinates outside the window are
    /// ignored.
    #[inline]
    pub fn unblock(&mut self, x: i32, y: i32) {
        if Self::contains(x, y) {
            self.rows[Self::row_index(x, y)] &= !(1 << (x % CHUNK_SIZE));
        }
    }

    /// Returns true if the cell is blocked. Coordinates outside the window
    /// report blocked.
    #[inline]
    #[must_use]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if !Self::contains(x, y) {
            return true;
        }
        self.rows[Self::row_index(x, y)] & (1 << (x % CHUNK_SIZE)) != 0
    }

    /// Returns true if an unobstructed straight line of cells connects `a`
    /// and `b` within the window. See [line_of_sight].
    #[inline]
    #[must_use]
    pub fn los(&self, a: IVec2, b: IVec2) -> bool {
        line_of_sight(self, a, b)
    }

    #[inline]
    fn row_index(x: i32, y: i32) -> usize {
        ((y / CHUNK_SIZE) * OVERLAY_SIZE + (y % CHUNK_SIZE) * OVERLAY_CHUNKS + x / CHUNK_SIZE)
            as usize
    }
}

impl Passability for Overlay {
    #[inline]
    fn available(&self, x: i32, y: i32) -> bool {
        !self.is_set(x, y)
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..OVERLAY_SIZE).rev() {
            for x in 0..OVERLAY_SIZE {
                f.write_str(if self.is_set(x, y) { "X" } else { "." })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
