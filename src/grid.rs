#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use bevy_math::IVec2;

/// Cells per chunk edge.
pub const CHUNK_SIZE: i32 = 16;

/// One 16x16 block of cell bits, stored as sixteen little-endian rows.
/// Bit `x` of row `y` is set when the cell `(x, y)` within the chunk is
/// blocked; a zeroed chunk is fully passable.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    rows: [u16; CHUNK_SIZE as usize],
}

impl Chunk {
    /// Obtain one packed row of blocked bits. `y` is taken modulo the chunk
    /// edge, so any cell coordinate can be passed directly.
    #[inline]
    #[must_use]
    pub fn row(&self, y: i32) -> u16 {
        self.rows[(y & (CHUNK_SIZE - 1)) as usize]
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32) {
        self.rows[y as usize] |= 1 << x;
    }

    #[inline]
    fn clear(&mut self, x: i32, y: i32) {
        self.rows[y as usize] &= !(1 << x);
    }

    #[inline]
    fn is_set(&self, x: i32, y: i32) -> bool {
        self.rows[y as usize] & (1 << x) != 0
    }
}

/// Read access to per-cell passability. Implementations report out-of-range
/// cells as unavailable.
pub trait Passability {
    /// Returns true if the cell at the given coordinates can be traversed.
    fn available(&self, x: i32, y: i32) -> bool;
}

/// A rectangular world of chunks storing per-cell passability as packed bits.
///
/// The world spans `chunks_x() * 16` by `chunks_y() * 16` cells with the
/// origin at the bottom left. Out-of-range reads report blocked, and
/// out-of-range writes are silently ignored.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    chunks: Vec<Chunk>,
    nx: i32,
    ny: i32,
}

impl TileMap {
    /// Create a fully passable map of `nx` by `ny` chunks.
    ///
    /// # Panics
    ///
    /// If `nx` or `ny` is not positive.
    #[must_use]
    pub fn new(nx: i32, ny: i32) -> Self {
        assert!(nx > 0 && ny > 0);
        Self {
            chunks: vec![Chunk::default(); (nx * ny) as usize],
            nx,
            ny,
        }
    }

    /// The number of chunk columns.
    #[inline]
    #[must_use]
    pub fn chunks_x(&self) -> i32 {
        self.nx
    }

    /// The number of chunk rows.
    #[inline]
    #[must_use]
    pub fn chunks_y(&self) -> i32 {
        self.ny
    }

    /// The world width in cells.
    #[inline]
    #[must_use]
    pub fn width(&self) -> i32 {
        self.nx * CHUNK_SIZE
    }

    /// The world height in cells.
    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        self.ny * CHUNK_SIZE
    }

    /// Obtain the chunk at the given chunk coordinates, or `None` when the
    /// coordinates fall outside the map.
    #[inline]
    #[must_use]
    pub fn chunk(&self, cx: i32, cy: i32) -> Option<&Chunk> {
        if cx < 0 || cy < 0 || cx >= self.nx || cy >= self.ny {
            return None;
        }
        Some(&self.chunks[(cy * self.nx + cx) as usize])
    }

    /// Mark the cell at the given coordinates as blocked. Out-of-range
    /// coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return;
        }
        let idx = (y / CHUNK_SIZE) * self.nx + x / CHUNK_SIZE;
        self.chunks[idx as usize].set(x % CHUNK_SIZE, y % CHUNK_SIZE);
    }

    /// Mark the cell at the given coordinates as passable. Out-of-range
    /// coordinates are ignored.
    #[inline]
    pub fn clear(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return;
        }
        let idx = (y / CHUNK_SIZE) * self.nx + x / CHUNK_SIZE;
        self.chunks[idx as usize].clear(x % CHUNK_SIZE, y % CHUNK_SIZE);
    }

    /// Returns true if the cell at the given coordinates is blocked.
    /// Out-of-range coordinates report blocked.
    #[inline]
    #[must_use]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return true;
        }
        let idx = (y / CHUNK_SIZE) * self.nx + x / CHUNK_SIZE;
        self.chunks[idx as usize].is_set(x % CHUNK_SIZE, y % CHUNK_SIZE)
    }

    /// Returns true if an unobstructed straight line of cells connects `a`
    /// and `b`. See [line_of_sight].
    #[inline]
    #[must_use]
    pub fn los(&self, a: IVec2, b: IVec2) -> bool {
        line_of_sight(self, a, b)
    }
}

impl Passability for TileMap {
    #[inline]
    fn available(&self, x: i32, y: i32) -> bool {
        !self.is_set(x, y)
    }
}

/// Walk the discrete line from `a` to `b` and report whether every traversed
/// cell is passable.
///
/// The walk rasterizes the segment symmetrically, so the result is the same
/// in both directions. When the line crosses a lattice corner exactly, both
/// cells orthogonally adjacent to the crossing must be passable; a diagonal
/// squeeze between two blocked cells fails the test.
#[must_use]
pub fn line_of_sight<M: Passability>(map: &M, a: IVec2, b: IVec2) -> bool {
    let (mut x, mut y) = (a.x, a.y);
    let mut dx = b.x - a.x;
    let mut dy = b.y - a.y;
    let mut sx = 1;
    let mut sy = 1;
    if dx < 0 {
        dx = -dx;
        sx = -1;
    }
    if dy < 0 {
        dy = -dy;
        sy = -1;
    }
    let (mut ix, mut iy) = (0, 0);
    while ix < dx || iy < dy {
        let k = (1 + 2 * ix) * dy - (1 + 2 * iy) * dx;
        if k < 0 {
            x += sx;
            ix += 1;
        } else if k > 0 {
            y += sy;
            iy += 1;
        } else {
            // crossing a corner exactly
            if !map.available(x, y + sy) || !map.available(x + sx, y) {
                return false;
            }
            x += sx;
            y += sy;
            ix += 1;
            iy += 1;
        }
        if !map.available(x, y) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod test {
    use super::*;
    use bevy_math::ivec2;

    #[test]
    fn test_set_clear() {
        let mut map = TileMap::new(2, 1);
        assert!(!map.is_set(5, 5));
        map.set(5, 5);
        assert!(map.is_set(5, 5));
        assert!(!map.available(5, 5));
        map.clear(5, 5);
        assert!(!map.is_set(5, 5));
        assert!(map.available(5, 5));
    }

    #[test]
    fn test_chunk_boundaries() {
        let mut map = TileMap::new(2, 2);
        map.set(16, 0);
        map.set(0, 16);
        map.set(31, 31);
        assert!(map.is_set(16, 0));
        assert!(map.is_set(0, 16));
        assert!(map.is_set(31, 31));
        assert!(!map.is_set(15, 0));
        assert_eq!(map.chunk(1, 0).unwrap().row(0), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut map = TileMap::new(1, 1);
        // writes are ignored, reads report blocked
        map.set(-1, 0);
        map.set(0, 16);
        map.clear(99, 99);
        assert!(map.is_set(-1, 0));
        assert!(map.is_set(0, 16));
        assert!(map.is_set(99, 99));
        assert!(!map.is_set(0, 0));
    }

    #[test]
    fn test_los_straight() {
        let mut map = TileMap::new(1, 1);
        assert!(map.los(ivec2(0, 0), ivec2(7, 0)));
        map.set(3, 0);
        assert!(!map.los(ivec2(0, 0), ivec2(7, 0)));
        assert!(map.los(ivec2(0, 1), ivec2(7, 1)));
    }

    #[test]
    fn test_los_symmetric() {
        let mut map = TileMap::new(1, 1);
        map.set(4, 2);
        map.set(9, 9);
        let cases = [
            (ivec2(0, 0), ivec2(7, 3)),
            (ivec2(1, 1), ivec2(12, 5)),
            (ivec2(2, 9), ivec2(10, 1)),
            (ivec2(0, 0), ivec2(15, 15)),
        ];
        for (a, b) in cases {
            assert_eq!(map.los(a, b), map.los(b, a), "{a} {b}");
        }
    }

    #[test]
    fn test_los_corner_crossing() {
        let mut map = TileMap::new(1, 1);
        map.set(1, 0);
        map.set(0, 1);
        // the exact corner crossing is pinched shut
        assert!(!map.los(ivec2(0, 0), ivec2(1, 1)));
        assert!(!map.los(ivec2(1, 1), ivec2(0, 0)));
        // one open side is not enough to squeeze through
        map.clear(1, 0);
        assert!(!map.los(ivec2(0, 0), ivec2(1, 1)));
        map.clear(0, 1);
        assert!(map.los(ivec2(0, 0), ivec2(1, 1)));
    }

    #[test]
    fn test_los_same_cell() {
        let map = TileMap::new(1, 1);
        assert!(map.los(ivec2(3, 3), ivec2(3, 3)));
    }
}
