//! A 255x255-tiled rectangle database that assigns each added rectangle a
//! monotonically increasing "draw group index": one larger than the max
//! group index of every rectangle it overlaps. Draw reordering uses the
//! group index as the most significant field of its sort key, so two draws
//! can only swap order when neither's bounds intersect the other's.
//!
//! Tiles are 255 units wide so a coordinate relative to a tile's corner
//! always fits in a `u8`, which keeps the per-rectangle edge test a handful
//! of byte compares instead of a full 32-bit one. Rectangles spanning more
//! than one tile register themselves with every tile they touch.

use crate::geom::IRect;

const TILE_SIZE: i32 = 255;
const CHUNK_SIZE: usize = 8;

/// One rectangle's edges inside a tile, encoded as `[left, top, 255-right,
/// 255-bottom]` relative to the tile's top-left corner. Negating the right
/// and bottom sides lets every edge comparison use the same `<` operator
/// (see [`edges_intersect`]).
#[derive(Debug, Clone, Copy, Default)]
struct TileEdges {
    left: u8,
    top: u8,
    neg_right: u8,
    neg_bottom: u8,
}

struct Chunk {
    edges: [TileEdges; CHUNK_SIZE],
    group_indices: [u16; CHUNK_SIZE],
}

impl Chunk {
    fn empty() -> Self {
        // Maximal edges so an unfilled slot never passes an intersection test.
        Self {
            edges: [TileEdges {
                left: u8::MAX,
                top: u8::MAX,
                neg_right: u8::MAX,
                neg_bottom: u8::MAX,
            }; CHUNK_SIZE],
            group_indices: [0; CHUNK_SIZE],
        }
    }
}

/// A single 255x255 cell of the board.
struct IntersectionTile {
    left: i32,
    top: i32,
    baseline_group_index: u16,
    max_group_index: u16,
    rectangle_count: usize,
    chunks: Vec<Chunk>,
}

impl IntersectionTile {
    fn new(left: i32, top: i32) -> Self {
        Self {
            left,
            top,
            baseline_group_index: 0,
            max_group_index: 0,
            rectangle_count: 0,
            chunks: Vec::new(),
        }
    }

    fn reset(&mut self, left: i32, top: i32, baseline_group_index: u16) {
        self.left = left;
        self.top = top;
        self.baseline_group_index = baseline_group_index;
        self.max_group_index = baseline_group_index;
        self.rectangle_count = 0;
        self.chunks.clear();
    }

    /// Local tile-relative ltrb, clamped to `[0, 255]`. `None` if the
    /// rectangle falls entirely outside this tile.
    fn local_ltrb(&self, rect: &IRect) -> Option<(i32, i32, i32, i32)> {
        let l = rect.left - self.left;
        let t = rect.top - self.top;
        let r = rect.right - self.left;
        let b = rect.bottom - self.top;
        if l >= TILE_SIZE || t >= TILE_SIZE || r <= 0 || b <= 0 {
            return None;
        }
        Some((l.max(0), t.max(0), r.min(TILE_SIZE), b.min(TILE_SIZE)))
    }

    fn add_rectangle(&mut self, rect: &IRect, group_index: u16) {
        let Some((l, t, r, b)) = self.local_ltrb(rect) else {
            return;
        };

        if l == 0 && t == 0 && r == TILE_SIZE && b == TILE_SIZE {
            // Covers the whole tile: every future rectangle will trivially
            // intersect it, so collapse the tile to a fresh baseline instead
            // of growing the chunk list forever.
            self.reset(self.left, self.top, group_index);
            return;
        }

        let sub_idx = self.rectangle_count % CHUNK_SIZE;
        if sub_idx == 0 {
            self.chunks.push(Chunk::empty());
        }

        let chunk = self.chunks.last_mut().expect("chunk just pushed");
        chunk.edges[sub_idx] = TileEdges {
            left: l.clamp(0, 255) as u8,
            top: t.clamp(0, 255) as u8,
            neg_right: (TILE_SIZE - r).clamp(0, 255) as u8,
            neg_bottom: (TILE_SIZE - b).clamp(0, 255) as u8,
        };
        chunk.group_indices[sub_idx] = group_index;

        self.max_group_index = self.max_group_index.max(group_index);
        self.rectangle_count += 1;
    }

    /// Folds the max group index of every stored rectangle that intersects
    /// `rect` into `running_max`, without dropping below this tile's
    /// baseline (everything added before the tile's last full-tile reset).
    fn max_intersecting_group_index(&self, rect: &IRect, running_max: u16) -> u16 {
        let Some((l, t, r, b)) = self.local_ltrb(rect) else {
            return running_max.max(self.baseline_group_index);
        };

        if l == 0 && t == 0 && r == TILE_SIZE && b == TILE_SIZE {
            return running_max.max(self.max_group_index);
        }

        let mut best = running_max;
        for chunk in &self.chunks {
            for i in 0..CHUNK_SIZE {
                let e = chunk.edges[i];
                if edges_intersect(l, t, r, b, e) {
                    best = best.max(chunk.group_indices[i]);
                }
            }
        }
        best.max(self.baseline_group_index)
    }
}

/// `l0 < r1 && t0 < b1 && r0 > l1 && b0 > t1`, expressed with the stored
/// rectangle's right/bottom already negated (`neg_right = 255 - right`) so
/// every comparison is a plain `<` between small non-negative integers.
#[inline]
fn edges_intersect(l: i32, t: i32, r: i32, b: i32, stored: TileEdges) -> bool {
    (stored.left as i32) < r
        && (stored.top as i32) < b
        && (stored.neg_right as i32) < (TILE_SIZE - l)
        && (stored.neg_bottom as i32) < (TILE_SIZE - t)
}

/// A 255x255-tiled database of axis-aligned pixel rectangles, used to assign
/// each drawn rectangle's group index for draw reordering and batching.
pub struct IntersectionBoard {
    viewport_width: i32,
    viewport_height: i32,
    cols: i32,
    rows: i32,
    tiles: Vec<IntersectionTile>,
}

impl IntersectionBoard {
    pub fn new() -> Self {
        Self {
            viewport_width: 0,
            viewport_height: 0,
            cols: 0,
            rows: 0,
            tiles: Vec::new(),
        }
    }

    /// Resizes the board to cover `(width, height)` and clears every
    /// rectangle previously added. Reuses the tile allocation when the new
    /// viewport needs no more tiles than are already allocated.
    pub fn resize_and_reset(&mut self, width: u32, height: u32) {
        self.viewport_width = width as i32;
        self.viewport_height = height as i32;
        self.cols = (self.viewport_width + TILE_SIZE - 1) / TILE_SIZE;
        self.rows = (self.viewport_height + TILE_SIZE - 1) / TILE_SIZE;
        let needed = (self.cols * self.rows).max(0) as usize;

        if self.tiles.len() < needed {
            self.tiles.resize_with(needed, || IntersectionTile::new(0, 0));
        }

        for y in 0..self.rows {
            for x in 0..self.cols {
                let idx = (y * self.cols + x) as usize;
                self.tiles[idx].reset(x * TILE_SIZE, y * TILE_SIZE, 0);
            }
        }
    }

    /// Adds `rect` to the board and returns its assigned group index: one
    /// greater than the maximum group index among every previously added
    /// rectangle it overlaps, or `1` if it overlaps nothing. Rectangles that
    /// are empty or fall entirely outside the viewport are discarded and
    /// return `0` (the implicit group index every draw starts at).
    pub fn add_rectangle(&mut self, rect: &IRect) -> u16 {
        if rect.is_empty()
            || rect.left >= self.viewport_width
            || rect.top >= self.viewport_height
            || rect.right <= 0
            || rect.bottom <= 0
        {
            return 0;
        }

        let clamped = IRect::new(
            rect.left.max(0),
            rect.top.max(0),
            rect.right.min(self.viewport_width),
            rect.bottom.min(self.viewport_height),
        );

        let col_start = (clamped.left / TILE_SIZE).clamp(0, self.cols - 1);
        let col_end = ((clamped.right - 1) / TILE_SIZE).clamp(0, self.cols - 1);
        let row_start = (clamped.top / TILE_SIZE).clamp(0, self.rows - 1);
        let row_end = ((clamped.bottom - 1) / TILE_SIZE).clamp(0, self.rows - 1);

        let mut max_group_index: u16 = 0;
        for y in row_start..=row_end {
            for x in col_start..=col_end {
                let idx = (y * self.cols + x) as usize;
                max_group_index = self.tiles[idx]
                    .max_intersecting_group_index(&clamped, max_group_index);
            }
        }

        let next_group_index = max_group_index.checked_add(1).expect(
            "more rectangles were added this frame than fit in a 16-bit group index",
        );

        for y in row_start..=row_end {
            for x in col_start..=col_end {
                let idx = (y * self.cols + x) as usize;
                self.tiles[idx].add_rectangle(&clamped, next_group_index);
            }
        }

        next_group_index
    }
}

impl Default for IntersectionBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(l: i32, t: i32, r: i32, b: i32) -> IRect {
        IRect::new(l, t, r, b)
    }

    #[test]
    fn disjoint_rectangles_all_get_group_one() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        assert_eq!(board.add_rectangle(&rect(0, 0, 10, 10)), 1);
        assert_eq!(board.add_rectangle(&rect(100, 100, 110, 110)), 1);
        assert_eq!(board.add_rectangle(&rect(200, 200, 210, 210)), 1);
    }

    #[test]
    fn overlapping_rectangles_get_increasing_groups() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        assert_eq!(board.add_rectangle(&rect(0, 0, 50, 50)), 1);
        // Overlaps the first rectangle.
        assert_eq!(board.add_rectangle(&rect(25, 25, 75, 75)), 2);
        // Overlaps the second but not the first.
        assert_eq!(board.add_rectangle(&rect(60, 60, 100, 100)), 3);
    }

    #[test]
    fn touching_but_not_overlapping_rectangles_do_not_conflict() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        assert_eq!(board.add_rectangle(&rect(0, 0, 10, 10)), 1);
        // Shares an edge at x=10 but open intervals don't overlap.
        assert_eq!(board.add_rectangle(&rect(10, 0, 20, 10)), 1);
    }

    #[test]
    fn rectangle_spanning_multiple_tiles_is_tracked_in_all_of_them() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        // Spans tiles (0,0) and (1,0).
        assert_eq!(board.add_rectangle(&rect(200, 0, 300, 50)), 1);
        // Overlaps only within the second tile.
        assert_eq!(board.add_rectangle(&rect(280, 0, 320, 50)), 2);
    }

    #[test]
    fn offscreen_rectangle_is_discarded() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(100, 100);

        assert_eq!(board.add_rectangle(&rect(200, 200, 210, 210)), 0);
    }

    #[test]
    fn reset_clears_previous_rectangles() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        assert_eq!(board.add_rectangle(&rect(0, 0, 10, 10)), 1);
        board.resize_and_reset(1000, 1000);
        assert_eq!(board.add_rectangle(&rect(0, 0, 10, 10)), 1);
    }

    #[test]
    fn many_stacked_rectangles_increase_monotonically() {
        let mut board = IntersectionBoard::new();
        board.resize_and_reset(1000, 1000);

        let mut last = 0;
        for i in 0..40 {
            let idx = board.add_rectangle(&rect(0, 0, 10 + i, 10 + i));
            assert!(idx > last);
            last = idx;
        }
    }
}
