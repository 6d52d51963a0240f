//! Center-outward ring traversal order.
//!
//! ```text
//!  r=2:  1  2  3  4  5      top edge, left→right
//!        11 .  .  .  14     left column, then right column (top→bottom)
//!        12 .  C  .  15
//!        13 .  .  .  16
//!        6  7  8  9  10     bottom edge, left→right
//! ```
//!
//! The walk yields every tile of the square ring at each radius, including
//! tiles outside the viewport; the scanner filters those out without
//! spending a query on them.

/// Iterator over tiles in ring order around a center, up to `max_radius`.
#[derive(Debug, Clone)]
pub struct RingWalk {
    center: (i64, i64),
    max_radius: i64,
    radius: i64,
    /// Tiles of the current ring not yet yielded, in visit order.
    pending: std::vec::IntoIter<(i64, i64)>,
}

impl RingWalk {
    /// Walk around `center` out to and including `max_radius`.
    pub fn new(center: (i64, i64), max_radius: i64) -> Self {
        Self {
            center,
            max_radius: max_radius.max(0),
            radius: 0,
            pending: vec![center].into_iter(),
        }
    }

    /// Radius of the ring currently being yielded.
    pub fn radius(&self) -> i64 {
        self.radius
    }

    fn ring(&self, r: i64) -> Vec<(i64, i64)> {
        let (cx, cy) = self.center;
        let mut tiles = Vec::with_capacity(r.clamp(0, 1 << 16) as usize * 8);
        // Edges past the i64 range are dropped.
        let (left, right) = (cx.checked_sub(r), cx.checked_add(r));
        let (top, bottom) = (cy.checked_sub(r), cy.checked_add(r));
        let (x_lo, x_hi) = (cx.saturating_sub(r), cx.saturating_add(r));
        for row in [top, bottom].into_iter().flatten() {
            for x in x_lo..=x_hi {
                tiles.push((x, row));
            }
        }
        let y_lo = top.map_or(i64::MIN, |t| t + 1);
        let y_hi = bottom.map_or(i64::MAX, |b| b - 1);
        for column in [left, right].into_iter().flatten() {
            for y in y_lo..=y_hi {
                tiles.push((column, y));
            }
        }
        tiles
    }
}

impl Iterator for RingWalk {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tile) = self.pending.next() {
                return Some(tile);
            }
            if self.radius >= self.max_radius {
                return None;
            }
            self.radius += 1;
            self.pending = self.ring(self.radius).into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_center_only() {
        let tiles: Vec<_> = RingWalk::new((3, 4), 0).collect();
        assert_eq!(tiles, vec![(3, 4)]);
    }

    #[test]
    fn test_first_ring_order() {
        let tiles: Vec<_> = RingWalk::new((0, 0), 1).collect();
        assert_eq!(
            tiles,
            vec![
                (0, 0),
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 1),
                (0, 1),
                (1, 1),
                (-1, 0),
                (1, 0),
            ]
        );
    }

    #[test]
    fn test_ring_at_i64_edge_drops_unrepresentable_tiles() {
        let tiles: Vec<_> = RingWalk::new((i64::MAX, 0), 1).collect();
        assert_eq!(
            tiles,
            vec![
                (i64::MAX, 0),
                (i64::MAX - 1, -1),
                (i64::MAX, -1),
                (i64::MAX - 1, 1),
                (i64::MAX, 1),
                (i64::MAX - 1, 0),
            ]
        );
    }

    #[test]
    fn test_ring_sizes_and_uniqueness() {
        let tiles: Vec<_> = RingWalk::new((10, -10), 3).collect();
        assert_eq!(tiles.len(), 49);
        let unique: HashSet<_> = tiles.iter().copied().collect();
        assert_eq!(unique.len(), 49);
    }

    #[test]
    fn test_chebyshev_distance_is_nondecreasing() {
        let center = (5, 5);
        let mut last = 0;
        for (x, y) in RingWalk::new(center, 4) {
            let d = (x - center.0).abs().max((y - center.1).abs());
            assert!(d >= last);
            last = d;
        }
        assert_eq!(last, 4);
    }
}
