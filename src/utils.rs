#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, PartialOrd, Ord)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[macro_export]
macro_rules! pos {
    ($x:expr, $y:expr) => {
        $crate::Pos { x: $x, y: $y }
    };
}

/// Moore neighbourhood offsets, row by row.
const NEIGHBOUR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl Pos {
    /// Moves by a signed offset, `None` when the result leaves `[0, width) x [0, height)`.
    pub fn offset(self, dx: isize, dy: isize, width: usize, height: usize) -> Option<Pos> {
        let x = self.x.checked_add_signed(dx).filter(|&x| x < width)?;
        let y = self.y.checked_add_signed(dy).filter(|&y| y < height)?;
        Some(pos!(x, y))
    }

    /// The up to 8 in-bounds neighbours of this position. Nothing wraps around.
    pub fn neighbours(self, width: usize, height: usize) -> impl Iterator<Item = Pos> {
        NEIGHBOUR_OFFSETS
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy, width, height))
    }

    /// Scrolls by a signed amount, clamping at zero.
    pub fn scrolled(self, dx: isize, dy: isize) -> Pos {
        pos!(
            self.x.saturating_add_signed(dx),
            self.y.saturating_add_signed(dy)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_has_three_neighbours() {
        let corner: Vec<_> = pos!(0, 0).neighbours(4, 4).collect();
        assert_eq!(corner, vec![pos!(1, 0), pos!(0, 1), pos!(1, 1)]);
        assert_eq!(pos!(3, 3).neighbours(4, 4).count(), 3);
    }

    #[test]
    fn edge_and_interior() {
        assert_eq!(pos!(2, 0).neighbours(4, 4).count(), 5);
        assert_eq!(pos!(2, 2).neighbours(4, 4).count(), 8);
        assert_eq!(pos!(0, 0).neighbours(1, 1).count(), 0);
    }

    #[test]
    fn scroll_clamps() {
        assert_eq!(pos!(2, 1).scrolled(-4, 4), pos!(0, 5));
    }
}
