use std::{fmt, hash::Hasher};

use metrohash::MetroHash64;

use crate::{error::ConfigError, pos, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Dead,
    Alive,
}

impl Cell {
    pub fn is_alive(self) -> bool {
        self == Cell::Alive
    }

    /// Conway's rule: survive on 2 or 3 neighbours, be born on exactly 3.
    pub fn next(self, alive_neighbours: u8) -> Cell {
        match (self, alive_neighbours) {
            (Cell::Alive, 2 | 3) => Cell::Alive, // stay
            (Cell::Dead, 3) => Cell::Alive,      // becomes alive
            _ => Cell::Dead,                     // dies or stays dead
        }
    }
}

impl From<bool> for Cell {
    fn from(alive: bool) -> Self {
        if alive {
            Cell::Alive
        } else {
            Cell::Dead
        }
    }
}

/// Read access to a fixed-size, column-major cell matrix.
///
/// Cell `(x, y)` lives at index `x * height + y`, so a range of columns is a
/// contiguous run of indices.
pub trait CellGrid {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Cell at a raw column-major index. Callers guarantee `index < width * height`.
    fn cell_at(&self, index: usize) -> Cell;

    fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width() && pos.y < self.height()
    }

    fn index_of(&self, pos: Pos) -> usize {
        assert!(
            self.contains(pos),
            "{pos:?} is outside a {}x{} grid",
            self.width(),
            self.height()
        );
        pos.x * self.height() + pos.y
    }

    fn try_get(&self, pos: Pos) -> Option<Cell> {
        self.contains(pos)
            .then(|| self.cell_at(pos.x * self.height() + pos.y))
    }

    /// # Panics
    ///
    /// Panics if `pos` is outside the grid.
    fn get(&self, pos: Pos) -> Cell {
        self.cell_at(self.index_of(pos))
    }

    /// Live cells among the 8 surrounding positions. Off-grid neighbours count as dead.
    fn count_alive_neighbours(&self, pos: Pos) -> u8 {
        let (width, height) = (self.width(), self.height());
        pos.neighbours(width, height)
            .filter(|&neighbour| self.cell_at(neighbour.x * height + neighbour.y).is_alive())
            .count() as u8
    }

    fn next_cell(&self, pos: Pos) -> Cell {
        self.get(pos).next(self.count_alive_neighbours(pos))
    }

    fn population(&self) -> usize {
        (0..self.width() * self.height())
            .filter(|&index| self.cell_at(index).is_alive())
            .count()
    }

    /// Content hash of the dimensions and every cell state.
    fn fingerprint(&self) -> u64 {
        let mut hasher = MetroHash64::default();
        hasher.write_usize(self.width());
        hasher.write_usize(self.height());
        let len = self.width() * self.height();
        for start in (0..len).step_by(64) {
            let bits = (start..len.min(start + 64))
                .fold(0u64, |bits, index| {
                    (bits << 1) | u64::from(self.cell_at(index).is_alive())
                });
            hasher.write_u64(bits);
        }
        hasher.finish()
    }
}

/// An owned grid: seeds, consumer snapshots and the single-threaded reference stepper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        let cells = vec![Cell::Dead; width * height];
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A grid with the given positions alive. Positions outside the grid are ignored.
    pub fn from_actives(
        width: usize,
        height: usize,
        actives: impl IntoIterator<Item = Pos>,
    ) -> Result<Self, ConfigError> {
        let mut grid = Self::new(width, height)?;
        for active in actives {
            if grid.contains(active) {
                grid.set(active, Cell::Alive);
            }
        }
        Ok(grid)
    }

    /// # Panics
    ///
    /// Panics if `pos` is outside the grid.
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        let index = self.index_of(pos);
        self.cells[index] = cell;
    }

    pub fn actives(&self) -> impl Iterator<Item = Pos> + '_ {
        let height = self.height;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, cell)| {
                cell.is_alive().then_some(pos!(index / height, index % height))
            })
    }

    /// Next generation computed on the calling thread.
    pub fn step(&self) -> Grid {
        let mut next = self.clone();
        for x in 0..self.width {
            for y in 0..self.height {
                next.set(pos!(x, y), self.next_cell(pos!(x, y)));
            }
        }
        next
    }

    /// Overwrites this grid with the contents of a same-sized grid.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn copy_from(&mut self, source: &impl CellGrid) {
        assert_eq!(
            (self.width, self.height),
            (source.width(), source.height()),
            "grid dimensions differ"
        );
        for (index, cell) in self.cells.iter_mut().enumerate() {
            *cell = source.cell_at(index);
        }
    }
}

impl CellGrid for Grid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn cell_at(&self, index: usize) -> Cell {
        self.cells[index]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let char = if self.get(pos!(x, y)).is_alive() { '#' } else { '.' };
                write!(f, "{char}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub(crate) use shared_grid::SharedGrid;
mod shared_grid;
