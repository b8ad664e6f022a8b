use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Cell, CellGrid, Grid, Pos};

/// Engine buffer that several workers write at once.
///
/// Each cell is an atomic accessed with `Relaxed` ordering. Workers write
/// disjoint column ranges and never read the buffer they write, so there is
/// no contention on cells; visibility between rounds is established by the
/// round lock every worker and the coordinator pass through.
#[derive(Debug)]
pub struct SharedGrid {
    width: usize,
    height: usize,
    cells: Box<[AtomicBool]>,
}

impl SharedGrid {
    pub fn blank(width: usize, height: usize) -> Self {
        let cells = (0..width * height).map(|_| AtomicBool::new(false)).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn from_grid(grid: &Grid) -> Self {
        let cells = (0..grid.width() * grid.height())
            .map(|index| AtomicBool::new(grid.cell_at(index).is_alive()))
            .collect();
        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
        }
    }

    #[inline]
    pub fn store(&self, pos: Pos, cell: Cell) {
        let index = self.index_of(pos);
        self.cells[index].store(cell.is_alive(), Ordering::Relaxed);
    }
}

impl CellGrid for SharedGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn cell_at(&self, index: usize) -> Cell {
        Cell::from(self.cells[index].load(Ordering::Relaxed))
    }
}
