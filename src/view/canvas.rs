use std::io::{self, Write};

use crate::{pos, CellGrid, Pos};

/// Character buffer for one terminal screen: a grid viewport plus a status line.
pub struct Canvas {
    lines: Vec<Vec<char>>,
    status: String,
    width: usize,
    height: usize,
}

impl Canvas {
    /// Sized to the terminal, keeping the bottom row for the status line.
    pub fn from_screen() -> Self {
        let (width, height) = termion::terminal_size().unwrap_or((80, 24));
        Self::new(width as usize, (height as usize).saturating_sub(1).max(1))
    }

    pub fn new(width: usize, height: usize) -> Self {
        let lines = vec![vec![' '; width]; height];
        Self {
            lines,
            status: String::new(),
            width,
            height,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Draws the part of `grid` starting at `origin`. Cells past the grid's edge stay blank.
    pub fn paint(&mut self, grid: &impl CellGrid, origin: Pos, alive: char, dead: char) {
        for (y, line) in self.lines.iter_mut().enumerate() {
            for (x, slot) in line.iter_mut().enumerate() {
                let pos = pos!(origin.x + x, origin.y + y);
                *slot = match grid.try_get(pos) {
                    Some(cell) if cell.is_alive() => alive,
                    Some(_) => dead,
                    None => ' ',
                };
            }
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn render(&self) -> String {
        let mut result = String::with_capacity((self.width + 16) * (self.height + 1));
        for (index, line) in self.lines.iter().enumerate() {
            let goto = termion::cursor::Goto(1, index as u16 + 1);
            result += &format!("{goto}");
            result.extend(line.iter());
        }
        let goto = termion::cursor::Goto(1, self.height as u16 + 1);
        let status: String = self.status.chars().take(self.width).collect();
        result += &format!("{goto}{status}");
        result
    }

    pub fn display(&self, out: &mut impl Write) -> io::Result<()> {
        let clear = termion::clear::All;
        write!(out, "{clear}{}", self.render())?;
        out.flush()
    }

    #[cfg(test)]
    fn line(&self, y: usize) -> String {
        self.lines[y].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grid;

    #[test]
    fn paints_viewport_from_origin() {
        let grid = Grid::from_actives(4, 3, [pos!(1, 1), pos!(3, 2)]).unwrap();
        let mut canvas = Canvas::new(3, 2);

        canvas.paint(&grid, pos!(0, 0), '#', '.');
        assert_eq!(canvas.line(0), "...");
        assert_eq!(canvas.line(1), ".#.");

        canvas.paint(&grid, pos!(2, 1), '#', '.');
        assert_eq!(canvas.line(0), ".. ");
        assert_eq!(canvas.line(1), ".# ");
    }

    #[test]
    fn status_is_truncated_to_width() {
        let mut canvas = Canvas::new(4, 1);
        canvas.set_status("generation 12");
        assert!(canvas.render().ends_with("gene"));
    }
}
