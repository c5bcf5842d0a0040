use serde::{Deserialize, Serialize};
use skyfleet_structs::{FleetError, Point};
use tinyvec::TinyVec;

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Cell { x, y, z }
    }

    pub fn offset(&self, (dx, dy, dz): (i32, i32, i32)) -> Cell {
        Cell { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }

    /// Fewest moves between two cells under the 10-connected move set:
    /// planar diagonals cover x and y together, altitude needs its own moves.
    pub fn hops_to(&self, other: &Cell) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dx.max(dy) + dz
    }

    pub fn chebyshev(&self, other: &Cell) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dx.max(dy).max(dz)
    }
}

/// Six axis moves followed by the four planar diagonals.
pub const MOVES: [(i32, i32, i32); 10] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
    (1, 1, 0),
    (1, -1, 0),
    (-1, 1, 0),
    (-1, -1, 0),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GridSize {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridSize {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        GridSize { x, y, z }
    }

    pub fn cells(&self) -> usize {
        self.checked_cells().unwrap_or(usize::MAX)
    }

    /// `None` when the cell count does not fit in a `usize`.
    pub fn checked_cells(&self) -> Option<usize> {
        (self.x.max(0) as usize).checked_mul(self.y.max(0) as usize)?.checked_mul(self.z.max(0) as usize)
    }

    pub fn contains(&self, c: &Cell) -> bool {
        c.x >= 0 && c.y >= 0 && c.z >= 0 && c.x < self.x && c.y < self.y && c.z < self.z
    }

    pub fn index(&self, c: &Cell) -> Option<usize> {
        self.contains(c).then(|| {
            let (x, y) = (self.x as usize, self.y as usize);
            (c.z as usize * y + c.y as usize) * x + c.x as usize
        })
    }
}

/// Largest grid [`Grid::new`] accepts.
pub const MAX_CELLS: usize = i32::MAX as usize;

/// Discretized airspace with binary static occupancy.
#[derive(Clone, Debug)]
pub struct Grid {
    size: GridSize,
    cell_size: f32,
    occupied: Vec<bool>,
}

impl Grid {
    pub fn new(size: GridSize, cell_size: f32) -> skyfleet_structs::Result<Self> {
        if size.x <= 0 || size.y <= 0 || size.z <= 0 {
            return Err(FleetError::config(format!(
                "grid dimensions must be positive, got {}x{}x{}",
                size.x, size.y, size.z
            )));
        }
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(FleetError::config(format!("cell size must be positive, got {}", cell_size)));
        }
        let cells = match size.checked_cells() {
            Some(n) if n <= MAX_CELLS => n,
            _ => {
                return Err(FleetError::config(format!(
                    "grid {}x{}x{} exceeds {} cells",
                    size.x, size.y, size.z, MAX_CELLS
                )))
            }
        };
        Ok(Grid { size, cell_size, occupied: vec![false; cells] })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn in_bounds(&self, c: &Cell) -> bool {
        self.size.contains(c)
    }

    /// Out-of-bounds cells count as occupied.
    pub fn is_occupied(&self, c: &Cell) -> bool {
        self.size.index(c).map(|i| self.occupied[i]).unwrap_or(true)
    }

    pub fn is_free(&self, c: &Cell) -> bool {
        !self.is_occupied(c)
    }

    /// Returns false when the cell lies outside the grid.
    pub fn set_occupied(&mut self, c: Cell, occupied: bool) -> bool {
        match self.size.index(&c) {
            Some(i) => {
                self.occupied[i] = occupied;
                true
            }
            None => false,
        }
    }

    /// Marks every in-bounds cell of the inclusive box as occupied.
    pub fn occupy_box(&mut self, min: Cell, max: Cell) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.set_occupied(Cell { x, y, z }, true);
                }
            }
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|o| **o).count()
    }

    pub fn cell_of(&self, p: &Point) -> Cell {
        Cell {
            x: (p.x / self.cell_size).floor() as i32,
            y: (p.y / self.cell_size).floor() as i32,
            z: (p.z / self.cell_size).floor() as i32,
        }
    }

    pub fn center_of(&self, c: &Cell) -> Point {
        Point {
            x: (c.x as f32 + 0.5) * self.cell_size,
            y: (c.y as f32 + 0.5) * self.cell_size,
            z: (c.z as f32 + 0.5) * self.cell_size,
        }
    }

    /// In-bounds, statically free cells one move away.
    pub fn neighbors(&self, c: &Cell) -> TinyVec<[Cell; 10]> {
        MOVES.iter().map(|m| c.offset(*m)).filter(|n| self.is_free(n)).collect()
    }

    /// In-bounds cells whose centers satisfy `inside`, searched within the
    /// axis-aligned box around `center` with the given half extents.
    pub fn cells_around(
        &self,
        center: &Point,
        half_xy: f32,
        z_range: (f32, f32),
        inside: impl Fn(&Point) -> bool,
    ) -> Vec<Cell> {
        let lo = self.cell_of(&Point { x: center.x - half_xy, y: center.y - half_xy, z: z_range.0 });
        let hi = self.cell_of(&Point { x: center.x + half_xy, y: center.y + half_xy, z: z_range.1 });
        let mut cells = Vec::new();
        for z in lo.z.max(0)..=hi.z.min(self.size.z - 1) {
            for y in lo.y.max(0)..=hi.y.min(self.size.y - 1) {
                for x in lo.x.max(0)..=hi.x.min(self.size.x - 1) {
                    let c = Cell { x, y, z };
                    if inside(&self.center_of(&c)) {
                        cells.push(c);
                    }
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_grid() {
        assert!(matches!(Grid::new(GridSize::new(0, 5, 5), 1.0), Err(FleetError::Config { .. })));
        assert!(matches!(Grid::new(GridSize::new(5, 5, -1), 1.0), Err(FleetError::Config { .. })));
        assert!(matches!(Grid::new(GridSize::new(5, 5, 5), 0.0), Err(FleetError::Config { .. })));
    }

    #[test]
    fn rejects_oversized_grid() {
        assert!(matches!(Grid::new(GridSize::new(2000, 2000, 1000), 1.0), Err(FleetError::Config { .. })));
        assert!(matches!(Grid::new(GridSize::new(i32::MAX, i32::MAX, 2), 1.0), Err(FleetError::Config { .. })));
        assert!(GridSize::new(i32::MAX, 2, 2).checked_cells().is_some_and(|n| n > MAX_CELLS));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn index_does_not_wrap_on_large_sizes() {
        let size = GridSize::new(50_000, 50_000, 2);
        assert_eq!(size.index(&Cell::new(49_999, 49_999, 1)), Some(4_999_999_999));
        assert_eq!(size.index(&Cell::new(1, 0, 0)), Some(1));
        assert_eq!(size.index(&Cell::new(50_000, 0, 0)), None);
    }

    #[test]
    fn neighbors_respect_bounds_and_occupancy() {
        let mut grid = Grid::new(GridSize::new(3, 3, 3), 1.0).unwrap();
        assert_eq!(grid.neighbors(&Cell::new(1, 1, 1)).len(), 10);
        assert_eq!(grid.neighbors(&Cell::new(0, 0, 0)).len(), 4);
        grid.set_occupied(Cell::new(2, 1, 1), true);
        let n = grid.neighbors(&Cell::new(1, 1, 1));
        assert_eq!(n.len(), 9);
        assert!(!n.contains(&Cell::new(2, 1, 1)));
        assert!(grid.is_occupied(&Cell::new(-1, 0, 0)));
    }

    #[test]
    fn point_cell_conversion() {
        let grid = Grid::new(GridSize::new(10, 10, 4), 10.0).unwrap();
        let c = grid.cell_of(&Point::new(25.0, 99.0, 0.0));
        assert_eq!(c, Cell::new(2, 9, 0));
        assert_eq!(grid.center_of(&c), Point::new(25.0, 95.0, 5.0));
        assert_eq!(Cell::new(0, 0, 0).hops_to(&Cell::new(3, 5, 2)), 7);
    }
}
