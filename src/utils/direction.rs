#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}
impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
    pub fn direction(&self, lo: bool) -> Direction {
        match (self, lo) {
            (Axis::X, true) => Direction::Xlo,
            (Axis::X, false) => Direction::Xhi,
            (Axis::Y, true) => Direction::Ylo,
            (Axis::Y, false) => Direction::Yhi,
            (Axis::Z, true) => Direction::Zlo,
            (Axis::Z, false) => Direction::Zhi,
        }
    }
}

/// One of the six faces of a box
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Xlo,
    Xhi,
    Ylo,
    Yhi,
    Zlo,
    Zhi,
}
impl Direction {
    /// Exchange order used by all ranks: x, y, z and lo before hi.
    pub const STAGES: [Direction; 6] = [
        Direction::Xlo,
        Direction::Xhi,
        Direction::Ylo,
        Direction::Yhi,
        Direction::Zlo,
        Direction::Zhi,
    ];

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Xlo => Direction::Xhi,
            Direction::Xhi => Direction::Xlo,
            Direction::Ylo => Direction::Yhi,
            Direction::Yhi => Direction::Ylo,
            Direction::Zlo => Direction::Zhi,
            Direction::Zhi => Direction::Zlo,
        }
    }
    pub fn axis(&self) -> Axis {
        match self {
            Direction::Xlo | Direction::Xhi => Axis::X,
            Direction::Ylo | Direction::Yhi => Axis::Y,
            Direction::Zlo | Direction::Zhi => Axis::Z,
        }
    }
    pub fn is_lo(&self) -> bool {
        matches!(self, Direction::Xlo | Direction::Ylo | Direction::Zlo)
    }
    pub fn index(&self) -> usize {
        match self {
            Direction::Xlo => 0,
            Direction::Xhi => 1,
            Direction::Ylo => 2,
            Direction::Yhi => 3,
            Direction::Zlo => 4,
            Direction::Zhi => 5,
        }
    }
}
