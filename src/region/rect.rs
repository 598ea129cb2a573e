use crate::utils::{Axis, Direction};

/// Axis-aligned box given by its lower and upper corners
#[derive(Clone, Debug, PartialEq)]
pub struct Rect {
    lo: [f64; 3],
    hi: [f64; 3],
}
impl Rect {
    pub fn new(xlo: f64, xhi: f64, ylo: f64, yhi: f64, zlo: f64, zhi: f64) -> Self {
        Self::from_corners([xlo, ylo, zlo], [xhi, yhi, zhi])
    }
    pub fn from_corners(lo: [f64; 3], hi: [f64; 3]) -> Self {
        assert!(
            (0..3).all(|i| lo[i] < hi[i]),
            "Lower corner {:?} should be below upper corner {:?}",
            lo,
            hi
        );
        Self { lo, hi }
    }
    /// Box of the given lengths centered on the origin
    pub fn centered(lengths: [f64; 3]) -> Self {
        let lo = lengths.map(|l| -0.5 * l);
        let hi = lengths.map(|l| 0.5 * l);
        Self::from_corners(lo, hi)
    }
    pub fn lo(&self) -> &[f64; 3] {
        &self.lo
    }
    pub fn hi(&self) -> &[f64; 3] {
        &self.hi
    }
    pub fn length(&self, axis: Axis) -> f64 {
        self.hi[axis.index()] - self.lo[axis.index()]
    }
    pub fn lengths(&self) -> [f64; 3] {
        [
            self.hi[0] - self.lo[0],
            self.hi[1] - self.lo[1],
            self.hi[2] - self.lo[2],
        ]
    }
    pub fn volume(&self) -> f64 {
        let [lx, ly, lz] = self.lengths();
        lx * ly * lz
    }
    pub fn get_bound(&self, direction: Direction) -> f64 {
        let i = direction.axis().index();
        if direction.is_lo() {
            self.lo[i]
        } else {
            self.hi[i]
        }
    }
    /// Half-open containment, so that neighboring boxes never share a point
    pub fn contains(&self, coord: &[f64; 3]) -> bool {
        (0..3).all(|i| self.lo[i] <= coord[i] && coord[i] < self.hi[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_bounds() {
        let rect = Rect::new(0.0, 1.0, 0.0, 2.0, 0.0, 3.0);
        assert!(rect.contains(&[0.0, 0.0, 0.0]));
        assert!(!rect.contains(&[1.0, 0.5, 0.5]));
        assert_eq!(rect.volume(), 6.0);
        assert_eq!(rect.get_bound(Direction::Yhi), 2.0);
    }

    #[test]
    fn centered_box() {
        let rect = Rect::centered([4.0, 4.0, 2.0]);
        assert_eq!(rect.lo(), &[-2.0, -2.0, -1.0]);
        assert_eq!(rect.length(Axis::Z), 2.0);
    }
}
