use super::Lattice;
use crate::{region::Rect, Error, Result};

/// Simple cubic lattice
#[derive(Debug)]
pub struct Cubic {
    a: f64,
}
impl Cubic {
    pub fn new(a: f64) -> Result<Self> {
        let s = Self { a };
        s.check_positive()?;
        Ok(s)
    }
    pub fn from_density(rho: f64) -> Result<Self> {
        let s = Self {
            a: (1.0 / rho).cbrt(),
        };
        s.check_positive()?;
        Ok(s)
    }
    fn check_positive(&self) -> Result<()> {
        if self.a > 0.0 && self.a.is_finite() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Lattice constant should be positive, found {}",
                self.a
            )))
        }
    }
}
impl Lattice for Cubic {
    fn cell_lengths(&self) -> [f64; 3] {
        [self.a, self.a, self.a]
    }
    fn coords_within_region(&self, region: &Rect, origin: &[f64; 3]) -> Vec<[f64; 3]> {
        let lo = region.lo();
        let hi = region.hi();
        // first and one-past-last lattice index along each axis
        let first: Vec<i64> = (0..3)
            .map(|i| ((lo[i] - origin[i]) / self.a).ceil() as i64)
            .collect();
        let last: Vec<i64> = (0..3)
            .map(|i| ((hi[i] - origin[i]) / self.a).ceil() as i64)
            .collect();
        let nlattice: Vec<usize> = (0..3).map(|i| (last[i] - first[i]).max(0) as usize).collect();
        let mut coords: Vec<[f64; 3]> = Vec::with_capacity(nlattice[0] * nlattice[1] * nlattice[2]);

        for i in first[0]..last[0] {
            for j in first[1]..last[1] {
                for k in first[2]..last[2] {
                    coords.push([
                        origin[0] + self.a * i as f64,
                        origin[1] + self.a * j as f64,
                        origin[2] + self.a * k as f64,
                    ]);
                }
            }
        }
        coords
    }
}
