use crate::{region::Rect, utils::Axis, Error, Result};

/// Fully periodic, orthorhombic simulation box centered on the origin
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    rect: Rect,
}
impl Container {
    // Creation

    /// Create a container of the given edge lengths
    pub fn new(lx: f64, ly: f64, lz: f64) -> Result<Self> {
        let lengths = [lx, ly, lz];
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(Error::Format(format!(
                "box lengths should be positive, found {:?}",
                lengths
            )));
        }
        Ok(Self {
            rect: Rect::centered(lengths),
        })
    }
    /// Create a container from a GSD box `[Lx, Ly, Lz, xy, xz, yz]`
    pub fn from_gsd_box(gsd_box: &[f64; 6]) -> Result<Self> {
        let [lx, ly, lz, xy, xz, yz] = *gsd_box;
        if xy != 0.0 || xz != 0.0 || yz != 0.0 {
            return Err(Error::Format(format!(
                "tilted boxes are not supported, found tilt factors ({}, {}, {})",
                xy, xz, yz
            )));
        }
        Self::new(lx, ly, lz)
    }

    // Getters

    /// A reference to the rectangular box
    pub fn rect(&self) -> &Rect {
        &self.rect
    }
    pub fn lo(&self) -> &[f64; 3] {
        self.rect.lo()
    }
    pub fn hi(&self) -> &[f64; 3] {
        self.rect.hi()
    }
    pub fn length(&self, axis: Axis) -> f64 {
        self.rect.length(axis)
    }
    pub fn lengths(&self) -> [f64; 3] {
        self.rect.lengths()
    }
    pub fn volume(&self) -> f64 {
        self.rect.volume()
    }
    pub fn to_gsd_box(&self) -> [f64; 6] {
        let [lx, ly, lz] = self.lengths();
        [lx, ly, lz, 0.0, 0.0, 0.0]
    }

    /// Wrap a position back into the box, counting crossings in `image`
    pub fn wrap(&self, position: &mut [f64; 3], image: &mut [i32; 3]) {
        let lengths = self.lengths();
        for i in 0..3 {
            let (lo, hi, l) = (self.lo()[i], self.hi()[i], lengths[i]);
            if position[i] >= lo && position[i] < hi {
                continue;
            }
            let shift = ((position[i] - lo) / l).floor();
            position[i] -= shift * l;
            image[i] += shift as i32;
            // floating-point rounding can land exactly on hi
            if position[i] >= hi {
                position[i] -= l;
                image[i] += 1;
            }
            if position[i] < lo {
                position[i] = lo;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_counts_images() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let mut pos = [5.5, -16.0, 4.0];
        let mut image = [0, 0, 0];
        container.wrap(&mut pos, &mut image);
        assert_relative_eq!(pos[0], -4.5);
        assert_relative_eq!(pos[1], 4.0);
        assert_relative_eq!(pos[2], 4.0);
        assert_eq!(image, [1, -2, 0]);
        assert!(container.rect().contains(&pos));
    }

    #[test]
    fn upper_face_wraps_to_lower() {
        let container = Container::new(2.0, 2.0, 2.0).unwrap();
        let mut pos = [1.0, 0.0, 0.0];
        let mut image = [0; 3];
        container.wrap(&mut pos, &mut image);
        assert_eq!(pos, [-1.0, 0.0, 0.0]);
        assert_eq!(image, [1, 0, 0]);
    }

    #[test]
    fn rejects_tilt_and_bad_lengths() {
        assert!(Container::from_gsd_box(&[1.0, 1.0, 1.0, 0.1, 0.0, 0.0]).is_err());
        assert!(Container::new(1.0, 0.0, 1.0).is_err());
        assert!(Container::new(1.0, f64::NAN, 1.0).is_err());
    }
}
