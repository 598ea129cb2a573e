use crate::region::Rect;

/// Cell grid covering a rank's subdomain plus a margin for ghosts.
///
/// Every cell is at least `min_bin_size` long, so all neighbors of a
/// particle within that distance lie in the 27 surrounding cells.
#[derive(Clone, Debug)]
pub struct Bins {
    lo: [f64; 3],
    bin_size: [f64; 3],
    num_bins: [usize; 3],
}
impl Bins {
    pub fn new(region: &Rect, margin: f64, min_bin_size: f64) -> Self {
        assert!(min_bin_size > 0.0, "Bin size must be positive");
        let lo = region.lo().map(|x| x - margin);
        let extent = region.lengths().map(|l| l + 2.0 * margin);
        let num_bins = extent.map(|e| ((e / min_bin_size).floor() as usize).max(1));
        let bin_size = [
            extent[0] / num_bins[0] as f64,
            extent[1] / num_bins[1] as f64,
            extent[2] / num_bins[2] as f64,
        ];
        Self {
            lo,
            bin_size,
            num_bins,
        }
    }
    pub fn num_bins(&self) -> [usize; 3] {
        self.num_bins
    }
    pub fn total_num_bins(&self) -> usize {
        self.num_bins[0] * self.num_bins[1] * self.num_bins[2]
    }
    /// Cell of a coordinate; coordinates outside the grid use the nearest cell
    pub fn coord_to_bin(&self, coord: &[f64; 3]) -> [usize; 3] {
        let mut inds = [0usize; 3];
        for i in 0..3 {
            let x = ((coord[i] - self.lo[i]) / self.bin_size[i]).floor();
            inds[i] = (x.max(0.0) as usize).min(self.num_bins[i] - 1);
        }
        inds
    }
    pub fn bin_idx(&self, inds: &[usize; 3]) -> usize {
        inds[0] * self.num_bins[1] * self.num_bins[2] + inds[1] * self.num_bins[2] + inds[2]
    }
    pub fn coord_to_bin_idx(&self, coord: &[f64; 3]) -> usize {
        self.bin_idx(&self.coord_to_bin(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_are_at_least_min_size() {
        let region = Rect::new(0.0, 10.0, 0.0, 5.0, 0.0, 2.0);
        let bins = Bins::new(&region, 1.0, 2.9);
        assert_eq!(bins.num_bins(), [4, 2, 1]);
        assert_eq!(bins.total_num_bins(), 8);
        assert_eq!(bins.coord_to_bin(&[-1.0, -1.0, -1.0]), [0, 0, 0]);
        assert_eq!(bins.coord_to_bin(&[10.9, 5.9, 2.9]), [3, 1, 0]);
        // clamped outside the margin
        assert_eq!(bins.coord_to_bin(&[50.0, -50.0, 0.0]), [3, 0, 0]);
        assert_eq!(bins.coord_to_bin_idx(&[10.9, 5.9, 2.9]), 7);
    }
}
