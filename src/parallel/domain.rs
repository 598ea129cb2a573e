use super::AdjacentProcs;
use crate::{region::Rect, utils::Axis, Container, Direction, Error, Result};

/// Transform a 3D index of a LxMxN array to a linear index of a L*M*N vector
pub(crate) fn multi_to_linear(idx: &[usize; 3], lengths: &[usize; 3]) -> usize {
    let [x, y, z] = *idx;
    let [nx, ny, nz] = *lengths;
    assert!(
        x < nx && y < ny && z < nz,
        "Multidimensional indices should be smaller than respective lengths"
    );
    x * ny * nz + y * nz + z
}
/// Transform a linear index of a L*M*N vector to a 3D index of a LxMxN array
pub(crate) fn linear_to_multi(idx: usize, lengths: &[usize; 3]) -> [usize; 3] {
    let [nx, ny, nz] = *lengths;
    assert!(
        nx * ny * nz > idx,
        "Index should be smaller than total number"
    );
    let z = idx % nz;
    let r = idx / nz;
    let y = r % ny;
    let x = r / ny;
    [x, y, z]
}

/// Determine and return the best configuration of processes to
/// reduce surface area for communication
pub fn procs_in_box(nprocs: usize, lengths: &[f64; 3]) -> [usize; 3] {
    let [lx, ly, lz] = *lengths;
    // This score is proportional to the surface area and therefore should be minimized
    let score = |nx: usize, ny: usize, nz: usize| {
        lx * ly / (nx * ny) as f64 + ly * lz / (ny * nz) as f64 + lx * lz / (nx * nz) as f64
    };

    let factors: Vec<usize> = (1..=nprocs.max(1)).filter(|i| nprocs % i == 0).collect();
    let mut best = ([1, 1, nprocs.max(1)], f64::MAX);
    for &nx in &factors {
        for &ny in factors
            .iter()
            .filter(|&&ny| nx * ny <= nprocs && nprocs % (nx * ny) == 0)
        {
            let nz = nprocs / nx / ny;
            let s = score(nx, ny, nz);
            if s < best.1 {
                best = ([nx, ny, nz], s);
            }
        }
    }
    best.0
}

/// The part of the box owned by one rank, and how it relates to its neighbors
#[derive(Clone, Debug)]
pub(crate) struct Domain {
    container: Container,
    grid: [usize; 3],
    my_idx: [usize; 3],
    subdomain: Rect,
    procs: AdjacentProcs,
}
impl Domain {
    pub fn new(rank: usize, num_ranks: usize, container: &Container) -> Self {
        let grid = procs_in_box(num_ranks, &container.lengths());
        let my_idx = linear_to_multi(rank, &grid);
        let subdomain = subdomain_of(container, &grid, &my_idx);
        Self {
            container: container.clone(),
            grid,
            my_idx,
            subdomain,
            procs: AdjacentProcs::new(&my_idx, &grid),
        }
    }

    // Getters
    pub fn container(&self) -> &Container {
        &self.container
    }
    pub fn subdomain(&self) -> &Rect {
        &self.subdomain
    }
    pub fn grid(&self) -> &[usize; 3] {
        &self.grid
    }
    pub fn my_idx(&self) -> &[usize; 3] {
        &self.my_idx
    }
    pub fn neighbor_rank(&self, direction: Direction) -> usize {
        self.procs.get(direction)
    }
    pub fn num_subdomains(&self, axis: Axis) -> usize {
        self.grid[axis.index()]
    }

    /// Index along `axis` of the subdomain holding `coord`
    pub fn owner_index(&self, axis: Axis, coord: f64) -> usize {
        let i = axis.index();
        let sublen = self.container.length(axis) / self.grid[i] as f64;
        let idx = ((coord - self.container.lo()[i]) / sublen).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.grid[i] - 1)
        }
    }
    /// Whether a wrapped position belongs to this rank
    pub fn owns(&self, coord: &[f64; 3]) -> bool {
        Axis::ALL
            .iter()
            .all(|&axis| self.owner_index(axis, coord[axis.index()]) == self.my_idx[axis.index()])
    }
    /// Offset applied to a ghost sent across `direction` so that it lands
    /// next to the receiving subdomain
    pub fn ghost_shift(&self, direction: Direction) -> f64 {
        let axis = direction.axis();
        let i = axis.index();
        let l = self.container.length(axis);
        if direction.is_lo() && self.my_idx[i] == 0 {
            l
        } else if !direction.is_lo() && self.my_idx[i] == self.grid[i] - 1 {
            -l
        } else {
            0.0
        }
    }

    /// Fail unless ghosts within `r_list` can be found on adjacent subdomains
    pub fn check_size(&self, r_list: f64) -> Result<()> {
        for axis in Axis::ALL {
            let l = self.container.length(axis);
            if l < 2.0 * r_list {
                return Err(Error::Domain(format!(
                    "box length {} along {:?} is smaller than twice the neighbor list range {}",
                    l, axis, r_list
                )));
            }
            let sublen = self.subdomain.length(axis);
            if sublen < r_list {
                return Err(Error::Domain(format!(
                    "subdomain length {} along {:?} is smaller than the neighbor list range {} \
                     (grid {:?}); use fewer ranks",
                    sublen, axis, r_list, self.grid
                )));
            }
        }
        Ok(())
    }
}

fn subdomain_of(container: &Container, grid: &[usize; 3], my_idx: &[usize; 3]) -> Rect {
    let lengths = container.lengths();
    let lo = container.lo();
    let hi = container.hi();
    let mut sdlo = [0.0; 3];
    let mut sdhi = [0.0; 3];
    for i in 0..3 {
        let l = lengths[i] / grid[i] as f64;
        sdlo[i] = lo[i] + l * my_idx[i] as f64;
        // last subdomain ends exactly on the box face
        sdhi[i] = if my_idx[i] == grid[i] - 1 {
            hi[i]
        } else {
            lo[i] + l * (my_idx[i] + 1) as f64
        };
    }
    Rect::from_corners(sdlo, sdhi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_conversions() {
        let lengths = [2, 3, 4];
        for i in 0..24 {
            assert_eq!(multi_to_linear(&linear_to_multi(i, &lengths), &lengths), i);
        }
        assert_eq!(linear_to_multi(5, &lengths), [0, 1, 1]);
    }

    #[test]
    fn best_proc_grids() {
        assert_eq!(procs_in_box(1, &[10.0, 10.0, 10.0]), [1, 1, 1]);
        assert_eq!(procs_in_box(8, &[10.0, 10.0, 10.0]), [2, 2, 2]);
        assert_eq!(procs_in_box(4, &[40.0, 10.0, 10.0]), [4, 1, 1]);
        let grid = procs_in_box(6, &[10.0, 10.0, 10.0]);
        assert_eq!(grid.iter().product::<usize>(), 6);
        assert_eq!(procs_in_box(7, &[10.0, 10.0, 10.0]).iter().product::<usize>(), 7);
    }

    #[test]
    fn subdomains_tile_the_box() {
        let container = Container::new(8.0, 8.0, 8.0).unwrap();
        let volume: f64 = (0..8)
            .map(|rank| Domain::new(rank, 8, &container).subdomain().volume())
            .sum();
        assert!((volume - container.volume()).abs() < 1e-12);

        let domain = Domain::new(0, 8, &container);
        assert_eq!(domain.subdomain(), &Rect::new(-4.0, 0.0, -4.0, 0.0, -4.0, 0.0));
        assert!(domain.owns(&[-1.0, -3.0, -0.1]));
        assert!(!domain.owns(&[0.0, -3.0, -0.1]));
        assert_eq!(domain.ghost_shift(Direction::Xlo), 8.0);
        assert_eq!(domain.ghost_shift(Direction::Xhi), 0.0);
    }

    #[test]
    fn owner_index_is_clamped() {
        let container = Container::new(9.0, 9.0, 9.0).unwrap();
        let domain = Domain::new(0, 3, &container);
        assert_eq!(domain.grid().iter().product::<usize>(), 3);
        let axis = Axis::ALL
            .into_iter()
            .find(|&a| domain.num_subdomains(a) == 3)
            .unwrap();
        assert_eq!(domain.owner_index(axis, -4.5), 0);
        assert_eq!(domain.owner_index(axis, 4.5), 2);
        assert_eq!(domain.owner_index(axis, 0.0), 1);
    }

    #[test]
    fn size_checks() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        assert!(Domain::new(0, 1, &container).check_size(2.9).is_ok());
        assert!(matches!(
            Domain::new(0, 1, &container).check_size(5.5),
            Err(Error::Domain(_))
        ));
        // 4 ranks give 10 x 5 x 5 subdomains
        assert!(Domain::new(0, 4, &container).check_size(2.9).is_ok());
        assert!(Domain::new(0, 8, &container).check_size(4.9).is_ok());
        assert!(Domain::new(0, 27, &container).check_size(3.4).is_err());
    }
}
