mod cubic;

pub use cubic::Cubic;

use crate::{gsd::Snapshot, region::Rect, Error, Result};

pub trait Lattice {
    /// Lattice sites `origin + n * cell` that fall inside `region`
    fn coords_within_region(&self, region: &Rect, origin: &[f64; 3]) -> Vec<[f64; 3]>;
    fn cell_lengths(&self) -> [f64; 3];
}

/// Snapshot of `num_particles` particles of type "A" on the first sites of
/// `lattice`, in the smallest cubic box with whole cells along each edge
pub fn lattice_snapshot<L: Lattice>(lattice: &L, num_particles: usize) -> Result<Snapshot> {
    if num_particles == 0 {
        return Err(Error::Config(String::from(
            "the number of particles should be positive",
        )));
    }
    let mut cells = (num_particles as f64).cbrt().round() as usize;
    while cells.pow(3) < num_particles {
        cells += 1;
    }
    let [a, b, c] = lattice.cell_lengths();
    let lengths = [a * cells as f64, b * cells as f64, c * cells as f64];
    let region = Rect::centered(lengths);
    let origin = [
        region.lo()[0] + 0.5 * a,
        region.lo()[1] + 0.5 * b,
        region.lo()[2] + 0.5 * c,
    ];
    let coords = lattice.coords_within_region(&region, &origin);

    let mut snapshot = Snapshot::with_particles(
        num_particles,
        [lengths[0], lengths[1], lengths[2], 0.0, 0.0, 0.0],
    );
    for (p, coord) in snapshot.position.iter_mut().zip(coords) {
        *p = coord;
    }
    Ok(snapshot)
}
