use std::cmp::Ordering;

use super::{Bins, UpdateSettings};
use crate::{region::Rect, utils::distance_squared, Atoms, Error, Result};

/// Cell-list neighbor list with a buffer.
///
/// Neighbors are stored for owned particles only and may be owned or ghost
/// particles. Each list is ordered by tag, which keeps force sums
/// independent of how particles are distributed over ranks.
#[derive(Clone, Debug)]
pub struct NeighborList {
    buffer: f64,
    r_cut: f64,
    settings: UpdateSettings,
    neighbors: Vec<Vec<usize>>,
    pos_at_prev_build: Vec<[f64; 3]>,
    last_build_step: u64,
    num_builds: usize,
    built: bool,
}
impl NeighborList {
    /// Cell list with the given buffer distance
    pub fn cell(buffer: f64) -> Result<Self> {
        if !(buffer >= 0.0 && buffer.is_finite()) {
            return Err(Error::NeighborList(format!(
                "buffer should be non-negative, found {}",
                buffer
            )));
        }
        Ok(Self {
            buffer,
            r_cut: 0.0,
            settings: UpdateSettings::default(),
            neighbors: Vec::new(),
            pos_at_prev_build: Vec::new(),
            last_build_step: 0,
            num_builds: 0,
            built: false,
        })
    }

    // Getters
    pub fn neighbors(&self) -> &[Vec<usize>] {
        &self.neighbors
    }
    pub fn buffer(&self) -> f64 {
        self.buffer
    }
    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
    /// Distance within which pairs are listed
    pub fn r_list(&self) -> f64 {
        if self.r_cut > 0.0 {
            self.r_cut + self.buffer
        } else {
            0.0
        }
    }
    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }
    pub fn num_builds(&self) -> usize {
        self.num_builds
    }
    pub fn last_build_step(&self) -> u64 {
        self.last_build_step
    }
    pub fn is_built(&self) -> bool {
        self.built
    }

    // Setters
    pub fn set_update_settings(&mut self, settings: UpdateSettings) {
        self.settings = settings;
    }
    pub(crate) fn set_r_cut(&mut self, r_cut: f64) {
        if r_cut != self.r_cut {
            self.built = false;
        }
        self.r_cut = r_cut;
    }
    pub(crate) fn invalidate(&mut self) {
        self.built = false;
    }

    /// Whether this step is one where the rebuild criterion is evaluated
    pub fn should_check(&self, step: u64) -> bool {
        !self.built || self.settings.should_check(step, self.last_build_step)
    }

    /// Whether an owned particle moved more than half the buffer since the last build
    pub fn local_rebuild_needed(&self, atoms: &Atoms) -> bool {
        if !self.built || !self.settings.check {
            return true;
        }
        let half_buffer = 0.5 * self.buffer;
        atoms
            .positions()
            .iter()
            .take(atoms.num_local())
            .zip(self.pos_at_prev_build.iter())
            .any(|(new, old)| distance_squared(new, old) > half_buffer * half_buffer)
    }

    /// Bins used to build the list over `subdomain`
    pub fn bins(&self, subdomain: &Rect) -> Bins {
        let r_list = self.r_list();
        let bin_size = if r_list > 0.0 {
            r_list
        } else {
            subdomain.lengths().iter().cloned().fold(f64::INFINITY, f64::min)
        };
        Bins::new(subdomain, r_list, bin_size)
    }

    /// Rebuild from owned and ghost positions
    pub fn build(&mut self, atoms: &Atoms, subdomain: &Rect, step: u64) {
        let nlocal = atoms.num_local();
        let r_list = self.r_list();
        self.neighbors = vec![Vec::new(); nlocal];

        if r_list > 0.0 {
            let bins = self.bins(subdomain);
            let positions = atoms.positions();

            // head-of-chain per cell, then a link per particle
            let mut heads = vec![usize::MAX; bins.total_num_bins()];
            let mut next = vec![usize::MAX; positions.len()];
            for (j, p) in positions.iter().enumerate() {
                let b = bins.coord_to_bin_idx(p);
                next[j] = heads[b];
                heads[b] = j;
            }

            let r_list2 = r_list * r_list;
            let num_bins = bins.num_bins();
            for i in 0..nlocal {
                let posi = &positions[i];
                let center = bins.coord_to_bin(posi);
                let mut list: Vec<usize> = Vec::new();
                for bx in neighbor_range(center[0], num_bins[0]) {
                    for by in neighbor_range(center[1], num_bins[1]) {
                        for bz in neighbor_range(center[2], num_bins[2]) {
                            let mut j = heads[bins.bin_idx(&[bx, by, bz])];
                            while j != usize::MAX {
                                if j != i && distance_squared(posi, &positions[j]) < r_list2 {
                                    list.push(j);
                                }
                                j = next[j];
                            }
                        }
                    }
                }
                list.sort_by(|&a, &b| compare_by_tag(atoms, a, b));
                self.neighbors[i] = list;
            }
        }

        self.pos_at_prev_build = atoms.positions()[..nlocal].to_vec();
        self.last_build_step = step;
        self.num_builds += 1;
        self.built = true;
    }
}

fn neighbor_range(center: usize, n: usize) -> std::ops::RangeInclusive<usize> {
    center.saturating_sub(1)..=(center + 1).min(n - 1)
}

/// Order by tag; periodic images of one particle are ordered by position
fn compare_by_tag(atoms: &Atoms, a: usize, b: usize) -> Ordering {
    let (pa, pb) = (&atoms.positions()[a], &atoms.positions()[b]);
    atoms.tags()[a]
        .cmp(&atoms.tags()[b])
        .then_with(|| pa[0].total_cmp(&pb[0]))
        .then_with(|| pa[1].total_cmp(&pb[1]))
        .then_with(|| pa[2].total_cmp(&pb[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::ParticleRecord;

    fn atoms_at(positions: &[[f64; 3]]) -> Atoms {
        let mut atoms = Atoms::new(vec![String::from("A")]);
        for (tag, &position) in positions.iter().enumerate() {
            atoms.push_local(ParticleRecord {
                tag,
                typeid: 0,
                position,
                velocity: [0.0; 3],
                mass: 1.0,
                image: [0; 3],
            });
        }
        atoms
    }

    #[test]
    fn lists_pairs_within_range() {
        let region = Rect::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0);
        let atoms = atoms_at(&[
            [1.0, 1.0, 1.0],
            [2.0, 1.0, 1.0],
            [5.0, 5.0, 5.0],
            [1.0, 3.3, 1.0],
        ]);
        let mut nlist = NeighborList::cell(0.5).unwrap();
        nlist.set_r_cut(2.0);
        nlist.build(&atoms, &region, 0);

        // 2.3 lies inside r_cut + buffer, sqrt(1 + 2.3^2) does not
        assert_eq!(nlist.neighbors()[0], vec![1, 3]);
        assert_eq!(nlist.neighbors()[1], vec![0]);
        assert!(nlist.neighbors()[2].is_empty());
        assert_eq!(nlist.neighbors()[3], vec![0]);
        assert!(nlist.is_built());
        assert_eq!(nlist.num_builds(), 1);
    }

    #[test]
    fn ghosts_are_neighbors_sorted_by_tag() {
        let region = Rect::new(0.0, 4.0, 0.0, 4.0, 0.0, 4.0);
        let mut atoms = atoms_at(&[[0.5, 0.5, 0.5]]);
        atoms.push_ghost(9, 0, [-0.5, 0.5, 0.5]);
        atoms.push_ghost(3, 0, [0.5, -0.5, 0.5]);
        let mut nlist = NeighborList::cell(0.2).unwrap();
        nlist.set_r_cut(1.5);
        nlist.build(&atoms, &region, 0);
        assert_eq!(nlist.neighbors()[0], vec![2, 1]);
    }

    #[test]
    fn rebuild_after_half_buffer() {
        let region = Rect::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0);
        let mut atoms = atoms_at(&[[1.0, 1.0, 1.0]]);
        let mut nlist = NeighborList::cell(0.4).unwrap();
        nlist.set_r_cut(2.5);
        assert!(nlist.local_rebuild_needed(&atoms));
        nlist.build(&atoms, &region, 0);
        atoms.increment_position(0, [0.15, 0.0, 0.0]);
        assert!(!nlist.local_rebuild_needed(&atoms));
        atoms.increment_position(0, [0.1, 0.0, 0.0]);
        assert!(nlist.local_rebuild_needed(&atoms));
    }

    #[test]
    fn rejects_negative_buffer() {
        assert!(NeighborList::cell(-0.1).is_err());
    }
}
