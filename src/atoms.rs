use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::{neighbor::Bins, utils, Error, Result};

/// Everything needed to move a particle to another rank or into a snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleRecord {
    pub tag: usize,
    pub typeid: usize,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub mass: f64,
    pub image: [i32; 3],
}

/// Particle properties of one rank, not including forces.
///
/// The first `nlocal` entries are owned by this rank. Ghost copies of
/// particles owned elsewhere follow them in `tags`, `types` and
/// `positions`; velocities, masses and images exist for owned particles only.
#[derive(Clone, Debug, Default)]
pub struct Atoms {
    pub tags: Vec<usize>,
    pub types: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub masses: Vec<f64>,
    pub images: Vec<[i32; 3]>,
    pub nlocal: usize,
    type_names: Vec<String>,
}
impl Atoms {
    pub fn new(type_names: Vec<String>) -> Self {
        Self {
            type_names,
            ..Self::default()
        }
    }
    pub fn num_local(&self) -> usize {
        self.nlocal
    }
    pub fn num_ghosts(&self) -> usize {
        self.tags.len() - self.nlocal
    }
    pub fn num_total(&self) -> usize {
        self.tags.len()
    }
    pub fn tags(&self) -> &[usize] {
        &self.tags
    }
    pub fn types(&self) -> &[usize] {
        &self.types
    }
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }
    pub fn velocities(&self) -> &[[f64; 3]] {
        &self.velocities
    }
    pub fn mass(&self, idx: usize) -> f64 {
        self.masses[idx]
    }
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }
    pub fn type_name(&self, idx: usize) -> &str {
        &self.type_names[self.types[idx]]
    }
    pub fn num_types(&self) -> usize {
        self.type_names.len()
    }

    pub fn increment_position(&mut self, i: usize, increment: [f64; 3]) {
        self.positions[i][0] += increment[0];
        self.positions[i][1] += increment[1];
        self.positions[i][2] += increment[2];
    }
    pub fn increment_velocity(&mut self, i: usize, increment: [f64; 3]) {
        self.velocities[i][0] += increment[0];
        self.velocities[i][1] += increment[1];
        self.velocities[i][2] += increment[2];
    }
    pub fn set_velocity(&mut self, i: usize, new_vel: [f64; 3]) {
        self.velocities[i] = new_vel;
    }

    /// Add an owned particle; ghosts must be cleared first
    pub fn push_local(&mut self, record: ParticleRecord) {
        debug_assert_eq!(self.num_ghosts(), 0, "ghosts must be cleared first");
        self.tags.push(record.tag);
        self.types.push(record.typeid);
        self.positions.push(record.position);
        self.velocities.push(record.velocity);
        self.masses.push(record.mass);
        self.images.push(record.image);
        self.nlocal += 1;
    }
    pub fn push_ghost(&mut self, tag: usize, typeid: usize, position: [f64; 3]) {
        self.tags.push(tag);
        self.types.push(typeid);
        self.positions.push(position);
    }
    pub fn clear_ghosts(&mut self) {
        self.tags.truncate(self.nlocal);
        self.types.truncate(self.nlocal);
        self.positions.truncate(self.nlocal);
    }
    pub fn record(&self, i: usize) -> ParticleRecord {
        ParticleRecord {
            tag: self.tags[i],
            typeid: self.types[i],
            position: self.positions[i],
            velocity: self.velocities[i],
            mass: self.masses[i],
            image: self.images[i],
        }
    }
    pub fn local_records(&self) -> Vec<ParticleRecord> {
        (0..self.nlocal).map(|i| self.record(i)).collect()
    }

    /// Remove the given owned particles and return them
    pub fn remove_locals(&mut self, atom_idxs: &[usize]) -> Vec<ParticleRecord> {
        debug_assert_eq!(self.num_ghosts(), 0, "ghosts must be cleared first");
        let removed: Vec<ParticleRecord> = atom_idxs.iter().map(|&i| self.record(i)).collect();
        let mut keep = vec![true; self.nlocal];
        for &i in atom_idxs {
            keep[i] = false;
        }
        fn filter_by_mask<T: Copy>(keep: &[bool], vec: &mut Vec<T>) {
            let mut flags = keep.iter();
            vec.retain(|_| *flags.next().unwrap_or(&true));
        }
        filter_by_mask(&keep, &mut self.tags);
        filter_by_mask(&keep, &mut self.types);
        filter_by_mask(&keep, &mut self.positions);
        filter_by_mask(&keep, &mut self.velocities);
        filter_by_mask(&keep, &mut self.masses);
        filter_by_mask(&keep, &mut self.images);
        self.nlocal = self.tags.len();
        removed
    }

    /// Reorder owned particles by cell so that neighbors sit close in memory
    pub fn sort_atoms_by_bin(&mut self, bins: &Bins) {
        debug_assert_eq!(self.num_ghosts(), 0, "ghosts must be cleared first");
        let bin_indices: Vec<usize> = self
            .positions
            .iter()
            .map(|coord| bins.coord_to_bin_idx(coord))
            .collect();
        let sort_indices = utils::get_sort_indices(&bin_indices);

        utils::sort_atoms(&sort_indices, &mut self.tags);
        utils::sort_atoms(&sort_indices, &mut self.types);
        utils::sort_atoms(&sort_indices, &mut self.positions);
        utils::sort_atoms(&sort_indices, &mut self.velocities);
        utils::sort_atoms(&sort_indices, &mut self.masses);
        utils::sort_atoms(&sort_indices, &mut self.images);
    }
}

/// Maxwell-Boltzmann velocity for one particle.
///
/// The generator is seeded from `seed` and the particle tag, so the draw
/// does not depend on which rank owns the particle.
pub fn thermal_velocity(seed: u64, tag: usize, kt: f64, mass: f64) -> Result<[f64; 3]> {
    if !(kt >= 0.0 && kt.is_finite()) || !(mass > 0.0 && mass.is_finite()) {
        return Err(Error::Config(format!(
            "cannot draw velocities for kT = {} and mass = {}",
            kt, mass
        )));
    }
    let dist = Normal::new(0.0, (kt / mass).sqrt())
        .map_err(|e| Error::Config(format!("invalid velocity distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ tag as u64);
    Ok([
        dist.sample(&mut rng),
        dist.sample(&mut rng),
        dist.sample(&mut rng),
    ])
}
