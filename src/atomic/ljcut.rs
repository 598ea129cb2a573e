use serde::{Deserialize, Serialize};

use super::{AtomicPotentialTrait, ForceArrays};
use crate::{
    utils::{TypePair, TypePairMap},
    Atoms, Error, NeighborList, Result,
};

/// Lennard-Jones coefficients of one type pair
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LJParams {
    pub epsilon: f64,
    pub sigma: f64,
}

/// Energy correction at the cutoff
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftMode {
    #[default]
    None,
    /// Shift the energy so that it vanishes at the cutoff
    Shift,
}

#[derive(Clone, Copy, Debug)]
struct LJCutCoeff {
    rcut2: f64,
    lj1: f64, // = 4 epsilon sigma^12
    lj2: f64, // = 4 epsilon sigma^6
    shift: f64,
}
impl LJCutCoeff {
    fn new(params: &LJParams, rcut: f64, mode: ShiftMode) -> Self {
        let sigma2 = params.sigma * params.sigma;
        let sigma6 = sigma2 * sigma2 * sigma2;
        let lj1 = 4.0 * params.epsilon * sigma6 * sigma6;
        let lj2 = 4.0 * params.epsilon * sigma6;
        let rcut2 = rcut * rcut;
        let shift = match mode {
            ShiftMode::Shift if rcut > 0.0 => {
                let r6inv = 1.0 / (rcut2 * rcut2 * rcut2);
                r6inv * (lj1 * r6inv - lj2)
            }
            _ => 0.0,
        };
        Self {
            rcut2,
            lj1,
            lj2,
            shift,
        }
    }
}

/// Lennard-Jones 12-6 potential, `U(r) = 4 eps ((sig/r)^12 - (sig/r)^6)`
#[derive(Clone, Debug)]
pub struct LJCut {
    pub params: TypePairMap<LJParams>,
    pub r_cut: TypePairMap<f64>,
    default_r_cut: Option<f64>,
    mode: ShiftMode,
    num_types: usize,
    coeffs: Vec<LJCutCoeff>,
}
impl LJCut {
    pub fn new(default_r_cut: Option<f64>, mode: ShiftMode) -> Self {
        Self {
            params: TypePairMap::new(),
            r_cut: TypePairMap::new(),
            default_r_cut,
            mode,
            num_types: 0,
            coeffs: Vec::new(),
        }
    }
    pub fn mode(&self) -> ShiftMode {
        self.mode
    }
    fn type_idx(&self, i: usize, j: usize) -> usize {
        i * self.num_types + j
    }
}

impl AtomicPotentialTrait for LJCut {
    fn prepare(&mut self, type_names: &[String]) -> Result<()> {
        let known = |pair: &TypePair| {
            type_names.iter().any(|t| t == pair.first())
                && type_names.iter().any(|t| t == pair.second())
        };
        for (pair, _) in self.params.iter() {
            if !known(pair) {
                return Err(Error::AtomicPotential(format!(
                    "LJ params given for unknown type pair {}",
                    pair
                )));
            }
        }
        for (pair, _) in self.r_cut.iter() {
            if !known(pair) {
                return Err(Error::AtomicPotential(format!(
                    "LJ r_cut given for unknown type pair {}",
                    pair
                )));
            }
        }

        let num_types = type_names.len();
        let mut coeffs = Vec::with_capacity(num_types * num_types);
        for a in type_names {
            for b in type_names {
                let pair = TypePair::new(a, b);
                let params = self.params.get(a, b).ok_or_else(|| {
                    Error::AtomicPotential(format!("LJ params for pair {} are not set", pair))
                })?;
                let rcut = self
                    .r_cut
                    .get(a, b)
                    .copied()
                    .or(self.default_r_cut)
                    .ok_or_else(|| {
                        Error::AtomicPotential(format!("LJ r_cut for pair {} is not set", pair))
                    })?;
                if !(rcut >= 0.0 && rcut.is_finite()) {
                    return Err(Error::AtomicPotential(format!(
                        "r_cut for pair {} should be non-negative, found {}",
                        pair, rcut
                    )));
                }
                if !params.epsilon.is_finite() || !params.sigma.is_finite() {
                    return Err(Error::AtomicPotential(format!(
                        "LJ params for pair {} should be finite, found {:?}",
                        pair, params
                    )));
                }
                coeffs.push(LJCutCoeff::new(params, rcut, self.mode));
            }
        }
        self.num_types = num_types;
        self.coeffs = coeffs;
        Ok(())
    }

    fn cutoff_distance(&self) -> f64 {
        self.coeffs
            .iter()
            .map(|c| c.rcut2.sqrt())
            .fold(0.0, f64::max)
    }

    fn compute_forces(&self, atoms: &Atoms, neighbor_list: &NeighborList, out: &mut ForceArrays) {
        let positions = atoms.positions();
        let types = atoms.types();
        for i in 0..atoms.num_local() {
            let posi = &positions[i];
            let typei = types[i];
            let mut force = [0.0; 3];
            let mut energy = 0.0;
            let mut virial = 0.0;

            for &j in &neighbor_list.neighbors()[i] {
                let coeff = &self.coeffs[self.type_idx(typei, types[j])];
                let posj = &positions[j];
                let r = [posi[0] - posj[0], posi[1] - posj[1], posi[2] - posj[2]];
                let r2 = r[0] * r[0] + r[1] * r[1] + r[2] * r[2];
                if r2 >= coeff.rcut2 {
                    continue;
                }

                // f_i = r_ij * (12 lj1 / r^14 - 6 lj2 / r^8), repulsive at short range
                let r2inv = 1.0 / r2;
                let r6inv = r2inv * r2inv * r2inv;
                let force_divr = r2inv * r6inv * (12.0 * coeff.lj1 * r6inv - 6.0 * coeff.lj2);
                force[0] += r[0] * force_divr;
                force[1] += r[1] * force_divr;
                force[2] += r[2] * force_divr;
                energy += 0.5 * (r6inv * (coeff.lj1 * r6inv - coeff.lj2) - coeff.shift);
                virial += 0.5 * r2 * force_divr;
            }

            out.forces[i][0] += force[0];
            out.forces[i][1] += force[1];
            out.forces[i][2] += force[2];
            out.energies[i] += energy;
            out.virials[i] += virial;
        }
    }
}
