use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use mdrun::{
    atomic::None_,
    filter::ParticleFilter,
    prelude::*,
    script::{self, init_lattice},
};
use tempfile::TempDir;

/// `n` particles on a simple cubic lattice of spacing 1.2; 216 fill a box
/// of 7.2 and 1000 a box of 12
fn fluid(dir: &TempDir, n: usize, kt: f64, seed: u64) -> PathBuf {
    let path = dir.path().join(format!("fluid-{}.gsd", n));
    init_lattice(&path, n, 1.2, kt, seed).unwrap();
    path
}

fn config_for(input: &Path, steps: u64, ranks: usize) -> RunConfig {
    RunConfig {
        input: input.to_path_buf(),
        steps,
        ranks,
        ..RunConfig::default()
    }
}

fn run_lj_nvt(config: &RunConfig) -> Result<f64> {
    let results = Mdrun::new(config.ranks)?.run(|device| script::lj_nvt(device, config))?;
    // every rank receives the same reduced value
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    Ok(results[0])
}

fn kinetic_energy_of(snapshot: &Snapshot) -> f64 {
    snapshot
        .velocity
        .iter()
        .zip(&snapshot.mass)
        .map(|(v, m)| 0.5 * m * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
        .sum()
}

#[test]
fn reference_run_reports_finite_energy() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.5, 1);
    let output = dir.path().join("final.gsd");
    let config = RunConfig {
        output: Some(output.clone()),
        ..config_for(&input, 200, 1)
    };
    let ke = run_lj_nvt(&config).unwrap();
    assert!(ke.is_finite());
    assert!(ke >= 0.0);

    let last = Snapshot::read(&output, -1).unwrap();
    assert_eq!(last.step, 200);
    assert_eq!(last.num_particles(), 216);
    // the file stores single precision
    assert_relative_eq!(kinetic_energy_of(&last), ke, max_relative = 1e-5);
}

#[test]
fn rank_counts_agree() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.5, 2);
    let serial = run_lj_nvt(&config_for(&input, 100, 1)).unwrap();
    for ranks in [2, 4, 8] {
        let parallel = run_lj_nvt(&config_for(&input, 100, ranks)).unwrap();
        assert_relative_eq!(parallel, serial, max_relative = 1e-8);
    }
}

#[test]
fn rank_counts_agree_with_distinct_neighbors() {
    // three subdomains along an axis give different lo and hi neighbors
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 1000, 1.5, 9);
    let serial = run_lj_nvt(&config_for(&input, 100, 1)).unwrap();
    for ranks in [3, 6, 27] {
        let parallel = run_lj_nvt(&config_for(&input, 100, ranks)).unwrap();
        assert_relative_eq!(parallel, serial, max_relative = 1e-8);
    }
}

#[test]
fn zero_steps_reports_initial_energy() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.5, 3);
    let initial = kinetic_energy_of(&Snapshot::read(&input, 0).unwrap());
    for ranks in [1, 2] {
        let ke = run_lj_nvt(&config_for(&input, 0, ranks)).unwrap();
        assert_relative_eq!(ke, initial, max_relative = 1e-12);
    }
}

#[test]
fn missing_checkpoint_fails_before_stepping() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir.path().join("random.gsd"), 10, 2);
    match run_lj_nvt(&config) {
        Err(Error::Io { path, .. }) => assert!(path.ends_with("random.gsd")),
        other => panic!("expected an I/O error, found {:?}", other),
    }
}

#[test]
fn empty_system_reports_zero() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.gsd");
    Snapshot::with_particles(0, [10.0, 10.0, 10.0, 0.0, 0.0, 0.0])
        .write(&input)
        .unwrap();
    for ranks in [1, 2] {
        let ke = run_lj_nvt(&config_for(&input, 5, ranks)).unwrap();
        assert!(ke == 0.0 && ke.is_sign_positive());
        let mut out = Vec::new();
        script::report(0, ke, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0\n");
    }
}

#[test]
fn same_inputs_reproduce() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.0, 4);
    let config = RunConfig {
        thermalize_kt: Some(2.0),
        seed: 11,
        ..config_for(&input, 50, 2)
    };
    let first = run_lj_nvt(&config).unwrap();
    let second = run_lj_nvt(&config).unwrap();
    assert_eq!(first, second);

    let reseeded = RunConfig { seed: 12, ..config };
    assert_ne!(run_lj_nvt(&reseeded).unwrap(), first);
}

#[test]
fn only_rank_zero_reports() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.5, 5);
    let config = config_for(&input, 10, 4);
    let reports = Mdrun::new(4)
        .unwrap()
        .run(|device| {
            let rank = device.rank();
            let ke = script::lj_nvt(device, &config)?;
            let mut out = Vec::new();
            let wrote = script::report(rank, ke, &mut out).unwrap();
            Ok((wrote, String::from_utf8(out).unwrap()))
        })
        .unwrap();
    assert_eq!(reports.iter().filter(|(wrote, _)| *wrote).count(), 1);
    assert!(reports[0].0);
    assert!(reports[0].1.trim().parse::<f64>().unwrap() > 0.0);
    assert!(reports[1..].iter().all(|(_, text)| text.is_empty()));
}

/// Free flight with no pair force, checked against straight lines
fn check_free_flight(input: &Path, ranks: usize) {
    let initial = Snapshot::read(input, 0).unwrap();
    let n = initial.num_particles();
    let steps = 300;
    let dt = 0.005;

    let results = Mdrun::new(ranks)
        .unwrap()
        .run(|device| {
            let mut sim = Simulation::new(device, 0);
            sim.create_state_from_gsd(input, 0)?;
            let mut integrator = Integrator::new(dt, NeighborList::cell(0.4)?)?;
            integrator.forces.push(None_::new().into());
            integrator.methods.push(Nve::new(ParticleFilter::All).into());
            sim.set_integrator(integrator);

            let thermo = ThermodynamicQuantities::new(ParticleFilter::All);
            let before = thermo.kinetic_energy(&sim)?;
            sim.run(steps)?;
            let after = thermo.kinetic_energy(&sim)?;
            let num_builds = sim.integrator().map_or(0, |i| i.neighbor_list().num_builds());
            Ok((before, after, num_builds, sim.snapshot()?))
        })
        .unwrap();

    let (before, after, num_builds, snapshot) = &results[0];
    assert_relative_eq!(*before, *after, max_relative = 1e-12);
    assert!(*num_builds > 1);
    let snapshot = snapshot.as_ref().unwrap();
    assert_eq!(snapshot.num_particles(), n);
    assert!(results[1..].iter().all(|r| r.3.is_none()));

    // unwrapped positions follow straight lines
    let l = snapshot.box_[0];
    let t = steps as f64 * dt;
    let mut crossed = 0;
    for tag in 0..n {
        for i in 0..3 {
            let unwrapped = snapshot.position[tag][i] + snapshot.image[tag][i] as f64 * l;
            let expected = initial.position[tag][i] + initial.velocity[tag][i] * t;
            assert!((unwrapped - expected).abs() < 1e-8, "particle {} on {} ranks", tag, ranks);
            if snapshot.image[tag][i] != 0 {
                crossed += 1;
            }
        }
    }
    assert!(crossed > 0);
}

#[test]
fn free_particles_migrate_between_ranks() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 10.0, 6);
    check_free_flight(&input, 8);
    // a 3 x 3 x 3 grid moves particles to distinct lo and hi neighbors
    check_free_flight(&input, 27);
}

#[test]
fn lj_nve_conserves_energy() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 1.0, 7);
    let results = Mdrun::new(2)
        .unwrap()
        .run(|device| {
            let mut sim = Simulation::new(device, 0);
            sim.create_state_from_gsd(&input, -1)?;
            let mut integrator = Integrator::new(0.005, NeighborList::cell(0.4)?)?;
            let mut lj = LJCut::new(Some(2.5), ShiftMode::Shift);
            lj.params.set(("A", "A"), LJParams { epsilon: 1.0, sigma: 1.0 });
            integrator.forces.push(lj.into());
            integrator.methods.push(Nve::new(ParticleFilter::All).into());
            sim.set_integrator(integrator);

            let thermo = ThermodynamicQuantities::new(ParticleFilter::All);
            sim.run(0)?;
            let start = thermo.compute(&sim)?;
            sim.run(400)?;
            let end = thermo.compute(&sim)?;
            Ok((start, end))
        })
        .unwrap();

    let (start, end) = &results[0];
    assert_eq!(end.step, 400);
    let e0 = start.kinetic_energy + start.potential_energy;
    let e1 = end.kinetic_energy + end.potential_energy;
    assert!(
        ((e1 - e0) / 216.0).abs() < 5e-3,
        "energy drifted from {} to {}",
        e0,
        e1
    );
    // the lattice is not at equilibrium, so energy moves between KE and PE
    assert!((end.kinetic_energy - start.kinetic_energy).abs() > 1e-6);
}

#[test]
fn nvt_holds_average_temperature() {
    let dir = TempDir::new().unwrap();
    let input = fluid(&dir, 216, 3.0, 8);
    let results = Mdrun::new(1)
        .unwrap()
        .run(|device| {
            let mut sim = Simulation::new(device, 0);
            sim.create_state_from_gsd(&input, 0)?;
            let mut integrator = Integrator::new(0.005, NeighborList::cell(0.4)?)?;
            integrator.forces.push(None_::new().into());
            integrator
                .methods
                .push(Nvt::new(ParticleFilter::All, 1.5, 0.5)?.into());
            sim.set_integrator(integrator);

            let thermo = ThermodynamicQuantities::new(ParticleFilter::All);
            let mut temperatures = Vec::new();
            for _ in 0..1000 {
                sim.run(10)?;
                temperatures.push(thermo.kinetic_temperature(&sim)?);
            }
            Ok(temperatures)
        })
        .unwrap();

    let temperatures = &results[0];
    let average = temperatures.iter().sum::<f64>() / temperatures.len() as f64;
    assert!(temperatures.iter().any(|&t| t < 2.0));
    assert!((average - 1.5).abs() < 0.5, "average temperature {}", average);
}
