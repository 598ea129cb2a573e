use super::{message::AtomMessage, Communicator, Domain};
use crate::{utils::Axis, Atoms, Direction, Error, Result};

/// Which particles each direction sends as ghosts, fixed between neighbor
/// list builds so that ghost indices stay valid
#[derive(Clone, Debug, Default)]
pub(crate) struct GhostPlans {
    send: [Vec<usize>; 6],
    recv_counts: [usize; 6],
}

fn unexpected(comm: &Communicator, expected: &str, message: &AtomMessage) -> Error {
    Error::Communication {
        rank: comm.rank(),
        message: format!("expected {} message, found {:?}", expected, message),
    }
}

/// Hand owned particles that left the subdomain to the neighbor that now
/// owns them. Positions must already be wrapped into the box and ghosts
/// cleared. Returns the number of particles sent away.
pub(crate) fn migrate(atoms: &mut Atoms, domain: &Domain, comm: &Communicator) -> Result<usize> {
    let mut num_sent = 0;
    for axis in Axis::ALL {
        let n = domain.num_subdomains(axis);
        if n == 1 {
            continue;
        }
        let i = axis.index();
        let me = domain.my_idx()[i];
        let mut to_lo = Vec::new();
        let mut to_hi = Vec::new();
        for (k, p) in atoms.positions()[..atoms.num_local()].iter().enumerate() {
            let target = domain.owner_index(axis, p[i]);
            if target == me {
                continue;
            } else if target == (me + 1) % n {
                to_hi.push(k);
            } else if target == (me + n - 1) % n {
                to_lo.push(k);
            } else {
                return Err(Error::Domain(format!(
                    "particle {} moved from subdomain {} to {} along {:?} between neighbor list builds",
                    atoms.tags()[k],
                    me,
                    target,
                    axis
                )));
            }
        }

        let num_lo = to_lo.len();
        let mut leaving = to_lo;
        leaving.append(&mut to_hi);
        num_sent += leaving.len();
        let mut records = atoms.remove_locals(&leaving);
        let hi_records = records.split_off(num_lo);

        let (lo, hi) = (axis.direction(true), axis.direction(false));
        comm.send(domain.neighbor_rank(lo), AtomMessage::Migrate(records))?;
        comm.send(domain.neighbor_rank(hi), AtomMessage::Migrate(hi_records))?;
        for direction in [hi, lo] {
            match comm.recv(domain.neighbor_rank(direction))? {
                AtomMessage::Migrate(arrived) => arrived.into_iter().for_each(|r| atoms.push_local(r)),
                other => return Err(unexpected(comm, "migration", &other)),
            }
        }
    }
    Ok(num_sent)
}

/// Rebuild the ghost layer of width `r_list` around the subdomain.
///
/// Stages run along x, y, then z. Ghosts received in earlier stages are
/// forwarded in later ones, which fills edge and corner regions.
pub(crate) fn exchange_ghosts(
    atoms: &mut Atoms,
    domain: &Domain,
    comm: &Communicator,
    r_list: f64,
    plans: &mut GhostPlans,
) -> Result<()> {
    atoms.clear_ghosts();
    for axis in Axis::ALL {
        let i = axis.index();
        let (sublo, subhi) = (domain.subdomain().lo()[i], domain.subdomain().hi()[i]);
        let (lo, hi) = (axis.direction(true), axis.direction(false));

        let positions = atoms.positions();
        let lo_plan: Vec<usize> = (0..atoms.num_total())
            .filter(|&k| positions[k][i] < sublo + r_list)
            .collect();
        let hi_plan: Vec<usize> = (0..atoms.num_total())
            .filter(|&k| positions[k][i] >= subhi - r_list)
            .collect();

        for (direction, plan) in [(lo, &lo_plan), (hi, &hi_plan)] {
            let message = AtomMessage::Ghosts {
                tags: plan.iter().map(|&k| atoms.tags()[k]).collect(),
                types: plan.iter().map(|&k| atoms.types()[k]).collect(),
                positions: shifted_positions(atoms, domain, direction, plan),
            };
            comm.send(domain.neighbor_rank(direction), message)?;
        }
        for direction in [hi, lo] {
            match comm.recv(domain.neighbor_rank(direction))? {
                AtomMessage::Ghosts {
                    tags,
                    types,
                    positions,
                } => {
                    if tags.len() != types.len() || tags.len() != positions.len() {
                        return Err(Error::Communication {
                            rank: comm.rank(),
                            message: String::from("ghost message with mismatched lengths"),
                        });
                    }
                    plans.recv_counts[direction.index()] = tags.len();
                    for ((tag, typeid), position) in tags.into_iter().zip(types).zip(positions) {
                        atoms.push_ghost(tag, typeid, position);
                    }
                }
                other => return Err(unexpected(comm, "ghost", &other)),
            }
        }
        plans.send[lo.index()] = lo_plan;
        plans.send[hi.index()] = hi_plan;
    }
    Ok(())
}

/// Refresh ghost positions along the plans of the last exchange
pub(crate) fn update_ghosts(
    atoms: &mut Atoms,
    domain: &Domain,
    comm: &Communicator,
    plans: &GhostPlans,
) -> Result<()> {
    let mut cursor = atoms.num_local();
    for axis in Axis::ALL {
        let (lo, hi) = (axis.direction(true), axis.direction(false));
        for direction in [lo, hi] {
            let positions = shifted_positions(atoms, domain, direction, &plans.send[direction.index()]);
            comm.send(domain.neighbor_rank(direction), AtomMessage::Positions(positions))?;
        }
        for direction in [hi, lo] {
            match comm.recv(domain.neighbor_rank(direction))? {
                AtomMessage::Positions(positions) => {
                    let count = plans.recv_counts[direction.index()];
                    if positions.len() != count || cursor + count > atoms.num_total() {
                        return Err(Error::Communication {
                            rank: comm.rank(),
                            message: format!(
                                "expected {} ghost positions, found {}",
                                count,
                                positions.len()
                            ),
                        });
                    }
                    atoms.positions[cursor..cursor + count].copy_from_slice(&positions);
                    cursor += count;
                }
                other => return Err(unexpected(comm, "position", &other)),
            }
        }
    }
    Ok(())
}

fn shifted_positions(
    atoms: &Atoms,
    domain: &Domain,
    direction: Direction,
    plan: &[usize],
) -> Vec<[f64; 3]> {
    let shift = domain.ghost_shift(direction);
    let i = direction.axis().index();
    plan.iter()
        .map(|&k| {
            let mut p = atoms.positions()[k];
            p[i] += shift;
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use super::*;
    use crate::{atoms::ParticleRecord, Container};

    fn record(tag: usize, position: [f64; 3]) -> ParticleRecord {
        ParticleRecord {
            tag,
            typeid: 0,
            position,
            velocity: [0.0; 3],
            mass: 1.0,
            image: [0; 3],
        }
    }

    fn atoms_with(records: Vec<ParticleRecord>) -> Atoms {
        let mut atoms = Atoms::new(vec![String::from("A")]);
        records.into_iter().for_each(|r| atoms.push_local(r));
        atoms
    }

    fn ghosts_of(atoms: &Atoms, tag: usize) -> Vec<[f64; 3]> {
        (atoms.num_local()..atoms.num_total())
            .filter(|&k| atoms.tags()[k] == tag)
            .map(|k| atoms.positions()[k])
            .collect()
    }

    #[test]
    fn single_rank_periodic_images() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let domain = Domain::new(0, 1, &container);
        let comm = Communicator::serial();
        let mut atoms = atoms_with(vec![
            record(0, [-4.5, 0.0, 0.0]),
            record(1, [0.0, 0.0, 0.0]),
            record(2, [4.75, 4.75, 4.75]),
        ]);
        let mut plans = GhostPlans::default();
        exchange_ghosts(&mut atoms, &domain, &comm, 2.0, &mut plans).unwrap();

        // one image for the face particle, seven for the corner one
        assert_eq!(atoms.num_ghosts(), 8);
        assert_eq!(ghosts_of(&atoms, 0), vec![[5.5, 0.0, 0.0]]);
        assert!(ghosts_of(&atoms, 1).is_empty());
        assert!(ghosts_of(&atoms, 2).contains(&[-5.25, -5.25, -5.25]));

        atoms.increment_position(0, [-0.25, 0.0, 0.0]);
        update_ghosts(&mut atoms, &domain, &comm, &plans).unwrap();
        assert_eq!(ghosts_of(&atoms, 0), vec![[5.25, 0.0, 0.0]]);
        assert_eq!(atoms.num_ghosts(), 8);
    }

    #[test]
    fn migration_between_two_ranks() {
        let container = Container::new(10.0, 4.0, 4.0).unwrap();
        let (tx, _rx) = mpsc::channel();
        let (comms, _replies) = Communicator::group(2, &tx);

        let counts: Vec<(usize, Vec<usize>)> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let container = container.clone();
                    s.spawn(move || {
                        let domain = Domain::new(comm.rank(), 2, &container);
                        assert_eq!(domain.grid(), &[2, 1, 1]);
                        // each rank starts with one particle that belongs to the other
                        let x = if comm.rank() == 0 { 1.0 } else { -1.0 };
                        let mut atoms = atoms_with(vec![
                            record(comm.rank(), [x, 0.0, 0.0]),
                            record(10 + comm.rank(), [-x, 0.0, 0.0]),
                        ]);
                        let sent = migrate(&mut atoms, &domain, &comm).unwrap();
                        let mut tags = atoms.tags().to_vec();
                        tags.sort();
                        (sent, tags)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(counts[0], (1, vec![1, 10]));
        assert_eq!(counts[1], (1, vec![0, 11]));
    }
}
