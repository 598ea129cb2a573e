use std::{
    panic::{self, AssertUnwindSafe},
    sync::mpsc,
    thread,
};

use log::{debug, error};

use crate::{
    atoms::ParticleRecord,
    parallel::{
        message::{M2W, W2M},
        Communicator, Device, Operation,
    },
    Error, Result,
};

/// A collective operation waiting for contributions from every rank
enum Pending {
    Idle,
    Reduce {
        op: Operation,
        values: Vec<Option<Vec<f64>>>,
    },
    Gather {
        parts: Vec<Option<Vec<ParticleRecord>>>,
    },
}

/// Main app, used to run a script through parallel ranks
pub struct Mdrun {
    num_ranks: usize,
}
impl Mdrun {
    pub fn new(num_ranks: usize) -> Result<Self> {
        if num_ranks == 0 {
            return Err(Error::Config(String::from(
                "the number of ranks should be at least 1",
            )));
        }
        Ok(Self { num_ranks })
    }
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// Run `script` once per rank, each on its own thread, and return the
    /// per-rank results in rank order.
    ///
    /// If any rank fails, the remaining ranks are aborted and the error of
    /// the first failing rank is returned.
    pub fn run<F, R>(&self, script: F) -> Result<Vec<R>>
    where
        F: Fn(Device) -> Result<R> + Sync,
        R: Send,
    {
        let (tx, rx) = mpsc::channel();
        let (comms, replies) = Communicator::group(self.num_ranks, &tx);
        drop(tx);
        let script = &script;

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.num_ranks);
            for comm in comms {
                let rank = comm.rank();
                let handle = thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(s, move || run_rank(script, comm))
                    .map_err(|e| Error::Communication {
                        rank,
                        message: format!("failed to spawn thread: {}", e),
                    });
                match handle {
                    Ok(h) => handles.push(h),
                    Err(e) => {
                        // ranks already started see the manager disappear
                        drop(replies);
                        return Err(e);
                    }
                }
            }

            let first_failure = self.handle_messages(rx, replies);

            let mut results = Vec::with_capacity(self.num_ranks);
            let mut errors: Vec<(usize, Error)> = Vec::new();
            for (rank, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(r)) => results.push(r),
                    Ok(Err(e)) => errors.push((rank, e)),
                    Err(_) => errors.push((
                        rank,
                        Error::Communication {
                            rank,
                            message: String::from("rank panicked"),
                        },
                    )),
                }
            }
            // a rank that only lost its peers is never the cause
            let cause = errors
                .into_iter()
                .min_by_key(|(rank, e)| (e.is_disconnect(), first_failure != Some(*rank), *rank));
            match cause {
                Some((rank, e)) => {
                    error!("rank {} failed: {}", rank, e);
                    Err(e)
                }
                None => Ok(results),
            }
        })
    }

    /// Service collectives until every rank is done or the run is aborted.
    /// Returns the rank that failed first, if one reported it.
    fn handle_messages(
        &self,
        rx: mpsc::Receiver<W2M>,
        replies: Vec<mpsc::Sender<M2W>>,
    ) -> Option<usize> {
        let n = self.num_ranks;
        let mut pending = Pending::Idle;
        let mut finished = 0;
        while finished < n {
            let message = match rx.recv() {
                Ok(m) => m,
                Err(_) => return None,
            };
            match message {
                W2M::Done(rank) => {
                    debug!("rank {} finished", rank);
                    finished += 1;
                }
                W2M::Failed(rank) => {
                    debug!("rank {} reported a failure, aborting", rank);
                    return Some(rank);
                }
                W2M::Reduce { rank, op, values } => {
                    if let Pending::Idle = pending {
                        pending = Pending::Reduce {
                            op,
                            values: vec![None; n],
                        };
                    }
                    match &mut pending {
                        Pending::Reduce {
                            op: pending_op,
                            values: contributions,
                        } if *pending_op == op && contributions[rank].is_none() => {
                            contributions[rank] = Some(values)
                        }
                        _ => return Some(rank),
                    }
                }
                W2M::Gather { rank, particles } => {
                    if let Pending::Idle = pending {
                        pending = Pending::Gather {
                            parts: vec![None; n],
                        };
                    }
                    match &mut pending {
                        Pending::Gather { parts } if parts[rank].is_none() => {
                            parts[rank] = Some(particles)
                        }
                        _ => return Some(rank),
                    }
                }
            }

            let num_contributed = match &pending {
                Pending::Idle => 0,
                Pending::Reduce { values, .. } => values.iter().filter(|v| v.is_some()).count(),
                Pending::Gather { parts } => parts.iter().filter(|p| p.is_some()).count(),
            };
            if num_contributed > 0 && finished > 0 {
                // a rank finished while others wait on a collective
                return None;
            }
            if num_contributed == n {
                let completed = std::mem::replace(&mut pending, Pending::Idle);
                if let Err(rank) = complete(completed, &replies) {
                    return Some(rank);
                }
            }
        }
        None
    }
}

/// Run one rank's script, reporting the outcome to the manager
fn run_rank<F, R>(script: &F, comm: Communicator) -> Result<R>
where
    F: Fn(Device) -> Result<R>,
{
    let rank = comm.rank();
    let notifier = comm.notifier();
    let device = Device::new(comm);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| script(device)));
    match outcome {
        Ok(result) => {
            notifier.notify(rank, result.is_ok());
            result
        }
        Err(payload) => {
            notifier.notify(rank, false);
            panic::resume_unwind(payload)
        }
    }
}

/// Send the result of a completed collective; returns the first rank that
/// could not be reached, or a rank whose contribution was malformed
fn complete(pending: Pending, replies: &[mpsc::Sender<M2W>]) -> std::result::Result<(), usize> {
    match pending {
        Pending::Idle => Ok(()),
        Pending::Reduce { op, values } => {
            let values: Vec<Vec<f64>> = values.into_iter().flatten().collect();
            let len = values.first().map_or(0, Vec::len);
            if let Some(bad) = values.iter().position(|v| v.len() != len) {
                return Err(bad);
            }
            let mut result: Vec<f64> = values.first().cloned().unwrap_or_default();
            for contribution in values.iter().skip(1) {
                for (acc, v) in result.iter_mut().zip(contribution) {
                    *acc = op.combine(*acc, *v);
                }
            }
            for (rank, reply) in replies.iter().enumerate() {
                reply.send(M2W::Reduced(result.clone())).map_err(|_| rank)?;
            }
            Ok(())
        }
        Pending::Gather { parts } => {
            let mut all: Vec<ParticleRecord> = parts.into_iter().flatten().flatten().collect();
            all.sort_by_key(|p| p.tag);
            let mut all = Some(all);
            for (rank, reply) in replies.iter().enumerate() {
                let data = if rank == 0 { all.take() } else { None };
                reply.send(M2W::Gathered(data)).map_err(|_| rank)?;
            }
            Ok(())
        }
    }
}
