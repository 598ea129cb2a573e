use std::sync::mpsc;

use super::message::{AtomMessage, Operation, M2W, W2M};
use crate::{atoms::ParticleRecord, Error, Result};

/// Channels of one rank: a link to the manager for collectives and one
/// FIFO channel to and from every rank for point-to-point exchange
pub struct Communicator {
    rank: usize,
    num_ranks: usize,
    manager: Option<(mpsc::Sender<W2M>, mpsc::Receiver<M2W>)>,
    to_peers: Vec<mpsc::Sender<AtomMessage>>,
    from_peers: Vec<mpsc::Receiver<AtomMessage>>,
}
impl Communicator {
    /// A lone rank; collectives complete locally
    pub fn serial() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rank: 0,
            num_ranks: 1,
            manager: None,
            to_peers: vec![tx],
            from_peers: vec![rx],
        }
    }

    /// Wire up `num_ranks` communicators serviced by a manager
    pub(crate) fn group(
        num_ranks: usize,
        to_manager: &mpsc::Sender<W2M>,
    ) -> (Vec<Self>, Vec<mpsc::Sender<M2W>>) {
        // senders[src][dest] and receivers[dest][src]
        let mut senders: Vec<Vec<mpsc::Sender<AtomMessage>>> = vec![Vec::new(); num_ranks];
        let mut receivers: Vec<Vec<mpsc::Receiver<AtomMessage>>> =
            (0..num_ranks).map(|_| Vec::new()).collect();
        for src in 0..num_ranks {
            for dest_receivers in receivers.iter_mut() {
                let (tx, rx) = mpsc::channel();
                senders[src].push(tx);
                dest_receivers.push(rx);
            }
        }

        let mut comms = Vec::with_capacity(num_ranks);
        let mut replies = Vec::with_capacity(num_ranks);
        for (rank, (to_peers, from_peers)) in senders.into_iter().zip(receivers).enumerate() {
            let (tx, rx) = mpsc::channel();
            replies.push(tx);
            comms.push(Self {
                rank,
                num_ranks,
                manager: Some((to_manager.clone(), rx)),
                to_peers,
                from_peers,
            });
        }
        (comms, replies)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    /// Combine `values` elementwise over all ranks, in rank order
    pub fn all_reduce(&self, op: Operation, values: Vec<f64>) -> Result<Vec<f64>> {
        match &self.manager {
            None => Ok(values),
            Some(_) => {
                self.send_to_manager(W2M::Reduce {
                    rank: self.rank,
                    op,
                    values,
                })?;
                match self.recv_from_manager()? {
                    M2W::Reduced(result) => Ok(result),
                    other => Err(self.unexpected(&other)),
                }
            }
        }
    }
    pub fn all_reduce_scalar(&self, op: Operation, value: f64) -> Result<f64> {
        let reduced = self.all_reduce(op, vec![value])?;
        reduced.first().copied().ok_or_else(|| Error::Communication {
            rank: self.rank,
            message: String::from("empty reduction result"),
        })
    }
    /// Wait until every rank has arrived
    pub fn barrier(&self) -> Result<()> {
        self.all_reduce(Operation::Sum, Vec::new()).map(|_| ())
    }

    /// Collect particles from all ranks, sorted by tag, on rank 0
    pub fn gather(&self, mut particles: Vec<ParticleRecord>) -> Result<Option<Vec<ParticleRecord>>> {
        match &self.manager {
            None => {
                particles.sort_by_key(|p| p.tag);
                Ok(Some(particles))
            }
            Some(_) => {
                self.send_to_manager(W2M::Gather {
                    rank: self.rank,
                    particles,
                })?;
                match self.recv_from_manager()? {
                    M2W::Gathered(result) => Ok(result),
                    other => Err(self.unexpected(&other)),
                }
            }
        }
    }

    pub(crate) fn send(&self, dest: usize, message: AtomMessage) -> Result<()> {
        self.to_peers[dest]
            .send(message)
            .map_err(|_| Error::disconnected(self.rank))
    }
    pub(crate) fn recv(&self, src: usize) -> Result<AtomMessage> {
        self.from_peers[src]
            .recv()
            .map_err(|_| Error::disconnected(self.rank))
    }

    pub(crate) fn notifier(&self) -> Notifier {
        Notifier(self.manager.as_ref().map(|(tx, _)| tx.clone()))
    }

    fn send_to_manager(&self, message: W2M) -> Result<()> {
        match &self.manager {
            Some((tx, _)) => tx.send(message).map_err(|_| Error::disconnected(self.rank)),
            None => Ok(()),
        }
    }
    fn recv_from_manager(&self) -> Result<M2W> {
        match &self.manager {
            Some((_, rx)) => rx.recv().map_err(|_| Error::Communication {
                rank: self.rank,
                message: String::from("run aborted by another rank"),
            }),
            None => Err(Error::disconnected(self.rank)),
        }
    }
    fn unexpected(&self, message: &M2W) -> Error {
        Error::Communication {
            rank: self.rank,
            message: format!("unexpected reply from manager: {:?}", message),
        }
    }
}

/// Tells the manager that a rank's script has returned
pub(crate) struct Notifier(Option<mpsc::Sender<W2M>>);
impl Notifier {
    pub fn notify(&self, rank: usize, ok: bool) {
        if let Some(tx) = &self.0 {
            let message = if ok { W2M::Done(rank) } else { W2M::Failed(rank) };
            // the manager may already have stopped after another failure
            let _ = tx.send(message);
        }
    }
}

/// Execution device of one rank
pub struct Device {
    comm: Communicator,
}
impl Device {
    pub fn new(comm: Communicator) -> Self {
        Self { comm }
    }
    /// Single-rank CPU device
    pub fn cpu() -> Self {
        Self::new(Communicator::serial())
    }
    pub fn communicator(&self) -> &Communicator {
        &self.comm
    }
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }
    pub fn num_ranks(&self) -> usize {
        self.comm.num_ranks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_collectives_are_local() {
        let comm = Communicator::serial();
        assert!(comm.is_root());
        assert_eq!(comm.all_reduce(Operation::Max, vec![1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
        assert_eq!(comm.all_reduce_scalar(Operation::Sum, 3.0).unwrap(), 3.0);
        comm.barrier().unwrap();
    }

    #[test]
    fn serial_peer_channel_loops_back() {
        let comm = Communicator::serial();
        comm.send(0, AtomMessage::Positions(vec![[1.0, 2.0, 3.0]]))
            .unwrap();
        match comm.recv(0).unwrap() {
            AtomMessage::Positions(p) => assert_eq!(p, vec![[1.0, 2.0, 3.0]]),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn group_wires_every_pair() {
        let (tx, _rx) = mpsc::channel();
        let (comms, replies) = Communicator::group(3, &tx);
        assert_eq!(replies.len(), 3);
        comms[2]
            .send(1, AtomMessage::Positions(vec![[2.0; 3]]))
            .unwrap();
        comms[0]
            .send(1, AtomMessage::Positions(vec![[0.0; 3]]))
            .unwrap();
        match comms[1].recv(2).unwrap() {
            AtomMessage::Positions(p) => assert_eq!(p, vec![[2.0; 3]]),
            other => panic!("unexpected message {:?}", other),
        }
        match comms[1].recv(0).unwrap() {
            AtomMessage::Positions(p) => assert_eq!(p, vec![[0.0; 3]]),
            other => panic!("unexpected message {:?}", other),
        }
    }
}
