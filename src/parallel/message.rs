use crate::atoms::ParticleRecord;

/// Elementwise combination used by reductions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Sum,
    Max,
    Min,
}
impl Operation {
    pub(crate) fn combine(&self, acc: f64, value: f64) -> f64 {
        match self {
            Operation::Sum => acc + value,
            Operation::Max => acc.max(value),
            Operation::Min => acc.min(value),
        }
    }
}

/// Message between ranks communicating particle info
#[derive(Debug)]
pub(crate) enum AtomMessage {
    /// Particles changing owner
    Migrate(Vec<ParticleRecord>),
    /// Ghost copies, positions already shifted across periodic faces
    Ghosts {
        tags: Vec<usize>,
        types: Vec<usize>,
        positions: Vec<[f64; 3]>,
    },
    /// Fresh positions for ghosts sent with the last `Ghosts` message
    Positions(Vec<[f64; 3]>),
}

/// Worker-to-Manager messages
#[derive(Debug)]
pub(crate) enum W2M {
    Reduce {
        rank: usize,
        op: Operation,
        values: Vec<f64>,
    },
    Gather {
        rank: usize,
        particles: Vec<ParticleRecord>,
    },
    Done(usize),
    Failed(usize),
}

/// Manager-to-Worker messages
#[derive(Debug)]
pub(crate) enum M2W {
    Reduced(Vec<f64>),
    /// All particles sorted by tag on rank 0, `None` elsewhere
    Gathered(Option<Vec<ParticleRecord>>),
}
