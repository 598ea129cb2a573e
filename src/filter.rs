use crate::Atoms;

/// Selects the particles an integration method or compute acts on
#[derive(Clone, Debug, PartialEq)]
pub enum ParticleFilter {
    All,
    /// Particles whose type name is in the list
    Type(Vec<String>),
    /// Particles whose tag is in the list
    Tags(Vec<usize>),
}
impl ParticleFilter {
    pub fn selects(&self, atoms: &Atoms, idx: usize) -> bool {
        match self {
            ParticleFilter::All => true,
            ParticleFilter::Type(names) => {
                let name = atoms.type_name(idx);
                names.iter().any(|n| n == name)
            }
            ParticleFilter::Tags(tags) => tags.contains(&atoms.tags[idx]),
        }
    }
    /// Owned particles selected by this filter
    pub fn local_indices(&self, atoms: &Atoms) -> Vec<usize> {
        (0..atoms.num_local())
            .filter(|&i| self.selects(atoms, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::ParticleRecord;

    #[test]
    fn selections() {
        let mut atoms = Atoms::new(vec![String::from("A"), String::from("B")]);
        for (tag, typeid) in [(0, 0), (1, 1), (2, 0)] {
            atoms.push_local(ParticleRecord {
                tag,
                typeid,
                position: [0.0; 3],
                velocity: [0.0; 3],
                mass: 1.0,
                image: [0; 3],
            });
        }
        assert_eq!(ParticleFilter::All.local_indices(&atoms), vec![0, 1, 2]);
        assert_eq!(
            ParticleFilter::Type(vec![String::from("B")]).local_indices(&atoms),
            vec![1]
        );
        assert_eq!(ParticleFilter::Tags(vec![0, 2]).local_indices(&atoms), vec![0, 2]);
        assert!(ParticleFilter::Type(vec![String::from("C")])
            .local_indices(&atoms)
            .is_empty());
    }
}
