use std::fmt::Display;

/// Unordered pair of particle type names; `(A, B)` and `(B, A)` are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypePair(String, String);
impl TypePair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_owned(), b.to_owned())
        } else {
            Self(b.to_owned(), a.to_owned())
        }
    }
    pub fn first(&self) -> &str {
        &self.0
    }
    pub fn second(&self) -> &str {
        &self.1
    }
}
impl From<(&str, &str)> for TypePair {
    fn from((a, b): (&str, &str)) -> Self {
        TypePair::new(a, b)
    }
}
impl Display for TypePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Per type-pair parameters, kept in insertion order
#[derive(Clone, Debug)]
pub struct TypePairMap<V> {
    keys: Vec<TypePair>,
    values: Vec<V>,
}
impl<V> TypePairMap<V> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }
    /// Set the value for a pair, replacing any earlier value.
    pub fn set(&mut self, pair: impl Into<TypePair>, value: V) {
        let pair = pair.into();
        match self.keys.iter().position(|k| *k == pair) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.keys.push(pair);
                self.values.push(value);
            }
        }
    }
    pub fn get(&self, a: &str, b: &str) -> Option<&V> {
        let pair = TypePair::new(a, b);
        self.keys
            .iter()
            .position(|k| *k == pair)
            .map(|idx| &self.values[idx])
    }
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&TypePair, &V)> {
        self.keys.iter().zip(self.values.iter())
    }
}
impl<V> Default for TypePairMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_order_does_not_matter() {
        let mut map = TypePairMap::new();
        map.set(("B", "A"), 1.5);
        assert_eq!(map.get("A", "B"), Some(&1.5));
        assert_eq!(map.get("B", "A"), Some(&1.5));
        assert_eq!(map.get("A", "A"), None);
    }

    #[test]
    fn set_replaces() {
        let mut map = TypePairMap::new();
        map.set(("A", "A"), 2.5);
        map.set(("A", "A"), 3.0);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("A", "A"), Some(&3.0));
        assert_eq!(TypePair::new("b", "a").to_string(), "(a, b)");
    }
}
