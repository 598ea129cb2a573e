use std::mem::swap;

/// Create the indices that can be used to sort the given keys.
///
/// This is a stable counting sort, suited to cell indices.
///
/// ```rust
/// use mdrun::utils::get_sort_indices;
///
/// let unsorted_vec = vec![2, 0, 1, 0];
/// let indices = get_sort_indices(&unsorted_vec);
/// assert_eq!(indices, vec![1, 3, 2, 0]);
/// ```
pub fn get_sort_indices(keys: &[usize]) -> Vec<usize> {
    let new_len = match keys.iter().max() {
        Some(v) => *v + 1,
        None => return Vec::new(),
    };
    let mut counts = vec![0usize; new_len];

    for b in keys {
        counts[*b] += 1;
    }
    for i in 1..new_len {
        counts[i] += counts[i - 1];
    }

    let mut output = vec![0usize; keys.len()];
    for i in (0..keys.len()).rev() {
        let j = keys[i];
        counts[j] -= 1;
        output[counts[j]] = i;
    }
    output
}

/// Reorders a vector of particle properties using a vector of indices.
///
/// ```rust
/// use mdrun::utils::{get_sort_indices, sort_atoms};
///
/// let mut sort_keys = vec![2usize, 0, 1];
/// let indices = get_sort_indices(&sort_keys);
///
/// let mut other_prop = vec![[1.0, 1.0, 1.0], [3.0, 3.0, 3.0], [2.0, 2.0, 2.0]];
///
/// sort_atoms(&indices, &mut sort_keys);
/// sort_atoms(&indices, &mut other_prop);
///
/// assert_eq!(sort_keys, vec![0usize, 1, 2]);
/// assert_eq!(other_prop, vec![[3.0, 3.0, 3.0], [2.0, 2.0, 2.0], [1.0, 1.0, 1.0]]);
/// ```
pub fn sort_atoms<T: Copy>(sort_indices: &[usize], unsorted_vec: &mut Vec<T>) {
    assert_eq!(sort_indices.len(), unsorted_vec.len());
    let mut output: Vec<T> = sort_indices.iter().map(|&idx| unsorted_vec[idx]).collect();
    swap(&mut output, unsorted_vec);
}
