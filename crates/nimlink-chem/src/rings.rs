//! Ring perception: the shortest cycle through every ring bond.

use std::collections::{BTreeSet, VecDeque};

use crate::molecule::Molecule;

/// Returns the distinct smallest cycles of `mol`, each as an ordered atom
/// walk. Rings are sorted by size, then by their lowest atoms.
pub fn perceive_rings(mol: &Molecule) -> Vec<Vec<usize>> {
    let mut seen = BTreeSet::new();
    let mut rings = Vec::new();
    for (idx, bond) in mol.bonds().iter().enumerate() {
        let Some(path) = shortest_path_avoiding(mol, bond.begin, bond.end, idx) else {
            continue;
        };
        let mut key = path.clone();
        key.sort_unstable();
        if seen.insert(key) {
            rings.push(normalize(path));
        }
    }
    rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| sorted(a).cmp(&sorted(b))));
    rings
}

fn sorted(ring: &[usize]) -> Vec<usize> {
    let mut atoms = ring.to_vec();
    atoms.sort_unstable();
    atoms
}

/// Breadth-first path from `from` to `to` that does not use `skip_bond`.
fn shortest_path_avoiding(
    mol: &Molecule,
    from: usize,
    to: usize,
    skip_bond: usize,
) -> Option<Vec<usize>> {
    let mut parent: Vec<Option<usize>> = vec![None; mol.atom_count()];
    let mut visited = vec![false; mol.atom_count()];
    let mut queue = VecDeque::from([from]);
    visited[from] = true;

    while let Some(atom) = queue.pop_front() {
        if atom == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(prev) = parent[cursor] {
                path.push(prev);
                cursor = prev;
            }
            return Some(path);
        }
        for &(nbr, bond) in mol.neighbors(atom) {
            if bond == skip_bond || visited[nbr] {
                continue;
            }
            visited[nbr] = true;
            parent[nbr] = Some(atom);
            queue.push_back(nbr);
        }
    }
    None
}

/// Rotate so the lowest atom comes first and walk towards its lower
/// neighbour, making the representation independent of discovery order.
fn normalize(mut ring: Vec<usize>) -> Vec<usize> {
    let n = ring.len();
    let start = ring
        .iter()
        .enumerate()
        .min_by_key(|(_, atom)| **atom)
        .map(|(i, _)| i)
        .unwrap_or(0);
    ring.rotate_left(start);
    if n > 2 && ring[n - 1] < ring[1] {
        ring[1..].reverse();
    }
    ring
}
