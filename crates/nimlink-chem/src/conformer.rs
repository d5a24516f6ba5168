use nalgebra::Vector3;

use crate::molecule::Molecule;

/// A molecule with explicit hydrogens and one set of 3-D coordinates.
#[derive(Debug, Clone)]
pub struct Conformer {
    pub molecule: Molecule,
    /// One position per atom of `molecule`, in Å.
    pub positions: Vec<Vector3<f64>>,
    /// Written as the first line of the SDF record.
    pub title: String,
    /// Force-field energy after optimisation (kcal/mol).
    pub energy: Option<f64>,
}

impl Conformer {
    pub fn new(molecule: Molecule, positions: Vec<Vector3<f64>>, title: impl Into<String>) -> Self {
        debug_assert_eq!(molecule.atom_count(), positions.len());
        Self {
            molecule,
            positions,
            title: title.into(),
            energy: None,
        }
    }

    pub fn distance(&self, a: usize, b: usize) -> f64 {
        (self.positions[a] - self.positions[b]).norm()
    }
}
