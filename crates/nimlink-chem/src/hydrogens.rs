//! Conversion between hydrogen counts and explicit hydrogen atoms.

use crate::element::Element;
use crate::molecule::{Atom, BondOrder, Chirality, Molecule};

/// Returns a copy of `mol` where every counted hydrogen is an explicit H
/// atom joined by a single bond. Heavy atoms keep their indices; the new
/// hydrogens are appended in the order of the atoms that carry them.
pub fn add_hydrogens(mol: &Molecule) -> Molecule {
    let mut out = mol.clone();
    for idx in 0..mol.atom_count() {
        let count = mol.atom(idx).hydrogens;
        for _ in 0..count {
            let h = out.add_atom(Atom::new(Element::H));
            out.add_bond(idx, h, BondOrder::Single);
        }
        out.atom_mut(idx).hydrogens = 0;
    }
    out
}

/// Folds plain explicit hydrogens back into their neighbour's count.
///
/// Hydrogens that are charged, isotopically labelled, unbonded, bonded to
/// more than one atom or to another hydrogen stay in the graph, as do any
/// that would overflow the neighbour's count. A tetrahedral tag on the
/// neighbour is re-expressed for the hydrogen moving to the implicit slot.
pub fn remove_hydrogens(mol: &mut Molecule) {
    let mut folded = vec![0u8; mol.atom_count()];
    let mut removable = Vec::new();
    for idx in 0..mol.atom_count() {
        let atom = mol.atom(idx);
        if atom.element != Element::H
            || atom.charge != 0
            || atom.isotope.is_some()
            || atom.hydrogens != 0
            || mol.degree(idx) != 1
        {
            continue;
        }
        let (heavy, bond) = mol.neighbors(idx)[0];
        if mol.atom(heavy).element == Element::H || mol.bond(bond).order != BondOrder::Single {
            continue;
        }
        let total = mol.atom(heavy).hydrogens.checked_add(folded[heavy]);
        if total.and_then(|n| n.checked_add(1)).is_none() {
            continue;
        }
        folded[heavy] += 1;
        removable.push((idx, heavy));
    }

    for &(h, heavy) in &removable {
        let chirality = mol.atom(heavy).chirality;
        let resolved = if !chirality.is_tetrahedral() {
            chirality
        } else if folded[heavy] == 1 && mol.degree(heavy) == 4 && mol.atom(heavy).hydrogens == 0 {
            // The hydrogen moves from its place in the neighbour list to the end.
            let position = mol.neighbors(heavy).iter().position(|(nbr, _)| *nbr == h);
            position.map_or(Chirality::None, |k| chirality.permuted((3 - k) % 2 == 1))
        } else {
            Chirality::None
        };
        mol.atom_mut(heavy).chirality = resolved;
    }
    for (idx, count) in folded.into_iter().enumerate() {
        mol.atom_mut(idx).hydrogens += count;
    }
    let atoms: Vec<usize> = removable.into_iter().map(|(idx, _)| idx).collect();
    mol.remove_atoms(&atoms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_hydrogens_to_ethanol() {
        let mol = Molecule::from_smiles("CCO").unwrap();
        let with_h = add_hydrogens(&mol);
        assert_eq!(with_h.atom_count(), 9);
        assert_eq!(with_h.bond_count(), 8);
        assert_eq!(with_h.atom(0).element, Element::C);
        assert!(with_h.atoms()[3..].iter().all(|a| a.element == Element::H));
        assert!(with_h.atoms().iter().all(|a| a.hydrogens == 0));
        assert_eq!(with_h.degree(0), 4);
        assert_eq!(with_h.formula(), mol.formula());
    }

    #[test]
    fn test_rings_survive_adding_hydrogens() {
        let mol = Molecule::from_smiles("C1CC1").unwrap();
        let with_h = add_hydrogens(&mol);
        assert_eq!(with_h.rings(), mol.rings());
    }

    #[test]
    fn test_molecular_hydrogen_is_kept() {
        let mol = Molecule::from_smiles("[H][H]").unwrap();
        assert_eq!(mol.atom_count(), 2);
    }

    #[test]
    fn test_remove_round_trip() {
        let mol = Molecule::from_smiles("c1ccncc1").unwrap();
        let mut with_h = add_hydrogens(&mol);
        remove_hydrogens(&mut with_h);
        assert_eq!(with_h.atom_count(), mol.atom_count());
        for (a, b) in with_h.atoms().iter().zip(mol.atoms()) {
            assert_eq!(a.hydrogens, b.hydrogens);
        }
    }

    #[test]
    fn test_explicit_hydrogen_on_a_centre_keeps_its_handedness() {
        // Same centre written with the hydrogen as a bracket count and as an atom.
        let implicit = Molecule::from_smiles("F[C@H](Cl)Br").unwrap();
        let explicit = Molecule::from_smiles("F[C@]([H])(Cl)Br").unwrap();
        assert_eq!(explicit.atom_count(), 4);
        assert_eq!(explicit.atom(1).hydrogens, 1);
        assert_eq!(explicit.atom(1).chirality, implicit.atom(1).chirality);
    }

    #[test]
    fn test_add_hydrogens_keeps_tags_valid() {
        let mol = Molecule::from_smiles("F[C@H](Cl)Br").unwrap();
        let with_h = add_hydrogens(&mol);
        assert_eq!(with_h.atom(1).chirality, mol.atom(1).chirality);
        assert_eq!(with_h.tetrahedral_neighbors(1).map(|n| n.len()), Some(4));
    }

    #[test]
    fn test_folded_double_bond_reference_is_replaced() {
        // The hydrogen is trans to the far fluorine, so the near one is cis.
        let mol = Molecule::from_smiles("[H]/C(F)=C/F").unwrap();
        assert_eq!(mol.atom_count(), 4);
        let double = mol.bond_between(0, 2).unwrap();
        let stereo = mol.bond(double).stereo.unwrap();
        assert_eq!((stereo.begin_ref, stereo.end_ref), (1, 3));
        assert!(stereo.cis);
    }
}

