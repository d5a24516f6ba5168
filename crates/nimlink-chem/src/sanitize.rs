//! Sanitization: ring perception, kekulization, valence checks, implicit
//! hydrogens and aromaticity.
//!
//! After [`sanitize`] every bond carries a Kekulé order, every atom carries
//! its total hydrogen count, and the aromatic flags on atoms and bonds
//! reflect Hückel perception rather than the input spelling.

use tracing::debug;

use crate::element::Element;
use crate::error::{ChemError, Result};
use crate::hydrogens::remove_hydrogens;
use crate::molecule::{BondDirection, BondOrder, DoubleBondStereo, Molecule};
use crate::rings::perceive_rings;
use crate::smiles::parse_smiles;

/// Upper bound on matching steps before kekulization gives up.
const KEKULIZE_BUDGET: usize = 200_000;

/// Ceiling for bracket atoms of elements without a valence table (metals).
const MAX_UNTABULATED_VALENCE: u32 = 16;

/// Double bonds in rings at least this large may carry cis/trans geometry.
const MIN_STEREO_RING: usize = 8;

impl Molecule {
    /// Parse and fully sanitize a SMILES string. Explicit hydrogen atoms
    /// that carry no extra information are folded into their neighbours.
    pub fn from_smiles(smiles: &str) -> Result<Molecule> {
        let mut mol = parse_smiles(smiles)?;
        sanitize(&mut mol)?;
        remove_hydrogens(&mut mol);
        Ok(mol)
    }
}

pub fn sanitize(mol: &mut Molecule) -> Result<()> {
    let rings = perceive_rings(mol);
    mol.set_rings(rings);

    for idx in 0..mol.atom_count() {
        if mol.atom(idx).aromatic && !mol.is_ring_atom(idx) {
            return Err(ChemError::NonRingAromatic(idx));
        }
    }
    // Aromatic bonds outside rings (the link in biphenyl) are plain single bonds.
    for idx in 0..mol.bond_count() {
        if mol.bond(idx).order == BondOrder::Aromatic && !mol.is_ring_bond(idx) {
            mol.bond_mut(idx).order = BondOrder::Single;
        }
    }

    kekulize(mol)?;
    assign_hydrogens(mol)?;
    perceive_aromaticity(mol);
    resolve_double_bond_stereo(mol);
    Ok(())
}

// ── Kekulization ──────────────────────────────────────────────────────────

/// Whether an aromatic atom must receive a double bond from the aromatic
/// system to reach an allowed valence.
fn needs_pi_bond(mol: &Molecule, idx: usize) -> bool {
    let atom = mol.atom(idx);
    let has_multiple = mol.neighbors(idx).iter().any(|(_, b)| {
        matches!(
            mol.bond(*b).order,
            BondOrder::Double | BondOrder::Triple | BondOrder::Quadruple
        )
    });
    if has_multiple {
        return false;
    }

    let valence = mol.explicit_valence(idx) + u32::from(atom.hydrogens);
    let allows = |allowed: &[u8], v: u32| allowed.iter().any(|a| u32::from(*a) == v);
    if atom.bracket {
        match atom.element.allowed_valences(atom.charge) {
            Some(allowed) => !allows(allowed, valence) && allows(allowed, valence + 1),
            None => false,
        }
    } else {
        atom.element
            .default_valences()
            .first()
            .is_some_and(|lowest| valence < u32::from(*lowest))
    }
}

fn kekulize(mol: &mut Molecule) -> Result<()> {
    let aromatic_bonds: Vec<usize> = (0..mol.bond_count())
        .filter(|b| mol.bond(*b).order == BondOrder::Aromatic)
        .collect();
    let has_aromatic_atoms = mol.atoms().iter().any(|a| a.aromatic);
    if aromatic_bonds.is_empty() && !has_aromatic_atoms {
        return Ok(());
    }

    let n = mol.atom_count();
    let needs: Vec<bool> = (0..n)
        .map(|i| mol.atom(i).aromatic && needs_pi_bond(mol, i))
        .collect();

    let mut graph: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for &b in &aromatic_bonds {
        let bond = mol.bond(b);
        if needs[bond.begin] && needs[bond.end] {
            graph[bond.begin].push((bond.end, b));
            graph[bond.end].push((bond.begin, b));
        }
    }

    let mut mate: Vec<Option<usize>> = vec![None; n];
    let mut budget = KEKULIZE_BUDGET;
    if !match_pi_bonds(&graph, &needs, &mut mate, &mut budget) {
        let unmatched = needs.iter().filter(|n| **n).count();
        return Err(ChemError::Kekulize(format!(
            "no alternating bond assignment covers the {unmatched} atom(s) needing a double bond"
        )));
    }

    for b in aromatic_bonds {
        let begin = mol.bond(b).begin;
        let order = if mate[begin] == Some(b) {
            BondOrder::Double
        } else {
            BondOrder::Single
        };
        let bond = mol.bond_mut(b);
        bond.order = order;
        bond.aromatic = true;
    }
    debug!(bonds = mol.bond_count(), "kekulized aromatic system");
    Ok(())
}

/// Backtracking perfect matching over atoms that need a π bond. Picks the
/// unmatched atom with the fewest free partners at every step.
fn match_pi_bonds(
    graph: &[Vec<(usize, usize)>],
    needs: &[bool],
    mate: &mut [Option<usize>],
    budget: &mut usize,
) -> bool {
    let mut best: Option<(usize, usize)> = None;
    for atom in 0..graph.len() {
        if !needs[atom] || mate[atom].is_some() {
            continue;
        }
        let free = graph[atom]
            .iter()
            .filter(|(nbr, _)| mate[*nbr].is_none())
            .count();
        if free == 0 {
            return false;
        }
        if best.map_or(true, |(_, count)| free < count) {
            best = Some((atom, free));
        }
    }
    let Some((atom, _)) = best else {
        return true;
    };

    for &(nbr, bond) in &graph[atom] {
        if mate[nbr].is_some() {
            continue;
        }
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        mate[atom] = Some(bond);
        mate[nbr] = Some(bond);
        if match_pi_bonds(graph, needs, mate, budget) {
            return true;
        }
        mate[atom] = None;
        mate[nbr] = None;
    }
    false
}

// ── Valence ───────────────────────────────────────────────────────────────

fn assign_hydrogens(mol: &mut Molecule) -> Result<()> {
    for idx in 0..mol.atom_count() {
        let explicit = mol.explicit_valence(idx);
        let atom = mol.atom(idx);
        let element = atom.element;

        if atom.bracket {
            let total = explicit + u32::from(atom.hydrogens);
            let max = match element.allowed_valences(atom.charge) {
                Some(allowed) => allowed.last().copied().map_or(0, u32::from),
                None => MAX_UNTABULATED_VALENCE,
            };
            if total > max {
                return Err(ChemError::Valence {
                    atom: idx,
                    element,
                    valence: total,
                });
            }
            continue;
        }

        let fill = element
            .default_valences()
            .iter()
            .map(|v| u32::from(*v))
            .find(|v| *v >= explicit);
        match fill {
            // Default valences fit in a u8, so the difference does too.
            Some(valence) => mol.atom_mut(idx).hydrogens = (valence - explicit) as u8,
            None => {
                return Err(ChemError::Valence {
                    atom: idx,
                    element,
                    valence: explicit,
                })
            }
        }
    }
    Ok(())
}

// ── Double-bond stereo ────────────────────────────────────────────────────

/// Whether `substituent` sits above its double-bond atom, read from the `/`
/// or `\` mark on the single bond joining them.
fn side_up(mol: &Molecule, substituent: usize, bond: usize) -> bool {
    let bond = mol.bond(bond);
    (bond.direction == BondDirection::Up) ^ (bond.begin == substituent)
}

/// First substituent of `atom` (other than `partner`) joined by a marked
/// single bond, with the side it sits on.
fn marked_substituent(mol: &Molecule, atom: usize, partner: usize) -> Option<(usize, bool)> {
    mol.neighbors(atom).iter().find_map(|&(nbr, bond)| {
        let b = mol.bond(bond);
        let marked = nbr != partner && b.order == BondOrder::Single && b.direction != BondDirection::None;
        marked.then(|| (nbr, side_up(mol, nbr, bond)))
    })
}

/// Turns directional marks around non-aromatic double bonds into
/// [`DoubleBondStereo`]. Bonds in small rings are always cis and are skipped.
fn resolve_double_bond_stereo(mol: &mut Molecule) {
    for idx in 0..mol.bond_count() {
        let bond = mol.bond(idx);
        if bond.order != BondOrder::Double || bond.aromatic {
            continue;
        }
        let (begin, end) = (bond.begin, bond.end);
        if mol
            .smallest_common_ring(&[begin, end])
            .is_some_and(|size| size < MIN_STEREO_RING && mol.is_ring_bond(idx))
        {
            continue;
        }
        let stereo = match (
            marked_substituent(mol, begin, end),
            marked_substituent(mol, end, begin),
        ) {
            (Some((begin_ref, a)), Some((end_ref, b))) => Some(DoubleBondStereo {
                begin_ref,
                end_ref,
                cis: a == b,
            }),
            _ => None,
        };
        mol.bond_mut(idx).stereo = stereo;
    }
}

// ── Aromaticity ───────────────────────────────────────────────────────────

/// π electrons an atom donates to a ring it belongs to, or `None` when it
/// cannot be part of an aromatic ring.
fn pi_electrons(mol: &Molecule, idx: usize) -> Option<u8> {
    let atom = mol.atom(idx);
    if !atom.element.can_be_aromatic() || !mol.is_ring_atom(idx) {
        return None;
    }

    let mut ring_double = false;
    let mut exocyclic_double = false;
    for &(nbr, bond) in mol.neighbors(idx) {
        match mol.bond(bond).order {
            BondOrder::Triple | BondOrder::Quadruple => return None,
            BondOrder::Double if mol.is_ring_bond(bond) => {
                if ring_double {
                    return None;
                }
                ring_double = true;
            }
            BondOrder::Double => {
                let electronegative = matches!(
                    mol.atom(nbr).element,
                    Element::O | Element::N | Element::S | Element::Se
                );
                if !electronegative || atom.element != Element::C {
                    return None;
                }
                exocyclic_double = true;
            }
            _ => {}
        }
    }
    if ring_double && exocyclic_double {
        return None;
    }
    if ring_double {
        return Some(1);
    }
    if exocyclic_double {
        return Some(0);
    }

    let connections = mol.degree(idx) + usize::from(atom.hydrogens);
    match (atom.element, atom.charge) {
        (Element::C, -1) => Some(2),
        (Element::C, 1) => Some(0),
        (Element::N | Element::P | Element::As, 0) if connections == 3 => Some(2),
        (Element::N | Element::P | Element::As, -1) if connections == 2 => Some(2),
        (Element::O | Element::S | Element::Se | Element::Te, 0) if connections == 2 => Some(2),
        (Element::B, 0) if connections == 3 => Some(0),
        _ => None,
    }
}

fn huckel(electrons: &[Option<u8>], atoms: impl IntoIterator<Item = usize>) -> bool {
    let mut total = 0u32;
    for atom in atoms {
        match electrons[atom] {
            Some(e) => total += u32::from(e),
            None => return false,
        }
    }
    total % 4 == 2
}

fn shares_bond(a: &[usize], b: &[usize]) -> bool {
    let n = a.len();
    (0..n).any(|i| {
        let (x, y) = (a[i], a[(i + 1) % n]);
        let m = b.len();
        (0..m).any(|j| {
            let (p, q) = (b[j], b[(j + 1) % m]);
            (x == p && y == q) || (x == q && y == p)
        })
    })
}

/// Marks atoms and bonds of Hückel-aromatic rings, checking single rings
/// and pairs of fused rings (which catches azulene-like systems).
fn perceive_aromaticity(mol: &mut Molecule) {
    for idx in 0..mol.atom_count() {
        mol.atom_mut(idx).aromatic = false;
    }
    for idx in 0..mol.bond_count() {
        mol.bond_mut(idx).aromatic = false;
    }

    let rings = mol.rings().to_vec();
    let electrons: Vec<Option<u8>> = (0..mol.atom_count())
        .map(|i| pi_electrons(mol, i))
        .collect();

    let mut aromatic: Vec<bool> = rings
        .iter()
        .map(|ring| huckel(&electrons, ring.iter().copied()))
        .collect();

    for i in 0..rings.len() {
        for j in (i + 1)..rings.len() {
            if (aromatic[i] && aromatic[j]) || !shares_bond(&rings[i], &rings[j]) {
                continue;
            }
            let mut envelope: Vec<usize> = rings[i].iter().chain(&rings[j]).copied().collect();
            envelope.sort_unstable();
            envelope.dedup();
            if huckel(&electrons, envelope) {
                aromatic[i] = true;
                aromatic[j] = true;
            }
        }
    }

    for (ring, _) in rings.iter().zip(&aromatic).filter(|(_, a)| **a) {
        let n = ring.len();
        for k in 0..n {
            let (a, b) = (ring[k], ring[(k + 1) % n]);
            mol.atom_mut(a).aromatic = true;
            if let Some(bond) = mol.bond_between(a, b) {
                mol.bond_mut(bond).aromatic = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aromatic_atoms(mol: &Molecule) -> usize {
        mol.atoms().iter().filter(|a| a.aromatic).count()
    }

    #[test]
    fn test_implicit_hydrogens() {
        let mol = Molecule::from_smiles("CC(=O)O").unwrap();
        let hs: Vec<u8> = mol.atoms().iter().map(|a| a.hydrogens).collect();
        assert_eq!(hs, vec![3, 0, 0, 1]);
    }

    #[test]
    fn test_hypervalent_sulfur_and_phosphorus() {
        assert!(Molecule::from_smiles("CS(=O)(=O)C").is_ok());
        assert!(Molecule::from_smiles("OP(=O)(O)O").is_ok());
    }

    #[test]
    fn test_valence_violation_is_rejected() {
        let err = Molecule::from_smiles("C(C)(C)(C)(C)C").unwrap_err();
        assert!(matches!(err, ChemError::Valence { valence: 5, .. }));
        assert!(Molecule::from_smiles("[CH5]").is_err());
        assert!(Molecule::from_smiles("O=O=O").is_err());
    }

    #[test]
    fn test_high_degree_metal_is_a_valence_error() {
        let triple = format!("[Fe]{}", "(#C)".repeat(90));
        let err = Molecule::from_smiles(&triple).unwrap_err();
        assert!(matches!(err, ChemError::Valence { valence: 270, .. }));

        let single = format!("[Fe]{}", "(C)".repeat(300));
        let err = Molecule::from_smiles(&single).unwrap_err();
        assert!(matches!(err, ChemError::Valence { valence: 300, .. }));

        assert!(Molecule::from_smiles("[Fe](C)(C)(C)(C)(C)C").is_ok());
    }

    #[test]
    fn test_double_bond_geometry_from_marks() {
        let trans = Molecule::from_smiles("F/C=C/F").unwrap();
        let stereo = trans.bond(1).stereo.unwrap();
        assert_eq!((stereo.begin_ref, stereo.end_ref), (0, 3));
        assert!(!stereo.cis);

        let cis = Molecule::from_smiles("F/C=C\\F").unwrap();
        assert!(cis.bond(1).stereo.unwrap().cis);

        // Same trans isomer written with the marks on the other side.
        let flipped = Molecule::from_smiles("F\\C=C\\F").unwrap();
        assert!(!flipped.bond(1).stereo.unwrap().cis);

        let unmarked = Molecule::from_smiles("FC=CF").unwrap();
        assert_eq!(unmarked.bond(1).stereo, None);
        let one_side = Molecule::from_smiles("F/C=CF").unwrap();
        assert_eq!(one_side.bond(1).stereo, None);
    }

    #[test]
    fn test_small_ring_double_bond_has_no_geometry() {
        let mol = Molecule::from_smiles("C/1=C/CCCC1").unwrap();
        assert!(mol.bonds().iter().all(|b| b.stereo.is_none()));
    }

    #[test]
    fn test_benzene_kekulizes_to_alternating_bonds() {
        let mol = Molecule::from_smiles("c1ccccc1").unwrap();
        let doubles = mol
            .bonds()
            .iter()
            .filter(|b| b.order == BondOrder::Double)
            .count();
        assert_eq!(doubles, 3);
        assert_eq!(aromatic_atoms(&mol), 6);
        assert!(mol.atoms().iter().all(|a| a.hydrogens == 1));
    }

    #[test]
    fn test_kekule_input_is_perceived_aromatic() {
        let mol = Molecule::from_smiles("C1=CC=CC=C1").unwrap();
        assert_eq!(aromatic_atoms(&mol), 6);
        assert!(mol.bonds().iter().all(|b| b.aromatic));
    }

    #[test]
    fn test_heteroaromatics() {
        let pyrrole = Molecule::from_smiles("c1cc[nH]c1").unwrap();
        assert_eq!(aromatic_atoms(&pyrrole), 5);
        let pyridine = Molecule::from_smiles("c1ccncc1").unwrap();
        assert_eq!(aromatic_atoms(&pyridine), 6);
        let furan = Molecule::from_smiles("c1ccoc1").unwrap();
        assert_eq!(aromatic_atoms(&furan), 5);
        let thiophene = Molecule::from_smiles("C1=CSC=C1").unwrap();
        assert_eq!(aromatic_atoms(&thiophene), 5);
        let pyridone = Molecule::from_smiles("O=C1C=CC=CN1").unwrap();
        assert_eq!(aromatic_atoms(&pyridone), 6);
    }

    #[test]
    fn test_pyrrole_without_hydrogen_cannot_kekulize() {
        let err = Molecule::from_smiles("c1ccnc1").unwrap_err();
        assert!(matches!(err, ChemError::Kekulize(_)));
    }

    #[test]
    fn test_non_aromatic_rings() {
        let cyclohexene = Molecule::from_smiles("C1=CCCCC1").unwrap();
        assert_eq!(aromatic_atoms(&cyclohexene), 0);
        let cot = Molecule::from_smiles("c1ccccccc1").unwrap();
        assert_eq!(aromatic_atoms(&cot), 0);
        let quinone = Molecule::from_smiles("O=C1C=CC(=O)C=C1").unwrap();
        assert_eq!(aromatic_atoms(&quinone), 0);
    }

    #[test]
    fn test_fused_systems() {
        let naphthalene = Molecule::from_smiles("c1ccc2ccccc2c1").unwrap();
        assert_eq!(aromatic_atoms(&naphthalene), 10);
        let azulene = Molecule::from_smiles("C1=CC2=CC=CC=CC2=C1").unwrap();
        assert_eq!(aromatic_atoms(&azulene), 10);
        let indole = Molecule::from_smiles("c1ccc2[nH]ccc2c1").unwrap();
        assert_eq!(aromatic_atoms(&indole), 9);
    }

    #[test]
    fn test_biphenyl_link_is_single() {
        let mol = Molecule::from_smiles("c1ccccc1c1ccccc1").unwrap();
        let link = mol.bond_between(5, 6).unwrap();
        assert_eq!(mol.bond(link).order, BondOrder::Single);
        assert!(!mol.bond(link).aromatic);
    }

    #[test]
    fn test_non_ring_aromatic_atom() {
        let err = Molecule::from_smiles("Cc").unwrap_err();
        assert!(matches!(err, ChemError::NonRingAromatic(1)));
    }

    #[test]
    fn test_charged_atoms() {
        let ammonium = Molecule::from_smiles("C[N+](C)(C)C").unwrap();
        assert_eq!(ammonium.atom(1).hydrogens, 0);
        let pyridinium = Molecule::from_smiles("c1cc[nH+]cc1").unwrap();
        assert_eq!(aromatic_atoms(&pyridinium), 6);
        assert!(Molecule::from_smiles("[Na+].[Cl-]").is_ok());
        assert!(Molecule::from_smiles("CC(=O)[O-]").is_ok());
    }

    #[test]
    fn test_explicit_hydrogens_are_folded() {
        let mol = Molecule::from_smiles("[H]C([H])([H])[H]").unwrap();
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(mol.atom(0).hydrogens, 4);
        let deuterium = Molecule::from_smiles("[2H]C").unwrap();
        assert_eq!(deuterium.atom_count(), 2);
    }
}
