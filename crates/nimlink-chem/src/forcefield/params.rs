//! UFF atom typing and parameters.
//!
//! Values follow Rappé et al., J. Am. Chem. Soc. 1992, 114, 10024. Elements
//! without a tabulated type fall back to parameters derived from their
//! covalent and van der Waals radii.

use crate::element::Element;
use crate::molecule::{BondOrder, Molecule};

/// Hybridization state used for typing and for picking torsion forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hybridization {
    /// Terminal or monovalent atoms (H, halogens, ions).
    S,
    Sp,
    Sp2,
    Sp3,
}

/// Per-type UFF parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomParams {
    pub label: &'static str,
    /// Valence bond radius (Å).
    pub r1: f64,
    /// Natural angle (degrees).
    pub theta0: f64,
    /// Van der Waals distance (Å).
    pub x1: f64,
    /// Van der Waals well depth (kcal/mol).
    pub d1: f64,
    /// Effective charge.
    pub z1: f64,
    /// GMP electronegativity.
    pub chi: f64,
}

macro_rules! uff {
    ($label:expr, $r1:expr, $theta:expr, $x1:expr, $d1:expr, $z1:expr, $chi:expr) => {
        AtomParams {
            label: $label,
            r1: $r1,
            theta0: $theta,
            x1: $x1,
            d1: $d1,
            z1: $z1,
            chi: $chi,
        }
    };
}

static UFF_TABLE: &[AtomParams] = &[
    uff!("H_", 0.354, 180.0, 2.886, 0.044, 0.712, 4.528),
    uff!("B_3", 0.838, 109.47, 4.083, 0.180, 1.755, 5.110),
    uff!("B_2", 0.828, 120.0, 4.083, 0.180, 1.755, 5.110),
    uff!("C_3", 0.757, 109.47, 3.851, 0.105, 1.912, 5.343),
    uff!("C_R", 0.729, 120.0, 3.851, 0.105, 1.912, 5.343),
    uff!("C_2", 0.732, 120.0, 3.851, 0.105, 1.912, 5.343),
    uff!("C_1", 0.706, 180.0, 3.851, 0.105, 1.912, 5.343),
    uff!("N_3", 0.700, 106.7, 3.660, 0.069, 2.544, 6.899),
    uff!("N_R", 0.699, 120.0, 3.660, 0.069, 2.544, 6.899),
    uff!("N_2", 0.685, 111.2, 3.660, 0.069, 2.544, 6.899),
    uff!("N_1", 0.656, 180.0, 3.660, 0.069, 2.544, 6.899),
    uff!("O_3", 0.658, 104.51, 3.500, 0.060, 2.300, 8.741),
    uff!("O_R", 0.680, 110.0, 3.500, 0.060, 2.300, 8.741),
    uff!("O_2", 0.634, 120.0, 3.500, 0.060, 2.300, 8.741),
    uff!("O_1", 0.639, 180.0, 3.500, 0.060, 2.300, 8.741),
    uff!("F_", 0.668, 180.0, 3.364, 0.050, 1.735, 10.874),
    uff!("Na", 1.539, 180.0, 2.983, 0.030, 1.081, 2.843),
    uff!("Si3", 1.117, 109.47, 4.295, 0.402, 2.323, 4.168),
    uff!("P_3+3", 1.101, 93.8, 4.147, 0.305, 2.863, 5.463),
    uff!("P_3+5", 1.056, 109.47, 4.147, 0.305, 2.863, 5.463),
    uff!("S_3+2", 1.064, 92.1, 4.035, 0.274, 2.703, 6.928),
    uff!("S_3+4", 1.049, 103.2, 4.035, 0.274, 2.703, 6.928),
    uff!("S_3+6", 1.027, 109.47, 4.035, 0.274, 2.703, 6.928),
    uff!("S_R", 1.077, 92.2, 4.035, 0.274, 2.703, 6.928),
    uff!("S_2", 0.854, 120.0, 4.035, 0.274, 2.703, 6.928),
    uff!("Cl", 1.044, 180.0, 3.947, 0.227, 2.348, 8.564),
    uff!("K_", 1.953, 180.0, 3.812, 0.035, 1.165, 2.421),
    uff!("As3+3", 1.211, 92.1, 4.230, 0.309, 2.900, 5.300),
    uff!("Se3+2", 1.190, 90.6, 4.205, 0.291, 2.764, 6.428),
    uff!("Br", 1.192, 180.0, 4.189, 0.251, 2.519, 7.790),
    uff!("I_", 1.382, 180.0, 4.500, 0.339, 2.650, 6.822),
];

fn lookup(label: &str) -> Option<AtomParams> {
    UFF_TABLE.iter().find(|p| p.label == label).copied()
}

fn generic_params(element: Element) -> AtomParams {
    AtomParams {
        label: "generic",
        r1: element.covalent_radius(),
        theta0: 109.47,
        x1: 2.0 * element.vdw_radius(),
        d1: 0.1,
        z1: 2.0,
        chi: 5.0,
    }
}

/// A typed atom: parameters plus the hybridization they were chosen for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomType {
    pub params: AtomParams,
    pub hybridization: Hybridization,
}

fn multiple_bond_counts(mol: &Molecule, idx: usize) -> (usize, usize) {
    let mut doubles = 0;
    let mut triples = 0;
    for &(_, bond) in mol.neighbors(idx) {
        match mol.bond(bond).order {
            BondOrder::Double => doubles += 1,
            BondOrder::Triple | BondOrder::Quadruple => triples += 1,
            _ => {}
        }
    }
    (doubles, triples)
}

fn is_unsaturated(mol: &Molecule, idx: usize) -> bool {
    let (doubles, triples) = multiple_bond_counts(mol, idx);
    mol.atom(idx).aromatic || doubles + triples > 0
}

pub fn hybridization(mol: &Molecule, idx: usize) -> Hybridization {
    let atom = mol.atom(idx);
    let connections = mol.degree(idx) + usize::from(atom.hydrogens);
    if connections <= 1 && !matches!(atom.element, Element::C | Element::N | Element::O) {
        return Hybridization::S;
    }
    let (doubles, triples) = multiple_bond_counts(mol, idx);
    if triples > 0 || (doubles >= 2 && atom.element == Element::C) {
        return Hybridization::Sp;
    }
    if doubles > 0 || atom.aromatic {
        return Hybridization::Sp2;
    }
    // Amide and aniline nitrogens are planar.
    if atom.element == Element::N
        && connections == 3
        && mol
            .neighbors(idx)
            .iter()
            .any(|(nbr, _)| is_unsaturated(mol, *nbr))
    {
        return Hybridization::Sp2;
    }
    match connections {
        0 | 1 => Hybridization::S,
        _ => Hybridization::Sp3,
    }
}

fn uff_label(mol: &Molecule, idx: usize, hyb: Hybridization) -> Option<&'static str> {
    let atom = mol.atom(idx);
    let (doubles, _) = multiple_bond_counts(mol, idx);
    let label = match atom.element {
        Element::H => "H_",
        Element::B => match mol.degree(idx) + usize::from(atom.hydrogens) {
            3 => "B_2",
            _ => "B_3",
        },
        Element::C => match hyb {
            Hybridization::Sp => "C_1",
            Hybridization::Sp2 if atom.aromatic => "C_R",
            Hybridization::Sp2 => "C_2",
            _ => "C_3",
        },
        Element::N => match hyb {
            _ if atom.aromatic => "N_R",
            Hybridization::Sp => "N_1",
            Hybridization::Sp2 if doubles > 0 => "N_2",
            Hybridization::Sp2 => "N_R",
            _ => "N_3",
        },
        Element::O => match hyb {
            _ if atom.aromatic => "O_R",
            Hybridization::Sp => "O_1",
            _ if doubles > 0 => "O_2",
            _ => "O_3",
        },
        Element::S => {
            let valence = mol.total_valence(idx);
            if atom.aromatic {
                "S_R"
            } else if valence >= 6 {
                "S_3+6"
            } else if valence >= 4 {
                "S_3+4"
            } else if doubles > 0 {
                "S_2"
            } else {
                "S_3+2"
            }
        }
        Element::P if mol.total_valence(idx) >= 5 => "P_3+5",
        Element::P => "P_3+3",
        Element::F => "F_",
        Element::Cl => "Cl",
        Element::Br => "Br",
        Element::I => "I_",
        Element::Si => "Si3",
        Element::Se => "Se3+2",
        Element::As => "As3+3",
        Element::Na => "Na",
        Element::K => "K_",
        _ => return None,
    };
    Some(label)
}

/// Assign a UFF type to every atom of `mol`.
pub fn assign_types(mol: &Molecule) -> Vec<AtomType> {
    (0..mol.atom_count())
        .map(|idx| {
            let hybridization = hybridization(mol, idx);
            let params = uff_label(mol, idx, hybridization)
                .and_then(lookup)
                .unwrap_or_else(|| generic_params(mol.atom(idx).element));
            AtomType {
                params,
                hybridization,
            }
        })
        .collect()
}

/// Bond order used in UFF length and torsion formulas.
pub fn uff_bond_order(mol: &Molecule, bond: usize) -> f64 {
    let bond = mol.bond(bond);
    if bond.aromatic {
        1.5
    } else {
        bond.order.as_f64()
    }
}

/// Natural bond length r_ij = r_i + r_j + r_BO - r_EN.
pub fn rest_length(a: &AtomParams, b: &AtomParams, order: f64) -> f64 {
    let (ri, rj) = (a.r1, b.r1);
    let r_bo = -0.1332 * (ri + rj) * order.ln();
    let (xi, xj) = (a.chi, b.chi);
    let r_en = ri * rj * (xi.sqrt() - xj.sqrt()).powi(2) / (xi * ri + xj * rj);
    ri + rj + r_bo - r_en
}

/// Harmonic bond force constant (kcal/mol/Å²).
pub fn bond_force_constant(a: &AtomParams, b: &AtomParams, rest: f64) -> f64 {
    664.12 * a.z1 * b.z1 / rest.powi(3)
}

/// Natural angle (radians) for the angle `i-j-k`, corrected for small rings
/// and for the exocyclic angles of planar ring atoms.
pub fn ideal_angle(mol: &Molecule, types: &[AtomType], i: usize, j: usize, k: usize) -> f64 {
    if let Some(size) = mol.smallest_common_ring(&[i, j, k]) {
        if let Some(angle) = ring_angle(size) {
            return angle.to_radians();
        }
    }
    if types[j].hybridization == Hybridization::Sp2 {
        let ring = mol
            .rings()
            .iter()
            .filter(|ring| ring.contains(&j))
            .map(Vec::len)
            .min();
        if let Some(inner) = ring.and_then(ring_angle) {
            return ((360.0 - inner) / 2.0).to_radians();
        }
    }
    types[j].params.theta0.to_radians()
}

fn ring_angle(size: usize) -> Option<f64> {
    match size {
        3 => Some(60.0),
        4 => Some(90.0),
        5 => Some(108.0),
        _ => None,
    }
}

/// Torsional barrier parameters for rotation about an sp3 atom.
pub fn sp3_torsion_barrier(element: Element) -> f64 {
    match element {
        Element::C => 2.119,
        Element::N => 0.450,
        Element::O => 0.018,
        Element::Si => 1.225,
        Element::P => 2.400,
        Element::S => 0.484,
        Element::Se => 0.335,
        Element::As => 1.500,
        _ => 1.0,
    }
}

/// Torsional barrier parameters for rotation about an sp2 atom.
pub fn sp2_torsion_barrier(element: Element) -> f64 {
    match element.period() {
        2 => 2.0,
        3 => 1.25,
        4 => 0.7,
        5 => 0.2,
        _ => 0.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(smiles: &str) -> Vec<&'static str> {
        let mol = Molecule::from_smiles(smiles).unwrap();
        assign_types(&mol).iter().map(|t| t.params.label).collect()
    }

    #[test]
    fn test_typing_common_groups() {
        assert_eq!(labels("CC=O"), vec!["C_3", "C_2", "O_2"]);
        assert_eq!(labels("C#N"), vec!["C_1", "N_1"]);
        assert_eq!(labels("c1ccncc1"), vec!["C_R", "C_R", "C_R", "N_R", "C_R", "C_R"]);
        assert_eq!(labels("CO"), vec!["C_3", "O_3"]);
        assert_eq!(labels("CS(C)(=O)=O")[1], "S_3+6");
        assert_eq!(labels("CC(=O)N")[3], "N_R");
        assert_eq!(labels("FCl"), vec!["F_", "Cl"]);
    }

    #[test]
    fn test_unknown_element_uses_generic_params() {
        assert_eq!(labels("[Fe]"), vec!["generic"]);
    }

    #[test]
    fn test_rest_lengths_are_reasonable() {
        let c3 = lookup("C_3").unwrap();
        let cr = lookup("C_R").unwrap();
        let o2 = lookup("O_2").unwrap();
        let h = lookup("H_").unwrap();
        let cc = rest_length(&c3, &c3, 1.0);
        assert!((cc - 1.514).abs() < 0.01, "{cc}");
        let aromatic = rest_length(&cr, &cr, 1.5);
        assert!((aromatic - 1.379).abs() < 0.01, "{aromatic}");
        let carbonyl = rest_length(&lookup("C_2").unwrap(), &o2, 2.0);
        assert!(carbonyl > 1.15 && carbonyl < 1.25, "{carbonyl}");
        let ch = rest_length(&c3, &h, 1.0);
        assert!(ch > 1.05 && ch < 1.15, "{ch}");
    }

    #[test]
    fn test_ring_angles() {
        let mol = Molecule::from_smiles("C1CC1").unwrap();
        let types = assign_types(&mol);
        let angle = ideal_angle(&mol, &types, 0, 1, 2).to_degrees();
        assert!((angle - 60.0).abs() < 1e-9);
    }
}
