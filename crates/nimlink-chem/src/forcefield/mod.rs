//! Universal Force Field (UFF) used to relax embedded conformers.

pub mod params;
pub mod terms;

use std::collections::VecDeque;

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::element::Element;
use crate::minimize::{minimize, MinimizeOptions, MinimizeReport, Objective};
use crate::molecule::Molecule;

use self::params::{
    assign_types, bond_force_constant, ideal_angle, rest_length, sp2_torsion_barrier,
    sp3_torsion_barrier, uff_bond_order, AtomType, Hybridization,
};
use self::terms::{AngleBend, BondStretch, Inversion, Torsion, VanDerWaals};

/// Flattens positions into `[x0, y0, z0, x1, ...]`.
pub fn flatten(positions: &[Vector3<f64>]) -> Vec<f64> {
    positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

pub fn unflatten(x: &[f64]) -> Vec<Vector3<f64>> {
    x.chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect()
}

/// Outcome of a force-field optimisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimization {
    pub energy: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// UFF energy expression for one molecule. The molecule is expected to
/// carry explicit hydrogens.
#[derive(Debug, Clone)]
pub struct ForceField {
    atom_count: usize,
    bonds: Vec<BondStretch>,
    angles: Vec<AngleBend>,
    torsions: Vec<Torsion>,
    inversions: Vec<Inversion>,
    vdw: Vec<VanDerWaals>,
}

impl ForceField {
    pub fn new(mol: &Molecule) -> Self {
        let types = assign_types(mol);
        let bonds = bond_terms(mol, &types);
        let angles = angle_terms(mol, &types, &bonds);
        let torsions = torsion_terms(mol, &types);
        let inversions = inversion_terms(mol, &types);
        let vdw = vdw_terms(mol, &types);
        debug!(
            atoms = mol.atom_count(),
            bonds = bonds.len(),
            angles = angles.len(),
            torsions = torsions.len(),
            inversions = inversions.len(),
            vdw = vdw.len(),
            "UFF set up"
        );
        Self {
            atom_count: mol.atom_count(),
            bonds,
            angles,
            torsions,
            inversions,
            vdw,
        }
    }

    pub fn bonds(&self) -> &[BondStretch] {
        &self.bonds
    }

    /// Total energy (kcal/mol) of a set of positions.
    pub fn energy(&self, positions: &[Vector3<f64>]) -> f64 {
        let x = flatten(positions);
        let mut grad = vec![0.0; x.len()];
        self.evaluate(&x, &mut grad)
    }

    /// Relaxes `positions` in place.
    pub fn optimize(&self, positions: &mut [Vector3<f64>], max_iterations: u32) -> Optimization {
        let mut x = flatten(positions);
        let options = MinimizeOptions {
            max_iterations,
            gradient_tolerance: 1e-2,
            energy_tolerance: 1e-7,
            max_step: 0.2,
        };
        let MinimizeReport {
            value,
            iterations,
            converged,
        } = minimize(self, &mut x, &options);
        for (p, c) in positions.iter_mut().zip(x.chunks_exact(3)) {
            *p = Vector3::new(c[0], c[1], c[2]);
        }
        if !converged {
            warn!(energy = value, iterations, "UFF optimization did not converge");
        }
        Optimization {
            energy: value,
            iterations,
            converged,
        }
    }
}

impl Objective for ForceField {
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        debug_assert_eq!(x.len(), 3 * self.atom_count);
        grad.fill(0.0);
        let mut energy = 0.0;
        for term in &self.bonds {
            energy += term.evaluate(x, grad);
        }
        for term in &self.angles {
            energy += term.evaluate(x, grad);
        }
        for term in &self.torsions {
            energy += term.evaluate(x, grad);
        }
        for term in &self.inversions {
            energy += term.evaluate(x, grad);
        }
        for term in &self.vdw {
            energy += term.evaluate(x, grad);
        }
        energy
    }
}

// ── Term construction ─────────────────────────────────────────────────────

fn bond_terms(mol: &Molecule, types: &[AtomType]) -> Vec<BondStretch> {
    mol.bonds()
        .iter()
        .enumerate()
        .map(|(idx, bond)| {
            let (a, b) = (&types[bond.begin].params, &types[bond.end].params);
            let rest = rest_length(a, b, uff_bond_order(mol, idx));
            BondStretch {
                i: bond.begin,
                j: bond.end,
                rest,
                k: bond_force_constant(a, b, rest),
            }
        })
        .collect()
}

fn rest_between(bonds: &[BondStretch], mol: &Molecule, a: usize, b: usize) -> Option<f64> {
    mol.bond_between(a, b).map(|idx| bonds[idx].rest)
}

fn angle_terms(mol: &Molecule, types: &[AtomType], bonds: &[BondStretch]) -> Vec<AngleBend> {
    let mut out = Vec::new();
    for j in 0..mol.atom_count() {
        let nbrs = mol.neighbors(j);
        for (a, &(i, _)) in nbrs.iter().enumerate() {
            for &(k, _) in &nbrs[a + 1..] {
                let (Some(r_ij), Some(r_jk)) =
                    (rest_between(bonds, mol, i, j), rest_between(bonds, mol, j, k))
                else {
                    continue;
                };
                let theta0 = ideal_angle(mol, types, i, j, k);
                let force = AngleBend::force_constant(
                    types[i].params.z1,
                    types[k].params.z1,
                    r_ij,
                    r_jk,
                    theta0,
                );
                out.push(AngleBend::new(i, j, k, theta0, force));
            }
        }
    }
    out
}

/// Barrier height, periodicity and cos(n φ0) for rotation about `j-k`.
fn torsion_profile(
    mol: &Molecule,
    types: &[AtomType],
    j: usize,
    k: usize,
    bond: usize,
) -> Option<(f64, f64, f64)> {
    use Hybridization::{Sp2, Sp3};
    let (ej, ek) = (mol.atom(j).element, mol.atom(k).element);
    match (types[j].hybridization, types[k].hybridization) {
        (Sp3, Sp3) => {
            let barrier = (sp3_torsion_barrier(ej) * sp3_torsion_barrier(ek)).sqrt();
            Some((barrier, 3.0, -1.0))
        }
        (Sp2, Sp2) => {
            let order = uff_bond_order(mol, bond);
            let barrier = 5.0
                * (sp2_torsion_barrier(ej) * sp2_torsion_barrier(ek)).sqrt()
                * (1.0 + 4.18 * order.ln());
            Some((barrier, 2.0, 1.0))
        }
        (Sp2, Sp3) | (Sp3, Sp2) => Some((1.0, 6.0, 1.0)),
        _ => None,
    }
}

fn torsion_terms(mol: &Molecule, types: &[AtomType]) -> Vec<Torsion> {
    let mut out = Vec::new();
    for (bond_idx, bond) in mol.bonds().iter().enumerate() {
        let (j, k) = (bond.begin, bond.end);
        if mol.degree(j) < 2 || mol.degree(k) < 2 {
            continue;
        }
        let Some((barrier, periodicity, cos_n_phi0)) = torsion_profile(mol, types, j, k, bond_idx)
        else {
            continue;
        };
        let mut quads = Vec::new();
        for &(i, _) in mol.neighbors(j) {
            if i == k {
                continue;
            }
            for &(l, _) in mol.neighbors(k) {
                if l != j && l != i {
                    quads.push([i, j, k, l]);
                }
            }
        }
        if quads.is_empty() {
            continue;
        }
        let share = barrier / quads.len() as f64;
        out.extend(quads.into_iter().map(|atoms| Torsion {
            atoms,
            barrier: share,
            periodicity,
            cos_n_phi0,
        }));
    }
    out
}

fn inversion_terms(mol: &Molecule, types: &[AtomType]) -> Vec<Inversion> {
    let mut out = Vec::new();
    for center in 0..mol.atom_count() {
        if types[center].hybridization != Hybridization::Sp2 || mol.degree(center) != 3 {
            continue;
        }
        let element = mol.atom(center).element;
        let nbrs = mol.neighbors(center);
        let k = match element {
            Element::C
                if nbrs
                    .iter()
                    .any(|&(nbr, _)| types[nbr].params.label == "O_2") =>
            {
                50.0
            }
            Element::C | Element::N => 6.0,
            _ => continue,
        };
        out.push(Inversion {
            center,
            neighbors: [nbrs[0].0, nbrs[1].0, nbrs[2].0],
            k: k / 3.0,
        });
    }
    out
}

/// Graph distances from `start`, cut off after `limit` bonds.
fn bond_distances(mol: &Molecule, start: usize, limit: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; mol.atom_count()];
    dist[start] = Some(0);
    let mut queue = VecDeque::from([start]);
    while let Some(atom) = queue.pop_front() {
        let Some(d) = dist[atom] else { continue };
        if d == limit {
            continue;
        }
        for &(nbr, _) in mol.neighbors(atom) {
            if dist[nbr].is_none() {
                dist[nbr] = Some(d + 1);
                queue.push_back(nbr);
            }
        }
    }
    dist
}

fn vdw_terms(mol: &Molecule, types: &[AtomType]) -> Vec<VanDerWaals> {
    let mut out = Vec::new();
    for i in 0..mol.atom_count() {
        let near = bond_distances(mol, i, 2);
        for j in i + 1..mol.atom_count() {
            if near[j].is_some() {
                continue;
            }
            let (a, b) = (&types[i].params, &types[j].params);
            out.push(VanDerWaals {
                i,
                j,
                distance: (a.x1 * b.x1).sqrt(),
                well: (a.d1 * b.d1).sqrt(),
            });
        }
    }
    out
}
