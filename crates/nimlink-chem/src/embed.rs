//! Distance-geometry embedding: topological distance bounds, triangle
//! smoothing, random metric-matrix embedding and bounds-error refinement.
//!
//! Tetrahedral tags become signed-volume terms in the refinement and
//! double-bond geometry becomes a fixed 1-4 distance. Attempts whose final
//! geometry contradicts either are discarded.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use nalgebra::{DMatrix, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::forcefield::params::{
    assign_types, ideal_angle, rest_length, uff_bond_order, AtomType, Hybridization,
};
use crate::forcefield::terms::{dihedral, position};
use crate::forcefield::{flatten, unflatten};
use crate::minimize::{minimize, MinimizeOptions, Objective};
use crate::molecule::{Bond, Chirality, Molecule};

/// Knobs for [`embed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Seed for reproducible coordinates; `None` draws from OS entropy.
    pub random_seed: Option<u64>,
    pub max_attempts: u32,
    /// Iteration cap for the bounds refinement and the UFF relaxation.
    pub max_iterations: u32,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            random_seed: None,
            max_attempts: 10,
            max_iterations: 200,
        }
    }
}

const BOND_TOLERANCE: f64 = 0.01;
const ANGLE_TOLERANCE: f64 = 0.04;
const VDW_SCALE: f64 = 0.7;
const FAR_AWAY: f64 = 1000.0;
const FRAGMENT_GAP: f64 = 3.0;
const JITTER: f64 = 0.05;

/// Largest bond-length error accepted before an attempt is discarded.
const MAX_BOND_DEVIATION: f64 = 0.3;

/// Signed volume (Å³) below which a chiral centre is pushed outwards.
const MIN_CHIRAL_VOLUME: f64 = 0.5;

// ── Bounds ────────────────────────────────────────────────────────────────

/// Which rule set a bound; higher levels are never overwritten by lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Free,
    OneFour,
    OneThree,
    Bonded,
}

#[derive(Debug, Clone)]
pub(crate) struct Bounds {
    lower: DMatrix<f64>,
    upper: DMatrix<f64>,
    level: DMatrix<u8>,
}

impl Bounds {
    fn set(&mut self, i: usize, j: usize, lower: f64, upper: f64, level: Level) {
        if self.level[(i, j)] >= level as u8 {
            return;
        }
        for (a, b) in [(i, j), (j, i)] {
            self.lower[(a, b)] = lower.max(0.0);
            self.upper[(a, b)] = upper;
            self.level[(a, b)] = level as u8;
        }
    }

    fn lower(&self, i: usize, j: usize) -> f64 {
        self.lower[(i, j)]
    }

    fn upper(&self, i: usize, j: usize) -> f64 {
        self.upper[(i, j)]
    }
}

fn bond_rest(mol: &Molecule, types: &[AtomType], a: usize, b: usize) -> Option<f64> {
    let bond = mol.bond_between(a, b)?;
    Some(rest_length(
        &types[a].params,
        &types[b].params,
        uff_bond_order(mol, bond),
    ))
}

fn law_of_cosines(a: f64, b: f64, angle: f64) -> f64 {
    (a * a + b * b - 2.0 * a * b * angle.cos()).max(0.0).sqrt()
}

/// Topological distance bounds for every atom pair of `mol`.
pub(crate) fn distance_bounds(mol: &Molecule, types: &[AtomType]) -> Bounds {
    let n = mol.atom_count();
    let mut bounds = Bounds {
        lower: DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                0.0
            } else {
                VDW_SCALE
                    * (mol.atom(i).element.vdw_radius() + mol.atom(j).element.vdw_radius())
            }
        }),
        upper: DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { FAR_AWAY }),
        level: DMatrix::from_element(n, n, Level::Free as u8),
    };

    for (idx, bond) in mol.bonds().iter().enumerate() {
        let (a, b) = (bond.begin, bond.end);
        let rest = rest_length(
            &types[a].params,
            &types[b].params,
            uff_bond_order(mol, idx),
        );
        bounds.set(
            a,
            b,
            rest - BOND_TOLERANCE,
            rest + BOND_TOLERANCE,
            Level::Bonded,
        );
    }

    for j in 0..n {
        let nbrs = mol.neighbors(j);
        for (pos, &(i, _)) in nbrs.iter().enumerate() {
            for &(k, _) in &nbrs[pos + 1..] {
                let (Some(r_ij), Some(r_jk)) = (bond_rest(mol, types, i, j), bond_rest(mol, types, j, k))
                else {
                    continue;
                };
                let d = law_of_cosines(r_ij, r_jk, ideal_angle(mol, types, i, j, k));
                bounds.set(i, k, d - ANGLE_TOLERANCE, d + ANGLE_TOLERANCE, Level::OneThree);
            }
        }
    }

    for bond in mol.bonds() {
        let (j, k) = (bond.begin, bond.end);
        let planar_ring = planar_ring_through(mol, types, j, k);
        for &(i, _) in mol.neighbors(j) {
            if i == k {
                continue;
            }
            for &(l, _) in mol.neighbors(k) {
                if l == j || l == i {
                    continue;
                }
                let Some((cis, trans)) = torsion_extremes(mol, types, [i, j, k, l]) else {
                    continue;
                };
                if let Some(same_side) = double_bond_cis(bond, i, j, l) {
                    let d = if same_side { cis } else { trans };
                    bounds.set(i, l, d - ANGLE_TOLERANCE, d + ANGLE_TOLERANCE, Level::OneFour);
                    continue;
                }
                match planar_ring {
                    Some(ring) if ring.contains(&i) == ring.contains(&l) => {
                        bounds.set(i, l, cis - ANGLE_TOLERANCE, cis + ANGLE_TOLERANCE, Level::OneFour)
                    }
                    Some(_) => bounds.set(
                        i,
                        l,
                        trans - ANGLE_TOLERANCE,
                        trans + ANGLE_TOLERANCE,
                        Level::OneFour,
                    ),
                    None => bounds.set(i, l, cis, trans, Level::OneFour),
                }
            }
        }
    }
    bounds
}

/// Whether `i` (on `j`'s side) and `l` (on the other side) are cis across
/// `bond`, when the bond has a defined geometry.
fn double_bond_cis(bond: &Bond, i: usize, j: usize, l: usize) -> Option<bool> {
    let stereo = bond.stereo?;
    let (near, far) = if j == bond.begin {
        (stereo.begin_ref, stereo.end_ref)
    } else {
        (stereo.end_ref, stereo.begin_ref)
    };
    Some(stereo.cis ^ (i != near) ^ (l != far))
}

/// Smallest ring through the bond `j-k` when both ends are trigonal.
fn planar_ring_through<'m>(
    mol: &'m Molecule,
    types: &[AtomType],
    j: usize,
    k: usize,
) -> Option<&'m [usize]> {
    if types[j].hybridization != Hybridization::Sp2 || types[k].hybridization != Hybridization::Sp2 {
        return None;
    }
    mol.rings()
        .iter()
        .filter(|ring| ring.contains(&j) && ring.contains(&k))
        .min_by_key(|ring| ring.len())
        .map(Vec::as_slice)
}

/// 1-4 distances at dihedral 0 and 180 degrees.
fn torsion_extremes(mol: &Molecule, types: &[AtomType], [i, j, k, l]: [usize; 4]) -> Option<(f64, f64)> {
    let r_ij = bond_rest(mol, types, i, j)?;
    let r_jk = bond_rest(mol, types, j, k)?;
    let r_kl = bond_rest(mol, types, k, l)?;
    let theta1 = ideal_angle(mol, types, i, j, k);
    let theta2 = ideal_angle(mol, types, j, k, l);

    let p_i = Vector3::new(r_ij * theta1.cos(), r_ij * theta1.sin(), 0.0);
    let x_l = r_jk - r_kl * theta2.cos();
    let y_l = r_kl * theta2.sin();
    let cis = (Vector3::new(x_l, y_l, 0.0) - p_i).norm();
    let trans = (Vector3::new(x_l, -y_l, 0.0) - p_i).norm();
    Some((cis.min(trans), cis.max(trans)))
}

/// Floyd-Warshall tightening of the bounds. Where the lower bound ends up
/// above the upper one it is pulled down to the upper bound.
pub(crate) fn smooth_bounds(lower: &mut DMatrix<f64>, upper: &mut DMatrix<f64>) {
    let n = lower.nrows();
    for k in 0..n {
        for i in 0..n {
            if i == k {
                continue;
            }
            for j in i + 1..n {
                if j == k {
                    continue;
                }
                let via = upper[(i, k)] + upper[(k, j)];
                if upper[(i, j)] > via {
                    upper[(i, j)] = via;
                    upper[(j, i)] = via;
                }
                let reach = (lower[(i, k)] - upper[(k, j)]).max(lower[(j, k)] - upper[(k, i)]);
                if lower[(i, j)] < reach {
                    lower[(i, j)] = reach;
                    lower[(j, i)] = reach;
                }
                if lower[(i, j)] > upper[(i, j)] {
                    lower[(i, j)] = upper[(i, j)];
                    lower[(j, i)] = upper[(i, j)];
                }
            }
        }
    }
}

// ── Stereo constraints ────────────────────────────────────────────────────

/// Signed-volume requirement on a tetrahedral centre. A lone pair is
/// represented by the centre itself in the last slot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ChiralConstraint {
    atoms: [usize; 4],
    /// `1.0` when the volume must be positive (clockwise), `-1.0` otherwise.
    sign: f64,
}

impl ChiralConstraint {
    fn volume(&self, p: &[Vector3<f64>; 4]) -> f64 {
        let (a, b, c) = (p[1] - p[0], p[2] - p[0], p[3] - p[0]);
        self.sign * a.dot(&b.cross(&c))
    }
}

#[derive(Debug, Clone, Default)]
struct StereoConstraints {
    chiral: Vec<ChiralConstraint>,
    /// `[ref, begin, end, ref]` around a double bond and whether the two
    /// references are cis.
    double_bonds: Vec<([usize; 4], bool)>,
}

impl StereoConstraints {
    fn new(mol: &Molecule) -> Self {
        let chiral = (0..mol.atom_count())
            .filter_map(|center| {
                let sign = match mol.atom(center).chirality {
                    Chirality::Clockwise => 1.0,
                    Chirality::CounterClockwise => -1.0,
                    _ => return None,
                };
                let nbrs = mol.tetrahedral_neighbors(center)?;
                let mut atoms = [center; 4];
                for (slot, nbr) in atoms.iter_mut().zip(nbrs) {
                    *slot = nbr.unwrap_or(center);
                }
                Some(ChiralConstraint { atoms, sign })
            })
            .collect();
        let double_bonds = mol
            .bonds()
            .iter()
            .filter_map(|bond| {
                let stereo = bond.stereo?;
                Some((
                    [stereo.begin_ref, bond.begin, bond.end, stereo.end_ref],
                    stereo.cis,
                ))
            })
            .collect();
        Self {
            chiral,
            double_bonds,
        }
    }

    /// Constraints lying entirely inside `atoms`, renumbered to positions
    /// in that slice.
    fn restricted_to(&self, atoms: &[usize]) -> Self {
        let local: HashMap<usize, usize> = atoms.iter().enumerate().map(|(l, &g)| (g, l)).collect();
        let renumber = |quad: &[usize; 4]| -> Option<[usize; 4]> {
            let mapped: Vec<usize> = quad.iter().map(|g| local.get(g).copied()).collect::<Option<_>>()?;
            <[usize; 4]>::try_from(mapped).ok()
        };
        Self {
            chiral: self
                .chiral
                .iter()
                .filter_map(|c| {
                    Some(ChiralConstraint {
                        atoms: renumber(&c.atoms)?,
                        sign: c.sign,
                    })
                })
                .collect(),
            double_bonds: self
                .double_bonds
                .iter()
                .filter_map(|(quad, cis)| Some((renumber(quad)?, *cis)))
                .collect(),
        }
    }

    fn inverted_centres(&self, coords: &[Vector3<f64>]) -> usize {
        self.chiral
            .iter()
            .filter(|c| c.volume(&c.atoms.map(|a| coords[a])) <= 0.0)
            .count()
    }

    fn satisfied(&self, coords: &[Vector3<f64>]) -> bool {
        let geometry_ok = self.double_bonds.iter().all(|(quad, cis)| {
            dihedral(&quad.map(|a| coords[a])).is_some_and(|phi| (phi.abs() < FRAC_PI_2) == *cis)
        });
        geometry_ok && self.inverted_centres(coords) == 0
    }
}

// ── Refinement objective ──────────────────────────────────────────────────

/// Penalty for distances outside their bounds and for chiral centres with
/// the wrong handedness.
struct BoundsError<'a> {
    lower: &'a DMatrix<f64>,
    upper: &'a DMatrix<f64>,
    chiral: &'a [ChiralConstraint],
}

impl Objective for BoundsError<'_> {
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        grad.fill(0.0);
        let n = x.len() / 3;
        let mut error = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                let d = [
                    x[3 * i] - x[3 * j],
                    x[3 * i + 1] - x[3 * j + 1],
                    x[3 * i + 2] - x[3 * j + 2],
                ];
                let d2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
                let u2 = self.upper[(i, j)].powi(2);
                let l2 = self.lower[(i, j)].powi(2);
                let de_dd2 = if d2 > u2 {
                    let t = d2 / u2 - 1.0;
                    error += t * t;
                    2.0 * t / u2
                } else if l2 > 0.0 && d2 < l2 {
                    let t = 2.0 * l2 / (l2 + d2) - 1.0;
                    error += t * t;
                    -4.0 * t * l2 / (l2 + d2).powi(2)
                } else {
                    continue;
                };
                for axis in 0..3 {
                    let g = 2.0 * de_dd2 * d[axis];
                    grad[3 * i + axis] += g;
                    grad[3 * j + axis] -= g;
                }
            }
        }

        for constraint in self.chiral {
            let p = constraint.atoms.map(|a| position(x, a));
            let volume = constraint.volume(&p);
            if volume >= MIN_CHIRAL_VOLUME {
                continue;
            }
            let t = volume - MIN_CHIRAL_VOLUME;
            error += t * t;
            let scale = 2.0 * t * constraint.sign;
            let (a, b, c) = (p[1] - p[0], p[2] - p[0], p[3] - p[0]);
            let g1 = b.cross(&c) * scale;
            let g2 = c.cross(&a) * scale;
            let g3 = a.cross(&b) * scale;
            let g0 = -(g1 + g2 + g3);
            for (&atom, g) in constraint.atoms.iter().zip([g0, g1, g2, g3]) {
                for axis in 0..3 {
                    grad[3 * atom + axis] += g[axis];
                }
            }
        }
        error
    }
}

// ── Embedding ─────────────────────────────────────────────────────────────

/// Coordinates from a metric matrix built on randomly chosen distances.
fn random_coordinates(
    lower: &DMatrix<f64>,
    upper: &DMatrix<f64>,
    rng: &mut StdRng,
) -> Option<Vec<Vector3<f64>>> {
    let n = lower.nrows();
    let mut dist2 = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i + 1..n {
            let (l, u) = (lower[(i, j)], upper[(i, j)]);
            let d = l + (u - l) * rng.gen::<f64>();
            dist2[(i, j)] = d * d;
            dist2[(j, i)] = d * d;
        }
    }

    let nf = n as f64;
    let total: f64 = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| dist2[(i, j)])
        .sum();
    let to_centroid: Vec<f64> = (0..n)
        .map(|i| dist2.row(i).sum() / nf - total / (nf * nf))
        .collect();
    let metric = DMatrix::from_fn(n, n, |i, j| {
        0.5 * (to_centroid[i] + to_centroid[j] - dist2[(i, j)])
    });

    let eigen = metric.symmetric_eigen();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    if eigen.eigenvalues[order[0]] <= 0.0 {
        return None;
    }

    let mut coords = vec![Vector3::zeros(); n];
    for (axis, &col) in order.iter().take(3).enumerate() {
        let scale = eigen.eigenvalues[col].max(0.0).sqrt();
        for (i, p) in coords.iter_mut().enumerate() {
            p[axis] = scale * eigen.eigenvectors[(i, col)];
        }
    }
    for p in &mut coords {
        for axis in 0..3 {
            p[axis] += JITTER * (rng.gen::<f64>() - 0.5);
        }
    }
    Some(coords)
}

fn bonds_are_sane(mol: &Molecule, types: &[AtomType], atoms: &[usize], coords: &[Vector3<f64>]) -> bool {
    if coords.iter().any(|p| !p.iter().all(|v| v.is_finite())) {
        return false;
    }
    for (a, &ga) in atoms.iter().enumerate() {
        for (b, &gb) in atoms.iter().enumerate().skip(a + 1) {
            if let Some(rest) = bond_rest(mol, types, ga, gb) {
                if ((coords[a] - coords[b]).norm() - rest).abs() > MAX_BOND_DEVIATION {
                    return false;
                }
            }
        }
    }
    true
}

/// Everything [`embed_once`] needs about one molecule.
struct EmbedSetup<'m> {
    mol: &'m Molecule,
    types: Vec<AtomType>,
    bounds: Bounds,
    stereo: StereoConstraints,
}

fn embed_fragment(
    setup: &EmbedSetup<'_>,
    atoms: &[usize],
    rng: &mut StdRng,
    max_iterations: u32,
) -> Option<Vec<Vector3<f64>>> {
    if atoms.len() == 1 {
        return Some(vec![Vector3::zeros()]);
    }
    let m = atoms.len();
    let bounds = &setup.bounds;
    let mut lower = DMatrix::from_fn(m, m, |a, b| bounds.lower(atoms[a], atoms[b]));
    let mut upper = DMatrix::from_fn(m, m, |a, b| bounds.upper(atoms[a], atoms[b]));
    smooth_bounds(&mut lower, &mut upper);
    let stereo = setup.stereo.restricted_to(atoms);

    let mut coords = random_coordinates(&lower, &upper, rng)?;
    // The metric matrix fixes geometry only up to a mirror image.
    if 2 * stereo.inverted_centres(&coords) > stereo.chiral.len() {
        for p in &mut coords {
            p.x = -p.x;
        }
    }
    let mut x = flatten(&coords);
    let objective = BoundsError {
        lower: &lower,
        upper: &upper,
        chiral: &stereo.chiral,
    };
    let options = MinimizeOptions {
        max_iterations,
        gradient_tolerance: 1e-4,
        energy_tolerance: 1e-10,
        max_step: 0.5,
    };
    let report = minimize(&objective, &mut x, &options);
    let coords = unflatten(&x);
    debug!(
        atoms = m,
        error = report.value,
        iterations = report.iterations,
        "bounds refinement finished"
    );
    if !stereo.satisfied(&coords) {
        debug!(atoms = m, "refined geometry has the wrong stereo");
        return None;
    }
    bonds_are_sane(setup.mol, &setup.types, atoms, &coords).then_some(coords)
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p);
    sum / points.len().max(1) as f64
}

fn embed_once(setup: &EmbedSetup<'_>, rng: &mut StdRng, max_iterations: u32) -> Option<Vec<Vector3<f64>>> {
    let mut positions = vec![Vector3::zeros(); setup.mol.atom_count()];
    let mut cursor: Option<f64> = None;
    for atoms in setup.mol.fragments() {
        let mut coords = embed_fragment(setup, &atoms, rng, max_iterations)?;
        let center = centroid(&coords);
        for p in &mut coords {
            *p -= center;
        }
        // Lay disconnected fragments side by side along x.
        let min_x = coords.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = coords.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let shift = match cursor {
            Some(edge) => edge + FRAGMENT_GAP - min_x,
            None => 0.0,
        };
        cursor = Some(max_x + shift);
        for (&atom, p) in atoms.iter().zip(&coords) {
            positions[atom] = Vector3::new(p.x + shift, p.y, p.z);
        }
    }
    Some(positions)
}

/// Generates 3-D coordinates for every atom of `mol`, which should carry
/// explicit hydrogens. Returns `None` when no attempt produced a usable
/// geometry.
pub fn embed(mol: &Molecule, options: &EmbedOptions) -> Option<Vec<Vector3<f64>>> {
    if mol.atom_count() == 0 {
        return Some(Vec::new());
    }
    let types = assign_types(mol);
    let bounds = distance_bounds(mol, &types);
    let setup = EmbedSetup {
        mol,
        types,
        bounds,
        stereo: StereoConstraints::new(mol),
    };
    let mut rng = match options.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for attempt in 1..=options.max_attempts {
        if let Some(positions) = embed_once(&setup, &mut rng, options.max_iterations) {
            debug!(attempt, atoms = mol.atom_count(), "embedding succeeded");
            return Some(positions);
        }
        debug!(attempt, "embedding attempt rejected");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrogens::add_hydrogens;

    fn explicit(smiles: &str) -> Molecule {
        add_hydrogens(&Molecule::from_smiles(smiles).unwrap())
    }

    fn seeded(seed: u64) -> EmbedOptions {
        EmbedOptions {
            random_seed: Some(seed),
            ..EmbedOptions::default()
        }
    }

    #[test]
    fn test_smoothing_tightens_upper_bounds() {
        let mut lower = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let mut upper =
            DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 100.0, 1.0, 0.0, 1.0, 100.0, 1.0, 0.0]);
        smooth_bounds(&mut lower, &mut upper);
        assert_eq!(upper[(0, 2)], 2.0);
        assert_eq!(upper[(2, 0)], 2.0);
        assert_eq!(lower[(0, 2)], 0.0);
    }

    #[test]
    fn test_smoothing_resolves_inverted_bounds() {
        let mut lower = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 5.0, 1.0, 0.0, 1.0, 5.0, 1.0, 0.0]);
        let mut upper =
            DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 100.0, 1.0, 0.0, 1.0, 100.0, 1.0, 0.0]);
        smooth_bounds(&mut lower, &mut upper);
        assert!(lower[(0, 2)] <= upper[(0, 2)]);
    }

    #[test]
    fn test_bonded_bounds_are_not_overwritten() {
        let mol = explicit("C1CC1");
        let types = assign_types(&mol);
        let bounds = distance_bounds(&mol, &types);
        // Ring atoms 0 and 2 are bonded and also 1-3 through atom 1.
        let rest = bond_rest(&mol, &types, 0, 2).unwrap();
        assert!((bounds.upper(0, 2) - (rest + BOND_TOLERANCE)).abs() < 1e-12);
    }

    #[test]
    fn test_single_atom_sits_at_origin() {
        let mol = Molecule::from_smiles("[Na+]").unwrap();
        let positions = embed(&mol, &seeded(1)).unwrap();
        assert_eq!(positions, vec![Vector3::zeros()]);
    }

    #[test]
    fn test_ethanol_bond_lengths() {
        let mol = explicit("CCO");
        let types = assign_types(&mol);
        let positions = embed(&mol, &seeded(7)).unwrap();
        assert_eq!(positions.len(), 9);
        for bond in mol.bonds() {
            let rest = bond_rest(&mol, &types, bond.begin, bond.end).unwrap();
            let d = (positions[bond.begin] - positions[bond.end]).norm();
            assert!((d - rest).abs() < MAX_BOND_DEVIATION, "{d} vs {rest}");
        }
    }

    #[test]
    fn test_same_seed_same_coordinates() {
        let mol = explicit("c1ccccc1O");
        let a = embed(&mol, &seeded(42)).unwrap();
        let b = embed(&mol, &seeded(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fragments_do_not_overlap() {
        let mol = explicit("CC.O");
        let positions = embed(&mol, &seeded(3)).unwrap();
        let fragments = mol.fragments();
        for &a in &fragments[0] {
            for &b in &fragments[1] {
                assert!((positions[a] - positions[b]).norm() > 1.0);
            }
        }
    }

    fn signed_volume(positions: &[Vector3<f64>], atoms: [usize; 4]) -> f64 {
        let p = atoms.map(|a| positions[a]);
        (p[1] - p[0]).dot(&(p[2] - p[0]).cross(&(p[3] - p[0])))
    }

    #[test]
    fn test_chiral_penalty_gradient_matches_finite_difference() {
        let lower = DMatrix::zeros(4, 4);
        let upper = DMatrix::from_element(4, 4, FAR_AWAY);
        let chiral = [ChiralConstraint {
            atoms: [0, 1, 2, 3],
            sign: 1.0,
        }];
        let objective = BoundsError {
            lower: &lower,
            upper: &upper,
            chiral: &chiral,
        };
        // A flattened, slightly inverted centre.
        let x = [0.0, 0.0, 0.1, 1.0, 0.0, -0.2, -0.5, 0.8, 0.0, -0.5, -0.8, 0.3];
        let mut grad = [0.0; 12];
        objective.evaluate(&x, &mut grad);
        let h = 1e-6;
        for k in 0..12 {
            let (mut plus, mut minus) = (x, x);
            plus[k] += h;
            minus[k] -= h;
            let mut scratch = [0.0; 12];
            let numeric =
                (objective.evaluate(&plus, &mut scratch) - objective.evaluate(&minus, &mut scratch)) / (2.0 * h);
            assert!((numeric - grad[k]).abs() < 1e-5, "coordinate {k}: {numeric} vs {}", grad[k]);
        }
    }

    #[test]
    fn test_enantiomers_embed_with_opposite_handedness() {
        for (smiles, sign) in [("N[C@@H](C)C(=O)O", 1.0), ("N[C@H](C)C(=O)O", -1.0)] {
            let mol = explicit(smiles);
            let stored = mol.tetrahedral_neighbors(1).unwrap();
            let atoms = [stored[0], stored[1], stored[2], stored[3]].map(|a| a.unwrap());
            let positions = embed(&mol, &seeded(11)).unwrap();
            let volume = signed_volume(&positions, atoms);
            assert!(volume * sign > 0.0, "{smiles}: volume {volume}");
        }
    }

    #[test]
    fn test_double_bond_geometry_is_respected() {
        for (smiles, cis) in [("F/C=C/F", false), ("F/C=C\\F", true)] {
            let mol = explicit(smiles);
            let positions = embed(&mol, &seeded(5)).unwrap();
            let phi = dihedral(&[positions[0], positions[1], positions[2], positions[3]]).unwrap();
            assert_eq!(phi.abs() < FRAC_PI_2, cis, "{smiles}: dihedral {phi}");
        }
    }
}
