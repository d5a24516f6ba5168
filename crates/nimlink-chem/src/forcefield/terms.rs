//! Energy terms. Each term adds its gradient into a flat `[x0, y0, z0, x1, ...]`
//! buffer and returns its energy in kcal/mol.

use std::f64::consts::PI;

use nalgebra::Vector3;

pub(crate) fn position(x: &[f64], atom: usize) -> Vector3<f64> {
    Vector3::new(x[3 * atom], x[3 * atom + 1], x[3 * atom + 2])
}

fn accumulate(grad: &mut [f64], atom: usize, g: &Vector3<f64>) {
    grad[3 * atom] += g.x;
    grad[3 * atom + 1] += g.y;
    grad[3 * atom + 2] += g.z;
}

const FD_STEP: f64 = 1e-5;

/// Central-difference gradient for terms whose analytic derivative is not
/// worth the bookkeeping.
fn numeric_gradient<const N: usize>(
    atoms: [usize; N],
    x: &[f64],
    grad: &mut [f64],
    energy: impl Fn(&[Vector3<f64>; N]) -> f64,
) -> f64 {
    let mut points = atoms.map(|a| position(x, a));
    let value = energy(&points);
    for (slot, &atom) in atoms.iter().enumerate() {
        for axis in 0..3 {
            let original = points[slot][axis];
            points[slot][axis] = original + FD_STEP;
            let plus = energy(&points);
            points[slot][axis] = original - FD_STEP;
            let minus = energy(&points);
            points[slot][axis] = original;
            grad[3 * atom + axis] += (plus - minus) / (2.0 * FD_STEP);
        }
    }
    value
}

// ── Bond stretch ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondStretch {
    pub i: usize,
    pub j: usize,
    /// Natural length (Å).
    pub rest: f64,
    /// Force constant (kcal/mol/Å²).
    pub k: f64,
}

impl BondStretch {
    pub fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        let d = position(x, self.i) - position(x, self.j);
        let r = d.norm().max(1e-8);
        let stretch = r - self.rest;
        let g = d * (self.k * stretch / r);
        accumulate(grad, self.i, &g);
        accumulate(grad, self.j, &(-g));
        0.5 * self.k * stretch * stretch
    }
}

// ── Angle bend ────────────────────────────────────────────────────────────

/// UFF cosine-Fourier angle term centred on `j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleBend {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub force: f64,
    linear: bool,
    c0: f64,
    c1: f64,
    c2: f64,
}

impl AngleBend {
    /// `theta0` in radians.
    pub fn new(i: usize, j: usize, k: usize, theta0: f64, force: f64) -> Self {
        let linear = (theta0 - PI).abs() < 1e-3;
        let (sin0, cos0) = theta0.sin_cos();
        let c2 = if linear { 0.0 } else { 1.0 / (4.0 * sin0 * sin0) };
        Self {
            i,
            j,
            k,
            force,
            linear,
            c0: c2 * (2.0 * cos0 * cos0 + 1.0),
            c1: -4.0 * c2 * cos0,
            c2,
        }
    }

    /// UFF angle force constant for an `i-j-k` angle with natural bond
    /// lengths `r_ij`, `r_jk` and effective charges `z_i`, `z_k`.
    pub fn force_constant(z_i: f64, z_k: f64, r_ij: f64, r_jk: f64, theta0: f64) -> f64 {
        let cos0 = theta0.cos();
        let r_ik2 = r_ij * r_ij + r_jk * r_jk - 2.0 * r_ij * r_jk * cos0;
        let r_ik = r_ik2.sqrt();
        664.12 * z_i * z_k / r_ik.powi(5) * (3.0 * r_ij * r_jk * (1.0 - cos0 * cos0) - r_ik2 * cos0)
    }

    pub fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        let u = position(x, self.i) - position(x, self.j);
        let v = position(x, self.k) - position(x, self.j);
        let (nu, nv) = (u.norm().max(1e-8), v.norm().max(1e-8));
        let cos = (u.dot(&v) / (nu * nv)).clamp(-1.0, 1.0);

        let (energy, de_dcos) = if self.linear {
            (self.force * (1.0 + cos), self.force)
        } else {
            let cos2 = 2.0 * cos * cos - 1.0;
            (
                self.force * (self.c0 + self.c1 * cos + self.c2 * cos2),
                self.force * (self.c1 + 4.0 * self.c2 * cos),
            )
        };

        let gi = (v / (nu * nv) - u * (cos / (nu * nu))) * de_dcos;
        let gk = (u / (nu * nv) - v * (cos / (nv * nv))) * de_dcos;
        accumulate(grad, self.i, &gi);
        accumulate(grad, self.k, &gk);
        accumulate(grad, self.j, &(-(gi + gk)));
        energy
    }
}

// ── Torsion ───────────────────────────────────────────────────────────────

/// Dihedral angle `i-j-k-l` in radians, or `None` when three of the atoms
/// are collinear.
pub fn dihedral(p: &[Vector3<f64>; 4]) -> Option<f64> {
    let b1 = p[1] - p[0];
    let b2 = p[2] - p[1];
    let b3 = p[3] - p[2];
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm() < 1e-8 || n2.norm() < 1e-8 {
        return None;
    }
    let m = n1.cross(&b2.normalize());
    Some((m.dot(&n2)).atan2(n1.dot(&n2)))
}

/// E = V/2 [1 - cos(n φ0) cos(n φ)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torsion {
    pub atoms: [usize; 4],
    pub barrier: f64,
    pub periodicity: f64,
    pub cos_n_phi0: f64,
}

impl Torsion {
    fn energy_at(&self, p: &[Vector3<f64>; 4]) -> f64 {
        let cos_n_phi = dihedral(p).map_or(1.0, |phi| (self.periodicity * phi).cos());
        0.5 * self.barrier * (1.0 - self.cos_n_phi0 * cos_n_phi)
    }

    pub fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        numeric_gradient(self.atoms, x, grad, |p| self.energy_at(p))
    }
}

// ── Inversion ─────────────────────────────────────────────────────────────

/// Out-of-plane term for a trigonal centre, summed over the three choices
/// of axis neighbour: E = K (1 - cos ω).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inversion {
    pub center: usize,
    pub neighbors: [usize; 3],
    /// Per-axis constant (already divided by three).
    pub k: f64,
}

impl Inversion {
    fn energy_at(&self, p: &[Vector3<f64>; 4]) -> f64 {
        let center = p[0];
        let mut energy = 0.0;
        for axis in 1..4 {
            let (a, b) = match axis {
                1 => (p[2], p[3]),
                2 => (p[1], p[3]),
                _ => (p[1], p[2]),
            };
            let normal = (a - center).cross(&(b - center));
            let bond = p[axis] - center;
            let (nn, nb) = (normal.norm(), bond.norm());
            if nn < 1e-8 || nb < 1e-8 {
                continue;
            }
            let sin_omega = (normal.dot(&bond) / (nn * nb)).clamp(-1.0, 1.0);
            let cos_omega = (1.0 - sin_omega * sin_omega).max(0.0).sqrt();
            energy += self.k * (1.0 - cos_omega);
        }
        energy
    }

    pub fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        let [a, b, c] = self.neighbors;
        numeric_gradient([self.center, a, b, c], x, grad, |p| self.energy_at(p))
    }
}

// ── Van der Waals ─────────────────────────────────────────────────────────

/// Lennard-Jones 12-6: E = D [(x/r)^12 - 2 (x/r)^6]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VanDerWaals {
    pub i: usize,
    pub j: usize,
    pub distance: f64,
    pub well: f64,
}

impl VanDerWaals {
    pub fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
        let d = position(x, self.i) - position(x, self.j);
        let r2 = d.norm_squared().max(0.25);
        let r = r2.sqrt();
        let s6 = (self.distance * self.distance / r2).powi(3);
        let de_dr = 12.0 * self.well / r * (s6 - s6 * s6);
        let g = d * (de_dr / r);
        accumulate(grad, self.i, &g);
        accumulate(grad, self.j, &(-g));
        self.well * (s6 * s6 - 2.0 * s6)
    }
}
