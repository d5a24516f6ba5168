//! Canonical SMILES.
//!
//! Atoms are ranked by iterative refinement of graph invariants, then
//! written by a depth-first walk that always visits the lowest-ranked
//! neighbour first. Two sanitized molecules with the same constitution and
//! configuration produce the same string regardless of input atom order or
//! Kekulé/aromatic spelling.
//!
//! Refinement leaves symmetric atoms tied. Without stereo every way of
//! breaking a tie writes the same string. Written stereo marks depend on
//! the choice, so for stereo molecules up to [`TIE_BREAK_BUDGET`] further
//! tie-breaks are written and the smallest string wins.

use std::collections::BTreeSet;

use crate::molecule::{is_odd_permutation, Bond, BondOrder, Chirality, Molecule};

/// Tie-break alternatives tried beyond the first when stereo is written.
const TIE_BREAK_BUDGET: usize = 64;

impl Molecule {
    pub fn to_canonical_smiles(&self) -> String {
        canonical_smiles(self)
    }
}

pub fn canonical_smiles(mol: &Molecule) -> String {
    if mol.atom_count() == 0 {
        return String::new();
    }
    let classes = symmetry_classes(mol);
    let plan = StereoPlan::new(mol, &classes);
    let mut budget = if plan.is_empty() { 0 } else { TIE_BREAK_BUDGET };
    let mut rankings = Vec::new();
    complete_ranking(mol, classes, &mut budget, &mut rankings);
    rankings
        .iter()
        .map(|ranks| SmilesWriter::new(mol, ranks, &plan).write())
        .min()
        .unwrap_or_default()
}

// ── Ranking ───────────────────────────────────────────────────────────────

fn bond_code(bond: &Bond) -> u8 {
    if bond.aromatic {
        return 5;
    }
    match bond.order {
        BondOrder::Aromatic => 5,
        other => other.valence(),
    }
}

/// Dense ranks (0, 1, 2, ...) of `keys`; equal keys share a rank.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
    let mut ranks = vec![0; keys.len()];
    let mut current = 0;
    for (pos, &idx) in order.iter().enumerate() {
        if pos > 0 && keys[order[pos - 1]] != keys[idx] {
            current += 1;
        }
        ranks[idx] = current;
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().collect::<BTreeSet<_>>().len()
}

fn refine(mol: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let keys: Vec<(usize, Vec<(usize, u8)>)> = (0..mol.atom_count())
            .map(|idx| {
                let mut env: Vec<(usize, u8)> = mol
                    .neighbors(idx)
                    .iter()
                    .map(|(nbr, bond)| (ranks[*nbr], bond_code(mol.bond(*bond))))
                    .collect();
                env.sort_unstable();
                (ranks[idx], env)
            })
            .collect();
        let refined = dense_ranks(&keys);
        if class_count(&refined) == class_count(&ranks) {
            return refined;
        }
        ranks = refined;
    }
}

/// Refined invariant classes before any tie is broken. Atoms in one class
/// are interchangeable as far as the ranking can tell.
fn symmetry_classes(mol: &Molecule) -> Vec<usize> {
    let invariants: Vec<_> = (0..mol.atom_count())
        .map(|idx| {
            let atom = mol.atom(idx);
            (
                mol.degree(idx),
                atom.element.atomic_number(),
                atom.hydrogens,
                atom.charge,
                atom.isotope.unwrap_or(0),
                atom.aromatic,
                mol.is_ring_atom(idx),
                atom.atom_class,
            )
        })
        .collect();
    refine(mol, dense_ranks(&invariants))
}

/// Breaks the lowest tie in `ranks` by promoting one member, refines, and
/// recurses until every atom has its own rank. Each complete ranking is
/// pushed to `out`. The first member of a tied class is always tried; every
/// further member costs one unit of `budget`.
fn complete_ranking(mol: &Molecule, ranks: Vec<usize>, budget: &mut usize, out: &mut Vec<Vec<usize>>) {
    let n = ranks.len();
    let mut counts = vec![0usize; n];
    for &r in &ranks {
        counts[r] += 1;
    }
    let Some(tied) = (0..n).find(|r| counts[*r] > 1) else {
        out.push(ranks);
        return;
    };
    let members: Vec<usize> = (0..n).filter(|idx| ranks[*idx] == tied).collect();
    for (i, &chosen) in members.iter().enumerate() {
        if i > 0 {
            if *budget == 0 {
                break;
            }
            *budget -= 1;
        }
        let keys: Vec<(usize, bool)> = (0..n).map(|idx| (ranks[idx], idx != chosen)).collect();
        complete_ranking(mol, refine(mol, dense_ranks(&keys)), budget, out);
    }
}

/// Canonical rank of every atom: a permutation of `0..atom_count`.
pub fn canonical_ranks(mol: &Molecule) -> Vec<usize> {
    let mut budget = 0;
    let mut rankings = Vec::new();
    complete_ranking(mol, symmetry_classes(mol), &mut budget, &mut rankings);
    rankings.pop().unwrap_or_default()
}

// ── Stereo ────────────────────────────────────────────────────────────────

/// Which stereo elements survive into the canonical string. Tags that
/// cannot distinguish anything (two equivalent neighbours, two equivalent
/// substituents on a double-bond end) are dropped.
struct StereoPlan {
    centers: Vec<bool>,
    double_bonds: Vec<bool>,
}

impl StereoPlan {
    fn new(mol: &Molecule, classes: &[usize]) -> Self {
        let n = mol.atom_count();
        let mut centers = vec![false; n];
        // Ring atoms whose only equivalent neighbours are the two ring paths.
        let mut ring_relative = vec![false; n];
        for atom in 0..n {
            if !mol.atom(atom).chirality.is_tetrahedral() {
                continue;
            }
            let Some(nbrs) = mol.tetrahedral_neighbors(atom) else {
                continue;
            };
            let graph_nbrs: Vec<usize> = nbrs.iter().flatten().copied().collect();
            let mut keys: Vec<usize> = graph_nbrs.iter().map(|nbr| classes[*nbr]).collect();
            keys.sort_unstable();
            keys.dedup();
            match graph_nbrs.len() - keys.len() {
                0 => centers[atom] = true,
                1 => ring_relative[atom] = equivalent_pair_is_in_ring(mol, classes, atom, &graph_nbrs),
                _ => {}
            }
        }

        // A ring-relative tag only means something next to another kept tag
        // in the same ring (cis/trans ring substitution).
        loop {
            let kept: Vec<usize> = (0..n).filter(|a| centers[*a] || ring_relative[*a]).collect();
            let mut changed = false;
            for &atom in &kept {
                if !ring_relative[atom] {
                    continue;
                }
                let partnered = kept.iter().any(|&other| {
                    other != atom
                        && (centers[other] || ring_relative[other])
                        && mol
                            .rings()
                            .iter()
                            .any(|ring| ring.contains(&atom) && ring.contains(&other))
                });
                if !partnered {
                    ring_relative[atom] = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        for (center, relative) in centers.iter_mut().zip(ring_relative) {
            *center |= relative;
        }

        let double_bonds = mol
            .bonds()
            .iter()
            .map(|bond| {
                bond.stereo.is_some()
                    && distinct_substituents(mol, classes, bond.begin, bond.end)
                    && distinct_substituents(mol, classes, bond.end, bond.begin)
            })
            .collect();

        Self {
            centers,
            double_bonds,
        }
    }

    fn is_empty(&self) -> bool {
        !self.centers.iter().chain(&self.double_bonds).any(|kept| *kept)
    }
}

/// Whether the two equivalent neighbours of `atom` are both joined to it by
/// ring bonds.
fn equivalent_pair_is_in_ring(mol: &Molecule, classes: &[usize], atom: usize, nbrs: &[usize]) -> bool {
    let in_ring = |nbr: usize| mol.bond_between(atom, nbr).is_some_and(|b| mol.is_ring_bond(b));
    nbrs.iter().enumerate().any(|(i, &x)| {
        nbrs[i + 1..]
            .iter()
            .any(|&y| classes[x] == classes[y] && in_ring(x) && in_ring(y))
    })
}

fn distinct_substituents(mol: &Molecule, classes: &[usize], atom: usize, partner: usize) -> bool {
    let subs: Vec<usize> = mol
        .neighbors(atom)
        .iter()
        .map(|(nbr, _)| *nbr)
        .filter(|nbr| *nbr != partner)
        .collect();
    match subs.as_slice() {
        [_] => true,
        [a, b] => classes[*a] != classes[*b] && mol.atom(atom).hydrogens == 0,
        _ => false,
    }
}

// ── Writing ───────────────────────────────────────────────────────────────

/// Hydrogen count a reader would infer for the bare (unbracketed) spelling
/// of `idx`, or `None` if the bare spelling would be read differently.
fn implied_hydrogens(mol: &Molecule, idx: usize) -> Option<u8> {
    let atom = mol.atom(idx);
    let lowest = u32::from(*atom.element.default_valences().first()?);

    let mut valence = 0u32;
    let mut has_multiple = false;
    let mut has_pi = false;
    for &(_, bond) in mol.neighbors(idx) {
        let bond = mol.bond(bond);
        if bond.aromatic {
            valence += 1;
            has_pi |= bond.order == BondOrder::Double;
        } else {
            valence += u32::from(bond.order.valence());
            has_multiple |= bond.order != BondOrder::Single;
        }
    }
    if atom.aromatic {
        let needs_pi = !has_multiple && valence < lowest;
        if needs_pi != has_pi {
            return None;
        }
        if needs_pi {
            valence += 1;
        }
    }
    atom.element
        .default_valences()
        .iter()
        .map(|v| u32::from(*v))
        .find(|v| *v >= valence)
        .and_then(|v| u8::try_from(v - valence).ok())
}

fn writes_bare(mol: &Molecule, idx: usize) -> bool {
    let atom = mol.atom(idx);
    if !atom.element.is_organic_subset()
        || atom.charge != 0
        || atom.isotope.is_some()
        || atom.atom_class.is_some()
    {
        return false;
    }
    if atom.aromatic && !atom.element.can_be_aromatic() {
        return false;
    }
    implied_hydrogens(mol, idx) == Some(atom.hydrogens)
}

fn atom_token(mol: &Molecule, idx: usize, chirality: Chirality) -> String {
    let atom = mol.atom(idx);
    let symbol = if atom.aromatic {
        atom.element.symbol().to_ascii_lowercase()
    } else {
        atom.element.symbol().to_string()
    };
    if chirality == Chirality::None && writes_bare(mol, idx) {
        return symbol;
    }

    let mut token = String::from("[");
    if let Some(isotope) = atom.isotope {
        token.push_str(&isotope.to_string());
    }
    token.push_str(&symbol);
    match chirality {
        Chirality::CounterClockwise => token.push('@'),
        Chirality::Clockwise => token.push_str("@@"),
        _ => {}
    }
    match atom.hydrogens {
        0 => {}
        1 => token.push('H'),
        n => token.push_str(&format!("H{n}")),
    }
    match atom.charge {
        0 => {}
        1 => token.push('+'),
        -1 => token.push('-'),
        c if c > 0 => token.push_str(&format!("+{c}")),
        c => token.push_str(&format!("-{}", -i16::from(c))),
    }
    if let Some(class) = atom.atom_class {
        token.push_str(&format!(":{class}"));
    }
    token.push(']');
    token
}

fn ring_label(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{digit:02}")
    }
}

struct SmilesWriter<'m> {
    mol: &'m Molecule,
    ranks: &'m [usize],
    plan: &'m StereoPlan,
    visited: Vec<bool>,
    used_bond: Vec<bool>,
    parent: Vec<Option<usize>>,
    /// Per bond: the atom written before the bond symbol.
    left: Vec<Option<usize>>,
    /// Per bond: `Some(true)` for `/`, `Some(false)` for `\`.
    marks: Vec<Option<bool>>,
    children: Vec<Vec<(usize, usize)>>,
    ring_opens: Vec<Vec<usize>>,
    ring_closes: Vec<Vec<usize>>,
    ring_digit: Vec<usize>,
    free_digits: BTreeSet<usize>,
}

impl<'m> SmilesWriter<'m> {
    fn new(mol: &'m Molecule, ranks: &'m [usize], plan: &'m StereoPlan) -> Self {
        let n = mol.atom_count();
        Self {
            mol,
            ranks,
            plan,
            visited: vec![false; n],
            used_bond: vec![false; mol.bond_count()],
            parent: vec![None; n],
            left: vec![None; mol.bond_count()],
            marks: vec![None; mol.bond_count()],
            children: vec![Vec::new(); n],
            ring_opens: vec![Vec::new(); n],
            ring_closes: vec![Vec::new(); n],
            ring_digit: vec![0; mol.bond_count()],
            free_digits: (1..100).collect(),
        }
    }

    fn write(mut self) -> String {
        let mut roots = Vec::new();
        loop {
            let next = (0..self.mol.atom_count())
                .filter(|idx| !self.visited[*idx])
                .min_by_key(|idx| self.ranks[*idx]);
            let Some(start) = next else {
                break;
            };
            self.build_tree(start, None);
            roots.push(start);
        }
        self.assign_marks();

        let mut out = String::new();
        for (i, root) in roots.into_iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            self.emit(root, &mut out);
        }
        out
    }

    fn sorted_neighbors(&self, atom: usize) -> Vec<(usize, usize)> {
        let mut nbrs = self.mol.neighbors(atom).to_vec();
        nbrs.sort_by_key(|(nbr, _)| self.ranks[*nbr]);
        nbrs
    }

    /// First pass: spanning tree plus ring-closure bonds.
    fn build_tree(&mut self, atom: usize, parent_bond: Option<usize>) {
        self.visited[atom] = true;
        for (nbr, bond) in self.sorted_neighbors(atom) {
            if Some(bond) == parent_bond || self.used_bond[bond] {
                continue;
            }
            self.used_bond[bond] = true;
            if self.visited[nbr] {
                // The digit (and any mark) is written first at `nbr`.
                self.left[bond] = Some(nbr);
                self.ring_opens[nbr].push(bond);
                self.ring_closes[atom].push(bond);
            } else {
                self.left[bond] = Some(atom);
                self.parent[nbr] = Some(atom);
                self.children[atom].push((nbr, bond));
                self.build_tree(nbr, Some(bond));
            }
        }
    }

    // ── Double-bond marks ──

    fn assign_marks(&mut self) {
        let mut bonds: Vec<usize> = (0..self.mol.bond_count())
            .filter(|b| self.plan.double_bonds[*b])
            .collect();
        bonds.sort_by_key(|b| {
            let bond = self.mol.bond(*b);
            let (x, y) = (self.ranks[bond.begin], self.ranks[bond.end]);
            (x.min(y), x.max(y))
        });
        for bond in bonds {
            self.mark_double_bond(bond);
        }
    }

    /// Side of `substituent` given the mark `up` on the bond joining it to
    /// its double-bond atom.
    fn side(&self, substituent: usize, bond: usize, up: bool) -> bool {
        up ^ (self.left[bond] == Some(substituent))
    }

    /// Substituent of `atom` whose bond will carry the mark: one already
    /// marked if possible, otherwise the lowest ranked.
    fn markable(&self, atom: usize, partner: usize) -> Option<(usize, usize)> {
        let candidates: Vec<(usize, usize)> = self
            .mol
            .neighbors(atom)
            .iter()
            .copied()
            .filter(|(nbr, bond)| {
                let b = self.mol.bond(*bond);
                *nbr != partner && b.order == BondOrder::Single && !b.aromatic
            })
            .collect();
        candidates
            .iter()
            .find(|(_, bond)| self.marks[*bond].is_some())
            .or_else(|| candidates.iter().min_by_key(|(nbr, _)| self.ranks[*nbr]))
            .copied()
    }

    /// Whether the marked substituents at every double bond of `atom` sit
    /// on opposite sides.
    fn marks_agree_at(&self, atom: usize) -> bool {
        self.mol.neighbors(atom).iter().all(|&(partner, double)| {
            let bond = self.mol.bond(double);
            if bond.order != BondOrder::Double || bond.aromatic {
                return true;
            }
            let sides: Vec<bool> = self
                .mol
                .neighbors(atom)
                .iter()
                .filter(|(nbr, _)| *nbr != partner)
                .filter_map(|&(nbr, b)| self.marks[b].map(|up| self.side(nbr, b, up)))
                .collect();
            !matches!(sides.as_slice(), [x, y] if x == y)
        })
    }

    fn mark_double_bond(&mut self, double: usize) {
        let bond = self.mol.bond(double);
        let Some(stereo) = bond.stereo else {
            return;
        };
        let (Some((xa, ba)), Some((xb, bb))) = (
            self.markable(bond.begin, bond.end),
            self.markable(bond.end, bond.begin),
        ) else {
            return;
        };
        let cis = stereo.cis ^ (xa != stereo.begin_ref) ^ (xb != stereo.end_ref);
        let other_side = |side: bool| if cis { side } else { !side };

        let fixed_a = self.marks[ba].map(|up| self.side(xa, ba, up));
        let fixed_b = self.marks[bb].map(|up| self.side(xb, bb, up));
        let (side_a, side_b) = match (fixed_a, fixed_b) {
            (Some(a), Some(b)) => {
                if other_side(a) != b {
                    return;
                }
                (a, b)
            }
            (Some(a), None) => (a, other_side(a)),
            (None, Some(b)) => (other_side(b), b),
            (None, None) => (true, other_side(true)),
        };

        let previous = (self.marks[ba], self.marks[bb]);
        self.marks[ba] = Some(side_a ^ (self.left[ba] == Some(xa)));
        self.marks[bb] = Some(side_b ^ (self.left[bb] == Some(xb)));
        if ![bond.begin, bond.end, xa, xb].into_iter().all(|atom| self.marks_agree_at(atom)) {
            self.marks[ba] = previous.0;
            self.marks[bb] = previous.1;
        }
    }

    fn bond_token(&self, bond: usize) -> &'static str {
        if let Some(up) = self.marks[bond] {
            return if up { "/" } else { "\\" };
        }
        let bond = self.mol.bond(bond);
        if bond.aromatic {
            return "";
        }
        match bond.order {
            BondOrder::Single => {
                if self.mol.atom(bond.begin).aromatic && self.mol.atom(bond.end).aromatic {
                    "-"
                } else {
                    ""
                }
            }
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Quadruple => "$",
            BondOrder::Aromatic => ":",
        }
    }

    // ── Emission ──

    /// Tetrahedral tag for `atom` relative to the order its neighbours are
    /// written in.
    fn written_chirality(
        &self,
        atom: usize,
        closes: &[usize],
        opens: &[usize],
        children: &[(usize, usize)],
    ) -> Chirality {
        if !self.plan.centers[atom] {
            return Chirality::None;
        }
        let Some(stored) = self.mol.tetrahedral_neighbors(atom) else {
            return Chirality::None;
        };
        let mut written: Vec<Option<usize>> = Vec::with_capacity(4);
        written.extend(self.parent[atom].map(Some));
        if stored.contains(&None) {
            written.push(None);
        }
        for &bond in closes.iter().chain(opens) {
            written.push(Some(self.mol.bond(bond).other(atom)));
        }
        written.extend(children.iter().map(|(child, _)| Some(*child)));
        self.mol
            .atom(atom)
            .chirality
            .permuted(is_odd_permutation(&written, &stored))
    }

    /// Second pass: emit atoms, ring digits and branches.
    fn emit(&mut self, atom: usize, out: &mut String) {
        let closes = std::mem::take(&mut self.ring_closes[atom]);
        let opens = std::mem::take(&mut self.ring_opens[atom]);
        let children = std::mem::take(&mut self.children[atom]);

        let chirality = self.written_chirality(atom, &closes, &opens, &children);
        out.push_str(&atom_token(self.mol, atom, chirality));

        for &bond in &closes {
            out.push_str(&ring_label(self.ring_digit[bond]));
        }

        for &bond in &opens {
            let digit = self.free_digits.pop_first().unwrap_or(99);
            self.ring_digit[bond] = digit;
            out.push_str(self.bond_token(bond));
            out.push_str(&ring_label(digit));
        }

        for &bond in &closes {
            self.free_digits.insert(self.ring_digit[bond]);
        }

        let last = children.len().saturating_sub(1);
        for (i, (child, bond)) in children.into_iter().enumerate() {
            if i < last {
                out.push('(');
                out.push_str(self.bond_token(bond));
                self.emit(child, out);
                out.push(')');
            } else {
                out.push_str(self.bond_token(bond));
                self.emit(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canon(smiles: &str) -> String {
        Molecule::from_smiles(smiles).unwrap().to_canonical_smiles()
    }

    #[test]
    fn test_atom_order_does_not_matter() {
        assert_eq!(canon("CCO"), "CCO");
        assert_eq!(canon("OCC"), "CCO");
        assert_eq!(canon("C(O)C"), "CCO");
    }

    #[test]
    fn test_acetic_acid() {
        assert_eq!(canon("OC(=O)C"), "CC(=O)O");
        assert_eq!(canon("CC(O)=O"), "CC(=O)O");
    }

    #[test]
    fn test_kekule_and_aromatic_benzene_agree() {
        assert_eq!(canon("C1=CC=CC=C1"), "c1ccccc1");
        assert_eq!(canon("c1ccccc1"), "c1ccccc1");
    }

    #[test]
    fn test_substituted_aromatics_agree() {
        assert_eq!(canon("Cc1ccccc1"), canon("C1=CC=CC=C1C"));
        assert_eq!(canon("c1ccccc1O"), canon("Oc1ccccc1"));
        assert_eq!(canon("c1ccc2ccccc2c1"), canon("C1=CC=C2C=CC=CC2=C1"));
        assert_eq!(canon("Cn1ccnc1"), canon("CN1C=CN=C1"));
    }

    #[test]
    fn test_pyrrole_keeps_bracket_hydrogen() {
        let smiles = canon("C1=CNC=C1");
        assert_eq!(smiles, canon("c1cc[nH]c1"));
        assert!(smiles.contains("[nH]"));
    }

    #[test]
    fn test_charges_and_isotopes() {
        assert_eq!(canon("[NH4+]"), "[NH4+]");
        let acetate = canon("[O-]C(=O)C");
        assert_eq!(acetate, canon("CC(=O)[O-]"));
        assert!(acetate.contains("[O-]"));
        assert_eq!(canon("[13CH4]"), "[13CH4]");
        assert_eq!(canon("[Fe+2]"), "[Fe+2]");
    }

    #[test]
    fn test_fragments_are_joined() {
        let a = canon("[Na+].[Cl-]");
        let b = canon("[Cl-].[Na+]");
        assert_eq!(a, b);
        assert!(a.contains('.'));
    }

    #[test]
    fn test_enantiomers_are_distinct() {
        let l_ala = canon("N[C@@H](C)C(=O)O");
        let d_ala = canon("N[C@H](C)C(=O)O");
        assert_ne!(l_ala, d_ala);
        assert!(l_ala.contains('@'), "{l_ala}");
        assert_eq!(canon("C[C@H](N)C(=O)O"), l_ala);
        assert_eq!(canon("OC(=O)[C@@H](N)C"), l_ala);
        assert_eq!(canon("[H][C@@](N)(C)C(=O)O"), canon("[C@@H](N)(C)C(=O)O"));
    }

    #[test]
    fn test_meaningless_tags_are_dropped() {
        assert_eq!(canon("C[C@H](C)C"), "CC(C)C");
        assert_eq!(canon("C[C@@H]1CCCCC1"), canon("CC1CCCCC1"));
        assert_eq!(canon("[C@H](F)(F)Cl"), canon("FC(F)Cl"));
    }

    #[test]
    fn test_double_bond_geometry() {
        let trans = canon("F/C=C/F");
        let cis = canon("F/C=C\\F");
        assert_ne!(trans, cis);
        assert_eq!(canon("F\\C=C\\F"), trans);
        assert_eq!(canon("F\\C=C/F"), cis);
        assert_eq!(canon("C(\\F)=C/F"), trans);
        assert_eq!(canon("FC=CF"), "FC=CF");
        assert_eq!(canon("C/C=C(/F)F"), canon("CC=C(F)F"));
    }

    #[test]
    fn test_ring_cis_trans() {
        let cis = canon("C[C@H]1CC[C@@H](C)CC1");
        let trans = canon("C[C@H]1CC[C@H](C)CC1");
        assert_ne!(cis, trans);
        assert_eq!(canon("C[C@@H]1CC[C@H](C)CC1"), cis);
        assert_eq!(canon("C[C@@H]1CC[C@@H](C)CC1"), trans);
    }

    #[test]
    fn test_atom_classes_are_kept() {
        let mapped = canon("[CH3:1]C");
        assert_ne!(mapped, canon("CC"));
        assert!(mapped.contains(":1]"), "{mapped}");
        assert_ne!(mapped, canon("[CH3:2]C"));
    }

    #[test]
    fn test_stereo_round_trip_is_stable() {
        for smiles in [
            "N[C@@H](C)C(=O)O",
            "C/C=C/C=C/C",
            "F/C=C/C[C@H](N)C(=O)O",
            "C[C@@H]1CC[C@H](C)CC1",
            "C[C@@H]1CCCC[C@H]1C",
            "OC[C@H]1OC(O)[C@H](O)[C@@H](O)[C@@H]1O",
            "CC(C)/N=C/c1ccccc1",
            "[CH3:7][C@H](F)Cl",
        ] {
            let first = canon(smiles);
            let second = canon(&first);
            assert_eq!(first, second, "input {smiles}");
        }
    }

    #[test]
    fn test_round_trip_is_stable() {
        for smiles in [
            "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
            "CN1C=NC2=C1C(=O)N(C(=O)N2C)C",
            "C1CC2CCC1C2",
            "O=C1C=CC(=O)C=C1",
            "c1ccc2[nH]ccc2c1",
            "C#N",
            "C1=CC2=CC=CC=CC2=C1",
        ] {
            let first = canon(smiles);
            let second = canon(&first);
            assert_eq!(first, second, "input {smiles}");
        }
    }

    #[test]
    fn test_ring_digits_are_reused() {
        let smiles = canon("C1CC1C1CC1");
        assert!(!smiles.contains('2'), "{smiles}");
    }

    #[test]
    fn test_ranks_are_a_permutation() {
        let mol = Molecule::from_smiles("c1ccccc1").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort_unstable();
        assert_eq!(ranks, (0..6).collect::<Vec<_>>());
    }
}
