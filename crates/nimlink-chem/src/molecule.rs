//! Molecular graph: atoms, bonds and adjacency.

use std::collections::BTreeMap;

use crate::element::Element;

/// Bond multiplicity. `Aromatic` only exists between parsing and
/// kekulization; sanitized molecules carry Kekulé orders plus
/// [`Bond::aromatic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to the explicit valence of either end.
    pub fn valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }

    /// Order used for bond-length estimates (1.5 for aromatic).
    pub fn as_f64(self) -> f64 {
        match self {
            BondOrder::Aromatic => 1.5,
            other => f64::from(other.valence()),
        }
    }
}

/// Tetrahedral chirality. Once parsed, the tag refers to the order of
/// [`Molecule::tetrahedral_neighbors`]: looking from the first neighbour,
/// the remaining three run counter-clockwise (`@`) or clockwise (`@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chirality {
    #[default]
    None,
    /// `@`
    CounterClockwise,
    /// `@@`
    Clockwise,
    /// `@SP2`, `@TB5`, `@OH15`, ... (recognised, not interpreted)
    Other,
}

impl Chirality {
    pub fn is_tetrahedral(self) -> bool {
        matches!(self, Chirality::CounterClockwise | Chirality::Clockwise)
    }

    /// The opposite tag; non-tetrahedral tags are returned unchanged.
    pub fn inverted(self) -> Self {
        match self {
            Chirality::CounterClockwise => Chirality::Clockwise,
            Chirality::Clockwise => Chirality::CounterClockwise,
            other => other,
        }
    }

    /// The tag for the same centre when its neighbours are listed in
    /// another order.
    pub fn permuted(self, odd: bool) -> Self {
        if odd {
            self.inverted()
        } else {
            self
        }
    }
}

/// Directional single-bond mark (`/` or `\`) read from SMILES, relative to
/// the bond's begin → end direction: `Up` means the end atom sits above
/// the begin atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondDirection {
    #[default]
    None,
    Up,
    Down,
}

/// Geometry of a double bond, pinned by one reference neighbour at each end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleBondStereo {
    /// Neighbour of the bond's begin atom.
    pub begin_ref: usize,
    /// Neighbour of the bond's end atom.
    pub end_ref: usize,
    /// Whether the two references sit on the same side.
    pub cis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub charge: i8,
    pub isotope: Option<u16>,
    pub aromatic: bool,
    /// Attached hydrogens that are not graph atoms (implicit or bracket).
    pub hydrogens: u8,
    /// Written as a bracket atom; its hydrogen count is fixed by the input.
    pub bracket: bool,
    pub chirality: Chirality,
    pub atom_class: Option<u32>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            isotope: None,
            aromatic: false,
            hydrogens: 0,
            bracket: false,
            chirality: Chirality::None,
            atom_class: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
    pub aromatic: bool,
    pub direction: BondDirection,
    /// Set on double bonds with a defined cis/trans configuration.
    pub stereo: Option<DoubleBondStereo>,
}

impl Bond {
    /// The atom at the other end of this bond.
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

/// An undirected molecular graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per atom: (neighbour, bond index).
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Smallest rings as atom cycles, filled by sanitization.
    rings: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Adds a bond and returns its index. Callers must reject self-loops and
    /// duplicate bonds beforehand.
    pub fn add_bond(&mut self, begin: usize, end: usize, order: BondOrder) -> usize {
        debug_assert!(begin != end && self.bond_between(begin, end).is_none());
        let idx = self.bonds.len();
        self.bonds.push(Bond {
            begin,
            end,
            order,
            aromatic: false,
            direction: BondDirection::None,
            stereo: None,
        });
        self.adjacency[begin].push((end, idx));
        self.adjacency[end].push((begin, idx));
        idx
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub fn atom_mut(&mut self, idx: usize) -> &mut Atom {
        &mut self.atoms[idx]
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    pub fn bond_mut(&mut self, idx: usize) -> &mut Bond {
        &mut self.bonds[idx]
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// (neighbour, bond index) pairs of `atom`.
    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|(nbr, _)| *nbr == b)
            .map(|(_, bond)| *bond)
    }

    /// Sum of bond valences at `atom`, excluding hydrogens that are not
    /// graph atoms.
    pub fn explicit_valence(&self, atom: usize) -> u32 {
        self.adjacency[atom]
            .iter()
            .map(|(_, bond)| u32::from(self.bonds[*bond].order.valence()))
            .sum()
    }

    /// Explicit valence plus attached non-graph hydrogens.
    pub fn total_valence(&self, atom: usize) -> u32 {
        self.explicit_valence(atom) + u32::from(self.atoms[atom].hydrogens)
    }

    /// Number of hydrogens attached to `atom`, whether stored as a count or
    /// as explicit H neighbours.
    pub fn total_hydrogens(&self, atom: usize) -> usize {
        let explicit = self.adjacency[atom]
            .iter()
            .filter(|(nbr, _)| self.atoms[*nbr].element == Element::H)
            .count();
        usize::from(self.atoms[atom].hydrogens) + explicit
    }

    /// The neighbour order a tetrahedral tag on `atom` refers to: graph
    /// neighbours in bond order, then `None` standing for the single
    /// implicit hydrogen or the lone pair of a three-coordinate S, Se, P or
    /// As. Returns `None` when `atom` cannot be a tetrahedral centre.
    pub fn tetrahedral_neighbors(&self, atom: usize) -> Option<Vec<Option<usize>>> {
        let mut order: Vec<Option<usize>> =
            self.adjacency[atom].iter().map(|(nbr, _)| Some(*nbr)).collect();
        let record = &self.atoms[atom];
        match (order.len(), record.hydrogens) {
            (4, 0) => {}
            (3, 1) => order.push(None),
            (3, 0) if matches!(record.element, Element::S | Element::Se | Element::P | Element::As) => {
                order.push(None)
            }
            _ => return None,
        }
        Some(order)
    }

    pub fn heavy_degree(&self, atom: usize) -> usize {
        self.adjacency[atom]
            .iter()
            .filter(|(nbr, _)| self.atoms[*nbr].element != Element::H)
            .count()
    }

    pub fn rings(&self) -> &[Vec<usize>] {
        &self.rings
    }

    pub(crate) fn set_rings(&mut self, rings: Vec<Vec<usize>>) {
        self.rings = rings;
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.rings.iter().any(|r| r.contains(&atom))
    }

    /// Whether the bond joins two consecutive atoms of a perceived ring.
    pub fn is_ring_bond(&self, bond: usize) -> bool {
        let b = &self.bonds[bond];
        self.rings.iter().any(|ring| ring_contains_edge(ring, b.begin, b.end))
    }

    /// Size of the smallest perceived ring containing both atoms, if any.
    pub fn smallest_common_ring(&self, atoms: &[usize]) -> Option<usize> {
        self.rings
            .iter()
            .filter(|ring| atoms.iter().all(|a| ring.contains(a)))
            .map(Vec::len)
            .min()
    }

    /// Connected components as sorted atom lists, ordered by first atom.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut fragments = Vec::new();
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            let mut stack = vec![start];
            let mut members = Vec::new();
            seen[start] = true;
            while let Some(atom) = stack.pop() {
                members.push(atom);
                for &(nbr, _) in &self.adjacency[atom] {
                    if !seen[nbr] {
                        seen[nbr] = true;
                        stack.push(nbr);
                    }
                }
            }
            members.sort_unstable();
            fragments.push(members);
        }
        fragments
    }

    /// Drops the given atoms (and their bonds), renumbering the rest in
    /// their original order. Ring information is remapped; rings that lose
    /// an atom are discarded.
    pub fn remove_atoms(&mut self, remove: &[usize]) {
        if remove.is_empty() {
            return;
        }
        let mut new_index = vec![None; self.atoms.len()];
        let mut next = 0;
        for (idx, slot) in new_index.iter_mut().enumerate() {
            if !remove.contains(&idx) {
                *slot = Some(next);
                next += 1;
            }
        }

        let mut rebuilt = Molecule::new();
        for (idx, atom) in self.atoms.iter().enumerate() {
            if new_index[idx].is_some() {
                rebuilt.add_atom(atom.clone());
            }
        }
        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (new_index[bond.begin], new_index[bond.end]) {
                let stereo = bond.stereo.and_then(|stereo| self.remap_stereo(bond, stereo, &new_index));
                let idx = rebuilt.add_bond(a, b, bond.order);
                rebuilt.bonds[idx].aromatic = bond.aromatic;
                rebuilt.bonds[idx].direction = bond.direction;
                rebuilt.bonds[idx].stereo = stereo;
            }
        }
        rebuilt.rings = self
            .rings
            .iter()
            .filter_map(|ring| ring.iter().map(|a| new_index[*a]).collect::<Option<Vec<_>>>())
            .collect();
        *self = rebuilt;
    }

    /// Renumbers a double-bond configuration. A removed reference is
    /// replaced by the other substituent on its end, which flips cis and
    /// trans; with no substituent left the configuration is dropped.
    fn remap_stereo(
        &self,
        bond: &Bond,
        stereo: DoubleBondStereo,
        new_index: &[Option<usize>],
    ) -> Option<DoubleBondStereo> {
        let mut cis = stereo.cis;
        let mut remap = |end: usize, partner: usize, reference: usize| -> Option<usize> {
            if let Some(idx) = new_index[reference] {
                return Some(idx);
            }
            cis = !cis;
            self.adjacency[end]
                .iter()
                .map(|(nbr, _)| *nbr)
                .find(|nbr| *nbr != partner && *nbr != reference)
                .and_then(|nbr| new_index[nbr])
        };
        let begin_ref = remap(bond.begin, bond.end, stereo.begin_ref)?;
        let end_ref = remap(bond.end, bond.begin, stereo.end_ref)?;
        Some(DoubleBondStereo {
            begin_ref,
            end_ref,
            cis,
        })
    }

    /// Hill-order molecular formula including implicit hydrogens.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut carbon = 0;
        let mut hydrogen = 0;
        for atom in &self.atoms {
            hydrogen += usize::from(atom.hydrogens);
            match atom.element {
                Element::C => carbon += 1,
                Element::H => hydrogen += 1,
                other => *counts.entry(other.symbol()).or_default() += 1,
            }
        }

        let mut out = String::new();
        let mut push = |symbol: &str, n: usize| {
            if n == 1 {
                out.push_str(symbol);
            } else if n > 1 {
                out.push_str(&format!("{symbol}{n}"));
            }
        };
        if carbon > 0 {
            push("C", carbon);
            push("H", hydrogen);
            for (symbol, n) in &counts {
                push(symbol, *n);
            }
        } else {
            counts.insert("H", hydrogen);
            for (symbol, n) in &counts {
                push(symbol, *n);
            }
        }
        out
    }
}

/// Whether `to` lists the entries of `from` in an odd permutation. Lists
/// that do not hold the same distinct entries count as even.
pub(crate) fn is_odd_permutation<T: PartialEq>(from: &[T], to: &[T]) -> bool {
    if from.len() != to.len() {
        return false;
    }
    let Some(mut perm) = to
        .iter()
        .map(|item| from.iter().position(|f| f == item))
        .collect::<Option<Vec<usize>>>()
    else {
        return false;
    };
    let mut seen = vec![false; perm.len()];
    for &p in &perm {
        if seen[p] {
            return false;
        }
        seen[p] = true;
    }
    let mut odd = false;
    for i in 0..perm.len() {
        while perm[i] != i {
            let j = perm[i];
            perm.swap(i, j);
            odd = !odd;
        }
    }
    odd
}

fn ring_contains_edge(ring: &[usize], a: usize, b: usize) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let (x, y) = (ring[i], ring[(i + 1) % n]);
        (x == a && y == b) || (x == b && y == a)
    })
}
