//! OpenSMILES reader.
//!
//! Produces an unsanitized [`Molecule`]: aromatic input keeps
//! [`BondOrder::Aromatic`] bonds and organic-subset atoms have no hydrogens
//! assigned yet. See [`crate::sanitize`] for the second half.

use std::collections::HashMap;

use crate::element::Element;
use crate::error::SmilesError;
use crate::molecule::{is_odd_permutation, Atom, BondDirection, BondOrder, Chirality, Molecule};

type ParseResult<T> = Result<T, SmilesError>;

/// Parse a SMILES string into a molecular graph.
///
/// Leading and trailing whitespace is ignored; anything after the first
/// interior whitespace character is treated as a title and skipped.
pub fn parse_smiles(input: &str) -> ParseResult<Molecule> {
    let trimmed = input.trim();
    let end = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    Parser::new(&trimmed[..end]).run()
}

#[derive(Debug, Clone, Copy)]
struct PendingBond {
    order: BondOrder,
    direction: BondDirection,
    position: usize,
}

impl PendingBond {
    /// The same bond read from its other end.
    fn reversed(self) -> Self {
        let direction = match self.direction {
            BondDirection::Up => BondDirection::Down,
            BondDirection::Down => BondDirection::Up,
            BondDirection::None => BondDirection::None,
        };
        Self { direction, ..self }
    }
}

#[derive(Debug, Clone, Copy)]
struct RingOpening {
    atom: usize,
    bond: Option<PendingBond>,
    position: usize,
    /// Index of the placeholder in the opening atom's written order.
    slot: usize,
}

/// One entry of an atom's neighbour order as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Atom(usize),
    /// Bracket hydrogen or lone pair of a chiral atom.
    Implicit,
    /// Ring bond whose partner has not been read yet.
    Ring,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    mol: Molecule,
    prev: Option<usize>,
    pending: Option<PendingBond>,
    /// (anchor atom, atom count when the branch opened, position of '(')
    branches: Vec<(usize, usize, usize)>,
    rings: HashMap<u16, RingOpening>,
    /// Per atom: neighbours in the order they appear in the string.
    written: Vec<Vec<Slot>>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            mol: Molecule::new(),
            prev: None,
            pending: None,
            branches: Vec::new(),
            rings: HashMap::new(),
            written: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn err<T>(&self, message: impl Into<String>) -> ParseResult<T> {
        Err(SmilesError::new(self.pos, message))
    }

    fn run(mut self) -> ParseResult<Molecule> {
        if self.bytes.is_empty() {
            return self.err("empty SMILES");
        }

        while let Some(ch) = self.peek() {
            match ch {
                b'-' | b'=' | b'#' | b'$' | b':' | b'/' | b'\\' => self.bond_symbol(ch)?,
                b'(' => self.open_branch()?,
                b')' => self.close_branch()?,
                b'.' => {
                    if self.pending.is_some() {
                        return self.err("bond before '.'");
                    }
                    if !self.branches.is_empty() {
                        return self.err("'.' inside a branch");
                    }
                    if self.prev.is_none() {
                        return self.err("'.' without a preceding atom");
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'0'..=b'9' => {
                    let number = u16::from(ch - b'0');
                    self.pos += 1;
                    self.ring_closure(number, self.pos - 1)?;
                }
                b'%' => {
                    let start = self.pos;
                    let (Some(d1), Some(d2)) = (self.peek_at(1), self.peek_at(2)) else {
                        return self.err("incomplete '%' ring number");
                    };
                    if !d1.is_ascii_digit() || !d2.is_ascii_digit() {
                        return self.err("'%' must be followed by two digits");
                    }
                    self.pos += 3;
                    let number = u16::from(d1 - b'0') * 10 + u16::from(d2 - b'0');
                    self.ring_closure(number, start)?;
                }
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.attach(atom)?;
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.attach(atom)?;
                }
            }
        }

        if let Some(bond) = self.pending {
            return Err(SmilesError::new(bond.position, "bond at end of SMILES"));
        }
        if let Some(&(_, _, position)) = self.branches.last() {
            return Err(SmilesError::new(position, "unclosed branch"));
        }
        if let Some(open) = self.rings.values().min_by_key(|r| r.position) {
            return Err(SmilesError::new(open.position, "unclosed ring"));
        }
        self.resolve_chirality();
        Ok(self.mol)
    }

    /// Re-expresses every tetrahedral tag against
    /// [`Molecule::tetrahedral_neighbors`]; tags on atoms that cannot be
    /// tetrahedral centres are cleared.
    fn resolve_chirality(&mut self) {
        for idx in 0..self.mol.atom_count() {
            let tag = self.mol.atom(idx).chirality;
            if !tag.is_tetrahedral() {
                continue;
            }
            let resolved = match self.mol.tetrahedral_neighbors(idx) {
                Some(internal) => {
                    let keep_implicit = internal.contains(&None);
                    let written: Vec<Option<usize>> = self.written[idx]
                        .iter()
                        .filter_map(|slot| match slot {
                            Slot::Atom(nbr) => Some(Some(*nbr)),
                            Slot::Implicit if keep_implicit => Some(None),
                            _ => None,
                        })
                        .collect();
                    tag.permuted(is_odd_permutation(&written, &internal))
                }
                None => Chirality::None,
            };
            self.mol.atom_mut(idx).chirality = resolved;
        }
    }

    fn bond_symbol(&mut self, ch: u8) -> ParseResult<()> {
        if self.pending.is_some() {
            return self.err("two consecutive bond symbols");
        }
        if self.prev.is_none() {
            return self.err("bond without a preceding atom");
        }
        let (order, direction) = match ch {
            b'-' => (BondOrder::Single, BondDirection::None),
            b'=' => (BondOrder::Double, BondDirection::None),
            b'#' => (BondOrder::Triple, BondDirection::None),
            b'$' => (BondOrder::Quadruple, BondDirection::None),
            b':' => (BondOrder::Aromatic, BondDirection::None),
            b'/' => (BondOrder::Single, BondDirection::Up),
            _ => (BondOrder::Single, BondDirection::Down),
        };
        self.pending = Some(PendingBond {
            order,
            direction,
            position: self.pos,
        });
        self.pos += 1;
        Ok(())
    }

    fn open_branch(&mut self) -> ParseResult<()> {
        let Some(prev) = self.prev else {
            return self.err("branch without a preceding atom");
        };
        if self.pending.is_some() {
            return self.err("bond before '('");
        }
        if self.pos > 0 && self.bytes[self.pos - 1] == b'(' {
            return self.err("branch must start with an atom");
        }
        self.branches.push((prev, self.mol.atom_count(), self.pos));
        self.pos += 1;
        Ok(())
    }

    fn close_branch(&mut self) -> ParseResult<()> {
        let Some((anchor, atoms_at_open, _)) = self.branches.pop() else {
            return self.err("unmatched ')'");
        };
        if self.pending.is_some() {
            return self.err("bond before ')'");
        }
        if self.mol.atom_count() == atoms_at_open {
            return self.err("empty branch");
        }
        self.prev = Some(anchor);
        self.pos += 1;
        Ok(())
    }

    fn implicit_order(&self, a: usize, b: usize) -> BondOrder {
        if self.mol.atom(a).aromatic && self.mol.atom(b).aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn connect(&mut self, a: usize, b: usize, explicit: Option<PendingBond>) -> ParseResult<()> {
        if a == b {
            return self.err("atom bonded to itself");
        }
        if self.mol.bond_between(a, b).is_some() {
            return self.err("duplicate bond between the same atoms");
        }
        let order = match explicit {
            Some(bond) => bond.order,
            None => self.implicit_order(a, b),
        };
        if order == BondOrder::Aromatic && !(self.mol.atom(a).aromatic && self.mol.atom(b).aromatic) {
            return self.err("aromatic bond between non-aromatic atoms");
        }
        let idx = self.mol.add_bond(a, b, order);
        if let Some(bond) = explicit {
            self.mol.bond_mut(idx).direction = bond.direction;
        }
        Ok(())
    }

    fn attach(&mut self, atom: Atom) -> ParseResult<()> {
        let chiral = atom.chirality.is_tetrahedral();
        let idx = self.mol.add_atom(atom);
        let mut written = Vec::with_capacity(4);
        if let Some(prev) = self.prev {
            written.push(Slot::Atom(prev));
        }
        if chiral {
            written.push(Slot::Implicit);
        }
        self.written.push(written);

        if let Some(prev) = self.prev {
            let bond = self.pending.take();
            self.connect(prev, idx, bond)?;
            self.written[prev].push(Slot::Atom(idx));
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self, number: u16, position: usize) -> ParseResult<()> {
        let Some(current) = self.prev else {
            return Err(SmilesError::new(position, "ring bond without a preceding atom"));
        };
        let bond = self.pending.take();

        match self.rings.remove(&number) {
            None => {
                self.written[current].push(Slot::Ring);
                let slot = self.written[current].len() - 1;
                self.rings.insert(
                    number,
                    RingOpening {
                        atom: current,
                        bond,
                        position,
                        slot,
                    },
                );
                Ok(())
            }
            Some(open) => {
                // A mark at the closing digit is read from the closing atom.
                let bond = match (open.bond, bond) {
                    (Some(a), Some(b)) if a.order != b.order => {
                        return Err(SmilesError::new(position, "conflicting ring bond orders"));
                    }
                    (Some(a), Some(b)) if a.direction == BondDirection::None => Some(b.reversed()),
                    (Some(a), _) => Some(a),
                    (None, b) => b.map(PendingBond::reversed),
                };
                if open.atom == current {
                    return Err(SmilesError::new(position, "ring bond to the same atom"));
                }
                if self.mol.bond_between(open.atom, current).is_some() {
                    return Err(SmilesError::new(position, "duplicate ring bond"));
                }
                self.connect(open.atom, current, bond)?;
                self.written[open.atom][open.slot] = Slot::Atom(current);
                self.written[current].push(Slot::Atom(open.atom));
                Ok(())
            }
        }
    }

    fn organic_atom(&mut self) -> ParseResult<Atom> {
        let start = self.pos;
        let ch = self.bytes[start];
        let next = self.peek_at(1);
        let (element, aromatic, len) = match (ch, next) {
            (b'C', Some(b'l')) => (Element::Cl, false, 2),
            (b'B', Some(b'r')) => (Element::Br, false, 2),
            (b'B', _) => (Element::B, false, 1),
            (b'C', _) => (Element::C, false, 1),
            (b'N', _) => (Element::N, false, 1),
            (b'O', _) => (Element::O, false, 1),
            (b'P', _) => (Element::P, false, 1),
            (b'S', _) => (Element::S, false, 1),
            (b'F', _) => (Element::F, false, 1),
            (b'I', _) => (Element::I, false, 1),
            (b'b', _) => (Element::B, true, 1),
            (b'c', _) => (Element::C, true, 1),
            (b'n', _) => (Element::N, true, 1),
            (b'o', _) => (Element::O, true, 1),
            (b'p', _) => (Element::P, true, 1),
            (b's', _) => (Element::S, true, 1),
            (b'*', _) => return self.err("wildcard atoms are not supported"),
            _ => {
                let shown = char::from(ch);
                return self.err(format!("unexpected character '{shown}'"));
            }
        };
        self.pos += len;
        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        Ok(atom)
    }

    /// Reads a run of digits. `Ok(None)` when there are none.
    fn parse_number(&mut self) -> ParseResult<Option<u32>> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Some)
            .ok_or_else(|| SmilesError::new(start, "number out of range"))
    }

    fn bracket_element(&mut self) -> ParseResult<(Element, bool)> {
        let Some(first) = self.peek() else {
            return self.err("unterminated bracket atom");
        };

        if first.is_ascii_lowercase() {
            let aromatic_two = match (first, self.peek_at(1)) {
                (b's', Some(b'e')) => Some(Element::Se),
                (b'a', Some(b's')) => Some(Element::As),
                (b't', Some(b'e')) => Some(Element::Te),
                _ => None,
            };
            if let Some(element) = aromatic_two {
                self.pos += 2;
                return Ok((element, true));
            }
            let element = match first {
                b'b' => Element::B,
                b'c' => Element::C,
                b'n' => Element::N,
                b'o' => Element::O,
                b'p' => Element::P,
                b's' => Element::S,
                _ => return self.err("invalid aromatic symbol"),
            };
            self.pos += 1;
            return Ok((element, true));
        }

        if !first.is_ascii_uppercase() {
            return self.err("expected element symbol");
        }
        if let Some(second) = self.peek_at(1).filter(u8::is_ascii_lowercase) {
            let symbol = [first, second];
            let two = std::str::from_utf8(&symbol).ok().and_then(Element::from_symbol);
            if let Some(element) = two {
                self.pos += 2;
                return Ok((element, false));
            }
        }
        let symbol = [first];
        match std::str::from_utf8(&symbol).ok().and_then(Element::from_symbol) {
            Some(element) => {
                self.pos += 1;
                Ok((element, false))
            }
            None => self.err("unknown element symbol"),
        }
    }

    fn chirality(&mut self) -> ParseResult<Chirality> {
        if self.peek() != Some(b'@') {
            return Ok(Chirality::None);
        }
        self.pos += 1;
        if self.peek() == Some(b'@') {
            self.pos += 1;
            return Ok(Chirality::Clockwise);
        }
        let class = (self.peek(), self.peek_at(1));
        if class == (Some(b'T'), Some(b'H')) {
            self.pos += 2;
            return Ok(match self.parse_number()? {
                Some(1) => Chirality::CounterClockwise,
                Some(2) => Chirality::Clockwise,
                _ => Chirality::Other,
            });
        }
        if matches!(
            class,
            (Some(b'A'), Some(b'L'))
                | (Some(b'S'), Some(b'P'))
                | (Some(b'T'), Some(b'B'))
                | (Some(b'O'), Some(b'H'))
        ) {
            self.pos += 2;
            self.parse_number()?;
            return Ok(Chirality::Other);
        }
        Ok(Chirality::CounterClockwise)
    }

    fn charge(&mut self) -> ParseResult<i8> {
        let sign: i8 = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Ok(0),
        };
        let sign_char = self.bytes[self.pos];
        self.pos += 1;
        let magnitude = match self.parse_number()? {
            Some(n) => n,
            None => {
                let mut count = 1;
                while self.peek() == Some(sign_char) {
                    count += 1;
                    self.pos += 1;
                }
                count
            }
        };
        match i8::try_from(magnitude) {
            Ok(m) if m <= 15 => Ok(sign * m),
            _ => self.err("charge out of range"),
        }
    }

    fn bracket_atom(&mut self) -> ParseResult<Atom> {
        let open = self.pos;
        self.pos += 1;

        let isotope = match self.parse_number()? {
            Some(n) => match u16::try_from(n) {
                Ok(isotope) => Some(isotope),
                Err(_) => return self.err("isotope out of range"),
            },
            None => None,
        };
        let (element, aromatic) = self.bracket_element()?;
        if aromatic && !element.can_be_aromatic() {
            return self.err("element cannot be aromatic");
        }
        let chirality = self.chirality()?;

        let mut hydrogens = 0;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            hydrogens = match self.parse_number()? {
                Some(n) if n > 9 => return self.err("hydrogen count out of range"),
                Some(n) => n as u8,
                None => 1,
            };
        }

        let charge = self.charge()?;

        let atom_class = if self.peek() == Some(b':') {
            self.pos += 1;
            match self.parse_number()? {
                Some(n) => Some(n),
                None => return self.err("expected atom class number"),
            }
        } else {
            None
        };

        if self.peek() != Some(b']') {
            return if self.peek().is_none() {
                Err(SmilesError::new(open, "unterminated bracket atom"))
            } else {
                self.err("unexpected character in bracket atom")
            };
        }
        self.pos += 1;

        Ok(Atom {
            element,
            charge,
            isotope,
            aromatic,
            hydrogens,
            bracket: true,
            chirality,
            atom_class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ethanol() {
        let mol = parse_smiles("CCO").unwrap();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bond_count(), 2);
        assert_eq!(mol.atom(2).element, Element::O);
        assert!(!mol.atom(0).bracket);
    }

    #[test]
    fn test_two_letter_organic_atoms() {
        let mol = parse_smiles("ClCBr").unwrap();
        let elements: Vec<_> = mol.atoms().iter().map(|a| a.element).collect();
        assert_eq!(elements, vec![Element::Cl, Element::C, Element::Br]);
    }

    #[test]
    fn test_branches_and_bonds() {
        let mol = parse_smiles("CC(=O)O").unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond(1).order, BondOrder::Double);
        assert_eq!(mol.bond(2).begin, 1);
        assert_eq!(mol.bond(2).end, 3);
    }

    #[test]
    fn test_aromatic_ring_closure() {
        let mol = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(mol.bond_count(), 6);
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Aromatic));
        assert!(mol.bond_between(0, 5).is_some());
    }

    #[test]
    fn test_percent_ring_number() {
        let mol = parse_smiles("C%10CCC%10").unwrap();
        assert_eq!(mol.bond_count(), 4);
        assert!(mol.bond_between(0, 3).is_some());
    }

    #[test]
    fn test_ring_bond_order_at_opening() {
        let mol = parse_smiles("C=1CCCC1").unwrap();
        let closing = mol.bond_between(0, 4).unwrap();
        assert_eq!(mol.bond(closing).order, BondOrder::Double);
    }

    #[test]
    fn test_bracket_atom_fields() {
        let mol = parse_smiles("[13CH3:7]").unwrap();
        let atom = mol.atom(0);
        assert_eq!(atom.isotope, Some(13));
        assert_eq!(atom.hydrogens, 3);
        assert_eq!(atom.atom_class, Some(7));
        assert!(atom.bracket);

        let mol = parse_smiles("[NH4+]").unwrap();
        assert_eq!(mol.atom(0).charge, 1);
        assert_eq!(mol.atom(0).hydrogens, 4);

        let mol = parse_smiles("[O--]").unwrap();
        assert_eq!(mol.atom(0).charge, -2);

        let mol = parse_smiles("[Fe+3]").unwrap();
        assert_eq!(mol.atom(0).charge, 3);
    }

    #[test]
    fn test_bracket_two_letter_and_aromatic() {
        assert_eq!(parse_smiles("[Sc]").unwrap().atom(0).element, Element::Sc);
        let se = parse_smiles("[se]1cccc1").unwrap();
        assert_eq!(se.atom(0).element, Element::Se);
        assert!(se.atom(0).aromatic);
        assert_eq!(parse_smiles("[nH]1cccc1").unwrap().atom(0).hydrogens, 1);
    }

    #[test]
    fn test_chirality_is_parsed() {
        // Written order N, H, C, C matches the stored order N, C, C, H after
        // an even number of swaps.
        let mol = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(mol.atom(1).chirality, Chirality::Clockwise);
        let mol = parse_smiles("F[C@TH1](Cl)(Br)I").unwrap();
        assert_eq!(mol.atom(1).chirality, Chirality::CounterClockwise);
        let mol = parse_smiles("F[C@TH2](Cl)(Br)I").unwrap();
        assert_eq!(mol.atom(1).chirality, Chirality::Clockwise);
        let mol = parse_smiles("F[C@SP1](Cl)(Br)I").unwrap();
        assert_eq!(mol.atom(1).chirality, Chirality::Other);
    }

    #[test]
    fn test_chirality_is_stored_in_bond_order() {
        // Leading hydrogen: written H, F, Cl, Br vs stored F, Cl, Br, H.
        let mol = parse_smiles("[C@H](F)(Cl)Br").unwrap();
        assert_eq!(mol.atom(0).chirality, Chirality::Clockwise);

        // Ring digit first: written C4, F, Cl, C3 vs stored F, Cl, C3, C4.
        let mol = parse_smiles("[C@]1(F)(Cl)CC1").unwrap();
        assert_eq!(mol.atom(0).chirality, Chirality::Clockwise);

        // No room for a centre on a methyl group.
        let mol = parse_smiles("[C@H3]C").unwrap();
        assert_eq!(mol.atom(0).chirality, Chirality::None);
    }

    #[test]
    fn test_directional_bonds() {
        let mol = parse_smiles("F/C=C/F").unwrap();
        assert_eq!(mol.bond(0).direction, BondDirection::Up);
        assert_eq!(mol.bond(0).order, BondOrder::Single);
        assert_eq!(mol.bond(2).direction, BondDirection::Up);
    }

    #[test]
    fn test_ring_closure_direction_is_read_from_opening_atom() {
        // "C/1" then "...C1": the bond runs opening to closing.
        let mol = parse_smiles("F/C=C/1.C1").unwrap();
        let ring = mol.bond_between(2, 3).unwrap();
        assert_eq!(mol.bond(ring).begin, 2);
        assert_eq!(mol.bond(ring).direction, BondDirection::Up);

        // A mark at the closing digit points the other way.
        let mol = parse_smiles("F/C=C1.C/1").unwrap();
        let ring = mol.bond_between(2, 3).unwrap();
        assert_eq!(mol.bond(ring).direction, BondDirection::Down);
    }

    #[test]
    fn test_fragments_and_title() {
        let mol = parse_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 0);

        let mol = parse_smiles("  CCO ethanol").unwrap();
        assert_eq!(mol.atom_count(), 3);
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            ("", "empty SMILES"),
            ("C(", "unclosed branch"),
            ("C)", "unmatched ')'"),
            ("C1CC", "unclosed ring"),
            ("C=", "bond at end of SMILES"),
            ("C()C", "empty branch"),
            ("C11", "ring bond to the same atom"),
            ("[C", "unterminated bracket atom"),
            ("[Xx]", "unknown element symbol"),
            ("Q", "unexpected character 'Q'"),
            ("=C", "bond without a preceding atom"),
            ("C==C", "two consecutive bond symbols"),
            ("C((C))", "branch must start with an atom"),
            ("C:C", "aromatic bond between non-aromatic atoms"),
            ("[99999999999C]", "number out of range"),
            ("[C+99999999999]", "number out of range"),
            ("[CH99999999999]", "number out of range"),
            ("[C:99999999999]", "number out of range"),
            ("[C+16]", "charge out of range"),
        ];
        for (input, message) in cases {
            let err = parse_smiles(input).unwrap_err();
            assert_eq!(err.message, message, "input {input:?}");
        }
    }

    #[test]
    fn test_error_position() {
        let err = parse_smiles("CC(C").unwrap_err();
        assert_eq!(err.position, 2);
        let err = parse_smiles("CCQ").unwrap_err();
        assert_eq!(err.position, 2);
    }
}
