//! Periodic-table data used by the parser, sanitizer and geometry code.

use std::fmt;

/// Chemical elements recognised in SMILES input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Sc,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Y,
    Zr,
    Nb,
    Mo,
    Tc,
    Ru,
    Rh,
    Pd,
    Ag,
    Cd,
    In,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Cs,
    Ba,
    W = 74,
    Re,
    Os,
    Ir,
    Pt,
    Au,
    Hg,
    Tl,
    Pb,
    Bi,
}

const NO_BONDS: &[u8] = &[0];

struct ElementData {
    element: Element,
    symbol: &'static str,
    mass: f64,
    covalent_radius: f64,
    vdw_radius: f64,
    /// Empty means the valence is not checked.
    valences: &'static [u8],
}

macro_rules! el {
    ($e:ident, $mass:expr, $cov:expr, $vdw:expr, [$($v:expr),*]) => {
        ElementData {
            element: Element::$e,
            symbol: stringify!($e),
            mass: $mass,
            covalent_radius: $cov,
            vdw_radius: $vdw,
            valences: &[$($v),*],
        }
    };
}

// Ordered by atomic number; `Element::data` relies on it.
static ELEMENTS: &[ElementData] = &[
    el!(H, 1.008, 0.31, 1.20, [1]),
    el!(He, 4.003, 0.28, 1.40, [0]),
    el!(Li, 6.941, 1.28, 1.82, [1]),
    el!(Be, 9.012, 0.96, 1.53, [2]),
    el!(B, 10.811, 0.84, 1.92, [3]),
    el!(C, 12.011, 0.76, 1.70, [4]),
    el!(N, 14.007, 0.71, 1.55, [3]),
    el!(O, 15.999, 0.66, 1.52, [2]),
    el!(F, 18.998, 0.57, 1.47, [1]),
    el!(Ne, 20.180, 0.58, 1.54, [0]),
    el!(Na, 22.990, 1.66, 2.27, [1]),
    el!(Mg, 24.305, 1.41, 1.73, [2]),
    el!(Al, 26.982, 1.21, 1.84, [3]),
    el!(Si, 28.086, 1.11, 2.10, [4]),
    el!(P, 30.974, 1.07, 1.80, [3, 5, 7]),
    el!(S, 32.065, 1.05, 1.80, [2, 4, 6]),
    el!(Cl, 35.453, 1.02, 1.75, [1]),
    el!(Ar, 39.948, 1.06, 1.88, [0]),
    el!(K, 39.098, 2.03, 2.75, [1]),
    el!(Ca, 40.078, 1.76, 2.31, [2]),
    el!(Sc, 44.956, 1.70, 2.11, []),
    el!(Ti, 47.867, 1.60, 2.00, []),
    el!(V, 50.942, 1.53, 2.00, []),
    el!(Cr, 51.996, 1.39, 2.00, []),
    el!(Mn, 54.938, 1.39, 2.00, []),
    el!(Fe, 55.845, 1.32, 2.00, []),
    el!(Co, 58.933, 1.26, 2.00, []),
    el!(Ni, 58.693, 1.24, 1.63, []),
    el!(Cu, 63.546, 1.32, 1.40, []),
    el!(Zn, 65.380, 1.22, 1.39, []),
    el!(Ga, 69.723, 1.22, 1.87, [3]),
    el!(Ge, 72.640, 1.20, 2.11, [4]),
    el!(As, 74.922, 1.19, 1.85, [3, 5, 7]),
    el!(Se, 78.960, 1.20, 1.90, [2, 4, 6]),
    el!(Br, 79.904, 1.20, 1.85, [1]),
    el!(Kr, 83.798, 1.16, 2.02, [0]),
    el!(Rb, 85.468, 2.20, 3.03, [1]),
    el!(Sr, 87.620, 1.95, 2.49, [2]),
    el!(Y, 88.906, 1.90, 2.00, []),
    el!(Zr, 91.224, 1.75, 2.00, []),
    el!(Nb, 92.906, 1.64, 2.00, []),
    el!(Mo, 95.960, 1.54, 2.00, []),
    el!(Tc, 98.000, 1.47, 2.00, []),
    el!(Ru, 101.070, 1.46, 2.00, []),
    el!(Rh, 102.906, 1.42, 2.00, []),
    el!(Pd, 106.420, 1.39, 1.63, []),
    el!(Ag, 107.868, 1.45, 1.72, []),
    el!(Cd, 112.411, 1.44, 1.58, []),
    el!(In, 114.818, 1.42, 1.93, [3]),
    el!(Sn, 118.710, 1.39, 2.17, [2, 4]),
    el!(Sb, 121.760, 1.39, 2.06, [3, 5, 7]),
    el!(Te, 127.600, 1.38, 2.06, [2, 4, 6]),
    el!(I, 126.904, 1.39, 1.98, [1, 3, 5]),
    el!(Xe, 131.293, 1.40, 2.16, [0, 2, 4, 6]),
    el!(Cs, 132.905, 2.44, 3.43, [1]),
    el!(Ba, 137.327, 2.15, 2.68, [2]),
    el!(W, 183.840, 1.62, 2.00, []),
    el!(Re, 186.207, 1.51, 2.00, []),
    el!(Os, 190.230, 1.44, 2.00, []),
    el!(Ir, 192.217, 1.41, 2.00, []),
    el!(Pt, 195.084, 1.36, 1.75, []),
    el!(Au, 196.967, 1.36, 1.66, []),
    el!(Hg, 200.590, 1.32, 1.55, []),
    el!(Tl, 204.383, 1.45, 1.96, [1, 3]),
    el!(Pb, 207.200, 1.46, 2.02, [2, 4]),
    el!(Bi, 208.980, 1.48, 2.07, [3, 5]),
];

impl Element {
    fn data(self) -> &'static ElementData {
        let z = self.atomic_number();
        let idx = ELEMENTS
            .binary_search_by_key(&z, |d| d.element.atomic_number())
            .unwrap_or_else(|_| unreachable!("element table is missing Z={z}"));
        &ELEMENTS[idx]
    }

    /// Look up an element by its case-sensitive symbol (`"Cl"`, not `"CL"`).
    pub fn from_symbol(symbol: &str) -> Option<Element> {
        ELEMENTS.iter().find(|d| d.symbol == symbol).map(|d| d.element)
    }

    /// Look up an element by atomic number.
    pub fn from_atomic_number(z: u8) -> Option<Element> {
        ELEMENTS
            .binary_search_by_key(&z, |d| d.element.atomic_number())
            .ok()
            .map(|idx| ELEMENTS[idx].element)
    }

    pub fn atomic_number(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    /// Standard atomic weight in g/mol.
    pub fn mass(self) -> f64 {
        self.data().mass
    }

    /// Single-bond covalent radius in Å.
    pub fn covalent_radius(self) -> f64 {
        self.data().covalent_radius
    }

    /// Van der Waals radius in Å.
    pub fn vdw_radius(self) -> f64 {
        self.data().vdw_radius
    }

    /// Allowed valences of the neutral atom, ascending. Empty for elements
    /// whose valence is not checked (transition metals).
    pub fn default_valences(self) -> &'static [u8] {
        self.data().valences
    }

    /// Members of the SMILES organic subset may be written without brackets.
    pub fn is_organic_subset(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::F
                | Element::Cl
                | Element::Br
                | Element::I
        )
    }

    /// Elements that may carry the aromatic (lowercase) spelling.
    pub fn can_be_aromatic(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::Se
                | Element::As
                | Element::Te
        )
    }

    pub fn period(self) -> u8 {
        match self.atomic_number() {
            1..=2 => 1,
            3..=10 => 2,
            11..=18 => 3,
            19..=36 => 4,
            37..=54 => 5,
            55..=86 => 6,
            _ => 7,
        }
    }

    /// Valences allowed for this element carrying `charge`.
    ///
    /// Charged main-group atoms take the valences of the isoelectronic
    /// neutral element in the same period (N+ as C, O- as F, C- as N).
    /// `None` means the valence is unrestricted.
    pub fn allowed_valences(self, charge: i8) -> Option<&'static [u8]> {
        if charge == 0 {
            let valences = self.default_valences();
            return (!valences.is_empty()).then_some(valences);
        }
        let z = i16::from(self.atomic_number()) - i16::from(charge);
        let target = u8::try_from(z).ok().and_then(Element::from_atomic_number)?;
        if target.period() != self.period() {
            // Closed-shell ions such as Na+ or Ca+2.
            return if target.default_valences().is_empty() || self.default_valences().is_empty() {
                None
            } else {
                Some(NO_BONDS)
            };
        }
        let valences = target.default_valences();
        (!valences.is_empty()).then_some(valences)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Element::from_symbol("Cl"), Some(Element::Cl));
        assert_eq!(Element::from_symbol("CL"), None);
        assert_eq!(Element::from_symbol("Pt"), Some(Element::Pt));
        assert_eq!(Element::Br.symbol(), "Br");
        assert_eq!(Element::Au.atomic_number(), 79);
    }

    #[test]
    fn test_table_is_sorted() {
        for pair in ELEMENTS.windows(2) {
            assert!(pair[0].element.atomic_number() < pair[1].element.atomic_number());
        }
        assert_eq!(Element::from_atomic_number(74), Some(Element::W));
        assert_eq!(Element::from_atomic_number(60), None);
    }

    #[test]
    fn test_charged_valences_follow_isoelectronic_neighbour() {
        assert_eq!(Element::N.allowed_valences(1), Some(&[4u8][..]));
        assert_eq!(Element::O.allowed_valences(-1), Some(&[1u8][..]));
        assert_eq!(Element::C.allowed_valences(-1), Some(&[3u8][..]));
        assert_eq!(Element::S.allowed_valences(0), Some(&[2u8, 4, 6][..]));
        assert_eq!(Element::Fe.allowed_valences(2), None);
    }

    #[test]
    fn test_closed_shell_ions_have_no_bonds() {
        // Na+ is isoelectronic with Ne, one period up.
        assert_eq!(Element::Na.allowed_valences(1), Some(&[0u8][..]));
        assert_eq!(Element::Cl.allowed_valences(-1), Some(&[0u8][..]));
    }
}
