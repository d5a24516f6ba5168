//! MDL molfile / SD record writer. Records use the V2000 layout unless the
//! atom or bond count overflows its three-digit fields, in which case the
//! connection table is written as V3000.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::conformer::Conformer;
use crate::error::{ChemError, Result};
use crate::molecule::BondOrder;

const PROGRAM_LINE: &str = "  nimlink          3D";

/// Largest atom or bond count the V2000 counts line can hold.
const V2000_MAX_COUNT: usize = 999;

/// Atom-block charge code (0 = uncharged or out of range).
fn charge_code(charge: i8) -> u8 {
    match charge {
        3 => 1,
        2 => 2,
        1 => 3,
        -1 => 5,
        -2 => 6,
        -3 => 7,
        _ => 0,
    }
}

fn bond_type(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
        BondOrder::Quadruple => 8,
    }
}

/// Writes `M  CHG` / `M  ISO` style property lines, eight entries per line.
fn write_property<W: Write>(out: &mut W, tag: &str, entries: &[(usize, i32)]) -> std::io::Result<()> {
    for chunk in entries.chunks(8) {
        write!(out, "M  {tag}{:>3}", chunk.len())?;
        for (atom, value) in chunk {
            write!(out, " {:>3} {:>3}", atom, value)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Serializes one conformer as an SD record, terminated by `$$$$`.
pub fn write_sdf<W: Write>(out: &mut W, conformer: &Conformer) -> std::io::Result<()> {
    let mol = &conformer.molecule;
    let title = conformer.title.lines().next().unwrap_or_default();
    writeln!(out, "{title}")?;
    writeln!(out, "{PROGRAM_LINE}")?;
    writeln!(out)?;
    if mol.atom_count() > V2000_MAX_COUNT || mol.bond_count() > V2000_MAX_COUNT {
        write_v3000_ctab(out, conformer)?;
    } else {
        write_v2000_ctab(out, conformer)?;
    }
    writeln!(out, "M  END")?;
    writeln!(out, "$$$$")?;
    Ok(())
}

fn write_v2000_ctab<W: Write>(out: &mut W, conformer: &Conformer) -> std::io::Result<()> {
    let mol = &conformer.molecule;
    writeln!(
        out,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
        mol.atom_count(),
        mol.bond_count()
    )?;

    for (atom, pos) in mol.atoms().iter().zip(&conformer.positions) {
        writeln!(
            out,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0{:>3}  0  0  0  0  0  0  0  0  0  0",
            pos.x,
            pos.y,
            pos.z,
            atom.element.symbol(),
            charge_code(atom.charge)
        )?;
    }
    for bond in mol.bonds() {
        writeln!(
            out,
            "{:>3}{:>3}{:>3}  0",
            bond.begin + 1,
            bond.end + 1,
            bond_type(bond.order)
        )?;
    }

    let charges: Vec<(usize, i32)> = mol
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.charge != 0)
        .map(|(i, a)| (i + 1, i32::from(a.charge)))
        .collect();
    let isotopes: Vec<(usize, i32)> = mol
        .atoms()
        .iter()
        .enumerate()
        .filter_map(|(i, a)| a.isotope.map(|iso| (i + 1, i32::from(iso))))
        .collect();
    write_property(out, "CHG", &charges)?;
    write_property(out, "ISO", &isotopes)?;
    Ok(())
}

fn write_v3000_ctab<W: Write>(out: &mut W, conformer: &Conformer) -> std::io::Result<()> {
    let mol = &conformer.molecule;
    writeln!(out, "  0  0  0     0  0            999 V3000")?;
    writeln!(out, "M  V30 BEGIN CTAB")?;
    writeln!(out, "M  V30 COUNTS {} {} 0 0 0", mol.atom_count(), mol.bond_count())?;

    writeln!(out, "M  V30 BEGIN ATOM")?;
    for (i, (atom, pos)) in mol.atoms().iter().zip(&conformer.positions).enumerate() {
        write!(
            out,
            "M  V30 {} {} {:.4} {:.4} {:.4} 0",
            i + 1,
            atom.element.symbol(),
            pos.x,
            pos.y,
            pos.z
        )?;
        if atom.charge != 0 {
            write!(out, " CHG={}", atom.charge)?;
        }
        if let Some(isotope) = atom.isotope {
            write!(out, " MASS={isotope}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "M  V30 END ATOM")?;

    writeln!(out, "M  V30 BEGIN BOND")?;
    for (i, bond) in mol.bonds().iter().enumerate() {
        writeln!(
            out,
            "M  V30 {} {} {} {}",
            i + 1,
            bond_type(bond.order),
            bond.begin + 1,
            bond.end + 1
        )?;
    }
    writeln!(out, "M  V30 END BOND")?;
    writeln!(out, "M  V30 END CTAB")?;
    Ok(())
}

/// Writes `conformer` to a new file at `path`. The file is flushed before
/// returning and closed on every exit path.
pub fn write_sdf_file(conformer: &Conformer, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ChemError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_sdf(&mut out, conformer).map_err(|e| ChemError::io(path, e))?;
    out.flush().map_err(|e| ChemError::io(path, e))?;
    Ok(())
}
