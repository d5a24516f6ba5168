//! nimlink-chem: the chemistry behind the SMILES → SDF conversion pipeline.
//!
//! SMILES strings are parsed and sanitized into a [`Molecule`], written back
//! out in canonical form for deduplication, given explicit hydrogens and 3-D
//! coordinates by distance geometry, relaxed with a UFF force field and
//! exported as SD files.
//!
//! ```no_run
//! use std::path::Path;
//! use nimlink_chem::{convert_smiles_to_sdf, prepare_output_directory, ConversionOptions};
//!
//! # fn main() -> nimlink_chem::Result<()> {
//! let out = Path::new("output");
//! prepare_output_directory(out)?;
//! let report = convert_smiles_to_sdf(&["CCO", "OCC"], out, &ConversionOptions::default())?;
//! assert_eq!(report.output_files.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod canon;
pub mod conformer;
pub mod element;
pub mod embed;
pub mod error;
pub mod forcefield;
pub mod hydrogens;
pub mod io;
pub mod minimize;
pub mod molecule;
pub mod pipeline;
pub mod rings;
pub mod sanitize;
pub mod sdf;
pub mod smiles;

pub use canon::canonical_smiles;
pub use conformer::Conformer;
pub use element::Element;
pub use embed::EmbedOptions;
pub use error::{ChemError, Result, SmilesError};
pub use io::{prepare_output_directory, read_text_file};
pub use molecule::{Atom, Bond, BondDirection, BondOrder, Chirality, DoubleBondStereo, Molecule};
pub use pipeline::{
    canonicalize_unique, convert_smiles_to_sdf, embed_and_optimize, validate_smiles,
    ConversionOptions, ConversionReport, FailurePolicy, SmilesValidation,
};
pub use sdf::write_sdf_file;
