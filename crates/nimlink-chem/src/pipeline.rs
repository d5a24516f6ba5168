//! SMILES → SDF conversion: validate, deduplicate by canonical form, embed,
//! optimise and write one file per unique molecule.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conformer::Conformer;
use crate::embed::{embed, EmbedOptions};
use crate::error::{ChemError, Result};
use crate::forcefield::ForceField;
use crate::hydrogens::add_hydrogens;
use crate::molecule::Molecule;

pub use crate::sdf::write_sdf_file;

/// Result of checking one input string.
#[derive(Debug, Clone)]
pub enum SmilesValidation {
    Valid(Molecule),
    Invalid { reason: String },
}

impl SmilesValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SmilesValidation::Valid(_))
    }
}

/// Parses and sanitizes `smiles`. Never fails; problems are reported as
/// [`SmilesValidation::Invalid`].
pub fn validate_smiles(smiles: &str) -> SmilesValidation {
    match Molecule::from_smiles(smiles) {
        Ok(mol) => {
            info!(smiles, "Valid SMILES");
            SmilesValidation::Valid(mol)
        }
        Err(e) => {
            let reason = e.to_string();
            warn!(smiles, %reason, "Invalid SMILES");
            SmilesValidation::Invalid { reason }
        }
    }
}

/// Canonical SMILES of every molecule with duplicates collapsed, in sorted
/// order.
pub fn canonicalize_unique(molecules: &[Molecule]) -> Vec<String> {
    let unique: BTreeSet<String> = molecules.iter().map(Molecule::to_canonical_smiles).collect();
    if unique.len() < molecules.len() {
        warn!(
            removed = molecules.len() - unique.len(),
            "Duplicates removed from the list of SMILES"
        );
    }
    unique.into_iter().collect()
}

/// Builds a relaxed 3-D conformer with explicit hydrogens for `smiles`.
pub fn embed_and_optimize(smiles: &str, options: &EmbedOptions) -> Result<Conformer> {
    let mol = add_hydrogens(&Molecule::from_smiles(smiles)?);
    let mut positions = embed(&mol, options).ok_or_else(|| ChemError::Embedding {
        smiles: smiles.to_string(),
        attempts: options.max_attempts,
    })?;

    let result = ForceField::new(&mol).optimize(&mut positions, options.max_iterations);
    if positions.iter().any(|p| !p.iter().all(|v| v.is_finite())) {
        return Err(ChemError::Embedding {
            smiles: smiles.to_string(),
            attempts: options.max_attempts,
        });
    }

    let mut conformer = Conformer::new(mol, positions, smiles);
    conformer.energy = Some(result.energy);
    Ok(conformer)
}

/// What to do when embedding or writing one molecule fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and return the error.
    #[default]
    Abort,
    /// Log, record in the report and continue with the next molecule.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    pub embed: EmbedOptions,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidInput {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMolecule {
    pub smiles: String,
    pub error: String,
}

/// Summary of one [`convert_smiles_to_sdf`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Written files in index order.
    pub output_files: Vec<PathBuf>,
    pub invalid: Vec<InvalidInput>,
    pub duplicates_removed: usize,
    /// Molecules skipped under [`FailurePolicy::Skip`].
    pub failed: Vec<FailedMolecule>,
}

/// Converts `smiles` into `molecule_{i}.sdf` files inside `output_dir`.
///
/// The directory must already exist. Invalid inputs are reported, not
/// raised; embedding and write failures follow `options.failure_policy`.
pub fn convert_smiles_to_sdf<S: AsRef<str>>(
    smiles: &[S],
    output_dir: &Path,
    options: &ConversionOptions,
) -> Result<ConversionReport> {
    let mut report = ConversionReport::default();

    let mut molecules = Vec::with_capacity(smiles.len());
    for input in smiles {
        let input = input.as_ref();
        match validate_smiles(input) {
            SmilesValidation::Valid(mol) => molecules.push(mol),
            SmilesValidation::Invalid { reason } => report.invalid.push(InvalidInput {
                input: input.to_string(),
                reason,
            }),
        }
    }

    let unique = canonicalize_unique(&molecules);
    report.duplicates_removed = molecules.len() - unique.len();

    for canonical in &unique {
        let path = output_dir.join(format!("molecule_{}.sdf", report.output_files.len()));
        let written = embed_and_optimize(canonical, &options.embed)
            .and_then(|conformer| write_sdf_file(&conformer, &path));
        match (written, options.failure_policy) {
            (Ok(()), _) => {
                info!(smiles = %canonical, path = %path.display(), "Wrote 3D structure");
                report.output_files.push(path);
            }
            (Err(e), FailurePolicy::Abort) => return Err(e),
            (Err(e), FailurePolicy::Skip) => {
                warn!(smiles = %canonical, error = %e, "Skipping molecule");
                report.failed.push(FailedMolecule {
                    smiles: canonical.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        written = report.output_files.len(),
        invalid = report.invalid.len(),
        duplicates = report.duplicates_removed,
        failed = report.failed.len(),
        "Conversion finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_validate_reports_reason() {
        match validate_smiles("C1CC") {
            SmilesValidation::Invalid { reason } => assert!(reason.contains("unclosed ring")),
            other => panic!("expected invalid, got {other:?}"),
        }
        assert!(validate_smiles("CC(=O)O").is_valid());
        assert!(!validate_smiles("").is_valid());
    }

    #[test]
    fn test_canonicalize_unique_is_sorted() {
        let mols: Vec<Molecule> = ["OCC", "CCO", "C", "c1ccccc1", "C1=CC=CC=C1"]
            .iter()
            .map(|s| Molecule::from_smiles(s).unwrap())
            .collect();
        let unique = canonicalize_unique(&mols);
        assert_eq!(unique.len(), 3);
        let mut sorted = unique.clone();
        sorted.sort();
        assert_eq!(unique, sorted);
    }

    #[test]
    fn test_failure_policy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let w: Wrapper = serde_json::from_str(r#"{"policy":"skip"}"#).unwrap();
        assert_eq!(w.policy, FailurePolicy::Skip);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }

    #[test]
    fn test_embed_and_optimize_adds_hydrogens() {
        let options = EmbedOptions {
            random_seed: Some(11),
            ..EmbedOptions::default()
        };
        let conformer = embed_and_optimize("CC", &options).unwrap();
        assert_eq!(conformer.molecule.atom_count(), 8);
        assert_eq!(conformer.positions.len(), 8);
        assert_eq!(conformer.title, "CC");
        assert!(conformer.energy.is_some());
    }
}
