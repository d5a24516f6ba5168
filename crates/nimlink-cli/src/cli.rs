use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nimlink_nim::NimKind;

#[derive(Parser)]
#[command(
    name = "nimlink",
    about = "SMILES to 3-D SDF conversion and NIM inference clients",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert SMILES strings into one SDF file per unique molecule
    Convert(ConvertArgs),

    /// Check whether a NIM endpoint is ready
    Health(HealthArgs),

    /// Predict a protein structure with ESMFold
    Fold(FoldArgs),

    /// Print the DiffDock request body for a protein/ligand pair
    DiffdockRequest(DiffDockArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// SMILES strings to convert
    #[arg(value_name = "SMILES")]
    pub smiles: Vec<String>,

    /// File with one SMILES per line (blank lines and '#' comments ignored)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output directory; emptied before writing
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Random seed for reproducible embeddings
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip molecules that fail to embed instead of aborting
    #[arg(long)]
    pub skip_failures: bool,

    /// Print the conversion report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct HealthArgs {
    /// Backend to query (esmfold, diffdock, alphafold)
    #[arg(short, long, default_value = "esmfold")]
    pub backend: NimKind,

    /// Base URL, overriding the configured one
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

#[derive(Args)]
pub struct FoldArgs {
    /// Amino-acid sequence
    #[arg(short, long)]
    pub sequence: String,

    /// Base URL, overriding the configured one
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Write the JSON response here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffDockArgs {
    /// Protein structure file (PDB)
    #[arg(long, value_name = "FILE")]
    pub protein: PathBuf,

    /// Ligand structure file (SDF)
    #[arg(long, value_name = "FILE")]
    pub ligand: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "nimlink", "convert", "CCO", "OCC", "--output", "out", "--seed", "7", "--skip-failures",
        ])
        .unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.smiles, vec!["CCO", "OCC"]);
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(args.seed, Some(7));
        assert!(args.skip_failures);
    }

    #[test]
    fn test_parse_health_backend() {
        let cli = Cli::try_parse_from(["nimlink", "health", "--backend", "diffdock"]).unwrap();
        let Command::Health(args) = cli.command else {
            panic!("expected health");
        };
        assert_eq!(args.backend, NimKind::DiffDock);
        assert!(Cli::try_parse_from(["nimlink", "health", "--backend", "rosetta"]).is_err());
    }
}
