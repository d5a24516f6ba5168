use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::element::Element;

/// A SMILES syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct SmilesError {
    pub position: usize,
    pub message: String,
}

impl SmilesError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChemError {
    #[error("SMILES parse error: {0}")]
    Smiles(#[from] SmilesError),

    #[error("explicit valence {valence} for atom #{atom} {element} is greater than permitted")]
    Valence {
        atom: usize,
        element: Element,
        valence: u32,
    },

    #[error("can't kekulize molecule: {0}")]
    Kekulize(String),

    #[error("non-ring atom #{0} marked aromatic")]
    NonRingAromatic(usize),

    #[error("embedding failed for '{smiles}' after {attempts} attempt(s)")]
    Embedding { smiles: String, attempts: u32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

impl ChemError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChemError>;
