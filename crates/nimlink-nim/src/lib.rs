//! HTTP clients for NIM inference endpoints.
//!
//! Backends:
//!   EsmFoldNim    protein structure prediction from one sequence
//!   DiffDockNim   protein-ligand docking (health check only)
//!   AlphaFoldNim  not implemented; construction always fails

pub mod alphafold;
pub mod backend;
pub mod diffdock;
pub mod error;
pub mod esmfold;

pub use alphafold::AlphaFoldNim;
pub use backend::{clean_url, ClientOptions, Nim, NimKind, NimResponse, PredictInput};
pub use diffdock::{DiffDockNim, DiffDockRequest};
pub use error::{NimError, Result};
pub use esmfold::EsmFoldNim;

/// Builds the backend for `kind` behind the common [`Nim`] interface.
pub fn build_nim(kind: NimKind, base_url: &str, options: &ClientOptions) -> Result<Box<dyn Nim>> {
    tracing::debug!(backend = %kind, base_url, "building NIM client");
    Ok(match kind {
        NimKind::EsmFold => Box::new(EsmFoldNim::new(base_url, options)?),
        NimKind::DiffDock => Box::new(DiffDockNim::new(base_url, options)?),
        NimKind::AlphaFold => Box::new(AlphaFoldNim::new(base_url, options)?),
    })
}
