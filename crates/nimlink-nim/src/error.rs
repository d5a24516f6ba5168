use thiserror::Error;

use crate::backend::NimKind;

#[derive(Debug, Error)]
pub enum NimError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response from {url} (status {status}) is not valid JSON: {source}")]
    Decode {
        url: String,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),

    #[error("invalid input for {backend}: {message}")]
    InvalidInput { backend: NimKind, message: String },

    #[error(transparent)]
    Chem(#[from] nimlink_chem::ChemError),
}

pub type Result<T> = std::result::Result<T, NimError>;
