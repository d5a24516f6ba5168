use std::convert::Infallible;

use async_trait::async_trait;

use crate::backend::{ClientOptions, Nim, NimKind, NimResponse, PredictInput};
use crate::error::{NimError, Result};

/// Placeholder for an AlphaFold backend. The type has no values: the
/// constructor always fails.
pub struct AlphaFoldNim {
    never: Infallible,
}

impl AlphaFoldNim {
    pub fn new(_base_url: &str, _options: &ClientOptions) -> Result<Self> {
        Err(NimError::NotImplemented("AlphaFold"))
    }
}

#[async_trait]
impl Nim for AlphaFoldNim {
    fn kind(&self) -> NimKind {
        NimKind::AlphaFold
    }

    fn base_url(&self) -> &str {
        match self.never {}
    }

    fn health_check_url(&self) -> String {
        match self.never {}
    }

    fn http(&self) -> &reqwest::Client {
        match self.never {}
    }

    async fn predict(&self, _input: PredictInput) -> Result<NimResponse> {
        match self.never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_always_fails() {
        for url in ["http://localhost:8000", "", "not a url"] {
            let err = AlphaFoldNim::new(url, &ClientOptions::default()).err();
            assert!(matches!(err, Some(NimError::NotImplemented(_))));
        }
    }
}
