use async_trait::async_trait;
use serde_json::json;

use crate::backend::{clean_url, post_json, ClientOptions, Nim, NimKind, NimResponse, PredictInput};
use crate::error::{NimError, Result};

const PREDICT_PATH: &str = "/protein-structure/esmfold/predict";
const HEALTH_PATH: &str = "/health/ready";

/// ESMFold single-sequence structure prediction.
pub struct EsmFoldNim {
    base_url: String,
    client: reqwest::Client,
}

impl EsmFoldNim {
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            base_url: clean_url(base_url),
            client: options.build_client()?,
        })
    }

    pub fn query_url(&self) -> String {
        format!("{}{PREDICT_PATH}", self.base_url)
    }

    /// Folds one amino-acid sequence.
    pub async fn fold(&self, sequence: &str) -> Result<NimResponse> {
        post_json(&self.client, &self.query_url(), &json!({ "sequence": sequence })).await
    }
}

#[async_trait]
impl Nim for EsmFoldNim {
    fn kind(&self) -> NimKind {
        NimKind::EsmFold
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn health_check_url(&self) -> String {
        format!("{}{HEALTH_PATH}", self.base_url)
    }

    fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn predict(&self, input: PredictInput) -> Result<NimResponse> {
        match input {
            PredictInput::Sequence(sequence) => self.fold(&sequence).await,
            PredictInput::Docking { .. } => Err(NimError::InvalidInput {
                backend: NimKind::EsmFold,
                message: "expected an amino-acid sequence".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let nim = EsmFoldNim::new("http://localhost:8000/", &ClientOptions::default()).unwrap();
        assert_eq!(nim.base_url(), "http://localhost:8000");
        assert_eq!(
            nim.query_url(),
            "http://localhost:8000/protein-structure/esmfold/predict"
        );
        assert_eq!(nim.health_check_url(), "http://localhost:8000/health/ready");
    }
}
