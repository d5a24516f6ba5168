use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{clean_url, ClientOptions, Nim, NimKind, NimResponse, PredictInput};
use crate::error::{NimError, Result};

const GENERATE_PATH: &str = "/molecular-docking/diffdock/generate";
const HEALTH_PATH: &str = "/v1/health/ready";

/// Request body for the DiffDock generate endpoint. Structure files are
/// carried inline as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffDockRequest {
    pub ligand: String,
    pub ligand_file_type: String,
    pub protein: String,
    pub num_poses: u32,
    pub time_divisions: u32,
    pub steps: u32,
    /// Keep the diffusion trajectory.
    pub save_trajectory: bool,
    pub is_staged: bool,
}

impl DiffDockRequest {
    pub fn new(protein: impl Into<String>, ligand: impl Into<String>) -> Self {
        Self {
            ligand: ligand.into(),
            ligand_file_type: "sdf".to_string(),
            protein: protein.into(),
            num_poses: 20,
            time_divisions: 20,
            steps: 18,
            save_trajectory: false,
            is_staged: false,
        }
    }

    pub fn from_files(protein: &Path, ligand: &Path) -> Result<Self> {
        let protein = nimlink_chem::read_text_file(protein)?;
        let ligand = nimlink_chem::read_text_file(ligand)?;
        Ok(Self::new(protein, ligand))
    }
}

/// DiffDock protein-ligand docking. Only the health check is wired up.
pub struct DiffDockNim {
    base_url: String,
    client: reqwest::Client,
}

impl DiffDockNim {
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            base_url: clean_url(base_url),
            client: options.build_client()?,
        })
    }

    pub fn query_url(&self) -> String {
        format!("{}{GENERATE_PATH}", self.base_url)
    }
}

#[async_trait]
impl Nim for DiffDockNim {
    fn kind(&self) -> NimKind {
        NimKind::DiffDock
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

    async fn predict(&self, _input: PredictInput) -> Result<NimResponse> {
        Err(NimError::NotImplemented("DiffDock prediction"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_urls() {
        let nim = DiffDockNim::new("http://dock:9000/", &ClientOptions::default()).unwrap();
        assert_eq!(nim.health_check_url(), "http://dock:9000/v1/health/ready");
        assert_eq!(
            nim.query_url(),
            "http://dock:9000/molecular-docking/diffdock/generate"
        );
    }

    #[test]
    fn test_request_defaults() {
        let body = serde_json::to_value(DiffDockRequest::new("ATOM", "$$$$")).unwrap();
        assert_eq!(
            body,
            json!({
                "ligand": "$$$$",
                "ligand_file_type": "sdf",
                "protein": "ATOM",
                "num_poses": 20,
                "time_divisions": 20,
                "steps": 18,
                "save_trajectory": false,
                "is_staged": false,
            })
        );
    }

    #[test]
    fn test_request_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let protein = dir.path().join("p.pdb");
        let ligand = dir.path().join("l.sdf");
        std::fs::write(&protein, "ATOM      1  N   MET A   1\n").unwrap();
        std::fs::write(&ligand, "ethanol\n$$$$\n").unwrap();
        let req = DiffDockRequest::from_files(&protein, &ligand).unwrap();
        assert_eq!(req.protein, "ATOM      1  N   MET A   1\n");
        assert_eq!(req.ligand, "ethanol\n$$$$\n");
    }

    #[test]
    fn test_request_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdb");
        let err = DiffDockRequest::from_files(&missing, &missing).unwrap_err();
        assert!(matches!(err, NimError::Chem(_)));
    }
}
