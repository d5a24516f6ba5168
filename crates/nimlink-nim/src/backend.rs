//! The NIM capability trait and the types shared by every backend.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NimError, Result};

// ── Backend tag ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NimKind {
    EsmFold,
    DiffDock,
    AlphaFold,
}

impl NimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NimKind::EsmFold => "esmfold",
            NimKind::DiffDock => "diffdock",
            NimKind::AlphaFold => "alphafold",
        }
    }
}

impl fmt::Display for NimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NimKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esmfold" => Ok(NimKind::EsmFold),
            "diffdock" => Ok(NimKind::DiffDock),
            "alphafold" => Ok(NimKind::AlphaFold),
            other => Err(format!("unknown NIM backend '{other}'")),
        }
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

/// What a backend is asked to predict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictInput {
    /// A single amino-acid sequence (folding backends).
    Sequence(String),
    /// A protein/ligand pair given as structure files (docking backends).
    Docking { protein: PathBuf, ligand: PathBuf },
}

/// A decoded JSON response together with its HTTP status. Non-2xx bodies
/// are returned too, so callers decide what a failure means.
#[derive(Debug, Clone, PartialEq)]
pub struct NimResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl NimResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client-side settings applied to every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    pub(crate) fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Removes one trailing `/` from `url`, if present.
pub fn clean_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Nim: Send + Sync {
    fn kind(&self) -> NimKind;

    /// Base URL without a trailing slash.
    fn base_url(&self) -> &str;

    fn health_check_url(&self) -> String;

    fn http(&self) -> &reqwest::Client;

    /// GETs the readiness endpoint; healthy when the body reads `true`.
    async fn check_health(&self) -> Result<bool> {
        let url = self.health_check_url();
        let body = self.http().get(&url).send().await?.text().await?;
        let healthy = body.trim() == "true";
        if healthy {
            info!(backend = %self.kind(), url = %url, "Health check passed");
        } else {
            warn!(backend = %self.kind(), url = %url, body = body.trim(), "Health check failed");
        }
        Ok(healthy)
    }

    async fn predict(&self, input: PredictInput) -> Result<NimResponse>;
}

// ── Helper: POST JSON and decode whatever comes back ──────────────────────────

pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<NimResponse> {
    let resp = client.post(url).json(body).send().await?;
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status == 200 {
        info!(url, "Request successful");
    } else {
        warn!(url, status, response = %text, "Request failed");
    }
    let body = serde_json::from_str(&text).map_err(|source| NimError::Decode {
        url: url.to_string(),
        status,
        source,
    })?;
    Ok(NimResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_url_strips_one_slash() {
        assert_eq!(clean_url("http://x/"), "http://x");
        assert_eq!(clean_url("http://x"), "http://x");
        assert_eq!(clean_url("http://x//"), "http://x/");
        assert_eq!(clean_url(""), "");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("ESMFold".parse::<NimKind>().unwrap(), NimKind::EsmFold);
        assert_eq!("diffdock".parse::<NimKind>().unwrap(), NimKind::DiffDock);
        assert!("rosetta".parse::<NimKind>().is_err());
        assert_eq!(NimKind::AlphaFold.to_string(), "alphafold");
    }

    #[test]
    fn test_response_success_range() {
        let ok = NimResponse {
            status: 204,
            body: serde_json::Value::Null,
        };
        let bad = NimResponse {
            status: 422,
            body: serde_json::Value::Null,
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
