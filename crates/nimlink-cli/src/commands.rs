//! Subcommand handlers.

use std::path::Path;

use anyhow::{bail, Context};
use nimlink_chem::{
    convert_smiles_to_sdf, prepare_output_directory, read_text_file, FailurePolicy,
};
use nimlink_nim::{build_nim, DiffDockRequest, EsmFoldNim, NimKind};
use tracing::info;

use crate::cli::{ConvertArgs, DiffDockArgs, FoldArgs, HealthArgs};
use crate::config::Config;

/// SMILES from a file: one per line, first whitespace-separated token,
/// skipping blank lines and `#` comments.
pub fn smiles_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

pub fn convert(config: &Config, args: ConvertArgs) -> anyhow::Result<()> {
    let mut smiles = args.smiles;
    if let Some(path) = &args.input {
        let text = read_text_file(path)?;
        smiles.extend(smiles_from_text(&text));
    }
    if smiles.is_empty() {
        bail!("no SMILES given; pass them as arguments or with --input");
    }

    let output = args
        .output
        .unwrap_or_else(|| config.conversion.output_dir.clone());
    let mut options = config.conversion.options();
    if args.seed.is_some() {
        options.embed.random_seed = args.seed;
    }
    if args.skip_failures {
        options.failure_policy = FailurePolicy::Skip;
    }

    prepare_output_directory(&output)
        .with_context(|| format!("preparing {}", output.display()))?;
    let report = convert_smiles_to_sdf(&smiles, &output, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in &report.output_files {
            println!("{}", path.display());
        }
    }
    info!(
        inputs = smiles.len(),
        written = report.output_files.len(),
        output = %output.display(),
        "convert done"
    );
    Ok(())
}

fn configured_url(config: &Config, kind: NimKind) -> anyhow::Result<&str> {
    match kind {
        NimKind::EsmFold => Ok(&config.nim.esmfold_url),
        NimKind::DiffDock => Ok(&config.nim.diffdock_url),
        NimKind::AlphaFold => bail!("no URL is configured for {kind}"),
    }
}

pub async fn health(config: &Config, args: HealthArgs) -> anyhow::Result<()> {
    let url = match &args.url {
        Some(url) => url.as_str(),
        None => configured_url(config, args.backend)?,
    };
    let nim = build_nim(args.backend, url, &config.nim.client_options())?;
    let healthy = nim
        .check_health()
        .await
        .with_context(|| format!("querying {}", nim.health_check_url()))?;
    if !healthy {
        bail!("{} at {} is not ready", args.backend, nim.base_url());
    }
    println!("{} at {} is ready", args.backend, nim.base_url());
    Ok(())
}

pub async fn fold(config: &Config, args: FoldArgs) -> anyhow::Result<()> {
    let url = args.url.as_deref().unwrap_or(&config.nim.esmfold_url);
    let nim = EsmFoldNim::new(url, &config.nim.client_options())?;
    let response = nim.fold(&args.sequence).await?;
    let rendered = serde_json::to_string_pretty(&response.body)?;
    match &args.out {
        Some(path) => write_output(path, &rendered)?,
        None => println!("{rendered}"),
    }
    if !response.is_success() {
        bail!("ESMFold returned status {}", response.status);
    }
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "response saved");
    Ok(())
}

pub fn diffdock_request(args: DiffDockArgs) -> anyhow::Result<()> {
    let request = DiffDockRequest::from_files(&args.protein, &args.ligand)?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_smiles_from_text() {
        let text = "# ligands\nCCO ethanol\n\n  c1ccccc1  \nOCC\n";
        assert_eq!(smiles_from_text(text), vec!["CCO", "c1ccccc1", "OCC"]);
    }

    #[test]
    fn test_convert_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sdf");
        let args = ConvertArgs {
            smiles: vec!["CCO".into(), "OCC".into(), "not_a_smiles".into()],
            input: None,
            output: Some(out.clone()),
            seed: Some(5),
            skip_failures: false,
            json: false,
        };
        convert(&Config::default(), args).unwrap();
        assert!(out.join("molecule_0.sdf").exists());
        assert!(!out.join("molecule_1.sdf").exists());
    }

    #[test]
    fn test_convert_requires_input() {
        let args = ConvertArgs {
            smiles: vec![],
            input: None,
            output: None,
            seed: None,
            skip_failures: false,
            json: false,
        };
        assert!(convert(&Config::default(), args).is_err());
    }

    #[test]
    fn test_alphafold_has_no_configured_url() {
        assert!(configured_url(&Config::default(), NimKind::AlphaFold).is_err());
    }
}
