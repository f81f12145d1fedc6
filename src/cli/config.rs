use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::flags::Cli;
use crate::config::{load_config, AppConfig};
use crate::core::store::EvidenceStore;
use crate::pipeline::reporter::OutputFormat;
use crate::session::navigation::Session;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub app: AppConfig,
    pub output: OutputFormat,
}

pub fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let app = load_config(cli.config.as_deref())
        .context("failed to load config")?
        .with_case_path(cli.case.clone());
    Ok(RunConfig {
        app,
        output: cli.output.into(),
    })
}

pub fn load_store(cfg: &RunConfig) -> Result<Arc<EvidenceStore>> {
    let path = &cfg.app.case_path;
    let store = EvidenceStore::from_case_file(path)
        .with_context(|| format!("failed to load case {}", path.display()))?;
    Ok(Arc::new(store))
}

pub fn open_session(cfg: &RunConfig) -> Result<Session> {
    let store = load_store(cfg)?;
    Ok(Session::new(store, cfg.app.session_settings()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    #[test]
    fn case_flag_overrides_config() {
        let cli = Cli::parse_from([
            "sherlock-cockpit",
            "--config",
            "does/not/exist.toml",
            "--case",
            "other.json",
            "summary",
        ]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.app.case_path, PathBuf::from("other.json"));
        assert_eq!(cfg.output, OutputFormat::Text);
    }

    #[test]
    fn missing_case_file_is_reported() {
        let cli = Cli::parse_from([
            "sherlock-cockpit",
            "--config",
            "does/not/exist.toml",
            "--case",
            "does/not/exist.json",
            "summary",
        ]);
        let cfg = resolve_config(&cli).unwrap();
        let err = open_session(&cfg).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
