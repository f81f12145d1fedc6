use std::time::Duration;
use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::core::error::CaseError;
use crate::pipeline::resolver::MissingRefPolicy;
use crate::session::export::ExportSettings;
use crate::session::upload::{UploadPolicy, DEFAULT_MAX_BYTES, MIB};
use crate::session::SessionSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config/cockpit.toml";
pub const DEFAULT_CASE_PATH: &str = "fixtures/case-demo.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub case_path: PathBuf,
    pub missing_refs: MissingRefPolicy,
    pub upload: UploadPolicy,
    pub export: ExportSettings,
    pub views: ViewDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDefaults {
    pub default_threshold: u8,
    pub page_limit: usize,
    pub top_pois: usize,
    pub timeline_preview: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigRaw {
    #[serde(default = "default_case_path")]
    case_path: String,
    #[serde(default)]
    missing_refs: MissingRefPolicy,
    #[serde(default)]
    upload: UploadRaw,
    #[serde(default)]
    export: ExportRaw,
    #[serde(default)]
    views: ViewsRaw,
}

#[derive(Debug, Clone, Deserialize)]
struct UploadRaw {
    #[serde(default = "default_max_bytes")]
    max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportRaw {
    #[serde(default = "default_tick_ms")]
    tick_ms: u64,
    #[serde(default = "default_step")]
    step: u8,
    #[serde(default = "default_completion_delay_ms")]
    completion_delay_ms: u64,
    #[serde(default = "default_max_ticks")]
    max_ticks: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ViewsRaw {
    #[serde(default = "default_threshold")]
    default_threshold: u8,
    #[serde(default = "default_page_limit")]
    page_limit: usize,
    #[serde(default = "default_top_pois")]
    top_pois: usize,
    #[serde(default = "default_timeline_preview")]
    timeline_preview: usize,
}

impl Default for UploadRaw {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl Default for ExportRaw {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            step: default_step(),
            completion_delay_ms: default_completion_delay_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

impl Default for ViewsRaw {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            page_limit: default_page_limit(),
            top_pois: default_top_pois(),
            timeline_preview: default_timeline_preview(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(ConfigRaw {
            case_path: default_case_path(),
            missing_refs: MissingRefPolicy::default(),
            upload: UploadRaw::default(),
            export: ExportRaw::default(),
            views: ViewsRaw::default(),
        })
    }
}

/// Reads the TOML config at `path` (or the default location). A missing file
/// yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CaseError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let cfg = parse_config(&content)?;
    tracing::debug!("config loaded from {}", path.display());
    Ok(cfg)
}

pub fn parse_config(content: &str) -> Result<AppConfig, CaseError> {
    let raw: ConfigRaw = toml::from_str(content)?;
    let cfg = AppConfig::from_raw(raw);
    cfg.validate()?;
    Ok(cfg)
}

impl AppConfig {
    fn from_raw(raw: ConfigRaw) -> Self {
        Self {
            case_path: PathBuf::from(raw.case_path),
            missing_refs: raw.missing_refs,
            upload: UploadPolicy {
                max_bytes: raw.upload.max_bytes,
            },
            export: ExportSettings {
                tick: Duration::from_millis(raw.export.tick_ms),
                step: raw.export.step,
                completion_delay: Duration::from_millis(raw.export.completion_delay_ms),
                max_ticks: raw.export.max_ticks,
            },
            views: ViewDefaults {
                default_threshold: raw.views.default_threshold,
                page_limit: raw.views.page_limit,
                top_pois: raw.views.top_pois,
                timeline_preview: raw.views.timeline_preview,
            },
        }
    }

    pub fn validate(&self) -> Result<(), CaseError> {
        let step = self.export.step;
        if step == 0 || step > 100 {
            return Err(CaseError::Config(format!(
                "export.step must be between 1 and 100, got {step}"
            )));
        }
        if self.export.tick.is_zero() {
            return Err(CaseError::Config("export.tick_ms must be positive".into()));
        }
        let needed = 100u32.div_ceil(u32::from(step));
        if self.export.max_ticks < needed {
            return Err(CaseError::Config(format!(
                "export.max_ticks must be at least {needed} for step {step}"
            )));
        }
        if self.views.default_threshold > 100 {
            return Err(CaseError::Config(
                "views.default_threshold must be at most 100".into(),
            ));
        }
        // the rejection message reports the limit in whole MB
        if self.upload.max_bytes < MIB {
            return Err(CaseError::Config(format!(
                "upload.max_bytes must be at least {MIB} (1 MB)"
            )));
        }
        Ok(())
    }

    /// Replaces the case path when a command-line override is given.
    pub fn with_case_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.case_path = path;
        }
        self
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            missing_refs: self.missing_refs,
            default_threshold: self.views.default_threshold,
            page_limit: self.views.page_limit,
            top_pois: self.views.top_pois,
            timeline_preview: self.views.timeline_preview,
            upload: self.upload,
            export: self.export,
        }
    }
}

fn default_case_path() -> String {
    DEFAULT_CASE_PATH.to_string()
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_tick_ms() -> u64 {
    800
}

fn default_step() -> u8 {
    20
}

fn default_completion_delay_ms() -> u64 {
    500
}

fn default_max_ticks() -> u32 {
    50
}

fn default_threshold() -> u8 {
    50
}

fn default_page_limit() -> usize {
    100
}

fn default_top_pois() -> usize {
    5
}

fn default_timeline_preview() -> usize {
    5
}
