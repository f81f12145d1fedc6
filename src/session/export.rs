//! Simulated case export: `config → progress → complete`, plus `error`.
//!
//! No file bytes are produced. A finished job lists the files a real export
//! would contain, each stamped with a digest of the request that produced it.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::error::CaseError;
use crate::core::hash::digest_json;
use crate::core::time::now_utc;

pub const NO_EVIDENCE_SELECTED: &str = "no evidence selected";
pub const EXPORT_TIMED_OUT: &str = "export timed out";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Json,
    #[default]
    Both,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
            ExportFormat::Both => "both",
        }
    }

    pub fn includes_pdf(&self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Both)
    }

    pub fn includes_json(&self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::Both)
    }

    pub fn next(self) -> Self {
        match self {
            ExportFormat::Pdf => ExportFormat::Json,
            ExportFormat::Json => ExportFormat::Both,
            ExportFormat::Both => ExportFormat::Pdf,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            "both" => Ok(ExportFormat::Both),
            _ => Err(CaseError::Parse {
                kind: "export format",
                value: value.to_string(),
            }),
        }
    }
}

/// One checkbox of the export panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportOption {
    Summary,
    Timeline,
    Pois,
    MediaInventory,
    Messages,
    Hashes,
    MediaThumbnails,
    RedactPii,
    RawLogs,
}

impl ExportOption {
    pub const ALL: [ExportOption; 9] = [
        ExportOption::Summary,
        ExportOption::Timeline,
        ExportOption::Pois,
        ExportOption::MediaInventory,
        ExportOption::Messages,
        ExportOption::Hashes,
        ExportOption::MediaThumbnails,
        ExportOption::RedactPii,
        ExportOption::RawLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportOption::Summary => "summary",
            ExportOption::Timeline => "timeline",
            ExportOption::Pois => "pois",
            ExportOption::MediaInventory => "media_inventory",
            ExportOption::Messages => "messages",
            ExportOption::Hashes => "hashes",
            ExportOption::MediaThumbnails => "media_thumbnails",
            ExportOption::RedactPii => "redact_pii",
            ExportOption::RawLogs => "raw_logs",
        }
    }

    /// Evidence categories, as opposed to presentation extras.
    pub fn is_evidence(&self) -> bool {
        !matches!(
            self,
            ExportOption::MediaThumbnails | ExportOption::RedactPii | ExportOption::RawLogs
        )
    }
}

impl FromStr for ExportOption {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase().replace('-', "_");
        ExportOption::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == wanted)
            .ok_or_else(|| CaseError::Parse {
                kind: "export option",
                value: value.to_string(),
            })
    }
}

/// The option panel; serialized as-is into the export request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportOptions {
    pub summary: bool,
    pub timeline: bool,
    pub pois: bool,
    pub media_inventory: bool,
    pub messages: bool,
    pub hashes: bool,
    pub media_thumbnails: bool,
    pub redact_pii: bool,
    pub raw_logs: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            summary: true,
            timeline: true,
            pois: true,
            media_inventory: true,
            messages: true,
            hashes: true,
            media_thumbnails: true,
            redact_pii: false,
            raw_logs: false,
        }
    }
}

impl ExportOptions {
    fn slot(&mut self, option: ExportOption) -> &mut bool {
        match option {
            ExportOption::Summary => &mut self.summary,
            ExportOption::Timeline => &mut self.timeline,
            ExportOption::Pois => &mut self.pois,
            ExportOption::MediaInventory => &mut self.media_inventory,
            ExportOption::Messages => &mut self.messages,
            ExportOption::Hashes => &mut self.hashes,
            ExportOption::MediaThumbnails => &mut self.media_thumbnails,
            ExportOption::RedactPii => &mut self.redact_pii,
            ExportOption::RawLogs => &mut self.raw_logs,
        }
    }

    pub fn get(&self, option: ExportOption) -> bool {
        match option {
            ExportOption::Summary => self.summary,
            ExportOption::Timeline => self.timeline,
            ExportOption::Pois => self.pois,
            ExportOption::MediaInventory => self.media_inventory,
            ExportOption::Messages => self.messages,
            ExportOption::Hashes => self.hashes,
            ExportOption::MediaThumbnails => self.media_thumbnails,
            ExportOption::RedactPii => self.redact_pii,
            ExportOption::RawLogs => self.raw_logs,
        }
    }

    pub fn set(&mut self, option: ExportOption, value: bool) {
        *self.slot(option) = value;
    }

    pub fn any_evidence(&self) -> bool {
        ExportOption::ALL
            .iter()
            .filter(|o| o.is_evidence())
            .any(|o| self.get(*o))
    }
}

/// Request payload a backend would receive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRequest {
    pub case_id: String,
    pub format: ExportFormat,
    pub options: ExportOptions,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Config,
    Progress,
    Complete,
    Error,
}

impl ExportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStage::Config => "config",
            ExportStage::Progress => "progress",
            ExportStage::Complete => "complete",
            ExportStage::Error => "error",
        }
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub format: ExportFormat,
    pub generated_at: DateTime<Utc>,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub tick: Duration,
    /// Percentage points added per tick.
    pub step: u8,
    pub completion_delay: Duration,
    pub max_ticks: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(800),
            step: 20,
            completion_delay: Duration::from_millis(500),
            max_ticks: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced(u8),
    /// Progress is at 100; completion follows after the configured delay.
    ReadyToComplete,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExportEvent {
    Started,
    Progress { percent: u8, seconds_remaining: u32 },
    Completed { files: Vec<ExportFile> },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportJob {
    case_id: String,
    #[serde(skip)]
    settings: ExportSettings,
    stage: ExportStage,
    format: ExportFormat,
    options: ExportOptions,
    progress: u8,
    ticks: u32,
    error: Option<String>,
    files: Vec<ExportFile>,
}

impl ExportJob {
    pub fn new(case_id: impl Into<String>, settings: ExportSettings) -> Self {
        Self {
            case_id: case_id.into(),
            settings,
            stage: ExportStage::Config,
            format: ExportFormat::default(),
            options: ExportOptions::default(),
            progress: 0,
            ticks: 0,
            error: None,
            files: Vec::new(),
        }
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn stage(&self) -> ExportStage {
        self.stage
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn files(&self) -> &[ExportFile] {
        &self.files
    }

    fn require(&self, action: &'static str, allowed: &[ExportStage]) -> Result<(), CaseError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(CaseError::InvalidTransition {
                action,
                stage: self.stage.as_str(),
            })
        }
    }

    pub fn set_format(&mut self, format: ExportFormat) -> Result<(), CaseError> {
        self.require("change format", &[ExportStage::Config])?;
        self.format = format;
        Ok(())
    }

    pub fn set_option(&mut self, option: ExportOption, value: bool) -> Result<(), CaseError> {
        self.require("change options", &[ExportStage::Config])?;
        self.options.set(option, value);
        Ok(())
    }

    pub fn request(&self) -> ExportRequest {
        ExportRequest {
            case_id: self.case_id.clone(),
            format: self.format,
            options: self.options.clone(),
        }
    }

    /// Starts the job. With no evidence category selected the job moves
    /// straight to `Error`.
    pub fn generate(&mut self) -> Result<(), CaseError> {
        self.require("generate", &[ExportStage::Config])?;
        if !self.options.any_evidence() {
            self.fail(NO_EVIDENCE_SELECTED);
            return Ok(());
        }
        self.progress = 0;
        self.ticks = 0;
        self.stage = ExportStage::Progress;
        tracing::info!(case = %self.case_id, format = %self.format, "export started");
        Ok(())
    }

    pub fn tick(&mut self) -> Result<TickOutcome, CaseError> {
        self.require("advance", &[ExportStage::Progress])?;
        if self.progress >= 100 {
            return Ok(TickOutcome::ReadyToComplete);
        }
        self.ticks += 1;
        if self.ticks > self.settings.max_ticks {
            self.fail(EXPORT_TIMED_OUT);
            return Ok(TickOutcome::Failed(EXPORT_TIMED_OUT.to_string()));
        }
        self.progress = self.progress.saturating_add(self.settings.step).min(100);
        tracing::debug!(progress = self.progress, tick = self.ticks, "export progress");
        if self.progress >= 100 {
            Ok(TickOutcome::ReadyToComplete)
        } else {
            Ok(TickOutcome::Advanced(self.progress))
        }
    }

    pub fn complete(&mut self) -> Result<(), CaseError> {
        self.require("complete", &[ExportStage::Progress])?;
        if self.progress < 100 {
            return Err(CaseError::InvalidTransition {
                action: "complete",
                stage: "progress below 100",
            });
        }
        let digest = digest_json(&self.request())?;
        let generated_at = now_utc();
        let mut files = Vec::new();
        if self.format.includes_pdf() {
            files.push(ExportFile {
                name: format!("Case_{}_Report.pdf", self.case_id),
                format: ExportFormat::Pdf,
                generated_at,
                sha256: digest.clone(),
            });
        }
        if self.format.includes_json() {
            files.push(ExportFile {
                name: format!("Case_{}_Data.json", self.case_id),
                format: ExportFormat::Json,
                generated_at,
                sha256: digest,
            });
        }
        self.files = files;
        self.stage = ExportStage::Complete;
        tracing::info!(case = %self.case_id, files = self.files.len(), "export complete");
        Ok(())
    }

    fn fail(&mut self, reason: &str) {
        tracing::warn!(case = %self.case_id, reason, "export failed");
        self.error = Some(reason.to_string());
        self.stage = ExportStage::Error;
    }

    /// Back to `Config` with every panel default restored.
    pub fn reset(&mut self) -> Result<(), CaseError> {
        self.require("reset", &[ExportStage::Complete, ExportStage::Error])?;
        *self = Self::new(std::mem::take(&mut self.case_id), self.settings);
        Ok(())
    }

    pub fn seconds_remaining(&self) -> u32 {
        let elapsed = (f64::from(self.progress) / 6.0).round() as i64;
        (15 - elapsed).max(0) as u32
    }

    fn progress_event(&self) -> ExportEvent {
        ExportEvent::Progress {
            percent: self.progress,
            seconds_remaining: self.seconds_remaining(),
        }
    }
}

/// Drives `job` from `Config` to a terminal stage on a tokio interval,
/// reporting each step on `events`. A closed receiver does not stop the job.
pub async fn run_export(
    mut job: ExportJob,
    events: mpsc::Sender<ExportEvent>,
) -> Result<ExportJob, CaseError> {
    job.generate()?;
    if let Some(reason) = job.error() {
        let _ = events
            .send(ExportEvent::Failed {
                reason: reason.to_string(),
            })
            .await;
        return Ok(job);
    }
    let _ = events.send(ExportEvent::Started).await;

    let mut interval = tokio::time::interval(job.settings.tick);
    // the first tick of a tokio interval fires immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        match job.tick()? {
            TickOutcome::Advanced(_) => {
                let _ = events.send(job.progress_event()).await;
            }
            TickOutcome::ReadyToComplete => {
                let _ = events.send(job.progress_event()).await;
                tokio::time::sleep(job.settings.completion_delay).await;
                job.complete()?;
                let _ = events
                    .send(ExportEvent::Completed {
                        files: job.files.clone(),
                    })
                    .await;
                break;
            }
            TickOutcome::Failed(reason) => {
                let _ = events.send(ExportEvent::Failed { reason }).await;
                break;
            }
        }
    }
    Ok(job)
}

/// Wall-clock pacing for callers that poll instead of awaiting, such as the
/// terminal UI's draw loop.
#[derive(Debug, Clone)]
pub struct ExportClock {
    last_tick: Instant,
    ready_since: Option<Instant>,
}

impl ExportClock {
    pub fn start(now: Instant) -> Self {
        Self {
            last_tick: now,
            ready_since: None,
        }
    }

    /// Advances `job` if a tick or the completion delay has elapsed at `now`.
    pub fn poll(
        &mut self,
        job: &mut ExportJob,
        now: Instant,
    ) -> Result<Option<ExportEvent>, CaseError> {
        if job.stage() != ExportStage::Progress {
            return Ok(None);
        }
        if let Some(ready) = self.ready_since {
            if now.duration_since(ready) >= job.settings.completion_delay {
                job.complete()?;
                self.ready_since = None;
                return Ok(Some(ExportEvent::Completed {
                    files: job.files.clone(),
                }));
            }
            return Ok(None);
        }
        if now.duration_since(self.last_tick) < job.settings.tick {
            return Ok(None);
        }
        self.last_tick = now;
        match job.tick()? {
            TickOutcome::Advanced(_) => Ok(Some(job.progress_event())),
            TickOutcome::ReadyToComplete => {
                self.ready_since = Some(now);
                Ok(Some(job.progress_event()))
            }
            TickOutcome::Failed(reason) => Ok(Some(ExportEvent::Failed { reason })),
        }
    }
}
