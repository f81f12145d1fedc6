//! Interactive state over a loaded case: navigation, per-view filters, file
//! import checks and the export job.

pub mod export;
pub mod navigation;
pub mod upload;
pub mod views;

use crate::pipeline::resolver::MissingRefPolicy;
use crate::session::export::ExportSettings;
use crate::session::upload::UploadPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub missing_refs: MissingRefPolicy,
    pub default_threshold: u8,
    pub page_limit: usize,
    pub top_pois: usize,
    pub timeline_preview: usize,
    pub upload: UploadPolicy,
    pub export: ExportSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            missing_refs: MissingRefPolicy::default(),
            default_threshold: 50,
            page_limit: 100,
            top_pois: 5,
            timeline_preview: 5,
            upload: UploadPolicy::default(),
            export: ExportSettings::default(),
        }
    }
}
