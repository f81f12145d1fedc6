use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::CaseError;
use crate::core::store::EvidenceStore;
use crate::core::types::{CaseSummary, Media, Message, Poi, TimelineEvent};
use crate::pipeline::filter::{paginate, FilterState};
use crate::pipeline::resolver::{EventEvidence, PoiEvidence, Resolver};
use crate::session::export::ExportJob;
use crate::session::upload::{FileSelection, UploadError};
use crate::session::views::{ChatState, DashboardState, MediaState, PoiState, TimelineState};
use crate::session::SessionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Dashboard,
    Timeline,
    Chat,
    Media,
    Poi,
    Export,
    ImportFile,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Dashboard,
        View::Timeline,
        View::Chat,
        View::Media,
        View::Poi,
        View::Export,
        View::ImportFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Timeline => "timeline",
            View::Chat => "chat",
            View::Media => "media",
            View::Poi => "poi",
            View::Export => "export",
            View::ImportFile => "importFile",
        }
    }

    /// Views that replace the main panel.
    pub fn is_page(&self) -> bool {
        !matches!(self, View::Export | View::ImportFile)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for View {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        View::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CaseError::UnknownView(value.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    None,
    Poi(String),
    Media(String),
    File(FileSelection),
}

#[derive(Debug, PartialEq, Eq)]
pub enum NavOutcome {
    Switched(View),
    ExportOpened,
    /// The selected file passed the size check and is handed to the caller.
    ImportRequested(FileSelection),
    ImportRejected(String),
}

/// One investigator's view of a loaded case.
#[derive(Debug)]
pub struct Session {
    store: Arc<EvidenceStore>,
    settings: SessionSettings,
    current: View,
    dashboard: DashboardState,
    chat: ChatState,
    timeline: TimelineState,
    media: MediaState,
    poi: PoiState,
    export: Option<ExportJob>,
}

impl Session {
    pub fn new(store: Arc<EvidenceStore>, settings: SessionSettings) -> Self {
        Self {
            chat: ChatState::new(settings.page_limit),
            media: MediaState::new(settings.default_threshold),
            store,
            settings,
            current: View::Dashboard,
            dashboard: DashboardState::default(),
            timeline: TimelineState::default(),
            poi: PoiState::default(),
            export: None,
        }
    }

    pub fn store(&self) -> &EvidenceStore {
        &self.store
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn current_view(&self) -> View {
        self.current
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store, self.settings.missing_refs)
    }

    pub fn navigate(&mut self, view: View, payload: Payload) -> Result<NavOutcome, CaseError> {
        match view {
            View::Export => {
                self.expect_no_payload(view, &payload)?;
                self.open_export();
                Ok(NavOutcome::ExportOpened)
            }
            View::ImportFile => {
                let Payload::File(file) = payload else {
                    return Err(CaseError::InvalidPayload {
                        view: "importFile",
                        detail: "a file selection is required".to_string(),
                    });
                };
                Ok(self.select_file(file))
            }
            View::Poi => {
                let selected = match payload {
                    Payload::Poi(id) => {
                        if self.store.poi(&id).is_none() {
                            return Err(CaseError::InvalidPayload {
                                view: "poi",
                                detail: format!("unknown poi {id}"),
                            });
                        }
                        Some(id)
                    }
                    Payload::None => self.store.pois().first().map(|p| p.id.clone()),
                    other => return Err(mismatch(view, &other)),
                };
                self.switch_to(View::Poi);
                self.poi.selected_poi = selected;
                Ok(NavOutcome::Switched(View::Poi))
            }
            View::Media => {
                let lightbox = match payload {
                    Payload::Media(id) => {
                        if self.store.media_item(&id).is_none() {
                            return Err(CaseError::InvalidPayload {
                                view: "media",
                                detail: format!("unknown media {id}"),
                            });
                        }
                        Some(id)
                    }
                    Payload::None => None,
                    other => return Err(mismatch(view, &other)),
                };
                self.switch_to(View::Media);
                self.media.selected_media = lightbox;
                Ok(NavOutcome::Switched(View::Media))
            }
            View::Dashboard | View::Timeline | View::Chat => {
                self.expect_no_payload(view, &payload)?;
                self.switch_to(view);
                Ok(NavOutcome::Switched(view))
            }
        }
    }

    /// Back button: always the dashboard.
    pub fn back(&mut self) -> NavOutcome {
        self.switch_to(View::Dashboard);
        NavOutcome::Switched(View::Dashboard)
    }

    fn expect_no_payload(&self, view: View, payload: &Payload) -> Result<(), CaseError> {
        match payload {
            Payload::None => Ok(()),
            other => Err(mismatch(view, other)),
        }
    }

    fn switch_to(&mut self, view: View) {
        if self.current != view {
            self.reset_view(self.current);
            tracing::debug!(from = %self.current, to = %view, "navigate");
            self.current = view;
        }
    }

    fn reset_view(&mut self, view: View) {
        match view {
            View::Dashboard => self.dashboard = DashboardState::default(),
            View::Chat => self.chat = ChatState::new(self.settings.page_limit),
            View::Timeline => self.timeline = TimelineState::default(),
            View::Media => self.media = MediaState::new(self.settings.default_threshold),
            View::Poi => self.poi = PoiState::default(),
            View::Export | View::ImportFile => {}
        }
    }

    fn select_file(&mut self, file: FileSelection) -> NavOutcome {
        match self.settings.upload.check(&file) {
            Ok(()) => {
                self.dashboard.upload_error = None;
                self.dashboard.selected_file = Some(file.clone());
                tracing::info!(file = %file.name, size = file.size, "import requested");
                NavOutcome::ImportRequested(file)
            }
            Err(err) => {
                let message = err.to_string();
                self.dashboard.selected_file = None;
                self.dashboard.upload_error = Some(message.clone());
                NavOutcome::ImportRejected(message)
            }
        }
    }

    /// Selects a file from disk by metadata and runs the import check.
    pub fn import_path(&mut self, path: &std::path::Path) -> Result<NavOutcome, UploadError> {
        let file = FileSelection::from_path(path)?;
        Ok(self.select_file(file))
    }

    pub fn dashboard(&self) -> &DashboardState {
        &self.dashboard
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatState {
        &mut self.chat
    }

    pub fn timeline(&self) -> &TimelineState {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut TimelineState {
        &mut self.timeline
    }

    pub fn media(&self) -> &MediaState {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut MediaState {
        &mut self.media
    }

    pub fn poi(&self) -> &PoiState {
        &self.poi
    }

    pub fn select_poi(&mut self, id: &str) -> Result<(), CaseError> {
        if self.store.poi(id).is_none() {
            return Err(CaseError::InvalidPayload {
                view: "poi",
                detail: format!("unknown poi {id}"),
            });
        }
        self.poi.selected_poi = Some(id.to_string());
        Ok(())
    }

    pub fn summary(&self) -> CaseSummary {
        self.store
            .summary(self.settings.top_pois, self.settings.timeline_preview)
    }

    /// Current chat page. Not filtered unless the chat view is showing.
    pub fn message_results(&self) -> FilterState<'_, Message> {
        if self.current != View::Chat {
            return FilterState::NotFiltered;
        }
        let all = self.chat.filter.apply(self.store.messages());
        FilterState::Filtered(paginate(&all, self.chat.page))
    }

    pub fn timeline_results(&self) -> FilterState<'_, TimelineEvent> {
        if self.current != View::Timeline {
            return FilterState::NotFiltered;
        }
        FilterState::Filtered(self.timeline.filter.apply(self.store.timeline()))
    }

    pub fn media_results(&self) -> FilterState<'_, Media> {
        if self.current != View::Media {
            return FilterState::NotFiltered;
        }
        FilterState::Filtered(self.media.filter.apply(self.store.media()))
    }

    pub fn selected_poi(&self) -> Option<&Poi> {
        self.poi
            .selected_poi
            .as_deref()
            .and_then(|id| self.store.poi(id))
    }

    pub fn poi_evidence(&self) -> Result<Option<PoiEvidence<'_>>, CaseError> {
        match self.selected_poi() {
            Some(poi) => self.resolver().poi_evidence(poi).map(Some),
            None => Ok(None),
        }
    }

    pub fn expanded_event_evidence(&self) -> Result<Option<EventEvidence<'_>>, CaseError> {
        let event = self
            .timeline
            .expanded_event
            .as_deref()
            .and_then(|id| self.store.event(id));
        match event {
            Some(event) => self.resolver().event_evidence(event).map(Some),
            None => Ok(None),
        }
    }

    /// Opens the export panel over the current view, keeping an existing job.
    pub fn open_export(&mut self) -> &mut ExportJob {
        let case_id = self.store.case().id.clone();
        let settings = self.settings.export;
        self.export
            .get_or_insert_with(|| ExportJob::new(case_id, settings))
    }

    pub fn export(&self) -> Option<&ExportJob> {
        self.export.as_ref()
    }

    pub fn export_mut(&mut self) -> Option<&mut ExportJob> {
        self.export.as_mut()
    }

    /// Closes the panel. A running job keeps its state until reset.
    pub fn close_export(&mut self) -> Option<ExportJob> {
        self.export.take()
    }

    pub fn put_export(&mut self, job: ExportJob) {
        self.export = Some(job);
    }
}

fn mismatch(view: View, payload: &Payload) -> CaseError {
    let kind = match payload {
        Payload::None => "none",
        Payload::Poi(_) => "poi",
        Payload::Media(_) => "media",
        Payload::File(_) => "file",
    };
    CaseError::InvalidPayload {
        view: view.as_str(),
        detail: format!("{kind} payload not accepted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::export::ExportStage;

    const CASE: &str = r#"{
        "case": { "id": "C-7", "device_owner": "Owner", "extraction_date": "2024-03-18T09:30:00Z" },
        "messages": [
            { "id": "m1", "timestamp": "2024-03-10T22:14:00Z", "sender_id": "c1", "sender_name": "Marcus",
              "recipient_id": "owner", "recipient_name": "Owner", "text": "x", "suspicious": true,
              "risk_level": "high", "source_app": "SMS" },
            { "id": "m2", "timestamp": "2024-03-10T22:15:00Z", "sender_id": "owner", "sender_name": "Owner",
              "recipient_id": "c1", "recipient_name": "Marcus", "text": "y", "suspicious": false,
              "source_app": "SMS" }
        ],
        "pois": [
            { "id": "c1", "name": "Marcus", "phone": "+1 555 0101", "score": 85,
              "feature_breakdown": { "total_messages": 2, "suspicious_msg_count": 1, "flagged_media_assoc": 0,
                "time_anomaly_score": 0.4, "communication_frequency": 1.5, "unusual_hour_pct": 50.0 },
              "evidence_refs": { "message_ids": ["m1", "m404"] },
              "first_contact": "2024-03-01T10:00:00Z", "last_contact": "2024-03-10T22:15:00Z" }
        ]
    }"#;

    fn session() -> Session {
        let store = EvidenceStore::from_json(CASE).unwrap();
        Session::new(Arc::new(store), SessionSettings::default())
    }

    #[test]
    fn parses_view_names() {
        assert_eq!("importFile".parse::<View>().unwrap(), View::ImportFile);
        assert_eq!("POI".parse::<View>().unwrap(), View::Poi);
        assert!(matches!(
            "settings".parse::<View>(),
            Err(CaseError::UnknownView(_))
        ));
    }

    #[test]
    fn export_opens_without_switching() {
        let mut s = session();
        s.navigate(View::Chat, Payload::None).unwrap();
        let outcome = s.navigate(View::Export, Payload::None).unwrap();
        assert_eq!(outcome, NavOutcome::ExportOpened);
        assert_eq!(s.current_view(), View::Chat);
        assert_eq!(s.export().map(|j| j.stage()), Some(ExportStage::Config));
    }

    #[test]
    fn back_returns_to_dashboard_and_resets() {
        let mut s = session();
        s.navigate(View::Poi, Payload::Poi("c1".into())).unwrap();
        assert_eq!(s.back(), NavOutcome::Switched(View::Dashboard));
        assert_eq!(s.current_view(), View::Dashboard);
        assert!(s.selected_poi().is_none());
        assert_eq!(s.back(), NavOutcome::Switched(View::Dashboard));
    }

    #[test]
    fn leaving_a_view_resets_it() {
        let mut s = session();
        s.navigate(View::Chat, Payload::None).unwrap();
        s.chat_mut().set_search("x");
        s.chat_mut().toggle_suspicious();
        s.navigate(View::Timeline, Payload::None).unwrap();
        assert!(s.chat().filter.suspicious_only);
        assert!(s.chat().filter.search.is_empty());
    }

    #[test]
    fn staying_on_a_view_keeps_state() {
        let mut s = session();
        s.navigate(View::Chat, Payload::None).unwrap();
        s.chat_mut().set_search("x");
        s.navigate(View::Chat, Payload::None).unwrap();
        assert_eq!(s.chat().filter.search, "x");
    }

    #[test]
    fn poi_defaults_to_first_and_validates_payload() {
        let mut s = session();
        s.navigate(View::Poi, Payload::None).unwrap();
        assert_eq!(s.selected_poi().map(|p| p.id.as_str()), Some("c1"));
        let evidence = s.poi_evidence().unwrap().unwrap();
        assert_eq!(evidence.messages.len(), 1);

        assert!(matches!(
            s.navigate(View::Poi, Payload::Poi("ghost".to_string())),
            Err(CaseError::InvalidPayload { view: "poi", .. })
        ));
        assert!(s
            .navigate(View::Timeline, Payload::Poi("c1".to_string()))
            .is_err());
    }

    #[test]
    fn results_are_not_filtered_off_view() {
        let mut s = session();
        assert!(!s.message_results().is_filtered());
        s.navigate(View::Chat, Payload::None).unwrap();
        let results = s.message_results();
        assert_eq!(results.len(), 1);
        assert!(!s.media_results().is_filtered());
        s.navigate(View::Media, Payload::None).unwrap();
        let media = s.media_results();
        assert!(media.is_filtered());
        assert!(media.is_empty());
    }

    #[test]
    fn import_checks_size() {
        let mut s = session();
        let ok = s
            .navigate(View::ImportFile, Payload::File(FileSelection::new("a.zip", 10)))
            .unwrap();
        assert!(matches!(ok, NavOutcome::ImportRequested(ref f) if f.name == "a.zip"));
        let too_big = FileSelection::new("b.zip", 600 * 1024 * 1024);
        let rejected = s.navigate(View::ImportFile, Payload::File(too_big)).unwrap();
        assert_eq!(
            rejected,
            NavOutcome::ImportRejected(
                "File too large. Please upload a file smaller than 500MB.".to_string()
            )
        );
        assert!(s.dashboard().upload_error.is_some());
        assert_eq!(s.current_view(), View::Dashboard);
        assert!(s.navigate(View::ImportFile, Payload::None).is_err());
    }
}
