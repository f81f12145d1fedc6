//! Per-view state. Each state is reset to its defaults when the user leaves
//! the view.

use crate::core::types::{EventType, LabelKind};
use crate::pipeline::filter::{MediaFilter, MessageFilter, Page, TimelineFilter};
use crate::session::upload::FileSelection;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub selected_file: Option<FileSelection>,
    pub upload_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    pub filter: MessageFilter,
    pub page: Page,
    pub selected_message: Option<String>,
}

impl ChatState {
    pub fn new(page_limit: usize) -> Self {
        Self {
            filter: MessageFilter::default(),
            page: Page {
                limit: page_limit,
                offset: 0,
            },
            selected_message: None,
        }
    }

    pub fn toggle_suspicious(&mut self) {
        self.filter.suspicious_only = !self.filter.suspicious_only;
        self.page.offset = 0;
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.search = text.into();
        self.page.offset = 0;
    }

    pub fn select_contact(&mut self, contact: Option<String>) {
        self.filter.contact = contact;
        self.page.offset = 0;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineState {
    pub filter: TimelineFilter,
    pub expanded_event: Option<String>,
}

impl TimelineState {
    pub fn toggle_suspicious(&mut self) {
        self.filter.suspicious_only = !self.filter.suspicious_only;
    }

    pub fn toggle_type(&mut self, event_type: EventType) {
        self.filter.toggle_type(event_type);
    }

    /// Expanding the open event collapses it.
    pub fn toggle_expanded(&mut self, id: &str) {
        if self.expanded_event.as_deref() == Some(id) {
            self.expanded_event = None;
        } else {
            self.expanded_event = Some(id.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaState {
    pub filter: MediaFilter,
    /// Media open in the lightbox.
    pub selected_media: Option<String>,
}

impl MediaState {
    pub fn new(default_threshold: u8) -> Self {
        Self {
            filter: MediaFilter::with_threshold(default_threshold),
            selected_media: None,
        }
    }

    pub fn toggle_label(&mut self, label: LabelKind) {
        self.filter.toggle_label(label);
    }

    pub fn set_threshold(&mut self, threshold: u8) {
        self.filter.threshold = threshold.min(100);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoiState {
    pub selected_poi: Option<String>,
}
