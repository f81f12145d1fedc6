//! Order-preserving filters over evidence collections.
//!
//! Every filter keeps the relative order of its input and never re-sorts;
//! applying a filter to its own output returns the same output.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::error::CaseError;
use crate::core::identity::{Identity, IdentityTable};
use crate::core::types::{EventType, Label, LabelKind, Media, Message, TimelineEvent};
use crate::pipeline::classifier::confidence_percent;

/// Records carrying a `suspicious` flag.
pub trait Flagged {
    fn is_suspicious(&self) -> bool;
}

impl Flagged for Message {
    fn is_suspicious(&self) -> bool {
        self.suspicious
    }
}

impl Flagged for TimelineEvent {
    fn is_suspicious(&self) -> bool {
        self.suspicious
    }
}

/// Result slot of a view: distinguishes "never filtered" from an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterState<'a, T> {
    NotFiltered,
    Filtered(Vec<&'a T>),
}

impl<'a, T> FilterState<'a, T> {
    pub fn is_filtered(&self) -> bool {
        matches!(self, FilterState::Filtered(_))
    }

    pub fn items(&self) -> Option<&[&'a T]> {
        match self {
            FilterState::NotFiltered => None,
            FilterState::Filtered(items) => Some(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items().map_or(0, |items| items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, T> Default for FilterState<'a, T> {
    fn default() -> Self {
        FilterState::NotFiltered
    }
}

/// The suspicious-only toggle shared by message and timeline filters.
fn keeps_flagged<T: Flagged>(item: &T, suspicious_only: bool) -> bool {
    !suspicious_only || item.is_suspicious()
}

/// Case-insensitive substring match; an empty needle matches everything.
pub fn text_matches(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub suspicious_only: bool,
    pub search: String,
    /// Keep only messages sent or received by this contact id.
    pub contact: Option<String>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            suspicious_only: true,
            search: String::new(),
            contact: None,
        }
    }
}

impl MessageFilter {
    pub fn matches(&self, m: &Message) -> bool {
        if !keeps_flagged(m, self.suspicious_only) {
            return false;
        }
        if !text_matches(&m.text, &self.search) {
            return false;
        }
        if let Some(contact) = &self.contact {
            if &m.sender_id != contact && &m.recipient_id != contact {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a Message>) -> Vec<&'a Message> {
        let out: Vec<&Message> = items.into_iter().filter(|m| self.matches(m)).collect();
        tracing::debug!(
            suspicious_only = self.suspicious_only,
            search = %self.search,
            kept = out.len(),
            "message filter applied"
        );
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineFilter {
    pub suspicious_only: bool,
    /// Included event types; empty includes nothing.
    pub types: BTreeSet<EventType>,
}

impl Default for TimelineFilter {
    fn default() -> Self {
        Self {
            suspicious_only: true,
            types: EventType::ALL.into_iter().collect(),
        }
    }
}

impl TimelineFilter {
    pub fn matches(&self, e: &TimelineEvent) -> bool {
        keeps_flagged(e, self.suspicious_only) && self.types.contains(&e.event_type)
    }

    pub fn toggle_type(&mut self, event_type: EventType) {
        if !self.types.remove(&event_type) {
            self.types.insert(event_type);
        }
    }

    pub fn apply<'a>(
        &self,
        items: impl IntoIterator<Item = &'a TimelineEvent>,
    ) -> Vec<&'a TimelineEvent> {
        let out: Vec<&TimelineEvent> = items.into_iter().filter(|e| self.matches(e)).collect();
        tracing::debug!(types = self.types.len(), kept = out.len(), "timeline filter applied");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFilter {
    pub labels: BTreeSet<LabelKind>,
    /// Minimum label confidence, in percent.
    pub threshold: u8,
    /// Case-insensitive substring of the file name; empty matches all.
    pub file_name: String,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::with_threshold(50)
    }
}

impl MediaFilter {
    pub fn with_threshold(threshold: u8) -> Self {
        Self {
            labels: LabelKind::ALL.into_iter().collect(),
            threshold: threshold.min(100),
            file_name: String::new(),
        }
    }

    /// Category and threshold are checked against the same label.
    pub fn label_passes(&self, label: &Label) -> bool {
        self.labels.contains(&label.label)
            && confidence_percent(label.confidence) >= f64::from(self.threshold)
    }

    pub fn matches(&self, m: &Media) -> bool {
        text_matches(&m.file_name, &self.file_name)
            && m.labels.iter().any(|l| self.label_passes(l))
    }

    pub fn toggle_label(&mut self, label: LabelKind) {
        if !self.labels.remove(&label) {
            self.labels.insert(label);
        }
    }

    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a Media>) -> Vec<&'a Media> {
        let out: Vec<&Media> = items.into_iter().filter(|m| self.matches(m)).collect();
        tracing::debug!(
            labels = self.labels.len(),
            threshold = self.threshold,
            kept = out.len(),
            "media filter applied"
        );
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

pub fn paginate<'a, T>(items: &[&'a T], page: Page) -> Vec<&'a T> {
    items
        .iter()
        .skip(page.offset)
        .take(page.limit)
        .copied()
        .collect()
}

/// Events per type, every type present.
pub fn event_type_counts(events: &[TimelineEvent]) -> BTreeMap<EventType, usize> {
    let mut counts: BTreeMap<EventType, usize> =
        EventType::ALL.into_iter().map(|t| (t, 0)).collect();
    for e in events {
        *counts.entry(e.event_type).or_default() += 1;
    }
    counts
}

/// Media items carrying each label, every label present.
pub fn label_counts(media: &[Media]) -> BTreeMap<LabelKind, usize> {
    LabelKind::ALL
        .into_iter()
        .map(|kind| {
            let n = media
                .iter()
                .filter(|m| m.labels.iter().any(|l| l.label == kind))
                .count();
            (kind, n)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactActivity {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    pub suspicious_count: usize,
}

/// Message participants in first-appearance order with their traffic counts.
pub fn contact_activity(messages: &[Message]) -> Vec<ContactActivity> {
    let mut out: Vec<ContactActivity> = Vec::new();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for m in messages {
        for (id, name) in [
            (&m.sender_id, &m.sender_name),
            (&m.recipient_id, &m.recipient_name),
        ] {
            if seen.contains_key(id) {
                continue;
            }
            seen.insert(id.clone(), out.len());
            out.push(ContactActivity {
                id: id.clone(),
                name: name.clone(),
                message_count: 0,
                suspicious_count: 0,
            });
        }
    }
    for m in messages {
        let mut touched = vec![&m.sender_id];
        if m.recipient_id != m.sender_id {
            touched.push(&m.recipient_id);
        }
        for id in touched {
            if let Some(pos) = seen.get(id) {
                out[*pos].message_count += 1;
                if m.suspicious {
                    out[*pos].suspicious_count += 1;
                }
            }
        }
    }
    out
}

/// One cross-collection search match.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "obj", rename_all = "snake_case")]
pub enum SearchHit<'a> {
    Contact(&'a Identity),
    Message(&'a Message),
    File(&'a Media),
}

impl SearchHit<'_> {
    pub fn id(&self) -> &str {
        match self {
            SearchHit::Contact(c) => &c.id,
            SearchHit::Message(m) => &m.id,
            SearchHit::File(f) => &f.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResults<'a> {
    pub query: String,
    /// Hits before paging.
    pub total: usize,
    pub hits: Vec<SearchHit<'a>>,
}

/// Case-insensitive search over contacts (id, name, phone), message text and
/// media file names. Hits come contacts first, then messages, then files, each
/// in store order; `page` applies to the combined list.
pub fn search<'a>(
    identities: &'a IdentityTable,
    messages: &'a [Message],
    media: &'a [Media],
    query: &str,
    page: Page,
) -> Result<SearchResults<'a>, CaseError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CaseError::Parse {
            kind: "search query",
            value: query.to_string(),
        });
    }
    let contacts = identities.iter().filter(|c| {
        text_matches(&c.id, query)
            || text_matches(&c.name, query)
            || c.phone.as_deref().is_some_and(|p| text_matches(p, query))
    });
    let hits: Vec<SearchHit<'a>> = contacts
        .map(SearchHit::Contact)
        .chain(
            messages
                .iter()
                .filter(|m| text_matches(&m.text, query))
                .map(SearchHit::Message),
        )
        .chain(
            media
                .iter()
                .filter(|f| text_matches(&f.file_name, query))
                .map(SearchHit::File),
        )
        .collect();
    let total = hits.len();
    let hits: Vec<SearchHit<'a>> = hits
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    tracing::debug!(query, total, shown = hits.len(), "search");
    Ok(SearchResults {
        query: query.to_string(),
        total,
        hits,
    })
}
