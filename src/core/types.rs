use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::CaseError;

/// Ordered risk tier shared by every evidence collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            "critical" => Ok(RiskTier::Critical),
            _ => Err(CaseError::Parse {
                kind: "risk tier",
                value: value.to_string(),
            }),
        }
    }
}

/// A detection rule that fired on a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub rule: String,
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub text: String,
    pub suspicious: bool,
    #[serde(default)]
    pub risk_level: Option<RiskTier>,
    #[serde(default)]
    pub rules_triggered: Vec<Rule>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub cluster_label: Option<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    pub source_app: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Nsfw,
    Weapon,
    Violence,
    Other,
}

impl LabelKind {
    pub const ALL: [LabelKind; 4] = [
        LabelKind::Nsfw,
        LabelKind::Weapon,
        LabelKind::Violence,
        LabelKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelKind::Nsfw => "nsfw",
            LabelKind::Weapon => "weapon",
            LabelKind::Violence => "violence",
            LabelKind::Other => "other",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LabelKind {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LabelKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| CaseError::Parse {
                kind: "label",
                value: value.to_string(),
            })
    }
}

/// Classifier output attached to a media item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    pub label: LabelKind,
    pub confidence: f64,
    pub model: String,
}

/// Weak reference to a person, carried by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub thumbnail_url: String,
    #[serde(default)]
    pub full_url: Option<String>,
    pub file_name: String,
    pub file_size: u64,
    pub sha256: String,
    pub source_app: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Supplied independently of `labels`; never derived from them.
    pub risk_level: RiskTier,
    #[serde(default)]
    pub linked_contacts: Vec<Contact>,
    #[serde(default)]
    pub linked_message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureBreakdown {
    pub total_messages: u32,
    pub suspicious_msg_count: u32,
    pub flagged_media_assoc: u32,
    pub time_anomaly_score: f64,
    pub communication_frequency: f64,
    pub unusual_hour_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoiEvidenceRefs {
    #[serde(default)]
    pub message_ids: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub event_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactNetworkNode {
    pub id: String,
    pub name: String,
    pub message_count: u32,
    #[serde(default)]
    pub risk_score: Option<u8>,
}

/// Person of interest. The snapshot arrives ranked by `score` descending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub score: u8,
    #[serde(default)]
    pub rank: Option<u32>,
    pub feature_breakdown: FeatureBreakdown,
    #[serde(default)]
    pub evidence_refs: PoiEvidenceRefs,
    pub first_contact: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
    #[serde(default)]
    pub contact_network: Vec<ContactNetworkNode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    MediaFlag,
    Call,
    AppActivity,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Message,
        EventType::MediaFlag,
        EventType::Call,
        EventType::AppActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::MediaFlag => "media_flag",
            EventType::Call => "call",
            EventType::AppActivity => "app_activity",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EventType::Message => "Messages",
            EventType::MediaFlag => "Media",
            EventType::Call => "Calls",
            EventType::AppActivity => "App Activity",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| CaseError::Parse {
                kind: "event type",
                value: value.to_string(),
            })
    }
}

/// Why an event was flagged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    #[serde(default)]
    pub rules_triggered: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    pub confidence: f64,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEvidenceRefs {
    #[serde(default)]
    pub message_ids: Vec<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub label: String,
    pub suspicious: bool,
    pub risk_level: RiskTier,
    #[serde(default)]
    pub participants: Option<Vec<String>>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub preview_thumbnail: Option<String>,
    pub explain: Explanation,
    #[serde(default)]
    pub evidence_refs: EventEvidenceRefs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseInfo {
    pub id: String,
    pub device_owner: String,
    pub extraction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseCounters {
    pub total_messages: u64,
    pub total_contacts: u64,
    pub total_media: u64,
    pub flagged_media: u64,
    pub suspicious_messages: u64,
    pub poi_count: u64,
}

/// On-disk shape of a case snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub case: CaseInfo,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub pois: Vec<Poi>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    /// Precomputed counters; derived from the collections when absent.
    #[serde(default)]
    pub summary: Option<CaseCounters>,
}

/// Dashboard view of a case.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaseSummary {
    pub case_id: String,
    pub device_owner: String,
    pub extraction_date: DateTime<Utc>,
    pub summary: CaseCounters,
    pub top_pois: Vec<Poi>,
    pub flagged_media_snapshot: Vec<Media>,
    pub timeline_preview: Vec<TimelineEvent>,
}
