use std::collections::HashMap;
use std::path::Path;

use crate::core::error::CaseError;
use crate::core::hash::is_sha256_hex;
use crate::core::identity::{Identity, IdentityTable};
use crate::core::types::{
    CaseCounters, CaseFile, CaseInfo, CaseSummary, Media, Message, Poi, TimelineEvent,
};

/// Read access by id into one collection. Unknown ids yield `None`.
pub trait Lookup<T> {
    fn lookup(&self, id: &str) -> Option<&T>;
}

/// Immutable snapshot of one case, indexed by id.
#[derive(Debug)]
pub struct EvidenceStore {
    case: CaseInfo,
    messages: Vec<Message>,
    media: Vec<Media>,
    pois: Vec<Poi>,
    timeline: Vec<TimelineEvent>,
    message_index: HashMap<String, usize>,
    media_index: HashMap<String, usize>,
    poi_index: HashMap<String, usize>,
    event_index: HashMap<String, usize>,
    identities: IdentityTable,
    counters: CaseCounters,
}

impl EvidenceStore {
    pub fn from_case_file(path: &Path) -> Result<Self, CaseError> {
        let data = std::fs::read_to_string(path)?;
        let store = Self::from_json(&data)?;
        tracing::info!(
            case = %store.case.id,
            messages = store.messages.len(),
            media = store.media.len(),
            pois = store.pois.len(),
            events = store.timeline.len(),
            "case loaded from {}",
            path.display()
        );
        Ok(store)
    }

    pub fn from_json(data: &str) -> Result<Self, CaseError> {
        let case: CaseFile = serde_json::from_str(data)?;
        Self::from_case(case)
    }

    pub fn from_case(case: CaseFile) -> Result<Self, CaseError> {
        validate_messages(&case.messages)?;
        validate_media(&case.media)?;
        validate_pois(&case.pois)?;
        validate_timeline(&case.timeline)?;

        let message_index = index_ids("message", &case.messages, |m| &m.id)?;
        let media_index = index_ids("media", &case.media, |m| &m.id)?;
        let poi_index = index_ids("poi", &case.pois, |p| &p.id)?;
        let event_index = index_ids("event", &case.timeline, |e| &e.id)?;

        let identities = IdentityTable::build(&case.messages, &case.media, &case.pois);
        let counters = match case.summary {
            Some(counters) => counters,
            None => derive_counters(&case.messages, &case.media, &case.pois, &identities),
        };

        Ok(Self {
            case: case.case,
            messages: case.messages,
            media: case.media,
            pois: case.pois,
            timeline: case.timeline,
            message_index,
            media_index,
            poi_index,
            event_index,
            identities,
            counters,
        })
    }

    pub fn case(&self) -> &CaseInfo {
        &self.case
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn media(&self) -> &[Media] {
        &self.media
    }

    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.message_index.get(id).map(|i| &self.messages[*i])
    }

    pub fn media_item(&self, id: &str) -> Option<&Media> {
        self.media_index.get(id).map(|i| &self.media[*i])
    }

    pub fn poi(&self, id: &str) -> Option<&Poi> {
        self.poi_index.get(id).map(|i| &self.pois[*i])
    }

    pub fn event(&self, id: &str) -> Option<&TimelineEvent> {
        self.event_index.get(id).map(|i| &self.timeline[*i])
    }

    pub fn identities(&self) -> &IdentityTable {
        &self.identities
    }

    pub fn counters(&self) -> &CaseCounters {
        &self.counters
    }

    /// First `n` POIs in snapshot order (already ranked).
    pub fn top_pois(&self, n: usize) -> &[Poi] {
        &self.pois[..n.min(self.pois.len())]
    }

    pub fn flagged_media(&self) -> Vec<&Media> {
        self.media.iter().filter(|m| !m.labels.is_empty()).collect()
    }

    pub fn timeline_preview(&self, n: usize) -> Vec<&TimelineEvent> {
        self.timeline.iter().filter(|e| e.suspicious).take(n).collect()
    }

    pub fn summary(&self, top_pois: usize, preview: usize) -> CaseSummary {
        CaseSummary {
            case_id: self.case.id.clone(),
            device_owner: self.case.device_owner.clone(),
            extraction_date: self.case.extraction_date,
            summary: self.counters.clone(),
            top_pois: self.top_pois(top_pois).to_vec(),
            flagged_media_snapshot: self.flagged_media().into_iter().cloned().collect(),
            timeline_preview: self
                .timeline_preview(preview)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

impl Lookup<Message> for EvidenceStore {
    fn lookup(&self, id: &str) -> Option<&Message> {
        self.message(id)
    }
}

impl Lookup<Media> for EvidenceStore {
    fn lookup(&self, id: &str) -> Option<&Media> {
        self.media_item(id)
    }
}

impl Lookup<Poi> for EvidenceStore {
    fn lookup(&self, id: &str) -> Option<&Poi> {
        self.poi(id)
    }
}

impl Lookup<TimelineEvent> for EvidenceStore {
    fn lookup(&self, id: &str) -> Option<&TimelineEvent> {
        self.event(id)
    }
}

impl Lookup<Identity> for EvidenceStore {
    fn lookup(&self, id: &str) -> Option<&Identity> {
        self.identities.get(id)
    }
}

fn index_ids<T>(
    collection: &'static str,
    items: &[T],
    id_of: impl Fn(&T) -> &String,
) -> Result<HashMap<String, usize>, CaseError> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let id = id_of(item);
        if index.insert(id.clone(), pos).is_some() {
            return Err(CaseError::DuplicateId {
                collection,
                id: id.clone(),
            });
        }
    }
    Ok(index)
}

fn derive_counters(
    messages: &[Message],
    media: &[Media],
    pois: &[Poi],
    identities: &IdentityTable,
) -> CaseCounters {
    CaseCounters {
        total_messages: messages.len() as u64,
        total_contacts: identities.len() as u64,
        total_media: media.len() as u64,
        flagged_media: media.iter().filter(|m| !m.labels.is_empty()).count() as u64,
        suspicious_messages: messages.iter().filter(|m| m.suspicious).count() as u64,
        poi_count: pois.len() as u64,
    }
}

fn check_unit(id: &str, field: &'static str, value: f64) -> Result<(), CaseError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CaseError::OutOfRange {
            id: id.to_string(),
            field,
            value,
        })
    }
}

fn validate_messages(messages: &[Message]) -> Result<(), CaseError> {
    for m in messages {
        if m.suspicious != m.risk_level.is_some() {
            return Err(CaseError::Invariant {
                id: m.id.clone(),
                detail: "risk_level must be present exactly when suspicious".to_string(),
            });
        }
        for rule in &m.rules_triggered {
            check_unit(&m.id, "rule confidence", rule.confidence)?;
        }
    }
    Ok(())
}

fn validate_media(media: &[Media]) -> Result<(), CaseError> {
    for item in media {
        if !is_sha256_hex(&item.sha256) {
            return Err(CaseError::InvalidHash {
                id: item.id.clone(),
            });
        }
        for label in &item.labels {
            check_unit(&item.id, "label confidence", label.confidence)?;
        }
    }
    Ok(())
}

fn validate_pois(pois: &[Poi]) -> Result<(), CaseError> {
    for poi in pois {
        if poi.score > 100 {
            return Err(CaseError::OutOfRange {
                id: poi.id.clone(),
                field: "score",
                value: f64::from(poi.score),
            });
        }
        check_unit(
            &poi.id,
            "time anomaly score",
            poi.feature_breakdown.time_anomaly_score,
        )?;
        let pct = poi.feature_breakdown.unusual_hour_pct;
        if !(0.0..=100.0).contains(&pct) {
            return Err(CaseError::OutOfRange {
                id: poi.id.clone(),
                field: "unusual hour pct",
                value: pct,
            });
        }
        for node in &poi.contact_network {
            if let Some(risk) = node.risk_score.filter(|r| *r > 100) {
                return Err(CaseError::OutOfRange {
                    id: format!("{}/{}", poi.id, node.id),
                    field: "risk score",
                    value: f64::from(risk),
                });
            }
        }
    }
    Ok(())
}

fn validate_timeline(events: &[TimelineEvent]) -> Result<(), CaseError> {
    for e in events {
        check_unit(&e.id, "explain confidence", e.explain.confidence)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "case": { "id": "C-1", "device_owner": "Owner", "extraction_date": "2024-03-18T09:30:00Z" },
        "messages": [
            { "id": "m1", "timestamp": "2024-03-10T22:14:00Z", "sender_id": "a", "sender_name": "A",
              "recipient_id": "b", "recipient_name": "B", "text": "x", "suspicious": true,
              "risk_level": "high", "source_app": "SMS" },
            { "id": "m2", "timestamp": "2024-03-10T22:15:00Z", "sender_id": "b", "sender_name": "B",
              "recipient_id": "a", "recipient_name": "A", "text": "y", "suspicious": false,
              "source_app": "SMS" }
        ]
    }"#;

    #[test]
    fn derives_counters_without_summary() {
        let store = EvidenceStore::from_json(MINIMAL).unwrap();
        let c = store.counters();
        assert_eq!(c.total_messages, 2);
        assert_eq!(c.suspicious_messages, 1);
        assert_eq!(c.total_contacts, 2);
        assert_eq!(c.total_media, 0);
        assert_eq!(c.poi_count, 0);
    }

    #[test]
    fn unknown_ids_are_absent() {
        let store = EvidenceStore::from_json(MINIMAL).unwrap();
        assert!(store.message("m1").is_some());
        assert!(store.message("m404").is_none());
        assert!(store.media_item("m1").is_none());
        assert!(store.poi("a").is_none());
        assert!(store.event("m1").is_none());
    }

    #[test]
    fn rejects_risk_level_without_suspicious_flag() {
        let broken = MINIMAL.replace(
            r#""suspicious": false,"#,
            r#""suspicious": false, "risk_level": "low","#,
        );
        let err = EvidenceStore::from_json(&broken).unwrap_err();
        assert!(matches!(err, CaseError::Invariant { ref id, .. } if id == "m2"));
    }

    const ONE_POI: &str = r#"{
        "case": { "id": "C-2", "device_owner": "Owner", "extraction_date": "2024-03-18T09:30:00Z" },
        "pois": [
            { "id": "c1", "name": "Marcus", "phone": "+1 555 0101", "score": 85,
              "feature_breakdown": { "total_messages": 2, "suspicious_msg_count": 1, "flagged_media_assoc": 0,
                "time_anomaly_score": 0.4, "communication_frequency": 1.5, "unusual_hour_pct": 62.5 },
              "first_contact": "2024-03-01T10:00:00Z", "last_contact": "2024-03-10T22:15:00Z",
              "contact_network": [ { "id": "c2", "name": "Lena", "message_count": 4, "risk_score": 100 } ] }
        ]
    }"#;

    #[test]
    fn poi_percentages_and_network_risk_are_bounded() {
        assert!(EvidenceStore::from_json(ONE_POI).is_ok());

        let hours = ONE_POI.replace("62.5", "162.5");
        let err = EvidenceStore::from_json(&hours).unwrap_err();
        assert!(matches!(
            err,
            CaseError::OutOfRange { field: "unusual hour pct", value, .. } if value == 162.5
        ));

        let risk = ONE_POI.replace(r#""risk_score": 100"#, r#""risk_score": 140"#);
        let err = EvidenceStore::from_json(&risk).unwrap_err();
        assert!(matches!(
            err,
            CaseError::OutOfRange { field: "risk score", ref id, .. } if id == "c1/c2"
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let broken = MINIMAL.replace(r#""id": "m2""#, r#""id": "m1""#);
        let err = EvidenceStore::from_json(&broken).unwrap_err();
        assert!(matches!(
            err,
            CaseError::DuplicateId {
                collection: "message",
                ..
            }
        ));
    }
}
