//! Turns id lists carried by one record into the records they name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::CaseError;
use crate::core::identity::Identity;
use crate::core::store::{EvidenceStore, Lookup};
use crate::core::types::{Media, Message, Poi, TimelineEvent};

/// What to do when an id in a reference list has no record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingRefPolicy {
    #[default]
    Omit,
    Warn,
    Error,
}

impl MissingRefPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingRefPolicy::Omit => "omit",
            MissingRefPolicy::Warn => "warn",
            MissingRefPolicy::Error => "error",
        }
    }
}

impl fmt::Display for MissingRefPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MissingRefPolicy {
    type Err = CaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "omit" => Ok(MissingRefPolicy::Omit),
            "warn" => Ok(MissingRefPolicy::Warn),
            "error" => Ok(MissingRefPolicy::Error),
            _ => Err(CaseError::Parse {
                kind: "missing reference policy",
                value: value.to_string(),
            }),
        }
    }
}

/// Records for `ids` in request order; unknown ids are dropped.
pub fn resolve<'a, T, L>(lookup: &'a L, ids: &[String]) -> Vec<&'a T>
where
    L: Lookup<T> + ?Sized,
{
    ids.iter().filter_map(|id| lookup.lookup(id)).collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PoiEvidence<'a> {
    pub messages: Vec<&'a Message>,
    pub media: Vec<&'a Media>,
    pub events: Vec<&'a TimelineEvent>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventEvidence<'a> {
    pub messages: Vec<&'a Message>,
    pub media: Vec<&'a Media>,
    pub contacts: Vec<&'a Identity>,
}

pub struct Resolver<'a> {
    store: &'a EvidenceStore,
    policy: MissingRefPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a EvidenceStore, policy: MissingRefPolicy) -> Self {
        Self { store, policy }
    }

    fn resolve_checked<T>(
        &self,
        collection: &'static str,
        owner: &str,
        ids: &[String],
    ) -> Result<Vec<&'a T>, CaseError>
    where
        EvidenceStore: Lookup<T>,
    {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match <EvidenceStore as Lookup<T>>::lookup(self.store, id) {
                Some(record) => out.push(record),
                None => match self.policy {
                    MissingRefPolicy::Omit => {}
                    MissingRefPolicy::Warn => {
                        tracing::warn!(owner, collection, id = %id, "dropping broken reference");
                    }
                    MissingRefPolicy::Error => {
                        return Err(CaseError::BrokenReference {
                            collection,
                            id: id.clone(),
                        });
                    }
                },
            }
        }
        Ok(out)
    }

    pub fn poi_evidence(&self, poi: &Poi) -> Result<PoiEvidence<'a>, CaseError> {
        let refs = &poi.evidence_refs;
        Ok(PoiEvidence {
            messages: self.resolve_checked("message", &poi.id, &refs.message_ids)?,
            media: self.resolve_checked("media", &poi.id, &refs.media_ids)?,
            events: self.resolve_checked("event", &poi.id, &refs.event_ids)?,
        })
    }

    pub fn event_evidence(&self, event: &TimelineEvent) -> Result<EventEvidence<'a>, CaseError> {
        let refs = &event.evidence_refs;
        Ok(EventEvidence {
            messages: self.resolve_checked("message", &event.id, &refs.message_ids)?,
            media: self.resolve_checked("media", &event.id, &refs.media_ids)?,
            contacts: self.resolve_checked("contact", &event.id, &refs.contact_ids)?,
        })
    }

    /// Media attached to a message.
    pub fn message_media(&self, message: &Message) -> Result<Vec<&'a Media>, CaseError> {
        self.resolve_checked("media", &message.id, &message.media_ids)
    }

    /// Messages a media item was shared in.
    pub fn media_messages(&self, media: &Media) -> Result<Vec<&'a Message>, CaseError> {
        self.resolve_checked("message", &media.id, &media.linked_message_ids)
    }

    /// Display name for a contact id, falling back to the raw id.
    pub fn display_name(&self, id: &'a str) -> &'a str {
        self.store.identities().display_name(id).unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = r#"{
        "case": { "id": "C-1", "device_owner": "Owner", "extraction_date": "2024-03-18T09:30:00Z" },
        "messages": [
            { "id": "m1", "timestamp": "2024-03-10T22:14:00Z", "sender_id": "c1", "sender_name": "Marcus",
              "recipient_id": "owner", "recipient_name": "Owner", "text": "x", "suspicious": true,
              "risk_level": "high", "source_app": "SMS", "media_ids": ["med404"] },
            { "id": "m2", "timestamp": "2024-03-10T22:15:00Z", "sender_id": "owner", "sender_name": "Owner",
              "recipient_id": "c1", "recipient_name": "Marcus", "text": "y", "suspicious": false,
              "source_app": "SMS" }
        ],
        "timeline": [
            { "id": "ev1", "timestamp": "2024-03-10T22:14:00Z", "type": "message", "label": "Msg",
              "suspicious": true, "risk_level": "high",
              "explain": { "confidence": 0.8, "model": "rules" },
              "evidence_refs": { "message_ids": ["m2", "m9", "m1"], "contact_ids": ["c1", "ghost"] } }
        ]
    }"#;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_list_resolves_to_empty() {
        let store = EvidenceStore::from_json(CASE).unwrap();
        let found: Vec<&Message> = resolve(&store, &[]);
        assert!(found.is_empty());
    }

    #[test]
    fn keeps_valid_ids_in_request_order() {
        let store = EvidenceStore::from_json(CASE).unwrap();
        let found: Vec<&Message> = resolve(&store, &ids(&["m1", "nope"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m1");

        let found: Vec<&Message> = resolve(&store, &ids(&["m2", "m1"]));
        let order: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, vec!["m2", "m1"]);
    }

    #[test]
    fn omit_and_warn_drop_missing_ids() {
        let store = EvidenceStore::from_json(CASE).unwrap();
        let event = store.event("ev1").unwrap();
        for policy in [MissingRefPolicy::Omit, MissingRefPolicy::Warn] {
            let evidence = Resolver::new(&store, policy).event_evidence(event).unwrap();
            let order: Vec<&str> = evidence.messages.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(order, vec!["m2", "m1"]);
            assert_eq!(evidence.contacts.len(), 1);
            assert_eq!(evidence.contacts[0].name, "Marcus");
        }
    }

    #[test]
    fn error_policy_reports_first_broken_reference() {
        let store = EvidenceStore::from_json(CASE).unwrap();
        let resolver = Resolver::new(&store, MissingRefPolicy::Error);
        let err = resolver
            .message_media(store.message("m1").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            CaseError::BrokenReference { collection: "media", ref id } if id == "med404"
        ));
        assert!(resolver
            .message_media(store.message("m2").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let store = EvidenceStore::from_json(CASE).unwrap();
        let resolver = Resolver::new(&store, MissingRefPolicy::Omit);
        assert_eq!(resolver.display_name("c1"), "Marcus");
        assert_eq!(resolver.display_name("c404"), "c404");
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("WARN".parse::<MissingRefPolicy>().unwrap(), MissingRefPolicy::Warn);
        assert!("ignore".parse::<MissingRefPolicy>().is_err());
    }
}
