//! Contact directory reconstructed once from every evidence source.
//!
//! Messages are scanned first (sender, then recipient, in message order), then
//! contacts linked from media, then POIs. An id keeps the identity from the
//! first source that mentions it.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::types::{Media, Message, Poi};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Message,
    Media,
    Poi,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub source: IdentitySource,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    order: Vec<String>,
    by_id: HashMap<String, Identity>,
}

impl IdentityTable {
    pub fn build(messages: &[Message], media: &[Media], pois: &[Poi]) -> Self {
        let mut table = Self::default();
        for m in messages {
            table.insert_if_absent(&m.sender_id, &m.sender_name, None, IdentitySource::Message);
            table.insert_if_absent(
                &m.recipient_id,
                &m.recipient_name,
                None,
                IdentitySource::Message,
            );
        }
        for item in media {
            for c in &item.linked_contacts {
                table.insert_if_absent(&c.id, &c.name, c.phone.clone(), IdentitySource::Media);
            }
        }
        for poi in pois {
            table.insert_if_absent(
                &poi.id,
                &poi.name,
                Some(poi.phone.clone()),
                IdentitySource::Poi,
            );
        }
        table
    }

    fn insert_if_absent(
        &mut self,
        id: &str,
        name: &str,
        phone: Option<String>,
        source: IdentitySource,
    ) {
        if id.is_empty() || self.by_id.contains_key(id) {
            return;
        }
        self.order.push(id.to_string());
        self.by_id.insert(
            id.to_string(),
            Identity {
                id: id.to_string(),
                name: name.to_string(),
                phone,
                source,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<&Identity> {
        self.by_id.get(id)
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.get(id).map(|i| i.name.as_str())
    }

    /// Identities in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::core::types::{Contact, RiskTier};

    fn message(id: &str, from: (&str, &str), to: (&str, &str)) -> Message {
        Message {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap(),
            sender_id: from.0.to_string(),
            sender_name: from.1.to_string(),
            recipient_id: to.0.to_string(),
            recipient_name: to.1.to_string(),
            text: "hi".to_string(),
            suspicious: false,
            risk_level: None,
            rules_triggered: vec![],
            cluster_id: None,
            cluster_label: None,
            media_ids: vec![],
            source_app: "SMS".to_string(),
        }
    }

    #[test]
    fn first_message_mention_wins() {
        let messages = vec![
            message("m1", ("c1", "Marcus"), ("owner", "Daniel")),
            message("m2", ("c1", "M. Vale"), ("owner", "Danny")),
        ];
        let table = IdentityTable::build(&messages, &[], &[]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.display_name("c1"), Some("Marcus"));
        assert_eq!(table.display_name("owner"), Some("Daniel"));
        let ids: Vec<&str> = table.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "owner"]);
    }

    #[test]
    fn media_contacts_fill_gaps_only() {
        let messages = vec![message("m1", ("c1", "Marcus"), ("owner", "Daniel"))];
        let media = vec![Media {
            id: "med1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 22, 5, 0).unwrap(),
            thumbnail_url: "thumb".to_string(),
            full_url: None,
            file_name: "a.jpg".to_string(),
            file_size: 10,
            sha256: "0".repeat(64),
            source_app: "WhatsApp".to_string(),
            labels: vec![],
            risk_level: RiskTier::Low,
            linked_contacts: vec![
                Contact {
                    id: "c1".to_string(),
                    name: "Someone Else".to_string(),
                    phone: None,
                },
                Contact {
                    id: "c9".to_string(),
                    name: "Jamie".to_string(),
                    phone: Some("+1 555 0100".to_string()),
                },
            ],
            linked_message_ids: vec![],
        }];
        let table = IdentityTable::build(&messages, &media, &[]);
        assert_eq!(table.display_name("c1"), Some("Marcus"));
        let jamie = table.get("c9").unwrap();
        assert_eq!(jamie.source, IdentitySource::Media);
        assert_eq!(jamie.phone.as_deref(), Some("+1 555 0100"));
        assert!(table.get("nobody").is_none());
    }
}
