use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::core::identity::Identity;
use crate::core::time::display_timestamp;
use crate::core::types::{
    CaseSummary, EventType, LabelKind, Media, Message, Poi, RiskTier, TimelineEvent,
};
use crate::pipeline::classifier::{badge_label, bar_width, confidence_display, TierScheme};
use crate::pipeline::filter::{ContactActivity, SearchHit, SearchResults};
use crate::pipeline::resolver::PoiEvidence;
use crate::session::export::{ExportJob, ExportStage};
use crate::session::navigation::NavOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// First eight characters of a phone number, as shown on list cards.
pub fn mask_phone(phone: &str) -> String {
    let head: String = phone.chars().take(8).collect();
    if head.len() == phone.len() {
        head
    } else {
        format!("{head}...")
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PoiRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub score: u8,
    pub tier: RiskTier,
    pub bar_width: u8,
}

pub fn poi_rows(pois: &[Poi], scheme: TierScheme) -> Vec<PoiRow> {
    pois.iter()
        .map(|p| PoiRow {
            id: p.id.clone(),
            name: p.name.clone(),
            phone: mask_phone(&p.phone),
            score: p.score,
            tier: scheme.classify(p.score),
            bar_width: bar_width(p.score),
        })
        .collect()
}

pub fn render_summary(summary: &CaseSummary, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(summary);
    }
    let c = &summary.summary;
    let mut out = String::new();
    out.push_str(&format!("Case {}\n", summary.case_id));
    out.push_str(&format!("Device owner: {}\n", summary.device_owner));
    out.push_str(&format!(
        "Extracted: {}\n\n",
        display_timestamp(&summary.extraction_date)
    ));
    out.push_str(&format!(
        "Messages: {} ({} suspicious)\nContacts: {}\nMedia: {} ({} flagged)\nPOIs: {}\n\n",
        c.total_messages,
        c.suspicious_messages,
        c.total_contacts,
        c.total_media,
        c.flagged_media,
        c.poi_count
    ));
    out.push_str("Top persons of interest\n");
    if summary.top_pois.is_empty() {
        out.push_str("  none\n");
    }
    for row in poi_rows(&summary.top_pois, TierScheme::Card) {
        out.push_str(&format!(
            "  {:<20} {:>3}  {:<8} {}\n",
            row.name,
            row.score,
            row.tier,
            score_bar(row.bar_width)
        ));
    }
    out.push_str(&format!(
        "\nFlagged media: {}\n",
        summary.flagged_media_snapshot.len()
    ));
    for media in &summary.flagged_media_snapshot {
        out.push_str(&format!("  {} {}\n", media.file_name, label_summary(media)));
    }
    out.push_str("\nRecent suspicious activity\n");
    for event in &summary.timeline_preview {
        out.push_str(&format!(
            "  {}  {:<12} {}\n",
            display_timestamp(&event.timestamp),
            event.event_type.display_name(),
            event.label
        ));
    }
    Ok(out)
}

/// Twenty-cell bar for a 0..=100 width.
fn score_bar(width: u8) -> String {
    let filled = usize::from(width) / 5;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled.min(20)))
}

fn label_summary(media: &Media) -> String {
    media
        .labels
        .iter()
        .map(|l| format!("{} {}%", l.label, confidence_display(l.confidence)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct Listing<'a, T: Serialize> {
    total: usize,
    items: &'a [T],
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<BTreeMap<String, usize>>,
}

pub fn render_messages(
    messages: &[&Message],
    total: usize,
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(&Listing {
            total,
            items: messages,
            counts: None,
        });
    }
    let mut out = format!("{} of {} messages\n", messages.len(), total);
    for m in messages {
        let flag = match m.risk_level {
            Some(tier) => format!("[{}]", tier),
            None => String::new(),
        };
        out.push_str(&format!(
            "{}  {} -> {}  {} {}\n    {}\n",
            display_timestamp(&m.timestamp),
            m.sender_name,
            m.recipient_name,
            m.source_app,
            flag,
            m.text
        ));
        for rule in &m.rules_triggered {
            out.push_str(&format!(
                "    ! {} ({}% confidence)\n",
                rule.rule,
                confidence_display(rule.confidence)
            ));
        }
    }
    Ok(out)
}

pub fn render_timeline(
    events: &[&TimelineEvent],
    counts: &BTreeMap<EventType, usize>,
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(&Listing {
            total: events.len(),
            items: events,
            counts: Some(
                counts
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect(),
            ),
        });
    }
    let mut out = String::new();
    let tallies: Vec<String> = counts
        .iter()
        .map(|(k, v)| format!("{} {}", k.display_name(), v))
        .collect();
    out.push_str(&format!("{}\n", tallies.join(" | ")));
    for e in events {
        out.push_str(&format!(
            "{}  {:<12} {:<8} {}  ({}% {})\n",
            display_timestamp(&e.timestamp),
            e.event_type.display_name(),
            e.risk_level,
            e.label,
            confidence_display(e.explain.confidence),
            e.explain.model
        ));
        if let Some(preview) = &e.preview {
            out.push_str(&format!("    {}\n", preview));
        }
    }
    Ok(out)
}

pub fn render_media(
    media: &[&Media],
    counts: &BTreeMap<LabelKind, usize>,
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(&Listing {
            total: media.len(),
            items: media,
            counts: Some(
                counts
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect(),
            ),
        });
    }
    let mut out = String::new();
    let tallies: Vec<String> = counts.iter().map(|(k, v)| format!("{k} {v}")).collect();
    out.push_str(&format!("{} media | {}\n", media.len(), tallies.join(" | ")));
    for m in media {
        out.push_str(&format!(
            "{:<10} {:<22} {:<8} {:>9}  {}\n",
            m.id,
            m.file_name,
            m.risk_level,
            format_megabytes(m.file_size),
            label_summary(m)
        ));
    }
    Ok(out)
}

pub fn render_pois(rows: &[PoiRow], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(rows);
    }
    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. {:<20} {:<12} {:>3} {:<8} {}\n",
            idx + 1,
            row.name,
            row.phone,
            row.score,
            row.tier,
            score_bar(row.bar_width)
        ));
    }
    Ok(out)
}

#[derive(Serialize)]
struct PoiDetail<'a> {
    poi: &'a Poi,
    tier: RiskTier,
    badge: &'static str,
    bar_width: u8,
    evidence: &'a PoiEvidence<'a>,
}

pub fn render_poi_detail(
    poi: &Poi,
    evidence: &PoiEvidence<'_>,
    format: OutputFormat,
) -> Result<String> {
    let tier = TierScheme::Detail.classify(poi.score);
    if format == OutputFormat::Json {
        return to_json(&PoiDetail {
            poi,
            tier,
            badge: badge_label(tier),
            bar_width: bar_width(poi.score),
            evidence,
        });
    }
    let fb = &poi.feature_breakdown;
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", poi.name, poi.phone));
    if let Some(email) = &poi.email {
        out.push_str(&format!("{}\n", email));
    }
    out.push_str(&format!(
        "Score {} {} {}\n\n",
        poi.score,
        badge_label(tier),
        score_bar(bar_width(poi.score))
    ));
    out.push_str(&format!(
        "Messages: {} ({} suspicious)\nFlagged media: {}\nTime anomaly: {}%\nFrequency: {:.1}/day\nUnusual hours: {:.0}%\n",
        fb.total_messages,
        fb.suspicious_msg_count,
        fb.flagged_media_assoc,
        confidence_display(fb.time_anomaly_score),
        fb.communication_frequency,
        fb.unusual_hour_pct
    ));
    out.push_str(&format!(
        "Contact window: {} to {}\n\n",
        display_timestamp(&poi.first_contact),
        display_timestamp(&poi.last_contact)
    ));
    out.push_str(&format!("Evidence messages ({})\n", evidence.messages.len()));
    for m in &evidence.messages {
        out.push_str(&format!("  {}  {}\n", m.id, m.text));
    }
    out.push_str(&format!("Evidence media ({})\n", evidence.media.len()));
    for m in &evidence.media {
        out.push_str(&format!("  {}  {}\n", m.id, m.file_name));
    }
    out.push_str(&format!("Evidence events ({})\n", evidence.events.len()));
    for e in &evidence.events {
        out.push_str(&format!(
            "  {}  {}\n",
            display_timestamp(&e.timestamp),
            e.label
        ));
    }
    if !poi.contact_network.is_empty() {
        out.push_str("Network\n");
        for node in &poi.contact_network {
            let risk = node
                .risk_score
                .map(|s| format!(" risk {s}"))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {} ({} messages{})\n",
                node.name, node.message_count, risk
            ));
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactRow {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub message_count: usize,
    pub suspicious_count: usize,
}

/// Identity table joined with message traffic, in identity order.
pub fn contact_rows<'a>(
    identities: impl IntoIterator<Item = &'a Identity>,
    activity: &[ContactActivity],
) -> Vec<ContactRow> {
    identities
        .into_iter()
        .map(|identity| {
            let traffic = activity.iter().find(|a| a.id == identity.id);
            ContactRow {
                id: identity.id.clone(),
                name: identity.name.clone(),
                phone: identity.phone.clone(),
                message_count: traffic.map_or(0, |a| a.message_count),
                suspicious_count: traffic.map_or(0, |a| a.suspicious_count),
            }
        })
        .collect()
}

pub fn render_contacts(rows: &[ContactRow], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(rows);
    }
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{:<12} {:<20} {:<16} {:>3} msgs {:>3} suspicious\n",
            row.id,
            row.name,
            row.phone.as_deref().unwrap_or("-"),
            row.message_count,
            row.suspicious_count
        ));
    }
    Ok(out)
}

pub fn render_search(results: &SearchResults<'_>, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(results);
    }
    let mut out = format!(
        "{} of {} matches for \"{}\"\n",
        results.hits.len(),
        results.total,
        results.query
    );
    for hit in &results.hits {
        let (kind, detail) = match hit {
            SearchHit::Contact(c) => (
                "contact",
                format!("{} {}", c.name, c.phone.as_deref().unwrap_or("")),
            ),
            SearchHit::Message(m) => ("message", format!("{}: {}", m.sender_name, m.text)),
            SearchHit::File(f) => ("file", f.file_name.clone()),
        };
        out.push_str(&format!("{:<8} {:<12} {}\n", kind, hit.id(), detail.trim_end()));
    }
    Ok(out)
}

pub fn render_export(job: &ExportJob, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(job);
    }
    let mut out = format!(
        "Export for case {}: {} ({}%)\n",
        job.case_id(),
        job.stage(),
        job.progress()
    );
    match job.stage() {
        ExportStage::Complete => {
            for file in job.files() {
                out.push_str(&format!(
                    "  {}  generated {}  sha256 {}\n",
                    file.name,
                    display_timestamp(&file.generated_at),
                    file.sha256
                ));
            }
        }
        ExportStage::Error => {
            out.push_str(&format!("  failed: {}\n", job.error().unwrap_or("unknown")));
        }
        ExportStage::Progress => {
            out.push_str(&format!(
                "  about {} seconds remaining\n",
                job.seconds_remaining()
            ));
        }
        ExportStage::Config => {}
    }
    Ok(out)
}

#[derive(Serialize)]
struct ImportReport<'a> {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn render_import(outcome: &NavOutcome, format: OutputFormat) -> Result<String> {
    let report = match outcome {
        NavOutcome::ImportRequested(file) => ImportReport {
            accepted: true,
            file: Some(file.name.as_str()),
            size: Some(file.size),
            error: None,
        },
        NavOutcome::ImportRejected(message) => ImportReport {
            accepted: false,
            file: None,
            size: None,
            error: Some(message.as_str()),
        },
        _ => ImportReport {
            accepted: false,
            file: None,
            size: None,
            error: Some("no file selected"),
        },
    };
    if format == OutputFormat::Json {
        return to_json(&report);
    }
    Ok(match (report.accepted, report.file, report.error) {
        (true, Some(name), _) => format!(
            "accepted {} ({})\n",
            name,
            format_megabytes(report.size.unwrap_or(0))
        ),
        (_, _, Some(error)) => format!("rejected: {}\n", error),
        _ => "rejected\n".to_string(),
    })
}
