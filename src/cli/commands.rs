use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::cli::config::{open_session, resolve_config, RunConfig};
use crate::cli::flags::{Cli, Command};
use crate::core::types::{EventType, LabelKind};
use crate::pipeline::classifier::TierScheme;
use crate::pipeline::filter::{contact_activity, event_type_counts, label_counts, search, Page};
use crate::pipeline::reporter::{
    contact_rows, poi_rows, render_contacts, render_export, render_import, render_media,
    render_messages, render_pois, render_poi_detail, render_search, render_summary,
    render_timeline,
};
use crate::session::export::{run_export, ExportEvent, ExportFormat, ExportJob, ExportOption};
use crate::session::navigation::{Payload, Session, View};
use crate::ui::tui::run_tui;

pub async fn run(cli: Cli) -> Result<()> {
    let cfg = resolve_config(&cli)?;
    let mut session = open_session(&cfg)?;

    match cli.command {
        Command::Summary => print(render_summary(&session.summary(), cfg.output)?),
        Command::Messages {
            all,
            search,
            contact,
            limit,
            offset,
        } => run_messages(&mut session, &cfg, all, search, contact, limit, offset),
        Command::Timeline { all, types } => run_timeline(&mut session, &cfg, all, types),
        Command::Media {
            labels,
            threshold,
            name,
        } => run_media(&mut session, &cfg, labels, threshold, name),
        Command::Search {
            text,
            limit,
            offset,
        } => run_search(&session, &cfg, &text, limit, offset),
        Command::Pois => {
            let rows = poi_rows(session.store().pois(), TierScheme::Card);
            print(render_pois(&rows, cfg.output)?)
        }
        Command::Poi { id } => run_poi(&mut session, &cfg, id),
        Command::Contacts => {
            let store = session.store();
            let activity = contact_activity(store.messages());
            let rows = contact_rows(store.identities().iter(), &activity);
            print(render_contacts(&rows, cfg.output)?)
        }
        Command::Export {
            format,
            exclude,
            redact_pii,
            raw_logs,
        } => {
            run_export_cmd(
                &mut session,
                &cfg,
                format.into(),
                &exclude,
                redact_pii,
                raw_logs,
            )
            .await
        }
        Command::Import { path } => run_import(&mut session, &cfg, &path),
        Command::Tui => run_tui(session),
    }
}

fn print(text: String) -> Result<()> {
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn run_messages(
    session: &mut Session,
    cfg: &RunConfig,
    all: bool,
    search: Option<String>,
    contact: Option<String>,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    session.navigate(View::Chat, Payload::None)?;
    let chat = session.chat_mut();
    if all {
        chat.toggle_suspicious();
    }
    chat.set_search(search.unwrap_or_default());
    chat.select_contact(contact);
    if let Some(limit) = limit {
        chat.page.limit = limit;
    }
    chat.page.offset = offset;

    let total = session.chat().filter.apply(session.store().messages()).len();
    let page = session.message_results();
    let items = page.items().unwrap_or_default();
    tracing::info!(shown = items.len(), total, "messages listed");
    print(render_messages(items, total, cfg.output)?)
}

fn run_timeline(
    session: &mut Session,
    cfg: &RunConfig,
    all: bool,
    types: Option<Vec<EventType>>,
) -> Result<()> {
    session.navigate(View::Timeline, Payload::None)?;
    let timeline = session.timeline_mut();
    if all {
        timeline.toggle_suspicious();
    }
    if let Some(types) = types {
        timeline.filter.types = types.into_iter().collect();
    }
    let counts = event_type_counts(session.store().timeline());
    let results = session.timeline_results();
    print(render_timeline(
        results.items().unwrap_or_default(),
        &counts,
        cfg.output,
    )?)
}

fn run_media(
    session: &mut Session,
    cfg: &RunConfig,
    labels: Option<Vec<LabelKind>>,
    threshold: Option<u8>,
    name: Option<String>,
) -> Result<()> {
    session.navigate(View::Media, Payload::None)?;
    let media = session.media_mut();
    if let Some(labels) = labels {
        media.filter.labels = labels.into_iter().collect();
    }
    if let Some(threshold) = threshold {
        media.set_threshold(threshold);
    }
    if let Some(name) = name {
        media.filter.file_name = name;
    }
    let counts = label_counts(session.store().media());
    let results = session.media_results();
    print(render_media(
        results.items().unwrap_or_default(),
        &counts,
        cfg.output,
    )?)
}

fn run_poi(session: &mut Session, cfg: &RunConfig, id: String) -> Result<()> {
    session.navigate(View::Poi, Payload::Poi(id))?;
    let poi = session
        .selected_poi()
        .ok_or_else(|| anyhow!("no poi selected"))?;
    let evidence = session
        .poi_evidence()?
        .ok_or_else(|| anyhow!("no poi selected"))?;
    print(render_poi_detail(poi, &evidence, cfg.output)?)
}

fn run_search(
    session: &Session,
    cfg: &RunConfig,
    text: &str,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    let store = session.store();
    let page = Page {
        limit: limit.unwrap_or(session.settings().page_limit),
        offset,
    };
    let results = search(
        store.identities(),
        store.messages(),
        store.media(),
        text,
        page,
    )?;
    tracing::info!(shown = results.hits.len(), total = results.total, "search listed");
    print(render_search(&results, cfg.output)?)
}

async fn run_export_cmd(
    session: &mut Session,
    cfg: &RunConfig,
    format: ExportFormat,
    exclude: &[ExportOption],
    redact_pii: bool,
    raw_logs: bool,
) -> Result<()> {
    session.navigate(View::Export, Payload::None)?;
    let mut job: ExportJob = session
        .close_export()
        .ok_or_else(|| anyhow!("export panel did not open"))?;
    job.set_format(format)?;
    for option in exclude {
        job.set_option(*option, false)?;
    }
    job.set_option(ExportOption::RedactPii, redact_pii)?;
    job.set_option(ExportOption::RawLogs, raw_logs)?;

    let (tx, mut rx) = mpsc::channel(16);
    let driver = tokio::spawn(run_export(job, tx));
    while let Some(event) = rx.recv().await {
        match &event {
            ExportEvent::Started => tracing::debug!("export job running"),
            ExportEvent::Progress {
                percent,
                seconds_remaining,
            } => tracing::info!(percent, seconds_remaining, "export progress"),
            ExportEvent::Completed { files } => {
                tracing::debug!(files = files.len(), "export files listed")
            }
            ExportEvent::Failed { reason } => tracing::warn!(reason = %reason, "export failed"),
        }
    }
    let job = driver.await??;
    let rendered = render_export(&job, cfg.output)?;
    session.put_export(job);
    print(rendered)
}

fn run_import(session: &mut Session, cfg: &RunConfig, path: &Path) -> Result<()> {
    let outcome = session.import_path(path)?;
    print(render_import(&outcome, cfg.output)?)
}
