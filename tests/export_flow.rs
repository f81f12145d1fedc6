use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sherlock_cockpit::config::parse_config;
use sherlock_cockpit::core::store::EvidenceStore;
use sherlock_cockpit::pipeline::resolver::MissingRefPolicy;
use sherlock_cockpit::session::export::{
    run_export, ExportEvent, ExportFormat, ExportJob, ExportOption, ExportSettings, ExportStage,
    EXPORT_TIMED_OUT, NO_EVIDENCE_SELECTED,
};
use sherlock_cockpit::session::navigation::{NavOutcome, Payload, Session, View};

fn session() -> Session {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = parse_config(&std::fs::read_to_string(root.join("config/cockpit.toml")).unwrap())
        .unwrap();
    let store = EvidenceStore::from_case_file(&root.join(&cfg.case_path)).unwrap();
    Session::new(Arc::new(store), cfg.session_settings())
}

async fn drain(mut rx: mpsc::Receiver<ExportEvent>) -> Vec<ExportEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[test]
fn shipped_config_matches_defaults() {
    let session = session();
    let settings = session.settings();
    assert_eq!(settings.missing_refs, MissingRefPolicy::Warn);
    assert_eq!(settings.export, ExportSettings::default());
    assert_eq!(settings.default_threshold, 50);
}

#[tokio::test(start_paused = true)]
async fn export_runs_through_every_step() {
    let mut session = session();
    assert_eq!(
        session.navigate(View::Export, Payload::None).unwrap(),
        NavOutcome::ExportOpened
    );
    let job = session.close_export().unwrap();

    let (tx, rx) = mpsc::channel(16);
    let started = tokio::time::Instant::now();
    let driver = tokio::spawn(run_export(job, tx));
    let events = drain(rx).await;
    let job = driver.await.unwrap().unwrap();

    // five ticks of 800ms plus the 500ms completion delay
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(4500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(4600), "{elapsed:?}");
    assert_eq!(events.first(), Some(&ExportEvent::Started));
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ExportEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![20, 40, 60, 80, 100]);
    assert!(matches!(
        events.last(),
        Some(ExportEvent::Completed { files }) if files.len() == 2
    ));

    assert_eq!(job.stage(), ExportStage::Complete);
    let names: Vec<&str> = job.files().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Case_CASE-2024-0417_Report.pdf",
            "Case_CASE-2024-0417_Data.json"
        ]
    );
    assert_eq!(job.files()[0].sha256.len(), 64);
}

#[tokio::test(start_paused = true)]
async fn identical_requests_share_a_digest() {
    let mut a = ExportJob::new("CASE-1", ExportSettings::default());
    let mut b = ExportJob::new("CASE-1", ExportSettings::default());
    a.set_format(ExportFormat::Json).unwrap();
    b.set_format(ExportFormat::Json).unwrap();

    let (tx, rx) = mpsc::channel(16);
    let a = tokio::spawn(run_export(a, tx));
    drain(rx).await;
    let (tx, rx) = mpsc::channel(16);
    let b = tokio::spawn(run_export(b, tx));
    drain(rx).await;

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.files().len(), 1);
    assert_eq!(a.files()[0].sha256, b.files()[0].sha256);

    let mut c = ExportJob::new("CASE-1", ExportSettings::default());
    c.set_format(ExportFormat::Json).unwrap();
    c.set_option(ExportOption::RedactPii, true).unwrap();
    let (tx, rx) = mpsc::channel(16);
    let c = tokio::spawn(run_export(c, tx));
    drain(rx).await;
    let c = c.await.unwrap().unwrap();
    assert_ne!(a.files()[0].sha256, c.files()[0].sha256);
}

#[tokio::test(start_paused = true)]
async fn export_without_evidence_fails_immediately() {
    let mut job = ExportJob::new("CASE-1", ExportSettings::default());
    for option in ExportOption::ALL.into_iter().filter(|o| o.is_evidence()) {
        job.set_option(option, false).unwrap();
    }
    // extras alone do not count as evidence
    job.set_option(ExportOption::RawLogs, true).unwrap();

    let (tx, rx) = mpsc::channel(16);
    let driver = tokio::spawn(run_export(job, tx));
    let events = drain(rx).await;
    let mut job = driver.await.unwrap().unwrap();

    assert_eq!(
        events,
        vec![ExportEvent::Failed {
            reason: NO_EVIDENCE_SELECTED.to_string()
        }]
    );
    assert_eq!(job.stage(), ExportStage::Error);
    job.reset().unwrap();
    assert_eq!(job.stage(), ExportStage::Config);
    assert!(job.options().summary);
    assert!(!job.options().raw_logs);
}

#[tokio::test(start_paused = true)]
async fn stalled_export_times_out() {
    let settings = ExportSettings {
        step: 5,
        max_ticks: 4,
        ..ExportSettings::default()
    };
    let job = ExportJob::new("CASE-1", settings);
    let (tx, rx) = mpsc::channel(16);
    let driver = tokio::spawn(run_export(job, tx));
    let events = drain(rx).await;
    let job = driver.await.unwrap().unwrap();

    assert_eq!(
        events.last(),
        Some(&ExportEvent::Failed {
            reason: EXPORT_TIMED_OUT.to_string()
        })
    );
    assert_eq!(job.stage(), ExportStage::Error);
    assert_eq!(job.error(), Some(EXPORT_TIMED_OUT));
    assert!(job.files().is_empty());
}

#[tokio::test(start_paused = true)]
async fn config_cannot_change_while_running() {
    let mut job = ExportJob::new("CASE-1", ExportSettings::default());
    job.generate().unwrap();
    assert!(job.set_format(ExportFormat::Pdf).is_err());
    assert!(job.set_option(ExportOption::Messages, false).is_err());
    assert!(job.reset().is_err());
    assert!(job.generate().is_err());
}
