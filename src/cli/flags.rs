use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::types::{EventType, LabelKind};
use crate::pipeline::reporter::OutputFormat;
use crate::session::export::{ExportFormat, ExportOption};

#[derive(Parser, Debug)]
#[command(
    name = "sherlock-cockpit",
    version,
    about = "Forensic case review cockpit over a phone extraction snapshot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML). Default: config/cockpit.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Case snapshot (JSON); overrides case_path from the config
    #[arg(long, global = true)]
    pub case: Option<PathBuf>,

    /// Output rendering
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputArg,

    /// Increase verbosity (info, debug, trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path
    #[arg(long, default_value = "data/cockpit.log", global = true)]
    pub log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Case overview: counters, top POIs, flagged media
    Summary,
    /// Browse messages (suspicious only unless --all)
    Messages {
        /// Include messages that were not flagged
        #[arg(long)]
        all: bool,
        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,
        /// Only messages sent or received by this contact id
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Chronological events (suspicious only unless --all)
    Timeline {
        #[arg(long)]
        all: bool,
        /// Event types to include
        #[arg(long, value_delimiter = ',', value_parser = parse_event_type)]
        types: Option<Vec<EventType>>,
    },
    /// Media gallery filtered by label and confidence
    Media {
        /// Labels to include
        #[arg(long, value_delimiter = ',', value_parser = parse_label)]
        labels: Option<Vec<LabelKind>>,
        /// Minimum label confidence in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
        /// Case-insensitive file name search
        #[arg(long)]
        name: Option<String>,
    },
    /// Search contacts, message text and file names at once
    Search {
        text: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Ranked persons of interest
    Pois,
    /// One person of interest with resolved evidence
    Poi {
        id: String,
    },
    /// Contact directory with message counts
    Contacts,
    /// Run the simulated export job
    Export {
        #[arg(long, value_enum, default_value = "both")]
        format: FormatArg,
        /// Evidence categories to leave out
        #[arg(long, value_delimiter = ',', value_parser = parse_export_option)]
        exclude: Vec<ExportOption>,
        #[arg(long)]
        redact_pii: bool,
        #[arg(long)]
        raw_logs: bool,
    },
    /// Check a file for import
    Import {
        path: PathBuf,
    },
    /// Interactive read-only browser
    Tui,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputArg {
    Text,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(value: OutputArg) -> Self {
        match value {
            OutputArg::Text => OutputFormat::Text,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Pdf,
    Json,
    Both,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Both => ExportFormat::Both,
        }
    }
}

fn parse_event_type(value: &str) -> Result<EventType, String> {
    value.parse().map_err(|e: crate::core::error::CaseError| e.to_string())
}

fn parse_label(value: &str) -> Result<LabelKind, String> {
    value.parse().map_err(|e: crate::core::error::CaseError| e.to_string())
}

fn parse_export_option(value: &str) -> Result<ExportOption, String> {
    value.parse().map_err(|e: crate::core::error::CaseError| e.to_string())
}
