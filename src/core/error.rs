use std::io;

#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("case file parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("duplicate {collection} id: {id}")]
    DuplicateId {
        collection: &'static str,
        id: String,
    },
    #[error("invariant violated on {id}: {detail}")]
    Invariant { id: String, detail: String },
    #[error("{field} out of range on {id}: {value}")]
    OutOfRange {
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("invalid sha256 on media {id}")]
    InvalidHash { id: String },
    #[error("broken {collection} reference: {id}")]
    BrokenReference {
        collection: &'static str,
        id: String,
    },
    #[error("export cannot {action} while {stage}")]
    InvalidTransition {
        action: &'static str,
        stage: &'static str,
    },
    #[error("unknown view: {0}")]
    UnknownView(String),
    #[error("invalid payload for {view}: {detail}")]
    InvalidPayload { view: &'static str, detail: String },
    #[error("invalid {kind}: {value}")]
    Parse { kind: &'static str, value: String },
}

impl From<toml::de::Error> for CaseError {
    fn from(err: toml::de::Error) -> Self {
        CaseError::Config(err.to_string())
    }
}
