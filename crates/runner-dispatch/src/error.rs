use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("JOURNAL/missing key {0}")]
    MissingJournalKey(&'static str),

    #[error("JOURNAL/no {0} data block")]
    MissingDataBlock(&'static str),

    #[error("JOURNAL/{path}: {source}")]
    JournalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("USAGE/{path}: {source}")]
    UsageLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("USAGE/{url}: {source}")]
    UsageServer {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("USAGE/serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("PAYLOAD/{0}")]
    Payload(#[source] serde_json::Error),

    #[error("REVEAL/{path}: {source}")]
    Reveal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/{0}")]
    Settings(String),
}
