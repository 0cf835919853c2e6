use std::path::PathBuf;

/// Failures surfaced by the tracking core and the sync reconciler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid store file {path}: {source}")]
    CorruptStore {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("impossible to access store file {path}: {source}")]
    PersistenceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("project {project} is already started")]
    AlreadyRunning { project: String },
    #[error("no project started")]
    NotRunning,
    #[error("no project given")]
    EmptyProject,
    #[error("frame stops at {stop} before it starts at {start}")]
    InvalidInterval { start: i64, stop: i64 },
    #[error("a remote url and a token are required to sync")]
    MissingRemoteConfig,
    #[error("unable to reach the server: {0}")]
    RemoteUnreachable(String),
    #[error("an error occurred with the remote server ({status}): {detail}")]
    RemoteRejected { status: u16, detail: String },
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
