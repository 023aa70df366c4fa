use std::io;
use std::path::PathBuf;

/// Failures while resolving or reading a track definition.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("no track named {0}")]
    Unknown(String),
    #[error("failed to read track file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed track file: {0}")]
    Format(#[from] serde_yaml::Error),
}

/// Failures on a framed packet connection. Any of these ends the connection.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("peer disconnected")]
    Disconnected,
    #[error("packet of {0} bytes does not fit the frame header")]
    Oversized(u64),
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("packet codec error: {0}")]
    Codec(#[from] bincode::Error),
}
