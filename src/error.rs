use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("Malformed timestamp '{0}', expected HH:MM:SS.mmm")]
    MalformedTimestamp(String),

    #[error("Malformed seconds value '{0}'")]
    MalformedSeconds(String),

    #[error("No subtitles were found in the file")]
    NoIntervals,

    #[error("No dialog left to extract after removing skipped chapters")]
    NoDialog,

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("No {0} tracks found")]
    NoTracks(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DialogError>;
