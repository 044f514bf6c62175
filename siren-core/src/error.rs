use thiserror::Error;

#[derive(Error, Debug)]
pub enum SirenError {
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Geocoding failed: {0}")]
    GeocodingFailed(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SirenError>;
