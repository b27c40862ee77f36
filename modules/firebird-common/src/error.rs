use thiserror::Error;

#[derive(Error, Debug)]
pub enum FirebirdError {
    #[error("Content fetch failed for location {location_id}: {message}")]
    ContentFetch {
        location_id: String,
        message: String,
    },

    #[error("Content fetch for location {location_id} timed out after {seconds}s")]
    Timeout { location_id: String, seconds: u64 },

    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = FirebirdError> = std::result::Result<T, E>;
