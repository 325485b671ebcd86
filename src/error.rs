//! Error types for the clustering session.
//!
//! Validation failures (`InsufficientCentroids`, `CentroidLimitReached`) and
//! `NotInitialized` are raised before any request leaves the process.
//! `Service` wraps everything that went wrong talking to the backend.

use thiserror::Error;

/// Failure talking to the clustering backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode service response: {0}")]
    Decode(String),
}

/// Errors surfaced by the session controllers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("manual initialization needs at least one selected centroid")]
    InsufficientCentroids,
    #[error("already selected {k} centroids")]
    CentroidLimitReached { k: usize },
    #[error("KMeans is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl Error {
    /// True for the errors that reject user input before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InsufficientCentroids | Error::CentroidLimitReached { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
