mod google;

pub use google::*;

use thiserror::Error;

/// Failures here are isolated to the export features; core CRUD never
/// depends on this module succeeding.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not authorized: {0}")]
    Auth(String),
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },
}
