use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("rate limited by registry after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("page cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("invalid page index {0} (pages start at 1)")]
    InvalidPage(usize),

    #[error("empty company number")]
    EmptyIdentifier,
}

impl RegistryError {
    /// HTTP status reported by the registry, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Server { status, .. } => Some(*status),
            RegistryError::RateLimited { .. } => Some(429),
            RegistryError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the registry says the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
