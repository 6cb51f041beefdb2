use thiserror::Error;

/// Everything that can abort a season/category run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport, DNS or HTTP-status failure while retrieving a page.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Expected page structure (table, link, URL) is absent or malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// URL path shorter than the fixed segment layout needed for race metadata.
    #[error("{url}: path has {found} segments, need at least {needed}")]
    Schema {
        url: String,
        needed: usize,
        found: usize,
    },

    /// A per-race worker panicked or was cancelled.
    #[error("worker for {url} failed: {reason}")]
    Task { url: String, reason: String },

    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScrapeError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
