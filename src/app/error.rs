use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No feeds registered")]
    NoFeeds,

    #[error("Post already stored: {0}")]
    DuplicateUrl(String),

    #[error("Feed already registered: {0}")]
    DuplicateFeed(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Already following {0}")]
    AlreadyFollowing(String),

    #[error("Not following {0}")]
    NotFollowing(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No user logged in, run `gator login <name>` first")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid interval: {0}")]
    Interval(#[from] crate::config::DurationError),

    #[error("{0}")]
    Other(String),
}

impl GatorError {
    /// Network failures: the fetch never produced a body.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            GatorError::Http(_) | GatorError::HttpStatus { .. } | GatorError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
