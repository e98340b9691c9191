use thiserror::Error;

/// Failure of a single site adapter fetch.
///
/// Always scoped to one adapter: the aggregator logs it and treats the site
/// as having returned zero offers. It never propagates to `aggregate` callers.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network failure: {message}")]
    Network { message: String },

    #[error("failed to parse listing page: {message}")]
    Parse { message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network {
                message: err.to_string(),
            }
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
