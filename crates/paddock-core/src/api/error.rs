use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the F1 data provider. The API is public, so there
/// is no credential to refresh: every variant is either "try later" or
/// "this data does not exist (yet)".
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403 from a public endpoint: the provider is blocking this client.
    #[error("Provider refused the request ({status}): {body}")]
    Refused { status: StatusCode, body: String },

    /// 404, typically next season's calendar before it is published.
    #[error("Nothing published at {url}")]
    NotPublished { url: String },

    #[error("Rate limited by provider, gave up after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Provider unavailable ({status}): {body}")]
    Unavailable { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected provider response ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

/// Longest response body kept in an error message
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn clip_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

impl ApiError {
    /// Classify a non-success, non-429 response for `url`.
    pub fn from_status(url: &str, status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Refused {
                status,
                body: clip_body(body),
            },
            404 => ApiError::NotPublished { url: url.to_string() },
            500..=599 => ApiError::Unavailable {
                status,
                body: clip_body(body),
            },
            _ => ApiError::Unexpected {
                status,
                body: clip_body(body),
            },
        }
    }

    /// Whether the requested data simply does not exist yet.
    pub fn is_not_published(&self) -> bool {
        matches!(self, ApiError::NotPublished { .. })
    }
}
