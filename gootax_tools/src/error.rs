use thiserror::Error;

#[derive(Debug, Error)]
pub enum GootaxApiError {
    #[error("Could not initialize provider client: {0}")]
    Initialization(String),
    /// The provider answered with a non-retryable client error (4xx other than 429). The request itself is wrong;
    /// retrying would only burn quota.
    #[error("Provider rejected the order (status {status}): {body}")]
    OrderRejected { status: u16, body: String, curl: String },
    /// A transient failure: no response at all, 429, or a 5xx. Eligible for retry; surfaced only once the retry
    /// budget is exhausted.
    #[error("Provider unavailable{}: {message}", status_suffix(.status))]
    Unavailable { status: Option<u16>, message: String, curl: String },
    #[error("Could not parse provider response: {0}")]
    InvalidResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl GootaxApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GootaxApiError::Unavailable { .. })
    }

    /// The cURL reproduction of the failed request, when one was actually sent.
    pub fn curl_reproduction(&self) -> Option<&str> {
        match self {
            GootaxApiError::OrderRejected { curl, .. } | GootaxApiError::Unavailable { curl, .. } => Some(curl),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GootaxApiError::OrderRejected { status, .. } => Some(*status),
            GootaxApiError::Unavailable { status, .. } => *status,
            _ => None,
        }
    }
}
