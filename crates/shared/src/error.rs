use serde::{Deserialize, Serialize};

/// Error envelope the scheduling service returns on rejected requests,
/// e.g. `{"detail": "Rate limit exceeded"}`. The detail text is surfaced
/// to the operator verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
