//! Request identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest caller-supplied id that is propagated as-is.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Identifier attached to a request and echoed in `x-request-id`.
///
/// Either propagated from the caller, when the presented value is a short
/// run of visible ASCII, or freshly generated as a ULID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// New ULID-based id.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Accept a caller-supplied id, or `None` if it is empty, too long or
    /// contains anything besides visible ASCII.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    /// Propagate `header_value` when acceptable, otherwise generate.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(Self::from_header)
            .unwrap_or_else(Self::generate)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
