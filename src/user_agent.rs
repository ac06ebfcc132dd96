//! User-Agent string for E-utilities requests.
//!
//! NCBI asks clients to identify themselves; the `tool` and `email` query
//! parameters carry the contact, and the header names the program and version.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/litopics/litopics";

/// Default User-Agent for bibliographic service requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("litopics/{version} (literature-research-tool; +{PROJECT_UA_URL})")
}
