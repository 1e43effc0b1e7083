//! User-Agent string for catalog API traffic.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/art-catalog";

/// Default User-Agent for every catalog request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("art-catalog/{version} (+{PROJECT_UA_URL})")
}
