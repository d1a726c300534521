//! Importing audio from a URL.

/// Bytes and declared content type returned by a fetch.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Source of remote bytes. The session never talks to the network itself.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<FetchedMedia>;
}

pub const REMOTE_PLACEHOLDER_NAME: &str = "Remote sound";

/// Default display name for a URL: its last path segment without query or fragment.
pub fn display_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or_default(),
        None => without_query,
    };
    let segment = path.rsplit('/').next().unwrap_or_default().trim();

    if segment.is_empty() {
        REMOTE_PLACEHOLDER_NAME.to_string()
    } else {
        segment.to_string()
    }
}
