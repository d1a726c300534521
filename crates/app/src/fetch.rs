use std::path::Path;

use anyhow::{Context, bail};
use board_core::{FetchedMedia, Fetcher};

/// Resolves `file://` URLs and bare paths. This build has no network client,
/// so remote schemes are refused.
pub struct LocalFetcher;

impl Fetcher for LocalFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<FetchedMedia> {
        let path = match url.split_once("://") {
            Some(("file", path)) => path,
            Some((scheme, _)) => {
                bail!("{scheme} URLs are not supported, download the file and use 'add'")
            }
            None => url,
        };
        let path = Path::new(path);

        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        tracing::debug!(path = %path.display(), len = bytes.len(), "fetched local media");
        Ok(FetchedMedia {
            bytes,
            content_type: board_decode::mime_from_path(path).to_string(),
        })
    }
}
