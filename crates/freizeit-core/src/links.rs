//! Feed link-list reading.
//!
//! Feed sources are configured in a plain text file, one URL per line.
//! Blank lines and lines starting with `#` are comments; `webcal://`
//! URLs are rewritten to `https://` before use. Lines that do not hold
//! a recognizable URL are skipped with a warning rather than failing
//! the whole list.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Regex matching a feed URL on a list line.
static FEED_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?|webcal)://[^\s<>"']+"#).expect("Invalid feed URL regex")
});

/// Errors reading a link list.
#[derive(Debug, Error)]
pub enum LinkListError {
    /// The list file could not be read.
    #[error("failed to read link list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a link list file and returns the usable feed URLs.
///
/// # Errors
///
/// Returns an error only if the file itself cannot be read; bad lines
/// inside it are skipped.
pub fn read_link_file(path: &Path) -> Result<Vec<Url>, LinkListError> {
    let text = std::fs::read_to_string(path).map_err(|source| LinkListError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_link_list(&text))
}

/// Parses link list text into feed URLs.
///
/// Each non-comment line contributes at most one URL; `webcal://` is
/// rewritten to `https://`.
pub fn parse_link_list(text: &str) -> Vec<Url> {
    let mut urls = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(found) = FEED_URL_REGEX.find(line) else {
            warn!(line = number + 1, content = line, "skipping non-URL line in link list");
            continue;
        };
        let rewritten = rewrite_webcal(found.as_str());
        match Url::parse(&rewritten) {
            Ok(url) => urls.push(url),
            Err(error) => {
                warn!(line = number + 1, url = rewritten, error = %error, "skipping unparsable URL");
            }
        }
    }
    urls
}

/// Rewrites the legacy `webcal://` scheme to `https://`.
fn rewrite_webcal(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
