use thiserror::Error;
use url::Url;

/// A search hit as delivered by the search collaborator.
///
/// Only `link` is consumed by mirroring; the rest is display data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub display_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceUrlError {
    #[error("empty url")]
    Empty,
    #[error("invalid url {input:?}: {message}")]
    Invalid { input: String, message: String },
    #[error("unsupported scheme {0}")]
    UnsupportedScheme(String),
}

/// Turns user input into the absolute URL of the page to mirror.
///
/// Absolute input is used as is. Page-relative input (see
/// [`is_page_relative`]) is joined onto `referrer` when one is known. Any
/// other input without a scheme is read as a host name and gets `https://`.
pub fn parse_source_url(raw: &str, referrer: Option<&Url>) -> Result<Url, SourceUrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SourceUrlError::Empty);
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match referrer {
            Some(base) if is_page_relative(trimmed) => base.join(trimmed),
            _ => Url::parse(&format!("https://{}", trimmed.trim_start_matches('/'))),
        },
        Err(err) => Err(err),
    }
    .map_err(|err| SourceUrlError::Invalid {
        input: trimmed.to_string(),
        message: err.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SourceUrlError::UnsupportedScheme(other.to_string())),
    }
}

/// Whether scheme-less input names a location on the current site rather
/// than a host.
///
/// Explicit relative forms (`/x`, `./x`, `../x`, `?q`, `#f`) always count.
/// Otherwise the first path segment decides: `docs/intro` is relative,
/// `example.com/docs` is a host.
pub fn is_page_relative(input: &str) -> bool {
    if input.starts_with("//") {
        return false;
    }
    if ["/", "./", "../", "?", "#"]
        .iter()
        .any(|prefix| input.starts_with(prefix))
        || input == "."
        || input == ".."
    {
        return true;
    }
    let first_segment = input.split(['/', '?', '#']).next().unwrap_or_default();
    !first_segment.contains('.')
}
