//! URL helpers: normalization of scraped links and the non-HTML link filter

use url::Url;

/// Path suffixes that never lead to an HTML page
const NON_HTML_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".png", ".jpg"];

/// Turn a scraped href into an absolute URL without a fragment
///
/// Same-site links (path-only, relative or scheme-relative) get `scheme` and `host`
/// filled in; links that already carry a host keep it. Query and path are kept as is.
///
/// # Examples
///
/// ```
/// use hn_dl::utils::normalize_url;
///
/// assert_eq!(
///     normalize_url("/item?id=123", "https", "news.ycombinator.com"),
///     "https://news.ycombinator.com/item?id=123"
/// );
/// assert_eq!(
///     normalize_url("https://example.com/a#frag", "https", "news.ycombinator.com"),
///     "https://example.com/a"
/// );
/// ```
pub fn normalize_url(url: &str, scheme: &str, host: &str) -> String {
    let url = url.trim();

    let parsed = match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("{scheme}://{host}/"))
            .ok()
            .and_then(|base| base.join(url).ok()),
        Err(_) => None,
    };

    match parsed {
        Some(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        // Unparseable input is passed through with only the fragment dropped
        None => strip_fragment(url).to_string(),
    }
}

/// Whether a front-page article link may point at an HTML page
///
/// Rejects links whose path ends in `.pdf`, `.txt`, `.png` or `.jpg`. The match is
/// case-sensitive and ignores the query string.
pub fn validate_link(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => strip_fragment(url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    !NON_HTML_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}
