use reqwest::Url;

use crate::error::TransportError;

/// Join a descriptor uri onto the configured base URL.
///
/// Absolute `http(s)://` uris are used as-is; anything else is treated as a
/// path relative to the base, keeping any path prefix the base carries.
pub fn resolve_url(base: &Url, uri: &str) -> Result<Url, TransportError> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: "uri is empty".into(),
        });
    }

    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Url::parse(uri).map_err(|e| TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        });
    }

    if base.cannot_be_a_base() {
        return Err(TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: format!("base URL `{base}` cannot carry a path"),
        });
    }

    let (path, query) = match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    };
    let prefix = base.path().trim_end_matches('/');
    let mut url = base.clone();
    url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    url.set_query(query);

    Ok(url)
}
