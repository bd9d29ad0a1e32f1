use url::Url;

use crate::error::AuditError;

/// Turn user input into the audited site root: an http(s) URL whose path ends
/// with `/`, without query or fragment.
pub fn site_root(input: &str) -> Result<Url, AuditError> {
    let trimmed = input.trim();
    let invalid = |message: String| AuditError::InvalidUrl {
        input: input.to_string(),
        message,
    };

    let mut url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Whether `candidate` lives under `root`: same origin and a path below the
/// root path.
pub fn is_within_site(root: &Url, candidate: &Url) -> bool {
    root.origin() == candidate.origin() && candidate.path().starts_with(root.path())
}

/// Resolve `href` against `base` and drop the fragment.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href.trim()).ok()?;
    url.set_fragment(None);
    Some(url)
}
