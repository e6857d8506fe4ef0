use url::Url;

/// Address prefixes that never get classified: browser-internal pages,
/// extension pages, local files and inline documents.
const EXCLUDED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "chrome-untrusted://",
    "edge://",
    "brave://",
    "opera://",
    "moz-extension://",
    "devtools://",
    "view-source:",
    "about:",
    "file:",
    "data:",
    "blob:",
    "javascript:",
];

/// Host component of `address`. Falls back to the address itself when it
/// does not parse or has no host, so callers must accept a "host" that is
/// really a full address.
pub fn extract_host(address: &str) -> String {
    match Url::parse(address) {
        Ok(url) => match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => address.to_string(),
        },
        Err(_) => address.to_string(),
    }
}

pub fn is_excluded_address(address: &str) -> bool {
    let trimmed = address.trim_start();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}
