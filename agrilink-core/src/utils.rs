use log::debug;
use std::io;

/// Open a URL in the default browser
pub fn open_url(url: &str) -> io::Result<()> {
    debug!("Opening browser at {}", url);
    open::that(url)
}

/// First characters of a secret, for logs
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{}...", prefix)
}
