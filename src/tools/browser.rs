//! Open URLs in the user's default browser
//!
//! Delegates to the platform opener (`xdg-open`, `open`, `cmd /C start`).

use std::process::{Command, Stdio};

use crate::{Error, Result};

/// Build the opener invocation for this platform
fn opener_command(url: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        // Empty title argument so `start` does not treat the URL as one
        cmd.args(["/C", "start", "", url]);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Open `url` in a new browser tab
///
/// # Errors
///
/// Returns error if the opener cannot be spawned
pub fn open_url(url: &str) -> Result<()> {
    let mut child = opener_command(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Launch(format!("failed to open browser: {e}")))?;

    tracing::info!(url, "opened browser");

    // Reap the opener without blocking the caller
    std::thread::spawn(move || {
        let _ = child.wait();
    });

    Ok(())
}

/// Google search URL for `query`
#[must_use]
pub fn google_search_url(query: &str) -> String {
    format!(
        "https://www.google.com/search?q={}",
        urlencoding::encode(query)
    )
}

/// `YouTube` results URL for `query`
#[must_use]
pub fn youtube_search_url(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_urls_are_encoded() {
        assert_eq!(
            google_search_url("gatos negros"),
            "https://www.google.com/search?q=gatos%20negros"
        );
        assert_eq!(
            youtube_search_url("música & baile"),
            "https://www.youtube.com/results?search_query=m%C3%BAsica%20%26%20baile"
        );
    }

    #[test]
    fn test_opener_program() {
        let cmd = opener_command("https://example.com");
        let program = cmd.get_program().to_string_lossy().to_string();
        assert!(["xdg-open", "open", "cmd"].contains(&program.as_str()));
    }
}
