//! Opening URLs in the user's browser

use std::process::{Command, Stdio};

use crate::{Error, Result};

/// Hands a URL to something that can show it
pub trait UrlOpener {
    /// Open `url`; returns once the hand-off succeeded
    ///
    /// # Errors
    ///
    /// Returns error if no opener is available or it cannot be spawned
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform's default handler
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let (program, mut args): (&str, Vec<&str>) = match std::env::consts::OS {
            "macos" => ("open", Vec::new()),
            "windows" => ("cmd", vec!["/C", "start", ""]),
            _ => ("xdg-open", Vec::new()),
        };
        args.push(url);

        let program = which::which(program)
            .map_err(|e| Error::Service(format!("no URL opener ({program}): {e}")))?;

        // Don't wait: the browser outlives the request
        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Service(format!("failed to launch {}: {e}", program.display())))?;

        tracing::debug!(url, "opened URL");
        Ok(())
    }
}

/// Substitute the URL-encoded query into a `{query}` template
#[must_use]
pub fn fill_template(template: &str, query: &str) -> String {
    template.replace("{query}", &urlencoding::encode(query))
}
