//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod content;
pub mod dashboard;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use teamsite_core::session::SessionManager;
use teamsite_types::Profile;

/// Prints `label` and reads one line from stdin (without the newline).
///
/// Secrets are read the same way so they can be piped in.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read from stdin")?;
    if read == 0 {
        bail!("No input provided for '{}'", label.trim_end_matches([':', ' ']));
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Restores stored tokens and loads the profile, failing when logged out.
pub(crate) async fn require_user(session: &SessionManager) -> Result<Profile> {
    match session.resume().await? {
        Some(profile) => Ok(profile),
        None => bail!("Not logged in. Run `teamsite login` first."),
    }
}
