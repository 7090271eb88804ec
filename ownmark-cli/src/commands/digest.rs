//! Digest command - SHA-256 of an email, a file or a text.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ownmark_core::{digest_of, digest_of_file, normalize_email};
use tracing::debug;

/// Execute the digest command. Exactly one input is expected.
pub fn execute(email: Option<String>, file: Option<PathBuf>, text: Option<String>) -> Result<()> {
    let digest = match (email, file, text) {
        (Some(email), None, None) => {
            let normalized = normalize_email(&email);
            debug!(email = %normalized, "Hashing normalized email");
            digest_of(&normalized)
        }
        (None, Some(file), None) => digest_of_file(&file)
            .with_context(|| format!("Failed to read file: {}", file.display()))?,
        (None, None, Some(text)) => digest_of(&text),
        _ => bail!("exactly one of --email, --file or --text is required"),
    };

    println!("{digest}");
    Ok(())
}
