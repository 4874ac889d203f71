//! Command handlers

pub mod collection;
pub mod config;
pub mod git;
pub mod link;
pub mod status;
pub mod watch;

use anyhow::{bail, Context, Result};

use linkbox_core::Library;

/// Fail unless a document file is open
pub fn require_document(library: &Library) -> Result<()> {
    if library.documents().path().is_none() {
        bail!(
            "No document open.\n\
             Pass --file <path> or open one with `linkbox save-as <path>` first."
        );
    }
    Ok(())
}

/// Write the open document after a change
pub async fn save(library: &mut Library) -> Result<()> {
    library
        .documents_mut()
        .save()
        .await
        .context("Failed to save document")
}
