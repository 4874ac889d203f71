//! Watch command handler
//!
//! Keeps the document open and reports changes made to it by other
//! programs until interrupted.

use anyhow::{Context, Result};
use tracing::debug;

use linkbox_core::{Library, LibraryEvent, WatchOutcome};

use crate::output::Output;

pub async fn run(library: &mut Library, output: &Output) -> Result<()> {
    output.message(&format!(
        "Watching {} (Ctrl-C to stop)",
        library.display_name()
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            event = library.next_event() => {
                let Some(event) = event else {
                    output.message("Watcher stopped.");
                    break;
                };
                report(library, event, output);
            }
        }
    }

    Ok(())
}

fn report(library: &Library, event: LibraryEvent, output: &Output) {
    match event {
        LibraryEvent::Document(WatchOutcome::Reloaded) => {
            let doc = library.documents().value();
            output.message(&format!(
                "Reloaded {}: {} link(s), {} collection(s)",
                library.display_name(),
                doc.links.len(),
                doc.collections.len()
            ));
        }
        LibraryEvent::Document(WatchOutcome::ReloadFailed) => {
            output.message("File changed but could not be read; keeping previous contents");
        }
        LibraryEvent::Settings(WatchOutcome::Reloaded) => {
            output.message("Settings reloaded");
        }
        other => debug!("Watch event: {:?}", other),
    }
}
