//! Status command handler

use anyhow::Result;

use linkbox_core::Library;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(library: &Library, output: &Output) -> Result<()> {
    let documents = library.documents();
    let settings = library.settings();
    let doc = documents.value();
    let issues = doc.validate();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "name": library.display_name(),
                    "path": documents.path(),
                    "dirty": documents.is_dirty(),
                    "watching": documents.is_watching(),
                    "last_error": documents.last_error(),
                    "counts": {
                        "links": doc.links.len(),
                        "collections": doc.collections.len(),
                        "id_counter": doc.id_counter,
                        "max_id": doc.max_id()
                    },
                    "issues": issues.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
                    "settings": {
                        "path": settings.path(),
                        "last_opened_file": settings.last_opened_file(),
                        "last_error": settings.last_error()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(path) = documents.path() {
                println!("{}", path.display());
            }
        }
        OutputFormat::Human => {
            println!("Linkbox Status");
            println!("==============");
            println!();
            println!("Document: {}", library.display_name());
            match documents.path() {
                Some(path) => println!("  Path:   {}", path.display()),
                None => println!("  Path:   (not saved)"),
            }
            if !documents.last_error().is_empty() {
                println!("  Error:  {}", documents.last_error());
            }
            println!();
            println!("Contents:");
            println!("  Links:       {}", doc.links.len());
            println!("  Collections: {}", doc.collections.len());
            println!("  Next id:     {}", doc.id_counter + 1);
            println!("  Highest id:  {}", doc.max_id());
            if !issues.is_empty() {
                println!();
                println!("Issues:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
            println!();
            println!("Settings:");
            if let Some(path) = settings.path() {
                println!("  File:        {}", path.display());
            }
            if !settings.last_error().is_empty() {
                println!("  Error:       {}", settings.last_error());
            }
        }
    }

    Ok(())
}
