//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use linkbox_core::{Collection, Link};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single link
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", link.id);
                println!("Title:   {}", link.title);
                println!("URL:     {}", link.url);
                if !link.note.is_empty() {
                    println!("Note:    {}", link.note);
                }
                if !link.tags.is_empty() {
                    println!("Tags:    {}", link.tags.join(", "));
                }
                println!("Updated: {}", link.last_updated.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(link),
            OutputFormat::Quiet => println!("{}", link.id),
        }
    }

    /// Print a list of links
    pub fn print_links(&self, links: &[&Link]) {
        match self.format {
            OutputFormat::Human => {
                if links.is_empty() {
                    println!("No links found.");
                    return;
                }
                for link in links {
                    println!(
                        "{:>5} | {} | {}",
                        link.id,
                        truncate(&link.title, 35),
                        truncate(&link.url, 45)
                    );
                }
                println!("\n{} link(s)", links.len());
            }
            OutputFormat::Json => print_json(&links),
            OutputFormat::Quiet => {
                for link in links {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print a collection with its resolved links
    pub fn print_collection(&self, collection: &Collection, links: &[&Link]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", collection.id);
                println!("Title:   {}", collection.title);
                if !collection.note.is_empty() {
                    println!("Note:    {}", collection.note);
                }
                println!(
                    "Updated: {}",
                    collection.last_updated.format("%Y-%m-%d %H:%M")
                );

                let missing = collection.links.len() - links.len();
                println!();
                println!("── Links ({}) ──", links.len());
                for link in links {
                    println!("{:>5} | {}", link.id, truncate(&link.title, 60));
                }
                if missing > 0 {
                    println!("({} deleted link(s) still referenced)", missing);
                }
            }
            OutputFormat::Json => print_json(collection),
            OutputFormat::Quiet => println!("{}", collection.id),
        }
    }

    /// Print a list of collections
    pub fn print_collections(&self, collections: &[Collection]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections found.");
                    return;
                }
                for collection in collections {
                    println!(
                        "{:>5} | {} ({} link(s))",
                        collection.id,
                        truncate(&collection.title, 40),
                        collection.links.len()
                    );
                }
                println!("\n{} collection(s)", collections.len());
            }
            OutputFormat::Json => print_json(&collections),
            OutputFormat::Quiet => {
                for collection in collections {
                    println!("{}", collection.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
