//! Link command handlers

use anyhow::{anyhow, Result};

use linkbox_core::{EntryId, Library, Link, NewLink};

use crate::commands::save;
use crate::metadata::fetch_title;
use crate::output::Output;
use crate::prompt::{confirm, prompt_optional, prompt_with_default};

/// Fields given on the command line for `link edit`
#[derive(Debug, Default)]
pub struct LinkEdits {
    pub url: Option<String>,
    pub title: Option<String>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl LinkEdits {
    fn is_empty(&self) -> bool {
        self.url.is_none() && self.title.is_none() && self.note.is_none() && self.tags.is_none()
    }

    fn apply(self, link: &mut Link) {
        if let Some(url) = self.url {
            link.url = url;
        }
        if let Some(title) = self.title {
            link.title = title;
        }
        if let Some(note) = self.note {
            link.note = note;
        }
        if let Some(tags) = self.tags {
            link.tags = tags;
        }
    }
}

/// Create a new link
pub async fn add(
    library: &mut Library,
    url: String,
    title: Option<String>,
    note: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let title = match title {
        Some(t) => t,
        None => fetch_title(&url).await,
    };

    let mut draft = NewLink::new(url).title(title).tags(normalize_tags(tags));
    if let Some(note) = note {
        draft = draft.note(note);
    }

    let link = library.documents_mut().add_link(draft);
    save(library).await?;

    output.success(&format!("Created link: {}", link.id));
    output.print_link(&link);
    Ok(())
}

/// List all links, optionally filtered by tag
pub fn list(library: &Library, tag: Option<String>, output: &Output) -> Result<()> {
    let documents = library.documents();
    let links = match tag {
        Some(ref t) => documents.links_with_tag(t),
        None => documents.sorted_links(),
    };

    output.print_links(&links);
    Ok(())
}

/// Show a single link
pub fn show(library: &Library, id: EntryId, output: &Output) -> Result<()> {
    let link = find(library, id)?;
    output.print_link(link);
    Ok(())
}

/// Edit a link, interactively when no field was given
pub async fn edit(
    library: &mut Library,
    id: EntryId,
    edits: LinkEdits,
    output: &Output,
) -> Result<()> {
    let mut link = find(library, id)?.clone();

    if edits.is_empty() {
        if !output.should_prompt() {
            output.message("Nothing to change.");
            return Ok(());
        }
        prompt_edits(&mut link)?;
    } else {
        edits.apply(&mut link);
    }

    library.documents_mut().update_link(link);
    save(library).await?;

    output.success("Link updated");
    output.print_link(find(library, id)?);
    Ok(())
}

/// Delete a link
pub async fn delete(library: &mut Library, id: EntryId, yes: bool, output: &Output) -> Result<()> {
    let link = find(library, id)?;

    if !yes && output.should_prompt() {
        println!("Delete link: {} - {}", link.id, link.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    library.documents_mut().delete_link(id);
    save(library).await?;

    output.success(&format!("Deleted link: {}", id));
    Ok(())
}

fn find(library: &Library, id: EntryId) -> Result<&Link> {
    library
        .documents()
        .link(id)
        .ok_or_else(|| anyhow!("Link not found: {}", id))
}

fn prompt_edits(link: &mut Link) -> Result<()> {
    println!("Editing link: {}", link.id);
    println!("Press Enter to keep current value, or type new value.\n");

    if let Some(title) = prompt_with_default("Title", &link.title)? {
        link.title = title;
    }
    if let Some(url) = prompt_with_default("URL", &link.url)? {
        link.url = url;
    }
    if let Some(note) = prompt_with_default("Note", &link.note)? {
        link.note = note;
    }

    let current_tags = link.tags.join(", ");
    println!(
        "Current tags: {}",
        if current_tags.is_empty() {
            "(none)"
        } else {
            &current_tags
        }
    );
    if let Some(tags) = prompt_optional("New tags (comma-separated)")? {
        link.tags = normalize_tags(tags.split(',').map(str::to_string).collect());
    }

    Ok(())
}

/// Trim, drop empties and duplicates, keep order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
