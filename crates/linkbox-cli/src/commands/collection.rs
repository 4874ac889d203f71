//! Collection command handlers

use anyhow::{anyhow, bail, Result};

use linkbox_core::{EntryId, Library, NewCollection};

use crate::commands::save;
use crate::output::Output;
use crate::prompt::confirm;

/// Create a collection
pub async fn add(
    library: &mut Library,
    title: String,
    note: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut draft = NewCollection::new(title);
    if let Some(note) = note {
        draft.note = note;
    }

    let collection = library.documents_mut().add_collection(draft);
    save(library).await?;

    output.success(&format!("Created collection: {}", collection.id));
    output.print_collection(&collection, &[]);
    Ok(())
}

pub fn list(library: &Library, output: &Output) -> Result<()> {
    output.print_collections(&library.documents().value().collections);
    Ok(())
}

/// Show a collection and the links it still resolves to
pub fn show(library: &Library, id: EntryId, output: &Output) -> Result<()> {
    let documents = library.documents();
    let collection = documents
        .collection(id)
        .ok_or_else(|| anyhow!("Collection not found: {}", id))?;

    output.print_collection(collection, &documents.collection_links(id));
    Ok(())
}

/// Delete a collection; its links stay
pub async fn delete(library: &mut Library, id: EntryId, yes: bool, output: &Output) -> Result<()> {
    let collection = library
        .documents()
        .collection(id)
        .ok_or_else(|| anyhow!("Collection not found: {}", id))?;

    if !yes && output.should_prompt() {
        println!("Delete collection: {} - {}", collection.id, collection.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    library.documents_mut().delete_collection(id);
    save(library).await?;

    output.success(&format!("Deleted collection: {}", id));
    Ok(())
}

/// Add a link to a collection
pub async fn attach(
    library: &mut Library,
    collection: EntryId,
    link: EntryId,
    output: &Output,
) -> Result<()> {
    let documents = library.documents();
    let Some(target) = documents.collection(collection) else {
        bail!("Collection not found: {}", collection);
    };
    if documents.link(link).is_none() {
        bail!("Link not found: {}", link);
    }
    if target.links.contains(&link) {
        output.message(&format!("Link {} is already in collection {}", link, collection));
        return Ok(());
    }

    library.documents_mut().add_link_to_collection(collection, link);
    save(library).await?;

    output.success(&format!("Added link {} to collection {}", link, collection));
    Ok(())
}

/// Remove a link from a collection
///
/// Works for ids whose link has already been deleted.
pub async fn detach(
    library: &mut Library,
    collection: EntryId,
    link: EntryId,
    output: &Output,
) -> Result<()> {
    if library.documents().collection(collection).is_none() {
        bail!("Collection not found: {}", collection);
    }
    if !library
        .documents_mut()
        .remove_link_from_collection(collection, link)
    {
        bail!("Link {} is not in collection {}", link, collection);
    }
    save(library).await?;

    output.success(&format!("Removed link {} from collection {}", link, collection));
    Ok(())
}
