//! Lists the data files backing one configured table, honoring a
//! marker-file completeness convention (a file is only "done" once its
//! `{marker_extension}` sibling shows up next to it).

use crate::config::TableDef;
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use futures::TryStreamExt;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::collections::HashSet;

pub async fn list_table_files(
    store: &dyn ObjectStore,
    root: &StorePath,
    table: &TableDef,
    ctx: &OpContext,
) -> Result<Vec<StorePath>, FabricError> {
    let prefix = root.child(table.path.as_str());
    let listing = ctx
        .run(store.list(Some(&prefix)).try_collect::<Vec<_>>())
        .await?
        .map_err(FabricError::internal)?;

    let all_paths: HashSet<String> = listing.iter().map(|meta| meta.location.to_string()).collect();
    let suffix = format!(".{}", table.extension);

    let mut files: Vec<StorePath> = listing
        .into_iter()
        .map(|meta| meta.location)
        .filter(|path| path.to_string().ends_with(&suffix))
        .filter(|path| match &table.marker_extension {
            None => true,
            Some(marker_ext) => all_paths.contains(&format!("{path}{marker_ext}")),
        })
        .collect();
    files.sort_by_key(|p| p.to_string());
    Ok(files)
}
