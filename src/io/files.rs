//! Whole-file export, import, delete and convert.
//!
//! These wrap the stream pipelines with file handling: gzip by file name (see
//! [`compression`](super::compression)), parent directory creation, glob
//! expansion for multi-file runs, and `anyhow` context naming the path.

use super::compression::{open_for_reading, open_for_writing};
use super::glob::expand_patterns;
use crate::config::TransferConfig;
use crate::convert::{ConvertOptions, convert};
use crate::mapper::{ModelMapping, import_mapped};
use crate::pipeline::{ExportSummary, ImportSummary, delete, export, import};
use crate::store::{EntitySource, EntityStore};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Export `source` into the file at `path`.
///
/// # Errors
/// The file cannot be created, the export fails, or the final flush fails.
pub fn export_file<S: EntitySource>(
    source: S,
    path: impl AsRef<Path>,
    cfg: &TransferConfig,
) -> Result<ExportSummary> {
    let path = path.as_ref();
    let mut out = open_for_writing(path)?;
    info!(path = %path.display(), "exporting");
    let summary =
        export(source, &mut out, cfg).with_context(|| format!("export to {}", path.display()))?;
    out.finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(summary)
}

/// Import the file at `path` into `store`.
///
/// # Errors
/// The file cannot be opened or the import fails.
pub fn import_file<S: EntityStore>(
    path: impl AsRef<Path>,
    store: S,
    cfg: &TransferConfig,
) -> Result<ImportSummary> {
    let path = path.as_ref();
    let input = open_for_reading(path)?;
    info!(path = %path.display(), "importing");
    import(input, store, cfg).with_context(|| format!("import {}", path.display()))
}

/// Delete from `store` every key found in the file at `path`.
///
/// # Errors
/// The file cannot be opened or the delete fails.
pub fn delete_file<S: EntityStore>(
    path: impl AsRef<Path>,
    store: S,
    cfg: &TransferConfig,
) -> Result<ImportSummary> {
    let path = path.as_ref();
    let input = open_for_reading(path)?;
    info!(path = %path.display(), "deleting entities from file");
    delete(input, store, cfg).with_context(|| format!("delete from {}", path.display()))
}

/// Import every file matching `patterns`, one file after another.
///
/// Stops at the first failing file; earlier files stay imported.
///
/// # Errors
/// A malformed pattern or the first failing file.
pub fn import_files<P, S>(patterns: &[P], mut store: S, cfg: &TransferConfig) -> Result<ImportSummary>
where
    P: AsRef<str>,
    S: EntityStore,
{
    let mut total = ImportSummary::default();
    for file in expand_patterns(patterns)? {
        accumulate(&mut total, import_file(&file, &mut store, cfg)?);
    }
    info!(entities = total.entities, batches = total.batches, "import of all files finished");
    Ok(total)
}

/// Delete the keys of every file matching `patterns`, one file after another.
///
/// # Errors
/// A malformed pattern or the first failing file.
pub fn delete_files<P, S>(patterns: &[P], mut store: S, cfg: &TransferConfig) -> Result<ImportSummary>
where
    P: AsRef<str>,
    S: EntityStore,
{
    let mut total = ImportSummary::default();
    for file in expand_patterns(patterns)? {
        accumulate(&mut total, delete_file(&file, &mut store, cfg)?);
    }
    info!(entities = total.entities, batches = total.batches, "delete of all files finished");
    Ok(total)
}

/// Import the file at `path` through model mappings.
///
/// # Errors
/// The file cannot be opened or the mapped import fails.
pub fn import_file_mapped(
    path: impl AsRef<Path>,
    mappings: Vec<ModelMapping<'_>>,
    cfg: &TransferConfig,
) -> Result<ImportSummary> {
    let path = path.as_ref();
    let input = open_for_reading(path)?;
    info!(path = %path.display(), mappings = mappings.len(), "importing through mappings");
    import_mapped(input, mappings, cfg).with_context(|| format!("import {}", path.display()))
}

/// Convert the frame file at `input` into object notation at `output`.
///
/// # Errors
/// Either file cannot be opened, or the conversion fails.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    opts: ConvertOptions,
    cfg: &TransferConfig,
) -> Result<ImportSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let reader = open_for_reading(input)?;
    let mut out = open_for_writing(output)?;
    let summary = convert(reader, &mut out, opts, cfg)
        .with_context(|| format!("convert {} to {}", input.display(), output.display()))?;
    out.finish()
        .with_context(|| format!("finish {}", output.display()))?;
    Ok(summary)
}

fn accumulate(total: &mut ImportSummary, file: ImportSummary) {
    total.lines += file.lines;
    total.entities += file.entities;
    total.batches += file.batches;
    total.columns = total.columns.max(file.columns);
}
