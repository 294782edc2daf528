//! Dump-file persistence for the LDIF backend.
//!
//! Every mutation re-emits the whole tree through an atomic rewrite: the
//! new dump is written to `P.new`, the previous dump is parked at `P.old`,
//! and the commit point is the rename of `P.new` onto `P`. The two parking
//! steps are cleanup only and tolerate failure; a failed commit rename is a
//! server error (the previous dump survives at `P.old`).
//!
//! The caller holds the write side of the tree lock across the whole
//! sequence, so readers never observe a torn tree or a half-written dump.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use super::import::{self, ImportResult};
use super::storage::TreeInner;
use crate::{
    backend::errors::BackendError,
    ldif::{LdifReader, LdifWriter},
};

/// `<path>.<suffix>`, appended to the full file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

fn server_codec_error(reason: String, err: crate::ldif::LdifError) -> BackendError {
    match err {
        crate::ldif::LdifError::Io { source } => BackendError::server_io(reason, source),
        other => BackendError::ServerError {
            reason: format!("{reason}: {other}"),
            source: None,
        },
    }
}

/// Rewrites the dump file at `path` from the current tree.
pub(crate) fn rewrite(inner: &TreeInner, path: &Path) -> Result<(), BackendError> {
    write_new_dump(inner, path)?;
    commit(path)
}

/// Writes the full tree to `<path>.new`, truncating any previous `.new`.
pub(crate) fn write_new_dump(inner: &TreeInner, path: &Path) -> Result<(), BackendError> {
    let new_path = sibling(path, "new");
    let file = File::create(&new_path).map_err(|e| {
        BackendError::server_io(
            format!("cannot create dump file {}", new_path.display()),
            e,
        )
    })?;
    let mut writer = LdifWriter::new(BufWriter::new(file));
    for entry in inner.entries.values() {
        writer.write_entry(entry).map_err(|e| {
            server_codec_error(format!("cannot write dump file {}", new_path.display()), e)
        })?;
    }
    writer.flush().map_err(|e| {
        server_codec_error(format!("cannot flush dump file {}", new_path.display()), e)
    })?;
    Ok(())
}

/// Installs `<path>.new` as the dump file.
///
/// The `.old` unlink and the `P -> P.old` rename are best-effort cleanup;
/// the final rename is the commit point and its failure is escalated.
pub(crate) fn commit(path: &Path) -> Result<(), BackendError> {
    let new_path = sibling(path, "new");
    let old_path = sibling(path, "old");

    if old_path.exists()
        && let Err(e) = fs::remove_file(&old_path)
    {
        warn!("cannot remove previous dump {}: {e}", old_path.display());
    }
    if path.exists()
        && let Err(e) = fs::rename(path, &old_path)
    {
        warn!(
            "cannot move current dump {} aside to {}: {e}",
            path.display(),
            old_path.display()
        );
    }
    if let Err(e) = fs::rename(&new_path, path) {
        error!(
            "cannot install new dump {} as {}: {e}",
            new_path.display(),
            path.display()
        );
        return Err(BackendError::server_io(
            format!("cannot install new dump file {}", path.display()),
            e,
        ));
    }
    Ok(())
}

/// Startup load: populates the tree from the dump at `path`. A missing
/// file yields an empty tree; the file is the authoritative source and is
/// not rewritten here.
pub(crate) fn load(inner: &mut TreeInner, path: &Path) -> Result<ImportResult, crate::Error> {
    match File::open(path) {
        Ok(file) => {
            let mut reader = LdifReader::new(BufReader::new(file));
            import::import(inner, &mut reader)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            super::storage::clear(inner);
            Ok(ImportResult::default())
        }
        Err(e) => Err(BackendError::server_io(
            format!("cannot open dump file {}", path.display()),
            e,
        )
        .into()),
    }
}

/// Writes every entry to `sink` in parent-before-child order.
pub(crate) fn export(inner: &TreeInner, sink: &mut dyn Write) -> Result<u64, BackendError> {
    let mut writer = LdifWriter::new(sink);
    for entry in inner.entries.values() {
        writer
            .write_entry(entry)
            .map_err(|e| server_codec_error("cannot write export stream".to_string(), e))?;
    }
    writer
        .flush()
        .map_err(|e| server_codec_error("cannot flush export stream".to_string(), e))?;
    Ok(writer.records_written())
}
