//! Dependency archive extraction
//!
//! The control node may ship extra code and resources as a tar archive next
//! to the serialized task. When present, every entry is unpacked into the
//! staging directory and the staging directory becomes the first entry of the
//! resolver search path.
//!
//! Entry paths are trusted and used verbatim, `..` components included; only
//! a leading `/` is dropped so absolute names land under the staging
//! directory. Re-extracting into an already populated directory is governed
//! by [`ExistingEntryPolicy`]; no cleanup is attempted after a partial failure.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ArchiveSettings, ExistingEntryPolicy};
use crate::error::{Error, Result};
use crate::resolver::ResolverContext;

/// Outcome of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Archive that was unpacked
    pub archive: PathBuf,
    /// Directory the entries were unpacked into
    pub root: PathBuf,
    /// Number of entries written
    pub entries: usize,
}

/// Unpacks the staged dependency archive
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    file_name: String,
    on_existing: ExistingEntryPolicy,
}

impl ArchiveExtractor {
    /// Create an extractor from configuration
    pub fn new(settings: &ArchiveSettings) -> Self {
        Self {
            file_name: settings.file_name.clone(),
            on_existing: settings.on_existing,
        }
    }

    /// Location of the archive inside a staging directory
    pub fn archive_path(&self, staging_dir: &Path) -> PathBuf {
        staging_dir.join(&self.file_name)
    }

    /// Extract the archive if it exists
    ///
    /// Returns `Ok(None)` when there is no archive to extract. On success the
    /// staging directory is prepended to `resolver`.
    pub fn extract(
        &self,
        staging_dir: &Path,
        resolver: &mut ResolverContext,
    ) -> Result<Option<ExtractionReport>> {
        let archive_path = self.archive_path(staging_dir);
        if !archive_path.is_file() {
            debug!(archive = %archive_path.display(), "No dependency archive staged, skipping extraction");
            return Ok(None);
        }

        let unreadable = |source: std::io::Error| Error::ArchiveUnreadable {
            path: archive_path.clone(),
            source,
        };

        let file = File::open(&archive_path).map_err(unreadable)?;
        let mut archive = tar::Archive::new(file);
        archive.set_preserve_permissions(true);
        archive.set_overwrite(self.on_existing == ExistingEntryPolicy::Overwrite);

        let mut entries = 0;
        for entry in archive.entries().map_err(unreadable)? {
            let mut entry = entry.map_err(unreadable)?;
            let entry_path = entry.path().map_err(unreadable)?.into_owned();

            let destination = entry_destination(staging_dir, &entry_path);

            if self.on_existing == ExistingEntryPolicy::Fail
                && entry.header().entry_type() != tar::EntryType::Directory
                && destination.symlink_metadata().is_ok()
            {
                return Err(Error::ArchiveConflict {
                    archive: archive_path.clone(),
                    destination,
                });
            }

            let entry_failed = |source: std::io::Error| Error::ArchiveEntryFailed {
                archive: archive_path.clone(),
                entry: entry_path.clone(),
                source,
            };
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(entry_failed)?;
            }
            entry.unpack(&destination).map_err(entry_failed)?;
            entries += 1;
        }

        resolver.prepend(staging_dir);

        info!(
            archive = %archive_path.display(),
            entries,
            "Dependency archive extracted"
        );

        Ok(Some(ExtractionReport {
            archive: archive_path,
            root: staging_dir.to_path_buf(),
            entries,
        }))
    }
}

/// Where an entry is written: its path under `root` without any root or
/// prefix component
fn entry_destination(root: &Path, entry_path: &Path) -> PathBuf {
    let relative: PathBuf = entry_path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}
