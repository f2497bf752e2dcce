//! Zip container access for parcel packages.
//!
//! Both the outer package and the payload archive it carries are zip files.
//! Extraction validates every entry name so that no entry can escape the
//! destination directory (zip-slip).

use log::trace;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors arising from opening, reading, or extracting a container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The container file does not exist.
    #[error("file not found: {}", .path.display())]
    NotFound {
        /// Path that was opened.
        path: PathBuf,
    },

    /// An I/O operation on the container or the destination failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not a readable zip archive.
    #[error("{} is not a readable archive: {source}", .path.display())]
    Archive {
        /// Path of the container.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: ZipError,
    },

    /// An entry name attempts to escape the destination directory.
    #[error("path traversal detected: {entry}")]
    PathTraversal {
        /// The offending entry name.
        entry: String,
    },
}

/// A located entry inside a [`PackageContainer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    index: usize,
    name: String,
}

impl ContainerEntry {
    /// Return the full entry name as stored in the archive.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An opened zip container.
pub struct PackageContainer {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl PackageContainer {
    /// Open the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotFound`] if the file does not exist,
    /// [`ContainerError::Io`] if it cannot be opened, or
    /// [`ContainerError::Archive`] if it is not a zip archive.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ContainerError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ContainerError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let archive = ZipArchive::new(file).map_err(|source| ContainerError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Return the path the container was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the first entry whose base name equals `name` exactly.
    ///
    /// Directory entries never match, and a name that merely contains
    /// `name` (for example `manifest.json.bak`) is not a match.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Archive`] if an entry header is unreadable.
    pub fn find_entry(&mut self, name: &str) -> Result<Option<ContainerEntry>, ContainerError> {
        for index in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index_raw(index)
                .map_err(|source| ContainerError::Archive {
                    path: self.path.clone(),
                    source,
                })?;
            if base_name(entry.name()) == name {
                return Ok(Some(ContainerEntry {
                    index,
                    name: entry.name().to_owned(),
                }));
            }
        }
        Ok(None)
    }

    /// Read the full content of `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Archive`] if the entry cannot be opened and
    /// [`ContainerError::Io`] if its content is unreadable.
    pub fn read_entry(&mut self, entry: &ContainerEntry) -> Result<Vec<u8>, ContainerError> {
        let mut file = self
            .archive
            .by_index(entry.index)
            .map_err(|source| ContainerError::Archive {
                path: self.path.clone(),
                source,
            })?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|source| ContainerError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(contents)
    }

    /// Extract every entry into `destination`, creating it if absent.
    ///
    /// Returns the relative paths of the extracted files; directory entries
    /// are created but not listed.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::PathTraversal`] if an entry would escape
    /// `destination`, [`ContainerError::Archive`] for unreadable entries,
    /// and [`ContainerError::Io`] on any write failure.
    pub fn extract_all(&mut self, destination: &Path) -> Result<Vec<PathBuf>, ContainerError> {
        create_dir(destination)?;
        let mut extracted = Vec::new();

        for index in 0..self.archive.len() {
            let mut entry = self
                .archive
                .by_index(index)
                .map_err(|source| ContainerError::Archive {
                    path: self.path.clone(),
                    source,
                })?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(ContainerError::PathTraversal {
                    entry: entry.name().to_owned(),
                });
            };
            let target = destination.join(&relative);

            if entry.is_dir() {
                create_dir(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }

            let mut output = File::create(&target).map_err(|source| ContainerError::Io {
                path: target.clone(),
                source,
            })?;
            io::copy(&mut entry, &mut output).map_err(|source| ContainerError::Io {
                path: target.clone(),
                source,
            })?;
            trace!("extracted {} to {}", entry.name(), target.display());
            extracted.push(relative.to_path_buf());
        }

        Ok(extracted)
    }
}

fn create_dir(path: &Path) -> Result<(), ContainerError> {
    fs::create_dir_all(path).map_err(|source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Final component of a zip entry name. Entries written on Windows may use
/// backslash separators.
fn base_name(entry_name: &str) -> &str {
    entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name)
}
