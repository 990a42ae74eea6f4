//! Mutating filesystem primitives behind a trait.
//!
//! Queries (`metadata`, `read_dir`) always go straight to `std::fs`. The
//! destructive primitives the move and delete paths depend on go through
//! [`Filesystem`] so hosts and tests can substitute them, for example to
//! simulate a rename that crosses devices.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Rename and removal primitives used by the engine.
pub trait Filesystem: Send + Sync + fmt::Debug {
    /// Atomically rename `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file or symlink.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFilesystem;

impl Filesystem for StdFilesystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}
