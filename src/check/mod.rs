//! Consistency checking of a loaded image.
//!
//! A [`Checker`] owns every table derived from the image for the duration of
//! one run. The run is a fixed sequence of passes, each aborting on the first
//! violation it finds:
//!
//! 1. [scan](Checker::scan): inode types and block claims
//! 2. [check_root](Checker::check_root): root is an allocated directory
//! 3. [walk](Checker::walk): directory contents, references and parents
//! 4. [report](Checker::report): orphans, link counts and the bitmap

mod report;
mod scanner;
mod walker;

use std::fmt::Display;

use log::info;

use crate::error::{AddressKind, Error};
use crate::filesystem::Filesystem;
use crate::structs::InodeType;

/// Block owned by an inode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub inode: u32,
    pub kind: AddressKind,
}

/// Facts gathered about one inode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InodeState {
    /// Type of an allocated inode, `None` if unused
    pub kind: Option<InodeType>,
    /// Declared link count
    pub nlink: u16,
    /// Named by some directory entry
    pub referenced: bool,
    /// Count of directory entries pointing here, `.` and `..` included
    pub links: u32,
    /// Directory named by the `..` entry
    pub parent: Option<u32>,
}

impl InodeState {
    pub fn is_allocated(&self) -> bool {
        self.kind.is_some()
    }

    pub fn is(&self, kind: InodeType) -> bool {
        self.kind == Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub inodes: usize,
    pub directories: usize,
    pub blocks: usize,
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inodes in use, {} directories, {} blocks claimed",
            self.inodes, self.directories, self.blocks
        )
    }
}

#[derive(Debug)]
pub struct Checker<'a> {
    fs: &'a Filesystem,
    /// Claim of every block, indexed by block number
    claims: Vec<Option<Claim>>,
    /// State of every inode, indexed by inode number
    inodes: Vec<InodeState>,
}

impl<'a> Checker<'a> {
    pub fn new(fs: &'a Filesystem) -> Self {
        let superblock = fs.superblock();
        Self {
            fs,
            claims: vec![None; superblock.size as usize],
            inodes: vec![InodeState::default(); superblock.ninodes as usize],
        }
    }

    /// Run every pass in order and stop at the first violation
    pub fn run(mut self) -> Result<Summary, Error> {
        self.scan()?;
        self.check_root()?;
        self.walk()?;
        self.report()?;
        let summary = self.summary();
        info!("Image is consistent: {summary}");
        Ok(summary)
    }

    fn summary(&self) -> Summary {
        Summary {
            inodes: self.inodes.iter().filter(|s| s.is_allocated()).count(),
            directories: self
                .inodes
                .iter()
                .filter(|s| s.is(InodeType::Directory))
                .count(),
            blocks: self.claims.iter().flatten().count(),
        }
    }
}

/// Check `fs` and return the first inconsistency found
pub fn check(fs: &Filesystem) -> Result<Summary, Error> {
    Checker::new(fs).run()
}
