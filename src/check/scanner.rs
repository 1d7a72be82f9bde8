use log::{debug, info, trace};

use super::{Checker, Claim};
use crate::error::{AddressKind, Error, FormatError};
use crate::structs::*;

impl Checker<'_> {
    /// Classify every inode and claim every block it addresses
    pub(super) fn scan(&mut self) -> Result<(), Error> {
        info!("Scanning {} inodes", self.inodes.len());
        let fs = self.fs;
        for index in 0..fs.superblock().ninodes {
            let inode = fs.inode(index)?;
            let kind = inode.kind().map_err(|raw| {
                debug!("Inode {index} has type {raw}");
                FormatError::BadInodeType
            })?;
            if kind == InodeType::Unused {
                continue;
            }
            trace!("Inode {index}: {kind}, {} links", inode.nlink);
            let state = &mut self.inodes[index as usize];
            state.kind = Some(kind);
            state.nlink = inode.nlink;

            for &addr in inode.direct().iter().filter(|&&addr| addr != 0) {
                self.claim(addr, index, AddressKind::Direct)?;
            }
            let indirect = inode.indirect();
            if indirect == 0 {
                continue;
            }
            self.claim(indirect, index, AddressKind::Indirect)?;
            for addr in fs.block(indirect)?.pointers().filter(|&addr| addr != 0) {
                self.claim(addr, index, AddressKind::Indirect)?;
            }
        }
        Ok(())
    }

    /// Record that `inode` owns `block`
    fn claim(&mut self, block: u32, inode: u32, kind: AddressKind) -> Result<(), Error> {
        if !self.fs.superblock().is_claimable(block) {
            debug!("Inode {inode} points to block {block} outside the data region");
            return Err(FormatError::BadAddress(kind).into());
        }
        let slot = &mut self.claims[block as usize];
        if let Some(existing) = slot {
            debug!(
                "Block {block} of inode {inode} already claimed by inode {}",
                existing.inode
            );
            return Err(FormatError::DuplicateAddress(existing.kind).into());
        }
        *slot = Some(Claim { inode, kind });
        if !is_marked(self.fs, block)? {
            debug!("Block {block} of inode {inode} is free in the bitmap");
            return Err(FormatError::FreeBlockInUse.into());
        }
        Ok(())
    }
}
