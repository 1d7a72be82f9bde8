use std::path::Path;

use log::{debug, info, trace};

use crate::error::ImageError;
use crate::structs::*;

pub mod builder;
pub mod fixture;

/// Immutable view over a raw file system image
#[derive(Debug)]
pub struct Filesystem {
    superblock: Superblock,
    data: Vec<u8>,
}

impl Filesystem {
    /// Read the whole image at `path` into memory
    pub fn open(path: &Path) -> Result<Self, ImageError> {
        info!("Loading image {}", path.display());
        let data = std::fs::read(path)?;
        Self::load(data)
    }

    /// Wrap raw image bytes, checking that every region the superblock
    /// describes is present
    pub fn load(data: Vec<u8>) -> Result<Self, ImageError> {
        let actual = data.len() as u64;
        let header = (SUPERBLOCK_BLOCK as u64 + 1) * BSIZE as u64;
        if actual < header {
            return Err(ImageError::TooSmall {
                required: header,
                actual,
            });
        }
        let offset = SUPERBLOCK_BLOCK as usize * BSIZE;
        let superblock = Superblock::decode(&data[offset..]).ok_or(ImageError::TooSmall {
            required: header,
            actual,
        })?;
        let required = superblock.required_blocks() * BSIZE as u64;
        if actual < required {
            return Err(ImageError::TooSmall { required, actual });
        }
        debug!(
            "Image holds {} blocks and {} inodes, data starts at block {}",
            superblock.size,
            superblock.ninodes,
            superblock.data_block_start()
        );
        Ok(Self { superblock, data })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Load block with index
    pub fn block(&self, index: u32) -> Result<Block<'_>, ImageError> {
        if index >= self.superblock.size {
            return Err(ImageError::BlockOutOfRange(index));
        }
        trace!("Load block {index}");
        let start = index as usize * BSIZE;
        let data = self
            .data
            .get(start..start + BSIZE)
            .ok_or(ImageError::BlockOutOfRange(index))?;
        Ok(Block { index, data })
    }

    /// Load inode with index
    pub fn inode(&self, index: u32) -> Result<Inode, ImageError> {
        if index >= self.superblock.ninodes {
            return Err(ImageError::InodeOutOfRange(index));
        }
        let (block, offset) = self.superblock.inode_position(index);
        let block = u32::try_from(block).map_err(|_| ImageError::InodeOutOfRange(index))?;
        let block = self.block(block)?;
        Inode::decode(&block.data[offset..]).ok_or(ImageError::InodeOutOfRange(index))
    }

    /// Addresses of an inode's content blocks: direct ones first, then
    /// the ones listed in its indirect block. The indirect block is only
    /// read when its address is non-zero.
    pub fn content_blocks(&self, inode: &Inode) -> Result<Vec<u32>, ImageError> {
        let mut blocks = inode
            .direct()
            .iter()
            .copied()
            .filter(|&addr| addr != 0)
            .collect::<Vec<_>>();
        let indirect = inode.indirect();
        if indirect != 0 {
            blocks.extend(self.block(indirect)?.pointers().filter(|&addr| addr != 0));
        }
        Ok(blocks)
    }

    /// Directory entries of an inode, free slots included
    pub fn entries(&self, inode: &Inode) -> Result<Vec<DirEntry>, ImageError> {
        let mut entries = Vec::new();
        for addr in self.content_blocks(inode)? {
            entries.extend(self.block(addr)?.entries());
        }
        Ok(entries)
    }
}
