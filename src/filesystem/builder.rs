use log::{debug, info, trace};

use crate::error::BuildError;
use crate::structs::*;

pub const DEFAULT_SIZE: u32 = 1000;
pub const DEFAULT_INODES: u32 = 200;
pub const DEFAULT_LOG_BLOCKS: u32 = 30;

/// Dimensions of a new image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Total blocks
    pub size: u32,
    /// Inode table capacity
    pub inodes: u32,
    /// Log blocks
    pub log_blocks: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            inodes: DEFAULT_INODES,
            log_blocks: DEFAULT_LOG_BLOCKS,
        }
    }
}

impl Geometry {
    /// Superblock describing this geometry:
    /// boot block, superblock, log, inode table, bitmap, data blocks
    pub fn superblock(&self) -> Result<Superblock, BuildError> {
        let bitmap_blocks = self.size.div_ceil(BPB);
        let inode_blocks = self.inodes / IPB as u32 + 1;
        let meta = 2u64 + self.log_blocks as u64 + inode_blocks as u64 + bitmap_blocks as u64;
        if meta >= self.size as u64 {
            return Err(BuildError::Geometry(format!(
                "{meta} metadata blocks leave no room in {} blocks",
                self.size
            )));
        }
        if self.inodes <= ROOT_INODE || self.inodes > u16::MAX as u32 + 1 {
            return Err(BuildError::Geometry(format!(
                "inode count {} out of range",
                self.inodes
            )));
        }
        Ok(Superblock {
            size: self.size,
            nblocks: self.size - meta as u32,
            ninodes: self.inodes,
            nlog: self.log_blocks,
            logstart: 2,
            inodestart: 2 + self.log_blocks,
            bmapstart: 2 + self.log_blocks + inode_blocks,
        })
    }
}

/// Writable image that hands out inodes and blocks sequentially
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    pub(crate) superblock: Superblock,
    image: Vec<u8>,
    next_inode: u32,
    next_block: u32,
}

impl ImageBuilder {
    pub fn new(geometry: Geometry) -> Result<Self, BuildError> {
        let superblock = geometry.superblock()?;
        let mut image = vec![0u8; superblock.size as usize * BSIZE];
        superblock
            .encode(&mut image[SUPERBLOCK_BLOCK as usize * BSIZE..])
            .ok_or(BuildError::OutOfBounds(SUPERBLOCK_BLOCK))?;
        let next_block = superblock.size - superblock.nblocks;
        info!(
            "New image: {} blocks, {} inodes, first data block {next_block}",
            superblock.size, superblock.ninodes
        );
        Ok(Self {
            superblock,
            image,
            next_inode: ROOT_INODE,
            next_block,
        })
    }

    /// First inode not yet handed out
    pub fn next_inode(&self) -> u32 {
        self.next_inode
    }

    /// First block not yet handed out
    pub fn next_block(&self) -> u32 {
        self.next_block
    }

    /// Get index of first empty inode and initialize it with `type`
    pub fn acquire_inode(&mut self, r#type: InodeType) -> Result<u32, BuildError> {
        let index = self.next_inode;
        if index >= self.superblock.ninodes {
            return Err(BuildError::NoFreeInodes);
        }
        debug!("Acquire inode {index} as {}", r#type);
        self.next_inode += 1;
        self.flush_inode(index, &Inode::new(r#type))?;
        Ok(index)
    }

    /// Get index of first empty block
    pub fn acquire_block(&mut self) -> Result<u32, BuildError> {
        let index = self.next_block;
        if index >= self.superblock.size {
            return Err(BuildError::NoFreeBlocks);
        }
        trace!("Acquire block {index}");
        self.next_block += 1;
        Ok(index)
    }

    fn block_mut(&mut self, index: u32) -> Result<&mut [u8], BuildError> {
        let start = index as usize * BSIZE;
        self.image
            .get_mut(start..start + BSIZE)
            .ok_or(BuildError::OutOfBounds(index))
    }

    /// Load inode with index
    pub fn load_inode(&self, index: u32) -> Result<Inode, BuildError> {
        let (block, offset) = self.superblock.inode_position(index);
        let start = block as usize * BSIZE + offset;
        self.image
            .get(start..)
            .and_then(Inode::decode)
            .ok_or(BuildError::OutOfBounds(block as u32))
    }

    /// Flush inode
    pub fn flush_inode(&mut self, index: u32, inode: &Inode) -> Result<(), BuildError> {
        let (block, offset) = self.superblock.inode_position(index);
        let data = self.block_mut(block as u32)?;
        inode
            .encode(&mut data[offset..])
            .ok_or(BuildError::OutOfBounds(block as u32))
    }

    /// Modify an inode in place
    pub fn update_inode<F>(&mut self, index: u32, change: F) -> Result<(), BuildError>
    where
        F: FnOnce(&mut Inode),
    {
        let mut inode = self.load_inode(index)?;
        change(&mut inode);
        self.flush_inode(index, &inode)
    }

    fn block(&self, index: u32) -> Result<&[u8], BuildError> {
        let start = index as usize * BSIZE;
        self.image
            .get(start..start + BSIZE)
            .ok_or(BuildError::OutOfBounds(index))
    }

    fn read_pointer(&self, block: u32, slot: usize) -> Result<u32, BuildError> {
        let data = self.block(block)?;
        let start = slot * std::mem::size_of::<u32>();
        let raw = data
            .get(start..start + 4)
            .ok_or(BuildError::OutOfBounds(block))?;
        Ok(u32::from_le(bytemuck::pod_read_unaligned(raw)))
    }

    pub(crate) fn write_pointer(
        &mut self,
        block: u32,
        slot: usize,
        addr: u32,
    ) -> Result<(), BuildError> {
        let data = self.block_mut(block)?;
        let start = slot * std::mem::size_of::<u32>();
        data.get_mut(start..start + 4)
            .ok_or(BuildError::OutOfBounds(block))?
            .copy_from_slice(&addr.to_le_bytes());
        Ok(())
    }

    /// Block holding the `nth` block of an inode's content, allocating it
    /// (and the indirect block) when missing
    fn content_block(&mut self, inode: &mut Inode, nth: usize) -> Result<u32, BuildError> {
        if nth >= MAXFILE {
            return Err(BuildError::FileTooLarge);
        }
        if nth < NDIRECT {
            if inode.addrs[nth] == 0 {
                inode.addrs[nth] = self.acquire_block()?;
            }
            return Ok(inode.addrs[nth]);
        }
        if inode.addrs[NDIRECT] == 0 {
            inode.addrs[NDIRECT] = self.acquire_block()?;
        }
        let indirect = inode.addrs[NDIRECT];
        let mut addr = self.read_pointer(indirect, nth - NDIRECT)?;
        if addr == 0 {
            addr = self.acquire_block()?;
            self.write_pointer(indirect, nth - NDIRECT, addr)?;
        }
        Ok(addr)
    }

    /// Append bytes to the end of an inode's content
    pub fn append(&mut self, index: u32, bytes: &[u8]) -> Result<(), BuildError> {
        let mut inode = self.load_inode(index)?;
        let mut offset = inode.size as usize;
        let mut remaining = bytes;
        while !remaining.is_empty() {
            let block = self.content_block(&mut inode, offset / BSIZE)?;
            let start = offset % BSIZE;
            let count = remaining.len().min(BSIZE - start);
            self.block_mut(block)?[start..start + count].copy_from_slice(&remaining[..count]);
            remaining = &remaining[count..];
            offset += count;
        }
        inode.size = u32::try_from(offset).map_err(|_| BuildError::FileTooLarge)?;
        self.flush_inode(index, &inode)
    }

    /// Append a directory entry for `inum` to directory `dir`
    pub fn add_entry(&mut self, dir: u32, inum: u32, name: &str) -> Result<(), BuildError> {
        let inum = u16::try_from(inum).map_err(|_| BuildError::NoFreeInodes)?;
        let mut raw = [0u8; std::mem::size_of::<DirEntry>()];
        DirEntry::new(inum, name)
            .encode(&mut raw)
            .ok_or(BuildError::OutOfBounds(dir))?;
        trace!("Add entry {name:?} -> {inum} to directory {dir}");
        self.append(dir, &raw)
    }

    /// Modify occupancy of `block` in the free bitmap
    pub fn set_bitmap(&mut self, block: u32, value: bool) -> Result<(), BuildError> {
        let superblock = self.superblock;
        set_marked(&mut self.image, &superblock, block, value).ok_or(BuildError::OutOfBounds(block))
    }

    /// Mark every block handed out so far, metadata included, as allocated
    pub fn mark_allocated(&mut self) -> Result<(), BuildError> {
        debug!("Marking first {} blocks as allocated", self.next_block);
        for block in 0..self.next_block {
            self.set_bitmap(block, true)?;
        }
        Ok(())
    }

    /// Raw image bytes
    pub fn finish(self) -> Vec<u8> {
        self.image
    }
}
