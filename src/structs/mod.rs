mod bitmap;
mod block;
mod inode;
mod superblock;

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

pub use bitmap::*;
pub use block::*;
pub use inode::*;

/// Block size in bytes
pub const BSIZE: usize = 512;
/// Root directory's inode
pub const ROOT_INODE: u32 = 1;
/// Direct block pointers in an inode
pub const NDIRECT: usize = 12;
/// Block pointers in an indirect block
pub const NINDIRECT: usize = BSIZE / size_of::<u32>();
/// Largest file in blocks
pub const MAXFILE: usize = NDIRECT + NINDIRECT;
/// Length of a directory entry's name
pub const DIRSIZ: usize = 14;
/// Inodes per block
pub const IPB: usize = BSIZE / size_of::<Inode>();
/// Bitmap bits per block
pub const BPB: u32 = (BSIZE * 8) as u32;
/// Directory entries per block
pub const DPB: usize = BSIZE / size_of::<DirEntry>();
/// Block holding the superblock, right after the boot block
pub const SUPERBLOCK_BLOCK: u32 = 1;

const _: () = assert!(BSIZE % size_of::<Inode>() == 0);
const _: () = assert!(BSIZE % size_of::<DirEntry>() == 0);

/// Fixed-layout record stored little-endian on disk
pub(crate) trait OnDisk: Pod {
    /// Convert every multi-byte field between little-endian and host order
    fn swap_le(self) -> Self;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..size_of::<Self>())?;
        Some(bytemuck::pod_read_unaligned::<Self>(raw).swap_le())
    }

    fn encode(&self, bytes: &mut [u8]) -> Option<()> {
        let raw = self.swap_le();
        bytes
            .get_mut(..size_of::<Self>())?
            .copy_from_slice(bytemuck::bytes_of(&raw));
        Some(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Superblock {
    /// Size of file system image in blocks
    pub(crate) size: u32,
    /// Count of data blocks
    pub(crate) nblocks: u32,
    /// Count of inodes
    pub(crate) ninodes: u32,
    /// Count of log blocks
    pub(crate) nlog: u32,
    /// First log block
    pub(crate) logstart: u32,
    /// First inode table block
    pub(crate) inodestart: u32,
    /// First free bitmap block
    pub(crate) bmapstart: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Inode {
    /// Raw file type, see [`InodeType`]
    pub(crate) r#type: u16,
    /// Major device number
    pub(crate) major: u16,
    /// Minor device number
    pub(crate) minor: u16,
    /// Count of directory entries linking to this inode
    pub(crate) nlink: u16,
    /// File size in bytes
    pub(crate) size: u32,
    /// Direct block addresses followed by the indirect block address
    pub(crate) addrs: [u32; NDIRECT + 1],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DirEntry {
    /// Referenced inode, zero for a free slot
    pub(crate) inum: u16,
    /// Name, NUL padded when shorter than [`DIRSIZ`]
    pub(crate) name: [u8; DIRSIZ],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    Unused = 0,
    Directory = 1,
    File = 2,
    Device = 3,
}

/// Read-only window over one block of an image
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Block's index
    pub(crate) index: u32,
    /// Raw data as bytes
    pub(crate) data: &'a [u8],
}
