use super::*;
use crate::error::ImageError;
use crate::filesystem::Filesystem;

const BITS_IN_BYTE: u32 = 8;

/// Bitmap block, byte inside it and bit mask for `block`
pub(crate) fn locate(superblock: &Superblock, block: u32) -> (u32, usize, u8) {
    let row = superblock.bmapstart.saturating_add(block / BPB);
    let offset = block % BPB;
    let byte = (offset / BITS_IN_BYTE) as usize;
    let mask = 1u8 << (offset % BITS_IN_BYTE);
    (row, byte, mask)
}

/// Whether the free bitmap marks `block` as allocated
pub fn is_marked(fs: &Filesystem, block: u32) -> Result<bool, ImageError> {
    let (row, byte, mask) = locate(fs.superblock(), block);
    let bitmap = fs.block(row)?;
    Ok(bitmap.data[byte] & mask != 0)
}

/// Modify occupancy of `block` in a writable image
pub(crate) fn set_marked(
    image: &mut [u8],
    superblock: &Superblock,
    block: u32,
    value: bool,
) -> Option<()> {
    let (row, byte, mask) = locate(superblock, block);
    let position = row as usize * BSIZE + byte;
    let chunk = image.get_mut(position)?;
    if value {
        *chunk |= mask;
    } else {
        *chunk &= !mask;
    }
    Some(())
}
