use std::fmt::Display;

use super::*;

impl Superblock {
    /// Blocks occupied by the free bitmap
    pub fn bitmap_blocks(&self) -> u32 {
        self.size.div_ceil(BPB)
    }

    /// Blocks occupied by the inode table
    pub fn inode_blocks(&self) -> u32 {
        self.ninodes.div_ceil(IPB as u32)
    }

    /// First block that inodes may claim
    pub fn data_block_start(&self) -> u64 {
        self.bmapstart as u64 + self.bitmap_blocks() as u64
    }

    /// Whether `block` lies in `[data_block_start, size)`
    pub fn is_claimable(&self, block: u32) -> bool {
        (block as u64) >= self.data_block_start() && block < self.size
    }

    /// Block holding inode `index` and its byte offset inside it
    pub fn inode_position(&self, index: u32) -> (u64, usize) {
        let block = self.inodestart as u64 + (index as usize / IPB) as u64;
        let offset = (index as usize % IPB) * std::mem::size_of::<Inode>();
        (block, offset)
    }

    /// Count of blocks every structure described here spans, at minimum
    pub fn required_blocks(&self) -> u64 {
        let inode_end = self.inodestart as u64 + self.inode_blocks() as u64;
        let bitmap_end = self.data_block_start();
        let log_end = self.logstart as u64 + self.nlog as u64;
        [
            self.size as u64,
            (SUPERBLOCK_BLOCK + 1) as u64,
            inode_end,
            bitmap_end,
            log_end,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
    }
}

impl OnDisk for Superblock {
    fn swap_le(self) -> Self {
        Self {
            size: u32::from_le(self.size),
            nblocks: u32::from_le(self.nblocks),
            ninodes: u32::from_le(self.ninodes),
            nlog: u32::from_le(self.nlog),
            logstart: u32::from_le(self.logstart),
            inodestart: u32::from_le(self.inodestart),
            bmapstart: u32::from_le(self.bmapstart),
        }
    }
}

impl Display for Superblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "size:       {}", self.size)?;
        writeln!(f, "nblocks:    {}", self.nblocks)?;
        writeln!(f, "ninodes:    {}", self.ninodes)?;
        writeln!(f, "nlog:       {}", self.nlog)?;
        writeln!(f, "logstart:   {}", self.logstart)?;
        writeln!(f, "inodestart: {}", self.inodestart)?;
        writeln!(f, "bmapstart:  {}", self.bmapstart)?;
        write!(f, "data start: {}", self.data_block_start())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xv6_default() -> Superblock {
        Superblock {
            size: 1000,
            nblocks: 941,
            ninodes: 200,
            nlog: 30,
            logstart: 2,
            inodestart: 32,
            bmapstart: 58,
        }
    }

    #[test]
    fn layout() {
        let sb = xv6_default();
        assert_eq!(sb.bitmap_blocks(), 1);
        assert_eq!(sb.inode_blocks(), 25);
        assert_eq!(sb.data_block_start(), 59);
        assert!(!sb.is_claimable(58));
        assert!(sb.is_claimable(59));
        assert!(sb.is_claimable(999));
        assert!(!sb.is_claimable(1000));
        assert_eq!(sb.required_blocks(), 1000);
    }

    #[test]
    fn inode_position() {
        let sb = xv6_default();
        assert_eq!(sb.inode_position(0), (32, 0));
        assert_eq!(sb.inode_position(1), (32, 64));
        assert_eq!(sb.inode_position(9), (33, 64));
    }

    #[test]
    fn decode_little_endian() {
        let mut raw = [0u8; 28];
        raw[0..4].copy_from_slice(&[0xe8, 0x03, 0, 0]);
        raw[8..12].copy_from_slice(&[0xc8, 0, 0, 0]);
        raw[24..28].copy_from_slice(&[0x3a, 0, 0, 0]);
        let sb = Superblock::decode(&raw).unwrap();
        assert_eq!(sb.size, 1000);
        assert_eq!(sb.ninodes, 200);
        assert_eq!(sb.bmapstart, 58);
        assert!(Superblock::decode(&raw[..27]).is_none());
    }

    #[test]
    fn encode_then_decode() {
        let sb = xv6_default();
        let mut raw = [0u8; BSIZE];
        sb.encode(&mut raw).unwrap();
        assert_eq!(&raw[0..4], &1000u32.to_le_bytes());
        assert_eq!(Superblock::decode(&raw), Some(sb));
    }
}
