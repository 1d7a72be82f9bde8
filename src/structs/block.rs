use std::fmt::Display;
use std::mem::size_of;

use super::*;

impl<'a> Block<'a> {
    /// Block addresses stored in an indirect block
    pub fn pointers(&self) -> impl Iterator<Item = u32> + 'a {
        self.data
            .chunks_exact(size_of::<u32>())
            .map(|raw| u32::from_le(bytemuck::pod_read_unaligned(raw)))
    }

    /// Directory entries stored in a directory block, free slots included
    pub fn entries(&self) -> impl Iterator<Item = DirEntry> + 'a {
        self.data
            .chunks_exact(size_of::<DirEntry>())
            .filter_map(DirEntry::decode)
    }
}

impl Display for Block<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "block {}", self.index)?;
        for (row, line) in self.data.chunks(16).enumerate() {
            write!(f, "{:04x}:", row * 16)?;
            for byte in line {
                write!(f, " {byte:02x}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl DirEntry {
    /// Entry for `inum` with `name` truncated to [`DIRSIZ`] bytes
    pub fn new(inum: u16, name: &str) -> Self {
        let mut raw = [0u8; DIRSIZ];
        let bytes = name.as_bytes();
        let len = bytes.len().min(DIRSIZ);
        raw[..len].copy_from_slice(&bytes[..len]);
        Self { inum, name: raw }
    }

    pub fn is_free(&self) -> bool {
        self.inum == 0
    }

    /// Name up to the first NUL byte
    pub fn name(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(DIRSIZ);
        &self.name[..len]
    }

    pub fn is_dot(&self) -> bool {
        self.name() == b"."
    }

    pub fn is_dotdot(&self) -> bool {
        self.name() == b".."
    }
}

impl OnDisk for DirEntry {
    fn swap_le(self) -> Self {
        Self {
            inum: u16::from_le(self.inum),
            name: self.name,
        }
    }
}

impl Display for DirEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>5} {}",
            self.inum,
            String::from_utf8_lossy(self.name())
        )
    }
}
