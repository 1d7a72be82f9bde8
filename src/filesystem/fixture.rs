use std::path::Path;

use clap::ValueEnum;
use log::info;

use super::builder::{Geometry, ImageBuilder};
use crate::error::{AddressKind, BuildError, FormatError};
use crate::structs::*;

/// Defect injected into an otherwise valid image
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Corruption {
    /// First file's inode gets an invalid type
    BadInodeType,
    /// First file's first direct address points past the image
    BadDirectAddr,
    /// An extra file's indirect address points past the image
    BadIndirectAddr,
    /// Root inode is never allocated
    MissingRoot,
    /// Root directory lacks `.` and `..`
    DirNotFormatted,
    /// A block owned by a file is clear in the bitmap
    FreeAddrInUse,
    /// A block owned by nobody is set in the bitmap
    BitmapNotInUse,
    /// Two files share a direct block
    DuplicateDirectAddr,
    /// Two files share an indirect block
    DuplicateIndirectAddr,
    /// First file is left out of the root directory
    InodeNotFound,
    /// Root directory names an unallocated inode
    InodeReferredNotUsed,
    /// First file declares two links but has one
    BadRefCount,
}

impl Corruption {
    pub const ALL: [Corruption; 12] = [
        Self::BadInodeType,
        Self::BadDirectAddr,
        Self::BadIndirectAddr,
        Self::MissingRoot,
        Self::DirNotFormatted,
        Self::FreeAddrInUse,
        Self::BitmapNotInUse,
        Self::DuplicateDirectAddr,
        Self::DuplicateIndirectAddr,
        Self::InodeNotFound,
        Self::InodeReferredNotUsed,
        Self::BadRefCount,
    ];

    /// Whether the defect is injected into the first input file
    fn needs_file(self) -> bool {
        matches!(
            self,
            Self::BadInodeType
                | Self::BadDirectAddr
                | Self::DuplicateDirectAddr
                | Self::InodeNotFound
                | Self::BadRefCount
        )
    }

    /// Inconsistency the checker reports for this defect
    pub fn expected(self) -> FormatError {
        match self {
            Self::BadInodeType => FormatError::BadInodeType,
            Self::BadDirectAddr => FormatError::BadAddress(AddressKind::Direct),
            Self::BadIndirectAddr => FormatError::BadAddress(AddressKind::Indirect),
            Self::MissingRoot => FormatError::MissingRoot,
            Self::DirNotFormatted => FormatError::DirFormat,
            Self::FreeAddrInUse => FormatError::FreeBlockInUse,
            Self::BitmapNotInUse => FormatError::BitmapFalsePositive,
            Self::DuplicateDirectAddr => FormatError::DuplicateAddress(AddressKind::Direct),
            Self::DuplicateIndirectAddr => FormatError::DuplicateAddress(AddressKind::Indirect),
            Self::InodeNotFound => FormatError::Orphan,
            Self::InodeReferredNotUsed => FormatError::DanglingReference,
            Self::BadRefCount => FormatError::BadRefCount,
        }
    }
}

/// File placed in the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl InputFile {
    pub fn new(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            content: content.to_vec(),
        }
    }

    /// Read a file from the host; its entry is named after the path's
    /// last component without a leading `_`
    pub fn from_path(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read(path)?;
        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = base.strip_prefix('_').unwrap_or(&base).to_owned();
        Ok(Self { name, content })
    }

    fn synthetic() -> Self {
        Self::new("fixture", b"placeholder content for an injected defect\n")
    }
}

/// Build an image holding `files` in its root directory, with at most one
/// injected defect
pub fn build(
    geometry: Geometry,
    files: &[InputFile],
    corruption: Option<Corruption>,
) -> Result<Vec<u8>, BuildError> {
    let mut builder = ImageBuilder::new(geometry)?;
    if corruption == Some(Corruption::MissingRoot) {
        info!("Leaving root directory unallocated");
        builder.mark_allocated()?;
        return Ok(builder.finish());
    }

    let root = builder.acquire_inode(InodeType::Directory)?;
    if corruption != Some(Corruption::DirNotFormatted) {
        builder.add_entry(root, root, ".")?;
        builder.add_entry(root, root, "..")?;
    } else {
        info!("Omitting . and .. from root directory");
    }
    builder.update_inode(root, |inode| inode.nlink = 2)?;

    let synthetic = [InputFile::synthetic()];
    let files = match corruption {
        Some(mode) if mode.needs_file() && files.is_empty() => &synthetic[..],
        _ => files,
    };
    for (position, file) in files.iter().enumerate() {
        let target = corruption.filter(|_| position == 0);
        add_file(&mut builder, root, file, target)?;
    }

    let mut freed = None;
    match corruption {
        Some(Corruption::BadIndirectAddr) => {
            info!("Pointing an indirect address past the image");
            let inum = builder.acquire_inode(InodeType::File)?;
            builder.add_entry(root, inum, "bad_indirect")?;
            let size = builder.superblock.size;
            builder.update_inode(inum, |inode| inode.addrs[NDIRECT] = size + 1)?;
        }
        Some(Corruption::DuplicateIndirectAddr) => {
            info!("Sharing an indirect block between two files");
            let first = builder.acquire_inode(InodeType::File)?;
            builder.add_entry(root, first, "dup_indirect")?;
            builder.append(first, &[0u8; (NDIRECT + 1) * BSIZE])?;
            let indirect = builder.load_inode(first)?.indirect();
            let second = builder.acquire_inode(InodeType::File)?;
            builder.add_entry(root, second, "dup_indirect2")?;
            builder.update_inode(second, |inode| inode.addrs[NDIRECT] = indirect)?;
        }
        Some(Corruption::FreeAddrInUse) => {
            let inum = builder.acquire_inode(InodeType::File)?;
            builder.add_entry(root, inum, "free_block")?;
            builder.append(inum, &[0u8; BSIZE])?;
            freed = Some(builder.load_inode(inum)?.direct()[0]);
        }
        Some(Corruption::InodeReferredNotUsed) => {
            let unused = builder.next_inode();
            info!("Referencing unallocated inode {unused}");
            builder.add_entry(root, unused, "bad_inode_ref")?;
        }
        _ => {}
    }

    builder.mark_allocated()?;
    if let Some(block) = freed {
        info!("Clearing bitmap bit of block {block} still in use");
        builder.set_bitmap(block, false)?;
    }
    if corruption == Some(Corruption::BitmapNotInUse) {
        let block = builder.next_block();
        if block >= builder.superblock.size {
            return Err(BuildError::NoFreeBlocks);
        }
        info!("Marking unused block {block} as allocated");
        builder.set_bitmap(block, true)?;
    }
    Ok(builder.finish())
}

fn add_file(
    builder: &mut ImageBuilder,
    root: u32,
    file: &InputFile,
    corruption: Option<Corruption>,
) -> Result<(), BuildError> {
    let inum = builder.acquire_inode(InodeType::File)?;
    if corruption == Some(Corruption::InodeNotFound) {
        info!("Leaving inode {inum} out of the root directory");
    } else {
        builder.add_entry(root, inum, &file.name)?;
    }
    builder.append(inum, &file.content)?;

    match corruption {
        Some(Corruption::BadInodeType) => {
            info!("Setting invalid type on inode {inum}");
            builder.update_inode(inum, |inode| inode.r#type = 99)?;
        }
        Some(Corruption::BadDirectAddr) => {
            info!("Pointing a direct address of inode {inum} past the image");
            let size = builder.superblock.size;
            builder.update_inode(inum, |inode| inode.addrs[0] = size + 1)?;
        }
        Some(Corruption::BadRefCount) => {
            builder.update_inode(inum, |inode| inode.nlink = 2)?;
        }
        Some(Corruption::DuplicateDirectAddr) => {
            // an empty file has no block to share, the root directory always does
            let shared = match builder.load_inode(inum)?.direct()[0] {
                0 => builder.load_inode(root)?.direct()[0],
                addr => addr,
            };
            info!("Sharing direct block {shared} with a new file");
            let dup = builder.acquire_inode(InodeType::File)?;
            builder.update_inode(dup, |inode| inode.addrs[0] = shared)?;
            builder.add_entry(root, dup, "dup_file")?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::filesystem::Filesystem;

    #[test]
    fn clean_image_layout() {
        let files = [InputFile::new("hello", b"hello world\n")];
        let fs = Filesystem::load(build(Geometry::default(), &files, None).unwrap()).unwrap();
        let root = fs.inode(ROOT_INODE).unwrap();
        assert_eq!(root.nlink, 2);
        let names = fs
            .entries(&root)
            .unwrap()
            .into_iter()
            .filter(|e| !e.is_free())
            .map(|e| (e.inum, String::from_utf8_lossy(e.name()).into_owned()))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                (1u16, String::from(".")),
                (1u16, String::from("..")),
                (2u16, String::from("hello")),
            ]
        );
        let file = fs.inode(2).unwrap();
        assert_eq!(file.kind(), Ok(InodeType::File));
        assert_eq!(file.size, 12);
        assert_eq!(&fs.block(file.direct()[0]).unwrap().data[..12], b"hello world\n");
    }

    #[test]
    fn synthetic_file_only_when_needed() {
        let image = build(Geometry::default(), &[], Some(Corruption::BadRefCount)).unwrap();
        let fs = Filesystem::load(image).unwrap();
        assert_eq!(fs.inode(2).unwrap().nlink, 2);

        let image = build(Geometry::default(), &[], Some(Corruption::BitmapNotInUse)).unwrap();
        let fs = Filesystem::load(image).unwrap();
        assert_eq!(fs.inode(2).unwrap().kind(), Ok(InodeType::Unused));
    }

    #[test]
    fn missing_root_leaves_inode_table_empty() {
        let image = build(Geometry::default(), &[], Some(Corruption::MissingRoot)).unwrap();
        let fs = Filesystem::load(image).unwrap();
        for index in 0..fs.superblock().ninodes {
            assert_eq!(fs.inode(index).unwrap().kind(), Ok(InodeType::Unused));
        }
    }

    #[test]
    fn input_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_cat");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"meow")
            .unwrap();
        let file = InputFile::from_path(&path).unwrap();
        assert_eq!(file.name, "cat");
        assert_eq!(file.content, b"meow");
        assert!(InputFile::from_path(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn every_mode_has_a_distinct_outcome() {
        for (i, a) in Corruption::ALL.iter().enumerate() {
            for b in &Corruption::ALL[i + 1..] {
                assert_ne!(a.expected(), b.expected());
            }
        }
    }
}
