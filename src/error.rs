use std::fmt::Display;

use thiserror::Error;

/// How a block is reached from its owning inode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Direct,
    Indirect,
}

impl Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Indirect => write!(f, "indirect"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Usage: xvfsck <file_system_image>")]
    Usage,
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image not found.")]
    Io(#[from] std::io::Error),
    #[error("image too small: {required} bytes required, {actual} found.")]
    TooSmall { required: u64, actual: u64 },
    #[error("block {0} out of range.")]
    BlockOutOfRange(u32),
    #[error("inode {0} out of range.")]
    InodeOutOfRange(u32),
}

/// Inconsistencies in an otherwise readable image, each with a fixed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("ERROR: bad inode.")]
    BadInodeType,
    #[error("ERROR: bad {0} address in inode.")]
    BadAddress(AddressKind),
    #[error("ERROR: {0} address used more than once.")]
    DuplicateAddress(AddressKind),
    #[error("ERROR: address used by inode but marked free in bitmap.")]
    FreeBlockInUse,
    #[error("ERROR: directory not properly formatted.")]
    DirFormat,
    #[error("ERROR: inode referred to in directory but marked free.")]
    DanglingReference,
    #[error("ERROR: root directory does not exist.")]
    MissingRoot,
    #[error("ERROR: inode marked in use but not found in a directory.")]
    Orphan,
    #[error("ERROR: bad reference count for file.")]
    BadRefCount,
    #[error("ERROR: directory appears more than once in file system.")]
    MultiplyLinkedDirectory,
    #[error("ERROR: bitmap marks block in use but it is not in use.")]
    BitmapFalsePositive,
    #[error("ERROR: block in use but not marked in bitmap.")]
    BitmapFalseNegative,
}

/// Failures of the image builder
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("out of free inodes")]
    NoFreeInodes,
    #[error("out of free blocks")]
    NoFreeBlocks,
    #[error("file exceeds maximum size")]
    FileTooLarge,
    #[error("write outside image at block {0}")]
    OutOfBounds(u32),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_single_line() {
        let errors: Vec<Error> = vec![
            Error::Usage,
            ImageError::TooSmall {
                required: 1024,
                actual: 10,
            }
            .into(),
            FormatError::BadAddress(AddressKind::Indirect).into(),
            FormatError::Orphan.into(),
        ];
        for e in errors {
            assert!(!e.to_string().contains('\n'));
        }
    }

    #[test]
    fn address_kind_in_message() {
        assert_eq!(
            FormatError::BadAddress(AddressKind::Direct).to_string(),
            "ERROR: bad direct address in inode."
        );
        assert_eq!(
            FormatError::DuplicateAddress(AddressKind::Indirect).to_string(),
            "ERROR: indirect address used more than once."
        );
    }
}
