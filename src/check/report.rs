use log::{debug, info};

use super::Checker;
use crate::error::{Error, FormatError};
use crate::structs::*;

impl Checker<'_> {
    /// Root inode must exist as a directory
    pub(super) fn check_root(&self) -> Result<(), Error> {
        match self.inodes.get(ROOT_INODE as usize) {
            Some(state) if state.is(InodeType::Directory) => Ok(()),
            state => {
                debug!("Root inode is {:?}", state.and_then(|s| s.kind));
                Err(FormatError::MissingRoot.into())
            }
        }
    }

    /// Cross-check gathered inode facts and the bitmap
    pub(super) fn report(&self) -> Result<(), Error> {
        info!("Checking reference counts and bitmap");
        // inode 0 is reserved
        let inodes = self.inodes.iter().enumerate().skip(1);

        for (index, state) in inodes.clone() {
            let countable = state.is(InodeType::File) || state.is(InodeType::Device);
            if countable && !state.referenced {
                debug!("Inode {index} is not in any directory");
                return Err(FormatError::Orphan.into());
            }
        }
        for (index, state) in inodes.clone() {
            if state.is(InodeType::File) && state.links != u32::from(state.nlink) {
                debug!(
                    "Inode {index} declares {} links, found {}",
                    state.nlink, state.links
                );
                return Err(FormatError::BadRefCount.into());
            }
        }
        for (index, state) in inodes {
            if index as u32 != ROOT_INODE && state.is(InodeType::Directory) && state.links > 1 {
                debug!("Directory {index} is named {} times", state.links);
                return Err(FormatError::MultiplyLinkedDirectory.into());
            }
        }

        self.check_bitmap()
    }

    fn check_bitmap(&self) -> Result<(), Error> {
        let superblock = self.fs.superblock();
        let data = superblock.data_block_start().min(superblock.size as u64) as u32;
        for block in data..superblock.size {
            if is_marked(self.fs, block)? && self.claims[block as usize].is_none() {
                debug!("Block {block} is marked but unclaimed");
                return Err(FormatError::BitmapFalsePositive.into());
            }
        }
        for block in data..superblock.size {
            if self.claims[block as usize].is_some() && !is_marked(self.fs, block)? {
                debug!("Block {block} is claimed but free in the bitmap");
                return Err(FormatError::BitmapFalseNegative.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::InodeState;
    use crate::filesystem::builder::{Geometry, ImageBuilder};
    use crate::filesystem::Filesystem;

    fn empty() -> Filesystem {
        let mut builder = ImageBuilder::new(Geometry::default()).unwrap();
        builder.mark_allocated().unwrap();
        Filesystem::load(builder.finish()).unwrap()
    }

    #[test]
    fn root_states() {
        let fs = empty();
        let mut checker = Checker::new(&fs);
        assert!(checker.check_root().is_err());
        checker.inodes[1].kind = Some(InodeType::File);
        assert!(checker.check_root().is_err());
        checker.inodes[1].kind = Some(InodeType::Directory);
        assert!(checker.check_root().is_ok());
    }

    #[test]
    fn reserved_inode_is_skipped() {
        let fs = empty();
        let mut checker = Checker::new(&fs);
        checker.inodes[0] = InodeState {
            kind: Some(InodeType::File),
            nlink: 3,
            ..Default::default()
        };
        assert!(checker.report().is_ok());
    }

    #[test]
    fn root_may_be_named_twice() {
        let fs = empty();
        let mut checker = Checker::new(&fs);
        checker.inodes[1] = InodeState {
            kind: Some(InodeType::Directory),
            referenced: true,
            links: 2,
            ..Default::default()
        };
        assert!(checker.report().is_ok());
        checker.inodes[2] = checker.inodes[1];
        assert!(matches!(
            checker.report(),
            Err(Error::Format(FormatError::MultiplyLinkedDirectory))
        ));
    }
}
