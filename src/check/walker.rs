use log::{debug, info, trace};

use super::Checker;
use crate::error::{Error, FormatError};
use crate::structs::*;

impl Checker<'_> {
    /// Walk every directory, counting references and recording parents
    pub(super) fn walk(&mut self) -> Result<(), Error> {
        info!("Walking directories");
        let fs = self.fs;
        for index in 0..fs.superblock().ninodes {
            if !self.inodes[index as usize].is(InodeType::Directory) {
                continue;
            }
            let inode = fs.inode(index)?;
            let entries = fs.entries(&inode)?;
            debug!("Directory {index}: {} entry slots", entries.len());

            let mut dot = false;
            let mut parent = None;
            for entry in entries.iter().filter(|e| !e.is_free()) {
                trace!("Directory {index}: {entry}");
                let target = u32::from(entry.inum);
                if !self
                    .inodes
                    .get(target as usize)
                    .is_some_and(|state| state.is_allocated())
                {
                    debug!("Directory {index} names free inode {target}");
                    return Err(FormatError::DanglingReference.into());
                }

                if entry.is_dot() {
                    if dot || target != index {
                        debug!("Directory {index} has a bad . entry");
                        return Err(FormatError::DirFormat.into());
                    }
                    dot = true;
                } else if entry.is_dotdot() {
                    if parent.is_some() {
                        debug!("Directory {index} has more than one .. entry");
                        return Err(FormatError::DirFormat.into());
                    }
                    parent = Some(target);
                }

                // . and .. count like any other entry
                let state = &mut self.inodes[target as usize];
                state.referenced = true;
                if state.is(InodeType::File) || state.is(InodeType::Directory) {
                    state.links += 1;
                }
            }

            if !dot || parent.is_none() {
                debug!("Directory {index} lacks . or ..");
                return Err(FormatError::DirFormat.into());
            }
            if index == ROOT_INODE && parent != Some(ROOT_INODE) {
                debug!("Root directory names {parent:?} as its parent");
                return Err(FormatError::MissingRoot.into());
            }
            self.inodes[index as usize].parent = parent;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::builder::{Geometry, ImageBuilder};
    use crate::filesystem::Filesystem;

    #[test]
    fn parents_and_links() {
        let mut builder = ImageBuilder::new(Geometry::default()).unwrap();
        let root = builder.acquire_inode(InodeType::Directory).unwrap();
        let sub = builder.acquire_inode(InodeType::Directory).unwrap();
        let file = builder.acquire_inode(InodeType::File).unwrap();
        builder.add_entry(root, root, ".").unwrap();
        builder.add_entry(root, root, "..").unwrap();
        builder.add_entry(root, sub, "sub").unwrap();
        builder.add_entry(sub, sub, ".").unwrap();
        builder.add_entry(sub, root, "..").unwrap();
        builder.add_entry(sub, file, "a").unwrap();
        builder.add_entry(root, file, "b").unwrap();
        builder.mark_allocated().unwrap();
        let fs = Filesystem::load(builder.finish()).unwrap();

        let mut checker = Checker::new(&fs);
        checker.scan().unwrap();
        checker.walk().unwrap();
        let state = |index: u32| checker.inodes[index as usize];
        assert_eq!(state(root).parent, Some(root));
        // root's . and .. plus sub's ..
        assert_eq!(state(root).links, 3);
        assert!(state(root).referenced);
        assert_eq!(state(sub).parent, Some(root));
        // sub's . plus its name in root
        assert_eq!(state(sub).links, 2);
        assert_eq!(state(file).links, 2);
        assert_eq!(state(file).parent, None);
    }

    #[test]
    fn dangling_reference_comes_before_format() {
        let mut builder = ImageBuilder::new(Geometry::default()).unwrap();
        let root = builder.acquire_inode(InodeType::Directory).unwrap();
        builder.add_entry(root, 7, ".").unwrap();
        builder.mark_allocated().unwrap();
        let fs = Filesystem::load(builder.finish()).unwrap();
        let mut checker = Checker::new(&fs);
        checker.scan().unwrap();
        assert!(matches!(
            checker.walk(),
            Err(Error::Format(FormatError::DanglingReference))
        ));
    }

    #[test]
    fn dotdot_to_file_is_counted() {
        let mut builder = ImageBuilder::new(Geometry::default()).unwrap();
        let root = builder.acquire_inode(InodeType::Directory).unwrap();
        let sub = builder.acquire_inode(InodeType::Directory).unwrap();
        let file = builder.acquire_inode(InodeType::File).unwrap();
        builder.add_entry(root, root, ".").unwrap();
        builder.add_entry(root, root, "..").unwrap();
        builder.add_entry(root, sub, "sub").unwrap();
        builder.add_entry(root, file, "f").unwrap();
        builder.add_entry(sub, sub, ".").unwrap();
        builder.add_entry(sub, file, "..").unwrap();
        builder.mark_allocated().unwrap();
        let fs = Filesystem::load(builder.finish()).unwrap();

        let mut checker = Checker::new(&fs);
        checker.scan().unwrap();
        checker.walk().unwrap();
        assert_eq!(checker.inodes[file as usize].links, 2);
        assert_eq!(checker.inodes[sub as usize].parent, Some(file));
    }

    #[test]
    fn duplicate_dotdot_entry() {
        let mut builder = ImageBuilder::new(Geometry::default()).unwrap();
        let root = builder.acquire_inode(InodeType::Directory).unwrap();
        builder.add_entry(root, root, ".").unwrap();
        builder.add_entry(root, root, "..").unwrap();
        builder.add_entry(root, root, "..").unwrap();
        builder.mark_allocated().unwrap();
        let fs = Filesystem::load(builder.finish()).unwrap();
        let mut checker = Checker::new(&fs);
        checker.scan().unwrap();
        assert!(matches!(
            checker.walk(),
            Err(Error::Format(FormatError::DirFormat))
        ));
    }
}
