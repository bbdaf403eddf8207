use log::info;

use crate::config::Config;
use crate::consts::{InodePointer, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::directory::Directory;
use crate::ops::file::{create_child, File};
use crate::structure::inode::{Inode, InodeKind};
use crate::structure::Structure;
use crate::util::error::{FsError, Result};

pub mod directory;
pub mod file;
pub mod path;

/// A child as listed by `read_directory`: the name stored in the directory
/// plus the child's live inode record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: Inode,
}

pub struct FileSystem<A: DeviceDriver> {
    structure: Structure<A>,
}

impl<A: DeviceDriver> FileSystem<A> {
    /// Formats `device`, destroying whatever it held.
    pub fn format(device: A, config: Config) -> Result<FileSystem<A>> {
        Ok(FileSystem { structure: Structure::new(device, config)? })
    }

    /// Validates the superblock and rebuilds the in-memory state from disk.
    pub fn load(device: A, config: Config) -> Result<FileSystem<A>> {
        Ok(FileSystem { structure: Structure::mount(device, config)? })
    }

    pub fn config(&self) -> Config {
        self.structure.config
    }

    /// Magic number read back from (or written to) block 0.
    pub fn magic(&self) -> u32 {
        self.structure.superblock().magic
    }

    pub fn root(&self) -> Result<&Inode> {
        self.structure.read_inode(ROOT_INODE)
    }

    pub fn get_inode(&self, index: InodePointer) -> Result<Option<&Inode>> {
        self.structure.get_inode(index)
    }

    /// Occupied inodes in index order.
    pub fn inodes(&self) -> impl Iterator<Item = &Inode> {
        self.structure.inode_table.iter()
    }

    pub fn resolve(&self, path: &str) -> Result<&Inode> {
        let index = path::resolve(&self.structure, path)?;
        self.structure.read_inode(index)
    }

    pub fn create_file(&mut self, path: &str, content: &[u8]) -> Result<Inode> {
        let (parent, name) = path::resolve_parent(&self.structure, path)?;
        let inode = create_child(&mut self.structure, &parent, name, InodeKind::File, content)?;
        info!("created file {} ({} bytes, inode {})", path, content.len(), inode.index());
        Ok(inode)
    }

    pub fn create_directory(&mut self, path: &str) -> Result<Inode> {
        let (parent, name) = path::resolve_parent(&self.structure, path)?;
        let inode = create_child(&mut self.structure, &parent, name, InodeKind::Directory, &[])?;
        info!("created directory {} (inode {})", path, inode.index());
        Ok(inode)
    }

    pub fn read_file(&self, index: InodePointer) -> Result<Vec<u8>> {
        File::open(&self.structure, index)?.get_data(&self.structure)
    }

    pub fn read_directory(&self, index: InodePointer) -> Result<Vec<DirEntry>> {
        let directory = Directory::open(&self.structure, index)?;
        directory
            .get_entries(&self.structure)?
            .into_iter()
            .map(|entry| -> Result<DirEntry> {
                let inode = self.structure.get_inode(entry.index)?.ok_or_else(|| {
                    FsError::SerializationError(format!("entry {} refers to free inode {}", entry.name, entry.index))
                })?;
                Ok(DirEntry { name: entry.name, inode: inode.clone() })
            })
            .collect()
    }

    /// Bitmap state as (inode slots, data blocks) in use.
    pub fn usage(&self) -> (Vec<InodePointer>, Vec<u32>) {
        (self.structure.inode_map.used().collect(), self.structure.data_map.used().collect())
    }

    pub fn device(&self) -> &A {
        self.structure.io.device()
    }

    pub fn into_device(self) -> A {
        self.structure.io.into_device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BLOCK_SIZE;
    use crate::driver::file_drive::FileDrive;
    use crate::driver::memory_drive::MemoryDrive;
    use crate::structure::superblock::MAGIC;
    use crate::util::error::Resource;

    fn drive() -> MemoryDrive {
        MemoryDrive::new(Config::default().total_blocks() * BLOCK_SIZE as u64, 512)
    }

    fn format() -> FileSystem<MemoryDrive> {
        FileSystem::format(drive(), Config::default()).unwrap()
    }

    #[test]
    fn fresh_filesystem() {
        let fs = format();
        let occupied: Vec<&Inode> = fs.inodes().collect();
        assert_eq!(occupied.len(), 1);

        let root = occupied[0];
        assert_eq!(root.index(), 0);
        assert_eq!(root.kind(), InodeKind::Directory);
        assert_eq!(root.size(), 0);
        assert_eq!(root.name(), "/");

        assert_eq!(fs.usage(), (vec![0], vec![]));
        assert_eq!(fs.magic(), MAGIC);
        assert!(fs.read_directory(ROOT_INODE).unwrap().is_empty());
    }

    #[test]
    fn round_trip_lengths() {
        let mut fs = format();
        for (i, length) in [0, 1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1].iter().enumerate() {
            let content: Vec<u8> = (0..*length).map(|byte| (byte % 251) as u8).collect();
            let inode = fs.create_file(&format!("/file{}", i), &content).unwrap();
            assert_eq!(inode.size() as usize, *length);
            assert_eq!(fs.read_file(inode.index()).unwrap(), content);
        }
    }

    #[test]
    fn create_file_lists_in_root() {
        let mut fs = format();
        let inode = fs.create_file("/foo", b"hello").unwrap();
        assert_eq!(inode.index(), 1);
        assert_eq!(inode.kind(), InodeKind::File);

        let listing = fs.read_directory(ROOT_INODE).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "foo");
        assert_eq!(listing[0].inode.kind(), InodeKind::File);
        assert_eq!(listing[0].inode.size(), 5);
    }

    #[test]
    fn inode_exhaustion_changes_nothing() {
        let mut fs = format();
        for i in 1..32 {
            fs.create_file(&format!("/f{}", i), b"").unwrap();
        }
        assert_eq!(fs.inodes().count(), 32);

        let usage = fs.usage();
        let table: Vec<Inode> = fs.inodes().cloned().collect();
        let bytes = fs.device().as_bytes().to_vec();

        let error = fs.create_file("/overflow", b"data").unwrap_err();
        assert!(matches!(error, FsError::ResourceExhausted(Resource::InodeSlot)));
        assert_eq!(fs.usage(), usage);
        assert_eq!(fs.inodes().cloned().collect::<Vec<_>>(), table);
        assert_eq!(fs.device().as_bytes(), &bytes[..]);
    }

    #[test]
    fn data_exhaustion() {
        let mut fs = format();
        // the root directory takes one block for its entries
        fs.create_file("/big", &vec![1; 16 * BLOCK_SIZE]).unwrap();
        fs.create_file("/big2", &vec![2; 15 * BLOCK_SIZE]).unwrap();
        assert_eq!(fs.usage().1.len(), 32);

        let error = fs.create_file("/more", b"x").unwrap_err();
        assert!(matches!(error, FsError::ResourceExhausted(Resource::DataBlock)));
        assert!(fs.create_file("/empty", b"").is_ok());
    }

    #[test]
    fn file_too_large() {
        let mut fs = FileSystem::format(
            MemoryDrive::new(64 * BLOCK_SIZE as u64, 4096),
            Config::new(32, 40).unwrap(),
        )
        .unwrap();
        let error = fs.create_file("/huge", &vec![0; 16 * BLOCK_SIZE + 1]).unwrap_err();
        assert!(matches!(error, FsError::CapacityExceeded { required: 17, limit: 16 }));
        assert_eq!(fs.usage(), (vec![0], vec![]));
    }

    #[test]
    fn persistence_round_trip() {
        let mut fs = format();
        fs.create_directory("/docs").unwrap();
        fs.create_file("/docs/readme", b"read me").unwrap();
        fs.create_file("/top", &vec![9; BLOCK_SIZE + 3]).unwrap();

        let usage = fs.usage();
        let table = fs.structure.inode_table.clone();
        let inode_map = fs.structure.inode_map.clone();
        let data_map = fs.structure.data_map.clone();

        let loaded = FileSystem::load(fs.into_device(), Config::default()).unwrap();
        assert_eq!(loaded.structure.inode_table, table);
        assert_eq!(loaded.structure.inode_map, inode_map);
        assert_eq!(loaded.structure.data_map, data_map);
        assert_eq!(loaded.usage(), usage);
        assert_eq!(loaded.magic(), MAGIC);

        let readme = loaded.resolve("/docs/readme").unwrap();
        assert_eq!(loaded.read_file(readme.index()).unwrap(), b"read me".to_vec());
    }

    #[test]
    fn persistence_through_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fs.img");
        let size = Config::default().total_blocks() * BLOCK_SIZE as u64;

        {
            let drive = FileDrive::create(&path, size, 512).unwrap();
            let mut fs = FileSystem::format(drive, Config::default()).unwrap();
            fs.create_file("/foo.txt", b"Hello, world!").unwrap();
        }

        let fs = FileSystem::load(FileDrive::open(&path, 512).unwrap(), Config::default()).unwrap();
        let inode = fs.resolve("/foo.txt").unwrap();
        assert_eq!(fs.read_file(inode.index()).unwrap(), b"Hello, world!".to_vec());
    }

    #[test]
    fn load_rejects_unformatted() {
        let result = FileSystem::load(drive(), Config::default());
        assert!(matches!(result, Err(FsError::CorruptFilesystem(_))));
    }

    #[test]
    fn resolve_errors() {
        let mut fs = format();
        assert!(matches!(fs.resolve("/a/b"), Err(FsError::NotFound(_))));

        fs.create_file("/a", b"file").unwrap();
        assert!(matches!(fs.resolve("/a/b"), Err(FsError::NotADirectory(_))));
        assert!(matches!(fs.create_file("/a/b", b""), Err(FsError::NotADirectory(_))));
        assert!(matches!(fs.create_file("/x/b", b""), Err(FsError::NotFound(_))));
        assert!(matches!(fs.create_file("relative", b""), Err(FsError::InvalidPath(_))));
        assert!(matches!(fs.create_file("/", b""), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn type_mismatches() {
        let mut fs = format();
        let file = fs.create_file("/f", b"x").unwrap();
        assert!(matches!(fs.read_file(ROOT_INODE), Err(FsError::NotAFile(0))));
        assert!(matches!(fs.read_directory(file.index()), Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn get_inode_bounds() {
        let fs = format();
        assert!(fs.get_inode(0).unwrap().is_some());
        assert!(fs.get_inode(31).unwrap().is_none());
        assert!(matches!(fs.get_inode(32), Err(FsError::OutOfBounds { index: 32, capacity: 32 })));
    }

    #[test]
    fn duplicate_names_are_shadowed() {
        let mut fs = format();
        let first = fs.create_file("/same", b"first").unwrap();
        fs.create_file("/same", b"second").unwrap();

        assert_eq!(fs.read_directory(ROOT_INODE).unwrap().len(), 2);
        assert_eq!(fs.resolve("/same").unwrap().index(), first.index());
    }

    #[test]
    fn nested_directories() {
        let mut fs = format();
        fs.create_directory("/a").unwrap();
        fs.create_directory("/a/b").unwrap();
        let inode = fs.create_file("/a/b/c", b"deep").unwrap();

        assert_eq!(fs.resolve("/a/b/c").unwrap(), &inode);
        let listing = fs.read_directory(fs.resolve("/a").unwrap().index()).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "b");
        assert!(listing[0].inode.is_directory());
    }
}
