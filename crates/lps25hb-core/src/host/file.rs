//! File operations for character devices

use crate::devnum::DevNum;
use crate::error::Result;
use bitflags::bitflags;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Access mode of an open file (`FMODE_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileMode: u32 {
        /// File is open for reading
        const READ  = 1 << 0;
        /// File is open for writing
        const WRITE = 1 << 1;
    }
}

impl Default for FileMode {
    fn default() -> Self {
        FileMode::empty()
    }
}

/// The inode handed to [`FileOperations::open`]
#[derive(Clone)]
pub struct Inode {
    rdev: DevNum,
    cdev_container: Arc<dyn Any + Send + Sync>,
}

impl Inode {
    /// Inode for the character device `rdev` embedded in `cdev_container`
    pub fn new(rdev: DevNum, cdev_container: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            rdev,
            cdev_container,
        }
    }

    /// Device number of the node
    pub fn rdev(&self) -> DevNum {
        self.rdev
    }

    /// The object the character device is embedded in, if it is a `T`
    pub fn container<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.cdev_container).downcast::<T>().ok()
    }
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode").field("rdev", &self.rdev).finish_non_exhaustive()
    }
}

/// State of one open file
#[derive(Default)]
pub struct File {
    mode: FileMode,
    pos: u64,
    private_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl File {
    /// A freshly opened file with access `mode`
    pub fn new(mode: FileMode) -> Self {
        Self {
            mode,
            pos: 0,
            private_data: None,
        }
    }

    /// Access mode
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Current file position
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Update the file position
    pub fn set_pos(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Attach driver data to the file
    pub fn set_private_data(&mut self, data: Arc<dyn Any + Send + Sync>) {
        self.private_data = Some(data);
    }

    /// Driver data attached in `open`, if it is a `T`
    pub fn private_data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.private_data
            .as_ref()
            .and_then(|data| Arc::clone(data).downcast::<T>().ok())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("mode", &self.mode)
            .field("pos", &self.pos)
            .field("private_data", &self.private_data.is_some())
            .finish()
    }
}

/// Character-device file operations (`struct file_operations`)
pub trait FileOperations: Send + Sync {
    /// Called when user space opens the device node
    fn open(&self, inode: &Inode, file: &mut File) -> Result<()>;

    /// Read up to `buf.len()` bytes at `*pos`, returning the number transferred
    fn read(&self, file: &File, buf: &mut [u8], pos: &mut u64) -> Result<usize>;

    /// Called when the last reference to the open file goes away
    fn release(&self, _inode: &Inode, _file: &mut File) -> Result<()> {
        Ok(())
    }
}
