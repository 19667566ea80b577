//! Host collaborators that turn a [`ResourceId`] into byte streams and that
//! take durable access grants on picked documents.

mod fs;
mod memory;

pub use fs::FsAccessor;
pub use memory::MemoryAccessor;

use std::{
    fmt,
    io::{Read, Write},
    ops::BitOr,
};

use crate::{errors::Result, id::ResourceId};

pub type ReadStream = Box<dyn Read + Send>;
pub type WriteStream = Box<dyn Write + Send>;

/// Opens byte streams on resources.
///
/// A stream is released when it is dropped. Opening failures must be reported
/// as [`crate::TransferError::InvalidIdentifier`].
pub trait ResourceAccessor: Send + Sync {
    fn open_read(&self, id: &ResourceId) -> Result<ReadStream>;
    fn open_write(&self, id: &ResourceId) -> Result<WriteStream>;
}

/// Takes persistable (surviving restarts) access grants on a resource.
pub trait AccessGrantor: Send + Sync {
    fn take_persistable(&self, id: &ResourceId, flags: AccessFlags) -> Result<()>;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(u8);

impl AccessFlags {
    pub const READ: AccessFlags = AccessFlags(0b01);
    pub const WRITE: AccessFlags = AccessFlags(0b10);

    pub fn contains(&self, other: AccessFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AccessFlags {
    type Output = AccessFlags;

    fn bitor(self, rhs: AccessFlags) -> AccessFlags {
        AccessFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let read = if self.contains(AccessFlags::READ) { "r" } else { "-" };
        let write = if self.contains(AccessFlags::WRITE) { "w" } else { "-" };
        write!(f, "AccessFlags({}{})", read, write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let both = AccessFlags::READ | AccessFlags::WRITE;
        assert!(both.contains(AccessFlags::READ));
        assert!(both.contains(AccessFlags::WRITE));
        assert!(!AccessFlags::READ.contains(AccessFlags::WRITE));
        assert!(AccessFlags::default().contains(AccessFlags::default()));
        assert_eq!(format!("{:?}", both), "AccessFlags(rw)");
    }
}
