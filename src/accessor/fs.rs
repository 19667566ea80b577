use std::{
    fs::{self, File, OpenOptions},
    path::PathBuf,
};

use log::debug;

use super::{AccessFlags, AccessGrantor, ReadStream, ResourceAccessor, WriteStream};
use crate::{
    errors::{Result, TransferError},
    id::ResourceId,
};

/// Resources on the local file system, named by `file://` URLs or plain
/// paths.
#[derive(Debug, Default, Clone)]
pub struct FsAccessor;

impl FsAccessor {
    pub fn new() -> Self {
        FsAccessor
    }

    pub fn resolve(&self, id: &ResourceId) -> Result<PathBuf> {
        match id.as_url() {
            Some(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| TransferError::invalid_id(id.as_str(), "not a local file URL")),
            Some(url) => Err(TransferError::invalid_id(
                id.as_str(),
                format!("unsupported scheme `{}`", url.scheme()),
            )),
            None => Ok(PathBuf::from(id.as_str())),
        }
    }
}

impl ResourceAccessor for FsAccessor {
    fn open_read(&self, id: &ResourceId) -> Result<ReadStream> {
        let path = self.resolve(id)?;
        let file = File::open(&path)
            .map_err(|e| TransferError::invalid_id(id.as_str(), e))?;
        if file
            .metadata()
            .map_err(|e| TransferError::invalid_id(id.as_str(), e))?
            .is_dir()
        {
            return Err(TransferError::invalid_id(id.as_str(), "is a directory"));
        }
        debug!("Opened {} for reading", path.display());
        Ok(Box::new(file))
    }

    fn open_write(&self, id: &ResourceId) -> Result<WriteStream> {
        let path = self.resolve(id)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| TransferError::invalid_id(id.as_str(), e))?;
        debug!("Opened {} for writing", path.display());
        Ok(Box::new(file))
    }
}

impl AccessGrantor for FsAccessor {
    fn take_persistable(&self, id: &ResourceId, flags: AccessFlags) -> Result<()> {
        let path = self.resolve(id)?;
        let meta = fs::metadata(&path)
            .map_err(|e| TransferError::AccessDenied(id.to_string(), e.to_string()))?;
        if flags.contains(AccessFlags::WRITE) && meta.permissions().readonly() {
            return Err(TransferError::AccessDenied(
                id.to_string(),
                "resource is read-only".into(),
            ));
        }
        debug!("Granted {:?} on {}", flags, path.display());
        Ok(())
    }
}
