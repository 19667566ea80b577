use std::{
    collections::HashMap,
    io::{self, Cursor, Read, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
};

use super::{AccessFlags, AccessGrantor, ReadStream, ResourceAccessor, WriteStream};
use crate::{
    errors::{Result, TransferError},
    id::ResourceId,
};

type Store = Arc<RwLock<HashMap<ResourceId, Vec<u8>>>>;

/// Resources kept in memory.
///
/// Every stream handed out is counted when opened and again when dropped, so
/// callers can check that nothing is left open. Written content becomes
/// visible when the write stream is flushed or dropped.
#[derive(Clone, Default)]
pub struct MemoryAccessor {
    resources: Store,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    grants: Arc<Mutex<Vec<(ResourceId, AccessFlags)>>>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ResourceId, content: impl Into<Vec<u8>>) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(id, content.into());
        }
    }

    pub fn content(&self, id: &ResourceId) -> Option<Vec<u8>> {
        self.resources
            .read()
            .ok()
            .and_then(|resources| resources.get(id).cloned())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Acquire)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    pub fn open_streams(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }

    pub fn grants(&self) -> Vec<(ResourceId, AccessFlags)> {
        self.grants
            .lock()
            .map(|grants| grants.clone())
            .unwrap_or_default()
    }

    fn poisoned() -> TransferError {
        TransferError::Other(anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl ResourceAccessor for MemoryAccessor {
    fn open_read(&self, id: &ResourceId) -> Result<ReadStream> {
        let content = self
            .resources
            .read()
            .map_err(|_| Self::poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::invalid_id(id.as_str(), "no such resource"))?;
        self.opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemoryReader {
            inner: Cursor::new(content),
            released: self.released.clone(),
        }))
    }

    fn open_write(&self, id: &ResourceId) -> Result<WriteStream> {
        self.resources
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(id.clone(), Vec::new());
        self.opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemoryWriter {
            id: id.clone(),
            buffer: Vec::new(),
            store: self.resources.clone(),
            released: self.released.clone(),
        }))
    }
}

impl AccessGrantor for MemoryAccessor {
    fn take_persistable(&self, id: &ResourceId, flags: AccessFlags) -> Result<()> {
        let known = self
            .resources
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(id);
        if !known {
            return Err(TransferError::AccessDenied(
                id.to_string(),
                "no such resource".into(),
            ));
        }
        self.grants
            .lock()
            .map_err(|_| Self::poisoned())?
            .push((id.clone(), flags));
        Ok(())
    }
}

struct MemoryReader {
    inner: Cursor<Vec<u8>>,
    released: Arc<AtomicUsize>,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::AcqRel);
    }
}

struct MemoryWriter {
    id: ResourceId,
    buffer: Vec<u8>,
    store: Store,
    released: Arc<AtomicUsize>,
}

impl MemoryWriter {
    fn commit(&self) -> io::Result<()> {
        let mut resources = self
            .store
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "store lock poisoned"))?;
        resources.insert(self.id.clone(), self.buffer.clone());
        Ok(())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        let _ = self.commit();
        self.released.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    #[test]
    fn streams_are_counted_until_dropped() {
        let accessor = MemoryAccessor::new();
        accessor.insert(id("mem://a"), b"abc".to_vec());

        let reader = accessor.open_read(&id("mem://a")).unwrap();
        let writer = accessor.open_write(&id("mem://b")).unwrap();
        assert_eq!(accessor.opened(), 2);
        assert_eq!(accessor.open_streams(), 2);

        drop(reader);
        drop(writer);
        assert_eq!(accessor.released(), 2);
        assert_eq!(accessor.open_streams(), 0);
    }

    #[test]
    fn written_bytes_land_on_drop() {
        let accessor = MemoryAccessor::new();
        let mut writer = accessor.open_write(&id("mem://out")).unwrap();
        writer.write_all(b"payload").unwrap();
        assert_eq!(accessor.content(&id("mem://out")), Some(Vec::new()));

        drop(writer);
        assert_eq!(accessor.content(&id("mem://out")), Some(b"payload".to_vec()));
    }

    #[test]
    fn unknown_resources_cannot_be_read_or_granted() {
        let accessor = MemoryAccessor::new();
        assert!(matches!(
            accessor.open_read(&id("mem://ghost")).err().unwrap(),
            TransferError::InvalidIdentifier(..)
        ));
        assert!(matches!(
            accessor
                .take_persistable(&id("mem://ghost"), AccessFlags::READ)
                .unwrap_err(),
            TransferError::AccessDenied(..)
        ));
        assert_eq!(accessor.opened(), 0);
    }
}
