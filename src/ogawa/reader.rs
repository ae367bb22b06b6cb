//! File-backed Ogawa storage.
//!
//! The file is either memory-mapped or read through a pool of file handles,
//! one per thread slot, so concurrent readers on different slots never
//! contend for a seek position.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
#[cfg(feature = "mmap")]
use memmap2::Mmap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::format::*;
use super::storage::{check_child, check_range, BlockGroup, DataBlock};
use crate::util::{Error, Result};

/// How a file-backed archive is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Memory-map the file instead of reading through file handles.
    pub use_mmap: bool,
    /// Number of file handles when not memory-mapped. Thread slots beyond
    /// this wrap around.
    pub thread_slots: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
            thread_slots: rayon::current_num_threads().max(1),
        }
    }
}

impl ReadOptions {
    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_thread_slots(mut self, thread_slots: usize) -> Self {
        self.thread_slots = thread_slots.max(1);
        self
    }
}

/// Input streams for reading Ogawa data.
pub struct IStreams {
    inner: StreamsInner,
    version: u16,
    frozen: bool,
    size: u64,
}

enum StreamsInner {
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    /// One handle per thread slot.
    Files(Vec<Mutex<File>>),
}

impl IStreams {
    /// Open a file and validate its header.
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let open = || {
            File::open(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FileNotFound(path.to_path_buf())
                } else {
                    Error::Io(e)
                }
            })
        };

        let file = open()?;
        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = Self::map_or_pool(file, open, options)?;
        let mut streams = Self { inner, version: 0, frozen: false, size };

        let mut header = [0u8; HEADER_SIZE];
        streams.read_into(0, &mut header, 0)?;
        let (version, frozen) = Self::parse_header(&header)?;
        streams.version = version;
        streams.frozen = frozen;

        debug!(path = %path.display(), size, version, frozen, "opened ogawa file");
        Ok(streams)
    }

    #[cfg(feature = "mmap")]
    fn map_or_pool(
        file: File,
        open: impl Fn() -> Result<File>,
        options: &ReadOptions,
    ) -> Result<StreamsInner> {
        if options.use_mmap {
            // Safety: the mapping is read-only and the file is not modified
            // through this crate while mapped
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            return Ok(StreamsInner::Mmap(mmap));
        }
        Self::pool(file, open, options)
    }

    #[cfg(not(feature = "mmap"))]
    fn map_or_pool(
        file: File,
        open: impl Fn() -> Result<File>,
        options: &ReadOptions,
    ) -> Result<StreamsInner> {
        if options.use_mmap {
            warn!("built without mmap support, reading through file handles");
        }
        Self::pool(file, open, options)
    }

    fn pool(file: File, open: impl Fn() -> Result<File>, options: &ReadOptions) -> Result<StreamsInner> {
        let slots = options.thread_slots.max(1);
        let mut files = Vec::with_capacity(slots);
        files.push(Mutex::new(file));
        for _ in 1..slots {
            files.push(Mutex::new(open()?));
        }
        Ok(StreamsInner::Files(files))
    }

    /// Parse and validate the Ogawa header.
    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[..OGAWA_MAGIC.len()] != OGAWA_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let frozen = data[FROZEN_OFFSET] == FROZEN_FLAG;
        if !frozen {
            warn!("archive is not frozen, it may still be open for writing");
        }
        let version = LittleEndian::read_u16(&data[VERSION_OFFSET..]);
        Ok((version, frozen))
    }

    /// Check if the archive is frozen (finalized).
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Ogawa format version from the header.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of independent read handles (1 when memory-mapped).
    pub fn num_slots(&self) -> usize {
        match &self.inner {
            #[cfg(feature = "mmap")]
            StreamsInner::Mmap(_) => 1,
            StreamsInner::Files(files) => files.len(),
        }
    }

    /// Root group position from the header.
    pub fn root_pos(&self) -> Result<u64> {
        self.read_u64(ROOT_POS_OFFSET as u64, 0)
    }

    /// Read bytes into `buf` at `pos`, routed through `slot`'s handle.
    pub fn read_into(&self, pos: u64, buf: &mut [u8], slot: usize) -> Result<()> {
        check_range(pos, buf.len(), self.size)?;

        match &self.inner {
            #[cfg(feature = "mmap")]
            StreamsInner::Mmap(mmap) => {
                let start = pos as usize;
                buf.copy_from_slice(&mmap[start..start + buf.len()]);
            }
            StreamsInner::Files(files) => {
                let mut f = files[slot % files.len()].lock();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
            }
        }
        Ok(())
    }

    pub fn read_u64(&self, pos: u64, slot: usize) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf, slot)?;
        Ok(LittleEndian::read_u64(&buf))
    }
}

/// Open `path` and return its root group.
pub fn open_root(path: impl AsRef<Path>, options: &ReadOptions) -> Result<IGroup> {
    let streams = Arc::new(IStreams::open(path, options)?);
    let root_pos = streams.root_pos()?;
    IGroup::new(streams, root_pos, 0)
}

/// A group in the Ogawa hierarchy.
#[derive(Clone)]
pub struct IGroup {
    streams: Arc<IStreams>,
    pos: u64,
    child_offsets: Vec<u64>,
}

impl IGroup {
    /// Read the group at `pos`. Position 0 is the empty group.
    pub fn new(streams: Arc<IStreams>, pos: u64, slot: usize) -> Result<Self> {
        if pos == 0 {
            return Ok(Self { streams, pos, child_offsets: Vec::new() });
        }

        let count = streams.read_u64(pos, slot)?;
        let table_len = count
            .checked_mul(8)
            .filter(|&len| pos.saturating_add(8).saturating_add(len) <= streams.size())
            .ok_or(Error::UnexpectedEof(pos.saturating_add(8)))?;

        let mut raw = vec![0u8; table_len as usize];
        streams.read_into(pos + 8, &mut raw, slot)?;
        let child_offsets = raw.chunks_exact(8).map(LittleEndian::read_u64).collect();

        Ok(Self { streams, pos, child_offsets })
    }

    /// Position of this group in the file.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Underlying streams.
    #[inline]
    pub fn streams(&self) -> &Arc<IStreams> {
        &self.streams
    }

    fn child_offset(&self, index: usize) -> Result<u64> {
        check_child(index, self.child_offsets.len())?;
        Ok(self.child_offsets[index])
    }
}

impl std::fmt::Debug for IGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IGroup")
            .field("pos", &self.pos)
            .field("children", &self.child_offsets.len())
            .finish()
    }
}

impl BlockGroup for IGroup {
    type Data = IData;

    fn num_children(&self) -> usize {
        self.child_offsets.len()
    }

    fn is_child_data(&self, index: usize) -> bool {
        self.child_offsets.get(index).is_some_and(|&o| is_data_offset(o))
    }

    fn is_child_group(&self, index: usize) -> bool {
        self.child_offsets.get(index).is_some_and(|&o| is_group_offset(o))
    }

    fn data(&self, index: usize, slot: usize) -> Result<IData> {
        let offset = self.child_offset(index)?;
        if !is_data_offset(offset) {
            return Err(Error::TypeMismatch { expected: "data", actual: "group" });
        }
        IData::new(self.streams.clone(), extract_offset(offset), slot)
    }

    fn group(&self, index: usize, slot: usize) -> Result<IGroup> {
        let offset = self.child_offset(index)?;
        if !is_group_offset(offset) {
            return Err(Error::TypeMismatch { expected: "group", actual: "data" });
        }
        IGroup::new(self.streams.clone(), extract_offset(offset), slot)
    }
}

/// Data block in the Ogawa hierarchy: `[size: u64][bytes]`.
#[derive(Clone)]
pub struct IData {
    streams: Arc<IStreams>,
    pos: u64,
    size: u64,
}

impl IData {
    /// Read the data header at `pos`. Position 0 is the empty block.
    pub fn new(streams: Arc<IStreams>, pos: u64, slot: usize) -> Result<Self> {
        let size = if pos == 0 { 0 } else { streams.read_u64(pos, slot)? };
        if size > 0 {
            check_range(pos + 8, size as usize, streams.size())?;
        }
        Ok(Self { streams, pos, size })
    }

    /// Position of this block in the file.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }
}

impl std::fmt::Debug for IData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IData").field("pos", &self.pos).field("size", &self.size).finish()
    }
}

impl DataBlock for IData {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64, dest: &mut [u8], slot: usize) -> Result<()> {
        check_range(offset, dest.len(), self.size)?;
        if dest.is_empty() {
            return Ok(());
        }
        self.streams.read_into(self.pos + 8 + offset, dest, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_header_parsing() {
        let mut header = [0u8; 16];
        header[0..5].copy_from_slice(OGAWA_MAGIC);
        header[FROZEN_OFFSET] = FROZEN_FLAG;
        header[VERSION_OFFSET] = 1;

        let (version, frozen) = IStreams::parse_header(&header).unwrap();
        assert_eq!(version, 1);
        assert!(frozen);
    }

    #[test]
    fn test_invalid_magic() {
        let header = [0u8; 16];
        assert!(matches!(IStreams::parse_header(&header), Err(Error::InvalidMagic)));
    }

    /// Root group with one data child holding "hi" and one empty data child.
    fn tiny_file() -> tempfile::NamedTempFile {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(OGAWA_MAGIC);
        bytes.push(FROZEN_FLAG);
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&26u64.to_le_bytes());
        // data at 16
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(b"hi");
        // group at 26
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&(16 | TYPE_FLAG_MASK).to_le_bytes());
        bytes.extend_from_slice(&TYPE_FLAG_MASK.to_le_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file
    }

    #[test]
    fn test_read_through_handle_pool() {
        let file = tiny_file();
        let options = ReadOptions::default().with_mmap(false).with_thread_slots(3);
        let root = open_root(file.path(), &options).unwrap();
        assert_eq!(root.streams().num_slots(), 3);
        assert_eq!(root.num_children(), 2);

        for slot in 0..5 {
            let data = root.data(0, slot).unwrap();
            assert_eq!(data.read_all(slot).unwrap(), b"hi");
        }
        assert!(root.data(1, 0).unwrap().is_empty());
        assert!(matches!(root.group(0, 0), Err(Error::TypeMismatch { .. })));
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_read_mapped() {
        let file = tiny_file();
        let root = open_root(file.path(), &ReadOptions::default()).unwrap();
        assert!(root.streams().is_frozen());
        assert_eq!(root.streams().version(), 1);
        assert_eq!(root.data(0, 7).unwrap().read_all(7).unwrap(), b"hi");
    }

    #[test]
    fn test_missing_and_short_files() {
        assert!(matches!(
            IStreams::open("/definitely/not/here.abc", &ReadOptions::default()),
            Err(Error::FileNotFound(_))
        ));

        let mut short = tempfile::NamedTempFile::new().unwrap();
        short.write_all(b"Ogawa").unwrap();
        assert!(matches!(
            IStreams::open(short.path(), &ReadOptions::default()),
            Err(Error::UnexpectedEof(5))
        ));
    }
}
