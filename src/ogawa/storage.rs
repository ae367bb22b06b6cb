//! Storage capability consumed by the decoders.
//!
//! An archive is a tree of groups whose leaves are opaque data blocks.
//! Decoders only see the [`BlockGroup`] / [`DataBlock`] traits; the file
//! backed implementation lives in [`super::reader`], and [`MemGroup`] keeps
//! the whole tree in memory for tests and embedding.
//!
//! Every read carries a thread slot. Implementations that keep per-thread
//! handles use it to pick one; the rest ignore it.

use std::sync::Arc;

use crate::util::{Error, Result};

/// A leaf block of bytes.
pub trait DataBlock: Send + Sync {
    /// Size of the block in bytes.
    fn size(&self) -> u64;

    /// Copy `dest.len()` bytes starting at `offset` into `dest`.
    fn read(&self, offset: u64, dest: &mut [u8], slot: usize) -> Result<()>;

    /// True if the block holds no bytes.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Read the whole block.
    fn read_all(&self, slot: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size() as usize];
        if !buf.is_empty() {
            self.read(0, &mut buf, slot)?;
        }
        Ok(buf)
    }
}

/// An ordered group of children, each either a group or a data block.
pub trait BlockGroup: Sized + Send + Sync {
    type Data: DataBlock;

    fn num_children(&self) -> usize;

    /// True if child `index` exists and is a data block.
    fn is_child_data(&self, index: usize) -> bool;

    /// True if child `index` exists and is a group.
    fn is_child_group(&self, index: usize) -> bool;

    /// Open child `index` as a data block.
    fn data(&self, index: usize, slot: usize) -> Result<Self::Data>;

    /// Open child `index` as a group.
    fn group(&self, index: usize, slot: usize) -> Result<Self>;

    /// Index of the last child, if it is a data block.
    fn last_data_index(&self) -> Option<usize> {
        let last = self.num_children().checked_sub(1)?;
        self.is_child_data(last).then_some(last)
    }
}

pub(crate) fn check_child(index: usize, count: usize) -> Result<()> {
    if index >= count {
        return Err(Error::ChildOutOfBounds { index, count });
    }
    Ok(())
}

pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::UnexpectedEof(offset.saturating_add(len as u64))),
    }
}

/// In-memory data block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemData {
    bytes: Arc<[u8]>,
}

impl Default for MemData {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into().into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl DataBlock for MemData {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&self, offset: u64, dest: &mut [u8], _slot: usize) -> Result<()> {
        check_range(offset, dest.len(), self.size())?;
        let start = offset as usize;
        dest.copy_from_slice(&self.bytes[start..start + dest.len()]);
        Ok(())
    }

    fn read_all(&self, _slot: usize) -> Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

/// Child of a [`MemGroup`].
#[derive(Clone, Debug)]
pub enum MemChild {
    Group(MemGroup),
    Data(MemData),
}

/// In-memory group. Cloning shares the children.
#[derive(Clone, Debug, Default)]
pub struct MemGroup {
    children: Arc<Vec<MemChild>>,
}

impl MemGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a data child.
    pub fn push_data(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        Arc::make_mut(&mut self.children).push(MemChild::Data(MemData::new(bytes)));
        self
    }

    /// Append a group child.
    pub fn push_group(&mut self, group: MemGroup) -> &mut Self {
        Arc::make_mut(&mut self.children).push(MemChild::Group(group));
        self
    }

    /// Builder form of [`push_data`](Self::push_data).
    pub fn with_data(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.push_data(bytes);
        self
    }

    /// Builder form of [`push_group`](Self::push_group).
    pub fn with_group(mut self, group: MemGroup) -> Self {
        self.push_group(group);
        self
    }

    pub fn children(&self) -> &[MemChild] {
        &self.children
    }
}

impl BlockGroup for MemGroup {
    type Data = MemData;

    fn num_children(&self) -> usize {
        self.children.len()
    }

    fn is_child_data(&self, index: usize) -> bool {
        matches!(self.children.get(index), Some(MemChild::Data(_)))
    }

    fn is_child_group(&self, index: usize) -> bool {
        matches!(self.children.get(index), Some(MemChild::Group(_)))
    }

    fn data(&self, index: usize, _slot: usize) -> Result<MemData> {
        check_child(index, self.children.len())?;
        match &self.children[index] {
            MemChild::Data(data) => Ok(data.clone()),
            MemChild::Group(_) => Err(Error::TypeMismatch {
                expected: "data",
                actual: "group",
            }),
        }
    }

    fn group(&self, index: usize, _slot: usize) -> Result<MemGroup> {
        check_child(index, self.children.len())?;
        match &self.children[index] {
            MemChild::Group(group) => Ok(group.clone()),
            MemChild::Data(_) => Err(Error::TypeMismatch {
                expected: "group",
                actual: "data",
            }),
        }
    }
}
