//! Archive walker over any [`BlockGroup`] storage.
//!
//! Layout of the root group:
//!
//! ```text
//! 0  data   archive layout version (i32, 0)
//! 1  data   library version (i32, >= 9999)
//! 2  group  top object
//! 3  data   archive metadata
//! 4  data   time sampling records
//! ```
//!
//! An object group holds its property compound at child 0, child object `i`
//! at child `i + 1` and the child object headers in its last data child.
//! A compound holds property `i` at child `i` and the property headers in its
//! last data child. Scalar properties store one data child per stored sample;
//! array properties store data at `2k` and dimensions at `2k + 1`.

use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;
use tracing::{debug, trace};

use super::format::{ALEMBIC_OGAWA_FILE_VERSION, DATA_KEY_SIZE, MIN_ALEMBIC_VERSION};
use super::read_util::{
    decode_object_headers, decode_property_headers, decode_time_samplings, read_array_sample,
    read_dimensions, read_sample_key, read_scalar_sample,
};
use super::reader::{open_root, IGroup, ReadOptions};
use super::storage::{BlockGroup, DataBlock};
use crate::core::{
    MetaData, ObjectHeader, PropertyHeader, PropertyType, Sample, SampleSelector, TimeSampling,
    TimeSamplingRegistry,
};
use crate::util::{DataType, Dimensions, Error, PlainOldDataType, Result};

const VERSION_CHILD: usize = 0;
const LIBRARY_VERSION_CHILD: usize = 1;
const TOP_OBJECT_CHILD: usize = 2;
const META_DATA_CHILD: usize = 3;
const TIME_SAMPLING_CHILD: usize = 4;

fn read_i32<G: BlockGroup>(group: &G, index: usize, what: &str) -> Result<i32> {
    let data = group.data(index, 0)?;
    if data.size() != 4 {
        return Err(Error::invalid(format!("{} is {} bytes, expected 4", what, data.size())));
    }
    let mut buf = [0u8; 4];
    data.read(0, &mut buf, 0)?;
    Ok(LittleEndian::read_i32(&buf))
}

/// Contents of the last child, or nothing if the group is empty or ends in
/// a group.
fn read_trailing_data<G: BlockGroup>(group: &G, slot: usize) -> Result<Vec<u8>> {
    match group.last_data_index() {
        Some(index) => group.data(index, slot)?.read_all(slot),
        None => Ok(Vec::new()),
    }
}

// ============================================================================
// Archive
// ============================================================================

/// An opened archive.
///
/// The time sampling registry is built once here and shared read-only by
/// every reader handed out afterwards.
pub struct Archive<G: BlockGroup = IGroup> {
    root: G,
    version: i32,
    library_version: i32,
    meta_data: MetaData,
    registry: Arc<TimeSamplingRegistry>,
}

impl Archive<IGroup> {
    /// Open an archive file.
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        Self::from_root(open_root(path, options)?)
    }
}

impl<G: BlockGroup> Archive<G> {
    /// Read archive-level records from the root group.
    pub fn from_root(root: G) -> Result<Self> {
        let count = root.num_children();
        if count <= TIME_SAMPLING_CHILD {
            return Err(Error::invalid(format!(
                "root group has {} children, expected at least {}",
                count,
                TIME_SAMPLING_CHILD + 1
            )));
        }
        let layout_ok = root.is_child_data(VERSION_CHILD)
            && root.is_child_data(LIBRARY_VERSION_CHILD)
            && root.is_child_group(TOP_OBJECT_CHILD)
            && root.is_child_data(META_DATA_CHILD)
            && root.is_child_data(TIME_SAMPLING_CHILD);
        if !layout_ok {
            return Err(Error::invalid("root group children have the wrong kinds"));
        }

        let version = read_i32(&root, VERSION_CHILD, "archive version")?;
        if version != ALEMBIC_OGAWA_FILE_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let library_version = read_i32(&root, LIBRARY_VERSION_CHILD, "library version")?;
        if library_version < MIN_ALEMBIC_VERSION {
            return Err(Error::UnsupportedVersion(library_version));
        }

        let meta_data = MetaData::parse_bytes(&root.data(META_DATA_CHILD, 0)?.read_all(0)?);
        let (samplings, max_samples) =
            decode_time_samplings(&root.data(TIME_SAMPLING_CHILD, 0)?.read_all(0)?)?;
        let registry = Arc::new(TimeSamplingRegistry::new(samplings, max_samples));

        debug!(
            version,
            library_version,
            time_samplings = registry.len(),
            "opened archive"
        );
        Ok(Self { root, version, library_version, meta_data, registry })
    }

    /// Archive layout version.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Version of the library that wrote the archive.
    pub fn library_version(&self) -> i32 {
        self.library_version
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    pub fn registry(&self) -> &Arc<TimeSamplingRegistry> {
        &self.registry
    }

    /// Time sampling `index` of the archive table.
    pub fn time_sampling(&self, index: u32) -> Result<&Arc<TimeSampling>> {
        self.registry.get(index)
    }

    /// The top object. Its full name is empty so children get `/name` paths.
    pub fn top(&self, slot: usize) -> Result<ObjectReader<G>> {
        let header = ObjectHeader {
            name: "ABC".to_string(),
            full_name: String::new(),
            meta_data: self.meta_data.clone(),
        };
        ObjectReader::new(self.root.group(TOP_OBJECT_CHILD, slot)?, header, self.registry.clone(), slot)
    }

    /// Find an object by full path, e.g. `/xform/mesh`.
    pub fn find_object(&self, path: &str, slot: usize) -> Result<Option<ObjectReader<G>>> {
        let mut current = self.top(slot)?;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            match current.child_by_name(name, slot)? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

// ============================================================================
// Objects
// ============================================================================

/// One object of the hierarchy with its child headers decoded.
pub struct ObjectReader<G: BlockGroup> {
    group: G,
    header: ObjectHeader,
    children: Vec<ObjectHeader>,
    registry: Arc<TimeSamplingRegistry>,
}

impl<G: BlockGroup> ObjectReader<G> {
    fn new(group: G, header: ObjectHeader, registry: Arc<TimeSamplingRegistry>, slot: usize) -> Result<Self> {
        let children = decode_object_headers(&read_trailing_data(&group, slot)?, &header.full_name)?;
        // property group + one group per child + header block
        if !children.is_empty() && group.num_children() < children.len() + 2 {
            return Err(Error::invalid(format!(
                "object {} lists {} children but its group holds {} entries",
                header.full_name,
                children.len(),
                group.num_children()
            )));
        }
        trace!(object = %header.full_name, children = children.len(), "object");
        Ok(Self { group, header, children, registry })
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn full_name(&self) -> &str {
        &self.header.full_name
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child_headers(&self) -> &[ObjectHeader] {
        &self.children
    }

    /// Open child object `index`.
    pub fn child(&self, index: usize, slot: usize) -> Result<ObjectReader<G>> {
        let header = self.children.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: self.children.len(),
        })?;
        ObjectReader::new(self.group.group(index + 1, slot)?, header.clone(), self.registry.clone(), slot)
    }

    pub fn child_by_name(&self, name: &str, slot: usize) -> Result<Option<ObjectReader<G>>> {
        match self.children.iter().position(|h| h.name == name) {
            Some(index) => self.child(index, slot).map(Some),
            None => Ok(None),
        }
    }

    /// The object's top-level property compound.
    pub fn properties(&self, slot: usize) -> Result<CompoundReader<G>> {
        let header = PropertyHeader::compound("", MetaData::new());
        let group = if self.group.is_child_group(0) {
            Some(self.group.group(0, slot)?)
        } else {
            None
        };
        CompoundReader::new(group, header, self.registry.clone(), slot)
    }
}

// ============================================================================
// Properties
// ============================================================================

/// A compound property with its child headers decoded.
pub struct CompoundReader<G: BlockGroup> {
    group: Option<G>,
    header: PropertyHeader,
    headers: Vec<PropertyHeader>,
    registry: Arc<TimeSamplingRegistry>,
}

impl<G: BlockGroup> CompoundReader<G> {
    fn new(
        group: Option<G>,
        header: PropertyHeader,
        registry: Arc<TimeSamplingRegistry>,
        slot: usize,
    ) -> Result<Self> {
        let headers = match &group {
            Some(group) => decode_property_headers(&read_trailing_data(group, slot)?, &registry)?,
            None => Vec::new(),
        };
        Ok(Self { group, header, headers, registry })
    }

    pub fn header(&self) -> &PropertyHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn num_properties(&self) -> usize {
        self.headers.len()
    }

    pub fn property_headers(&self) -> &[PropertyHeader] {
        &self.headers
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.name == name)
    }

    /// Open property `index`.
    pub fn property(&self, index: usize, slot: usize) -> Result<PropertyReader<G>> {
        let header = self.headers.get(index).ok_or(Error::ChildOutOfBounds {
            index,
            count: self.headers.len(),
        })?;
        let group = match &self.group {
            Some(group) => group.group(index, slot)?,
            None => return Err(Error::ChildOutOfBounds { index, count: 0 }),
        };

        Ok(match header.property_type {
            PropertyType::Compound => PropertyReader::Compound(CompoundReader::new(
                Some(group),
                header.clone(),
                self.registry.clone(),
                slot,
            )?),
            PropertyType::Scalar => {
                PropertyReader::Scalar(ScalarPropertyReader(Sampled::new(group, header.clone())?))
            }
            PropertyType::Array => {
                PropertyReader::Array(ArrayPropertyReader(Sampled::new(group, header.clone())?))
            }
        })
    }

    pub fn property_by_name(&self, name: &str, slot: usize) -> Result<Option<PropertyReader<G>>> {
        match self.find(name) {
            Some(index) => self.property(index, slot).map(Some),
            None => Ok(None),
        }
    }
}

/// Any property.
pub enum PropertyReader<G: BlockGroup> {
    Compound(CompoundReader<G>),
    Scalar(ScalarPropertyReader<G>),
    Array(ArrayPropertyReader<G>),
}

impl<G: BlockGroup> PropertyReader<G> {
    pub fn header(&self) -> &PropertyHeader {
        match self {
            Self::Compound(p) => p.header(),
            Self::Scalar(p) => p.header(),
            Self::Array(p) => p.header(),
        }
    }

    pub fn as_compound(&self) -> Option<&CompoundReader<G>> {
        match self {
            Self::Compound(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarPropertyReader<G>> {
        match self {
            Self::Scalar(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayPropertyReader<G>> {
        match self {
            Self::Array(p) => Some(p),
            _ => None,
        }
    }
}

/// Shared state of scalar and array properties.
struct Sampled<G: BlockGroup> {
    group: G,
    header: PropertyHeader,
    data_type: DataType,
    time_sampling: Arc<TimeSampling>,
}

impl<G: BlockGroup> Sampled<G> {
    fn new(group: G, header: PropertyHeader) -> Result<Self> {
        let (Some(data_type), Some(time_sampling)) = (header.data_type, header.time_sampling.clone())
        else {
            return Err(Error::invalid(format!("property {} has no data type", header.name)));
        };
        Ok(Self { group, header, data_type, time_sampling })
    }

    fn stored_index(&self, selector: SampleSelector) -> Result<usize> {
        let index = selector.resolve(&self.time_sampling, self.header.num_samples());
        self.header.stored_sample_index(index)
    }

    fn read_all<F>(&self, read: F) -> Result<Vec<Sample>>
    where
        F: Fn(usize, usize) -> Result<Sample> + Sync,
    {
        (0..self.header.num_samples())
            .into_par_iter()
            .map(|index| read(index, rayon::current_thread_index().unwrap_or(0)))
            .collect()
    }
}

macro_rules! sampled_accessors {
    () => {
        pub fn header(&self) -> &PropertyHeader {
            &self.0.header
        }

        pub fn name(&self) -> &str {
            &self.0.header.name
        }

        pub fn data_type(&self) -> DataType {
            self.0.data_type
        }

        pub fn num_samples(&self) -> usize {
            self.0.header.num_samples()
        }

        pub fn is_constant(&self) -> bool {
            self.0.header.is_constant()
        }

        pub fn time_sampling(&self) -> &Arc<TimeSampling> {
            &self.0.time_sampling
        }

        /// Read a sample in its stored element kind.
        pub fn read_sample(&self, selector: impl Into<SampleSelector>, slot: usize) -> Result<Sample> {
            self.read_sample_as(selector, self.0.data_type.pod, slot)
        }

        /// Read every sample in parallel, each on its worker's thread slot.
        pub fn read_samples_par(&self, as_pod: PlainOldDataType) -> Result<Vec<Sample>> {
            self.0.read_all(|index, slot| self.read_sample_as(index, as_pod, slot))
        }
    };
}

/// A property with one value of `extent` elements per sample.
pub struct ScalarPropertyReader<G: BlockGroup>(Sampled<G>);

impl<G: BlockGroup> ScalarPropertyReader<G> {
    sampled_accessors!();

    /// Read a sample converted to `as_pod`.
    #[tracing::instrument(level = "trace", skip_all, fields(property = %self.0.header.name, slot = slot))]
    pub fn read_sample_as(
        &self,
        selector: impl Into<SampleSelector>,
        as_pod: PlainOldDataType,
        slot: usize,
    ) -> Result<Sample> {
        let stored = self.0.stored_index(selector.into())?;
        let data = self.0.group.data(stored, slot)?;
        read_scalar_sample(&data, slot, self.0.data_type, as_pod)
    }

    /// Key of a sample's data block.
    pub fn sample_key(&self, selector: impl Into<SampleSelector>, slot: usize) -> Result<Option<[u8; DATA_KEY_SIZE]>> {
        let stored = self.0.stored_index(selector.into())?;
        read_sample_key(&self.0.group.data(stored, slot)?, slot)
    }
}

/// A property with an array of values per sample.
pub struct ArrayPropertyReader<G: BlockGroup>(Sampled<G>);

impl<G: BlockGroup> ArrayPropertyReader<G> {
    sampled_accessors!();

    pub fn is_homogeneous(&self) -> bool {
        self.0.header.is_homogeneous
    }

    fn blocks(&self, selector: SampleSelector, slot: usize) -> Result<(G::Data, G::Data)> {
        let stored = self.0.stored_index(selector)?;
        let data = self.0.group.data(2 * stored, slot)?;
        let dims = self.0.group.data(2 * stored + 1, slot)?;
        Ok((dims, data))
    }

    /// Read a sample converted to `as_pod`.
    #[tracing::instrument(level = "trace", skip_all, fields(property = %self.0.header.name, slot = slot))]
    pub fn read_sample_as(
        &self,
        selector: impl Into<SampleSelector>,
        as_pod: PlainOldDataType,
        slot: usize,
    ) -> Result<Sample> {
        let (dims, data) = self.blocks(selector.into(), slot)?;
        read_array_sample(&dims, &data, slot, self.0.data_type, as_pod)
    }

    /// Dimensions of a sample without reading its values (except for string
    /// kinds, which are counted).
    pub fn read_dimensions(&self, selector: impl Into<SampleSelector>, slot: usize) -> Result<Dimensions> {
        let (dims, data) = self.blocks(selector.into(), slot)?;
        read_dimensions(&dims, &data, slot, self.0.data_type)
    }

    /// Key of a sample's data block.
    pub fn sample_key(&self, selector: impl Into<SampleSelector>, slot: usize) -> Result<Option<[u8; DATA_KEY_SIZE]>> {
        let (_, data) = self.blocks(selector.into(), slot)?;
        read_sample_key(&data, slot)
    }
}
