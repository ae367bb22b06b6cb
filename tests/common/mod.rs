//! Byte-level builders for Ogawa archives used by the integration tests.
#![allow(dead_code)]

use std::io::Write;

use abc_decode::ogawa::{
    MemGroup, EXTENT_SHIFT, FROZEN_FLAG, HAS_TSIDX_MASK, HOMOGENEOUS_MASK, NEEDS_FIRST_LAST_MASK,
    OGAWA_MAGIC, POD_SHIFT, TYPE_FLAG_MASK,
};
use abc_decode::PlainOldDataType;

/// Storage tree node.
#[derive(Clone, Debug)]
pub enum Node {
    Group(Vec<Node>),
    Data(Vec<u8>),
}

impl Node {
    pub fn to_mem(&self) -> MemGroup {
        let mut group = MemGroup::new();
        if let Node::Group(children) = self {
            for child in children {
                match child {
                    Node::Group(_) => group.push_group(child.to_mem()),
                    Node::Data(bytes) => group.push_data(bytes.clone()),
                };
            }
        }
        group
    }

    /// Serialize as an Ogawa file with this node as root group.
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(OGAWA_MAGIC);
        out.push(FROZEN_FLAG);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        let root = write_node(self, &mut out);
        out[8..16].copy_from_slice(&root.to_le_bytes());
        out
    }

    pub fn to_temp_file(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&self.to_file_bytes()).expect("write archive");
        file.flush().expect("flush archive");
        file
    }
}

fn write_node(node: &Node, out: &mut Vec<u8>) -> u64 {
    match node {
        Node::Data(bytes) if bytes.is_empty() => TYPE_FLAG_MASK,
        Node::Data(bytes) => {
            let pos = out.len() as u64;
            out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            out.extend_from_slice(bytes);
            pos | TYPE_FLAG_MASK
        }
        Node::Group(children) if children.is_empty() => 0,
        Node::Group(children) => {
            let offsets: Vec<u64> = children.iter().map(|c| write_node(c, out)).collect();
            let pos = out.len() as u64;
            out.extend_from_slice(&(offsets.len() as u64).to_le_bytes());
            for offset in offsets {
                out.extend_from_slice(&offset.to_le_bytes());
            }
            pos
        }
    }
}

pub fn data(bytes: impl Into<Vec<u8>>) -> Node {
    Node::Data(bytes.into())
}

pub fn empty() -> Node {
    Node::Data(Vec::new())
}

/// Sample block: 16 key bytes then the payload.
pub fn keyed(key: u8, payload: &[u8]) -> Node {
    let mut bytes = vec![key; 16];
    bytes.extend_from_slice(payload);
    Node::Data(bytes)
}

pub fn f32s(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn i32s(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn u32s(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn push_sized(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Object header records.
pub fn object_headers(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, meta) in entries {
        push_sized(&mut out, name.as_bytes());
        push_sized(&mut out, meta.as_bytes());
    }
    out
}

/// Sampled property header record description.
pub struct Prop<'a> {
    pub name: &'a str,
    pub kind: u32,
    pub pod: PlainOldDataType,
    pub extent: u8,
    pub next: u32,
    pub first_last: Option<(u32, u32)>,
    pub time_sampling: Option<u32>,
    pub homogeneous: bool,
    pub meta: &'a str,
}

impl<'a> Prop<'a> {
    pub fn scalar(name: &'a str, pod: PlainOldDataType, extent: u8, next: u32) -> Self {
        Self {
            name,
            kind: 1,
            pod,
            extent,
            next,
            first_last: None,
            time_sampling: None,
            homogeneous: true,
            meta: "",
        }
    }

    pub fn array(name: &'a str, pod: PlainOldDataType, extent: u8, next: u32) -> Self {
        Self { kind: 2, homogeneous: false, ..Self::scalar(name, pod, extent, next) }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut info = self.kind | ((self.pod as u32) << POD_SHIFT) | ((self.extent as u32) << EXTENT_SHIFT);
        if self.time_sampling.is_some() {
            info |= HAS_TSIDX_MASK;
        }
        if self.first_last.is_some() {
            info |= NEEDS_FIRST_LAST_MASK;
        }
        if self.homogeneous {
            info |= HOMOGENEOUS_MASK;
        }
        out.extend_from_slice(&info.to_le_bytes());
        out.extend_from_slice(&self.next.to_le_bytes());
        if let Some((first, last)) = self.first_last {
            out.extend_from_slice(&first.to_le_bytes());
            out.extend_from_slice(&last.to_le_bytes());
        }
        if let Some(ts) = self.time_sampling {
            out.extend_from_slice(&ts.to_le_bytes());
        }
        push_sized(out, self.name.as_bytes());
        push_sized(out, self.meta.as_bytes());
    }
}

pub fn compound_header(out: &mut Vec<u8>, name: &str, meta: &str) {
    out.extend_from_slice(&0u32.to_le_bytes());
    push_sized(out, name.as_bytes());
    push_sized(out, meta.as_bytes());
}

/// Time sampling record.
pub fn time_sampling(out: &mut Vec<u8>, max_sample: u32, time_per_cycle: f64, times: &[f64]) {
    out.extend_from_slice(&max_sample.to_le_bytes());
    out.extend_from_slice(&time_per_cycle.to_le_bytes());
    out.extend_from_slice(&(times.len() as u32).to_le_bytes());
    for t in times {
        out.extend_from_slice(&t.to_le_bytes());
    }
}

/// Root group around a top object.
pub fn archive(top: Node, meta: &str, samplings: Vec<u8>) -> Node {
    Node::Group(vec![
        data(0i32.to_le_bytes().to_vec()),
        data(10709i32.to_le_bytes().to_vec()),
        top,
        data(meta.as_bytes().to_vec()),
        data(samplings),
    ])
}

/// Archive used across the integration tests.
///
/// ```text
/// /xform            schema=AbcGeom_Xform_v3
///   .xform.ops      scalar uint8 x4, constant
/// /xform/mesh       schema=AbcGeom_PolyMesh_v1
///   .geom {}
///     P             array float32 x3, 3 samples on sampling 1
///     .faceCounts   array int32, 2 samples, all stored
///     .names        array string, 1 sample
///   visible         scalar int8, 4 samples, changes at 1..=2
/// ```
pub fn scene() -> Node {
    let mut samplings = Vec::new();
    time_sampling(&mut samplings, 4, 1.0, &[0.0]);
    time_sampling(&mut samplings, 3, 1.0 / 24.0, &[1.0 / 24.0]);

    // mesh .geom compound
    let mut geom_headers = Vec::new();
    Prop { time_sampling: Some(1), meta: "interpretation=point", ..Prop::array("P", PlainOldDataType::Float32, 3, 3) }
        .encode(&mut geom_headers);
    Prop::array(".faceCounts", PlainOldDataType::Int32, 1, 2).encode(&mut geom_headers);
    Prop::array(".names", PlainOldDataType::String, 1, 1).encode(&mut geom_headers);

    let p = Node::Group(vec![
        keyed(1, &f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0])),
        empty(),
        keyed(2, &f32s(&[0.0, 1.0, 0.0, 1.0, 1.0, 0.0])),
        empty(),
        keyed(3, &f32s(&[0.0, 2.0, 0.0, 1.0, 2.0, 0.0, 0.5, 3.0, 0.0])),
        data(u32s(&[3])),
    ]);
    let face_counts = Node::Group(vec![
        keyed(4, &i32s(&[3, 4, 300])),
        empty(),
        keyed(5, &i32s(&[-1])),
        empty(),
    ]);
    let names = Node::Group(vec![keyed(6, b"left\0right\0"), empty()]);
    let geom = Node::Group(vec![p, face_counts, names, data(geom_headers)]);

    let mut mesh_props = Vec::new();
    compound_header(&mut mesh_props, ".geom", "schema=AbcGeom_PolyMesh_v1");
    Prop { first_last: Some((1, 2)), ..Prop::scalar("visible", PlainOldDataType::Int8, 1, 4) }
        .encode(&mut mesh_props);
    let visible = Node::Group(vec![
        keyed(7, &[1]),
        keyed(8, &[0]),
        keyed(9, &[0xff]),
    ]);
    let mesh = Node::Group(vec![Node::Group(vec![geom, visible, data(mesh_props)]), data(Vec::new())]);

    let mut xform_props = Vec::new();
    Prop { first_last: Some((0, 0)), ..Prop::scalar(".xform.ops", PlainOldDataType::Uint8, 4, 5) }
        .encode(&mut xform_props);
    let ops = Node::Group(vec![keyed(10, &[1, 2, 3, 4])]);
    let xform = Node::Group(vec![
        Node::Group(vec![ops, data(xform_props)]),
        mesh,
        data(object_headers(&[("mesh", "schema=AbcGeom_PolyMesh_v1")])),
    ]);

    let top = Node::Group(vec![
        empty_props(),
        xform,
        data(object_headers(&[("xform", "schema=AbcGeom_Xform_v3")])),
    ]);
    archive(top, "_ai_Application=abc-decode tests", samplings)
}

fn empty_props() -> Node {
    Node::Group(Vec::new())
}
