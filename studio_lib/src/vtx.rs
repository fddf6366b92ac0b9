//! Optimized triangle strips in `.vtx` files.
//!
//! The hierarchy mirrors the body parts, models, and meshes in the [Mdl](crate::mdl::Mdl)
//! with additional levels of detail and strip groups for each mesh.
//! Vertices reference the mesh vertices in the [Vvd](crate::vvd::Vvd).
//!
//! # File Paths
//! | Game | Versions | File Patterns |
//! | --- | --- | --- |
//! | Half-Life 2 | 7 | `models/**/*.dx90.vtx`, `models/**/*.dx80.vtx`, `models/**/*.sw.vtx` |
//! | Portal 2 | 7 | `models/**/*.dx90.vtx` |
//! | Counter-Strike: Global Offensive | 7 | `models/**/*.dx90.vtx` |
//!
//! Offsets are relative to the start of the record containing the offset.
use std::{
    io::{Cursor, Read, Seek},
    path::Path,
};

use bilge::prelude::*;
use binrw::{binread, BinRead, BinReaderExt};

use crate::{
    error::{DecodeError, Format, LayoutError, ReadFileError},
    parse_count32_offset32, parse_offset32_count, parse_string_ptr32,
};

/// `FileHeader_t`
///
/// Files for models with [Mdl::version](crate::mdl::Mdl::version) 49 or higher
/// add topology data to strip groups and strips.
/// The file does not indicate which layout is used,
/// so use [Vtx::read_with_topology] for these files.
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct Vtx {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(assert(version == 7, LayoutError::version("version", 7, version)))]
    pub version: i32,

    pub vertex_cache_size: i32,
    pub max_bones_per_strip: u16,
    pub max_bones_per_triangle: u16,
    pub max_bones_per_vertex: i32,

    /// Matches the checksum of the [Mdl](crate::mdl::Mdl) and [Vvd](crate::vvd::Vvd).
    pub checksum: i32,

    #[br(temp)]
    lod_count: i32,

    /// Material replacements for each level of detail.
    #[br(parse_with = parse_offset32_count, args(base_offset, lod_count))]
    pub material_replacements: Vec<MaterialReplacementList>,

    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub body_parts: Vec<BodyPart>,
}

/// `MaterialReplacementListHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct MaterialReplacementList {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub replacements: Vec<MaterialReplacement>,
}

/// `MaterialReplacementHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct MaterialReplacement {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// Index into [Mdl::textures](crate::mdl::Mdl::textures).
    pub material_id: i16,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,
}

/// `BodyPartHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct BodyPart {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub models: Vec<Model>,
}

/// `ModelHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct Model {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// Levels of detail from highest to lowest quality.
    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub lods: Vec<ModelLod>,
}

/// `ModelLODHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct ModelLod {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// The meshes in the same order as the [Mdl](crate::mdl::Mdl) meshes for this model.
    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub meshes: Vec<Mesh>,

    /// The distance to switch to this level of detail.
    pub switch_point: f32,
}

/// `MeshHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct Mesh {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub strip_groups: Vec<StripGroup>,

    pub flags: MeshFlags,
}

#[bitsize(8)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u8::into)]
pub struct MeshFlags {
    pub is_teeth: bool,
    pub is_eyes: bool,
    pub unk: u6,
}

/// `StripGroupHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct StripGroup {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub vertices: Vec<Vertex>,

    #[br(temp, parse_with = parse_count32_offset32, offset = base_offset)]
    raw_indices: Vec<u16>,

    /// Triangle indices into [vertices](#structfield.vertices).
    #[br(calc = raw_indices.iter().copied().map(i32::from).collect())]
    pub indices: Vec<i32>,

    #[br(parse_with = parse_count32_offset32)]
    #[br(args { offset: base_offset, inner: has_topology })]
    pub strips: Vec<Strip>,

    pub flags: StripGroupFlags,

    /// Present only for files using the topology layout.
    #[br(if(has_topology))]
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub topology: Vec<u16>,
}

#[bitsize(8)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u8::into)]
pub struct StripGroupFlags {
    pub is_flexed: bool,
    pub is_hardware_skinned: bool,
    pub is_delta_flexed: bool,
    pub suppress_hardware_morph: bool,
    pub unk: u4,
}

/// `Vertex_t`
#[binread]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Vertex {
    // The bone arrays always have 3 elements.
    #[br(temp)]
    bone_weight_indices: [u8; 3],

    #[br(temp)]
    #[br(assert(
        bone_count <= 3,
        LayoutError::inconsistent("bone count", format!("{bone_count} exceeds 3"))
    ))]
    bone_count: u8,

    /// Index into the vertices of the corresponding [Mdl](crate::mdl::Mdl) mesh.
    pub original_mesh_vertex_index: u16,

    #[br(temp)]
    bone_ids: [u8; 3],

    /// The used bone slots from the stored bone count.
    #[br(calc = bone_weight_indices
        .iter()
        .zip(bone_ids)
        .take(bone_count as usize)
        .map(|(weight_index, bone_id)| VertexBone { weight_index: *weight_index, bone_id })
        .collect())]
    pub bones: Vec<VertexBone>,
}

/// A bone influence for a [Vertex].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VertexBone {
    /// Index into the [Vvd](crate::vvd::Vvd) vertex bone weights.
    pub weight_index: u8,
    /// The hardware bone index set by the [Strip::bone_state_changes].
    pub bone_id: u8,
}

/// `StripHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(import_raw(has_topology: bool))]
pub struct Strip {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    pub index_count: i32,
    /// The first index in [StripGroup::indices].
    pub index_offset: i32,

    pub vertex_count: i32,
    /// The first vertex in [StripGroup::vertices].
    pub vertex_offset: i32,

    pub bone_count: i16,
    pub flags: StripFlags,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub bone_state_changes: Vec<BoneStateChange>,

    #[br(if(has_topology))]
    pub topology_index_count: i32,

    #[br(if(has_topology))]
    pub topology_index_offset: i32,
}

#[bitsize(8)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u8::into)]
pub struct StripFlags {
    pub is_triangle_list: bool,
    pub is_triangle_strip: bool,
    pub unk: u6,
}

/// `BoneStateChangeHeader_t`
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct BoneStateChange {
    /// The hardware bone slot referenced by [VertexBone::bone_id].
    pub hardware_id: i32,
    /// Index into [Mdl::bones](crate::mdl::Mdl::bones).
    pub new_bone_id: i32,
}

impl Vtx {
    /// Read a file using the original layout without topology data.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, DecodeError> {
        Self::read_with_topology(reader, false)
    }

    /// Read a file using the layout with topology data if `has_topology` is `true`.
    pub fn read_with_topology<R: Read + Seek>(
        reader: &mut R,
        has_topology: bool,
    ) -> Result<Self, DecodeError> {
        reader
            .read_le_args(has_topology)
            .map_err(|e| crate::decode_error(reader, Format::Vtx, e))
    }

    /// Read a file using the layout for the [Mdl::version](crate::mdl::Mdl::version).
    pub fn read_for_mdl_version<R: Read + Seek>(
        reader: &mut R,
        mdl_version: i32,
    ) -> Result<Self, DecodeError> {
        Self::read_with_topology(reader, mdl_version >= 49)
    }

    /// Read from `path` using a fully buffered reader for performance.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReadFileError> {
        let path = path.as_ref();
        std::fs::read(path)
            .map_err(|source| DecodeError::Io {
                format: Format::Vtx,
                source,
            })
            .and_then(Self::from_bytes)
            .map_err(|source| ReadFileError {
                path: path.to_owned(),
                source,
            })
    }

    /// Read from `bytes` using a fully buffered reader for performance.
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, DecodeError> {
        Self::read(&mut Cursor::new(bytes))
    }
}

impl Strip {
    /// Triangle vertex indices into [StripGroup::vertices] for this strip.
    ///
    /// Triangle strips are converted to lists with consistent winding.
    /// Returns `None` if the index range is out of bounds.
    pub fn triangle_list(&self, strip_group: &StripGroup) -> Option<Vec<i32>> {
        let start = usize::try_from(self.index_offset).ok()?;
        let count = usize::try_from(self.index_count).ok()?;
        let indices = strip_group.indices.get(start..start.checked_add(count)?)?;

        if self.flags.is_triangle_strip() {
            Some(
                indices
                    .windows(3)
                    .enumerate()
                    .filter(|(_, w)| w[0] != w[1] && w[1] != w[2] && w[0] != w[2])
                    .flat_map(|(i, w)| {
                        if i % 2 == 0 {
                            [w[0], w[1], w[2]]
                        } else {
                            [w[1], w[0], w[2]]
                        }
                    })
                    .collect(),
            )
        } else {
            Some(indices.to_vec())
        }
    }
}
