//! Vertex data in `.vvd` files.
//!
//! Vertices for all models and meshes are stored in a single buffer.
//! The [Mdl](crate::mdl::Mdl) models and meshes select ranges of this buffer.
//! Unlike the other formats, all offsets are relative to the start of the file.
//!
//! # File Paths
//! | Game | Versions | File Patterns |
//! | --- | --- | --- |
//! | Half-Life 2 | 4 | `models/**/*.vvd` |
//! | Team Fortress 2 | 4 | `models/**/*.vvd` |
//! | Portal 2 | 4 | `models/**/*.vvd` |
use binrw::{binread, BinRead, BinResult};

use crate::{error::LayoutError, parse_count32_offset32, parse_vec, RelativeOffset};

/// The size in bytes of each vertex record.
pub const VERTEX_SIZE: usize = 48;

/// The maximum number of bone influences for each vertex.
pub const MAX_BONES_PER_VERTEX: usize = 3;

/// `vertexFileHeader_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(magic(b"IDSV"))]
pub struct Vvd {
    // The magic is part of the header record.
    #[br(temp, try_calc = r.stream_position().map(|p| p - 4))]
    base_offset: u64,

    #[br(assert(version == 4, LayoutError::version("version", 4, version)))]
    pub version: i32,

    /// Matches the checksum of the [Mdl](crate::mdl::Mdl) and [Vtx](crate::vtx::Vtx).
    pub checksum: i32,

    pub lod_count: i32,
    pub lod_vertex_counts: [i32; 8],

    /// Ranges of [vertices](#structfield.vertices) used for each level of detail.
    ///
    /// The fixups are not applied to the vertices.
    /// Files without fixups use the same vertices for all levels of detail.
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub fixups: Vec<Fixup>,

    #[br(temp)]
    vertex_offset: i32,

    #[br(temp)]
    tangent_offset: i32,

    #[br(parse_with = parse_vertices, args(base_offset, vertex_offset, tangent_offset))]
    pub vertices: Vec<Vertex>,
}

/// `vertexFileFixup_t`
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct Fixup {
    /// The highest level of detail using this range.
    pub lod: i32,
    /// The index of the first vertex in [Vvd::vertices].
    pub source_vertex_id: i32,
    pub vertex_count: i32,
}

/// A single vertex combined with its tangent.
#[derive(Debug, PartialEq, Clone)]
pub struct Vertex {
    /// Up to [MAX_BONES_PER_VERTEX] bone influences.
    pub bone_weights: Vec<BoneWeight>,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// The tangent with the bitangent sign in W.
    pub tangent: [f32; 4],
}

/// The weight of a single bone influence.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BoneWeight {
    pub weight: f32,
    /// Index into [Mdl::bones](crate::mdl::Mdl::bones).
    pub bone: u8,
}

/// `mstudiovertex_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
struct VertexRecord {
    // The bone arrays always have 3 elements.
    #[br(temp)]
    weights: [f32; 3],

    #[br(temp)]
    bones: [u8; 3],

    #[br(temp)]
    #[br(assert(
        bone_count as usize <= MAX_BONES_PER_VERTEX,
        LayoutError::inconsistent("bone count", format!("{bone_count} exceeds {MAX_BONES_PER_VERTEX}"))
    ))]
    bone_count: u8,

    #[br(calc = weights
        .iter()
        .zip(bones)
        .take(bone_count as usize)
        .map(|(weight, bone)| BoneWeight { weight: *weight, bone })
        .collect())]
    bone_weights: Vec<BoneWeight>,

    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

fn parse_vertices<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    (base_offset, vertex_offset, tangent_offset): (u64, i32, i32),
) -> BinResult<Vec<Vertex>> {
    let pos = reader.stream_position()?;

    // The vertex count is only implied by the tangent data following the vertex data.
    // Check the layout before reading anything.
    let count = vertex_count(vertex_offset, tangent_offset).map_err(|e| e.at(pos))?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let vertex_start = RelativeOffset::new(base_offset, vertex_offset).position(reader)?;
    let tangent_start = RelativeOffset::new(base_offset, tangent_offset).position(reader)?;
    crate::check_remaining(reader, tangent_start, count as u64 * 16)?;

    let vertices: Vec<VertexRecord> = parse_vec(reader, endian, (), vertex_start, count)?;
    let tangents: Vec<[f32; 4]> = parse_vec(reader, endian, (), tangent_start, count)?;

    Ok(vertices
        .into_iter()
        .zip(tangents)
        .map(|(v, tangent)| Vertex {
            bone_weights: v.bone_weights,
            position: v.position,
            normal: v.normal,
            uv: v.uv,
            tangent,
        })
        .collect())
}

fn vertex_count(vertex_offset: i32, tangent_offset: i32) -> Result<usize, LayoutError> {
    let size = tangent_offset as i64 - vertex_offset as i64;
    if size < 0 || size as usize % VERTEX_SIZE != 0 {
        return Err(LayoutError::inconsistent(
            "vertex data size",
            format!(
                "tangent offset {tangent_offset} minus vertex offset {vertex_offset} is not a multiple of {VERTEX_SIZE}"
            ),
        ));
    }
    Ok(size as usize / VERTEX_SIZE)
}

impl Vvd {
    /// The vertices for `model` starting at [Model::first_vertex](crate::mdl::Model::first_vertex).
    ///
    /// Returns `None` if the range is out of bounds.
    pub fn model_vertices(&self, model: &crate::mdl::Model) -> Option<&[Vertex]> {
        let start = model.first_vertex();
        let count = usize::try_from(model.vertex_count).ok()?;
        self.vertices.get(start..start.checked_add(count)?)
    }
}
