//! Studio model headers in `.mdl` files.
//!
//! The `.mdl` contains the skeleton, materials, and mesh hierarchy for a model.
//! Vertex data is stored separately in the [Vvd](crate::vvd::Vvd)
//! and the triangle strips in the [Vtx](crate::vtx::Vtx).
//!
//! # File Paths
//! | Game | Versions | File Patterns |
//! | --- | --- | --- |
//! | Half-Life 2 | 44 | `models/**/*.mdl` |
//! | Team Fortress 2 | 44, 48 | `models/**/*.mdl` |
//! | Portal 2 | 48, 49 | `models/**/*.mdl` |
//! | Counter-Strike: Global Offensive | 48, 49 | `models/**/*.mdl` |
//!
//! Offsets are relative to the start of the record containing the offset
//! unless documented otherwise.
use binrw::{binread, BinRead, BinResult};

use crate::{
    error::LayoutError, fixed_string, parse_count32_offset32, parse_offset32_count,
    parse_opt_ptr32, parse_string_opt_ptr32, parse_string_ptr32, parse_string_table, parse_table,
    read_string_at, RelativeOffset,
};

/// The studio header `studiohdr_t` at the start of the file.
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
#[br(magic(b"IDST"))]
pub struct Mdl {
    // The magic is part of the header record.
    #[br(temp, try_calc = r.stream_position().map(|p| p - 4))]
    base_offset: u64,

    /// The studiomdl version in the range 44 to 49.
    #[br(assert((44..=49).contains(&version), LayoutError::version("version", "44 to 49", version)))]
    pub version: i32,

    /// Matches the checksum of the [Vvd](crate::vvd::Vvd) and [Vtx](crate::vtx::Vtx).
    pub checksum: i32,

    #[br(map = |bytes: [u8; 64]| fixed_string(bytes))]
    pub name: String,

    /// The size of the file in bytes.
    pub length: i32,

    pub eye_position: [f32; 3],
    pub illumination_position: [f32; 3],
    pub hull: BoundingBox,
    pub view_bounds: BoundingBox,

    pub flags: u32,

    /// Bones with parents before children.
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    #[br(assert(
        parents_precede_children(&bones),
        LayoutError::inconsistent("bone parent", "parent index does not precede the bone")
    ))]
    pub bones: Vec<Bone>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub bone_controllers: Vec<BoneController>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub hitbox_sets: Vec<HitboxSet>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub local_animations: Vec<LocalAnimation>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub local_sequences: Vec<LocalSequence>,

    pub activity_list_version: i32,
    pub events_indexed: i32,

    /// Material names referenced by [Mesh::material_index].
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub textures: Vec<Texture>,

    /// Folders searched for the [textures](#structfield.textures).
    /// Each string offset is relative to the start of the file.
    #[br(parse_with = parse_string_table, offset = base_offset)]
    pub texture_paths: Vec<String>,

    #[br(temp)]
    skin_reference_count: i32,

    #[br(temp)]
    skin_family_count: i32,

    /// Indices into [textures](#structfield.textures) for each skin family.
    /// The first family is the default skin.
    #[br(parse_with = parse_skin_families)]
    #[br(args(base_offset, skin_reference_count, skin_family_count))]
    pub skin_families: Vec<Vec<i16>>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub body_parts: Vec<BodyPart>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub attachments: Vec<Attachment>,

    #[br(temp)]
    node_count: i32,

    #[br(parse_with = parse_nodes, args(base_offset, node_count))]
    pub nodes: Vec<Node>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub flex_descs: Vec<FlexDesc>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub flex_controllers: Vec<FlexController>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub flex_rules: Vec<FlexRule>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub ik_chains: Vec<IkChain>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub mouths: Vec<Mouth>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub pose_parameters: Vec<PoseParameter>,

    #[br(parse_with = parse_string_opt_ptr32, offset = base_offset)]
    pub surface_prop: Option<String>,

    /// KeyValues text for game specific model settings.
    #[br(parse_with = parse_string_opt_ptr32, offset = base_offset)]
    #[br(pad_after = 4)]
    pub key_values: Option<String>,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub ik_locks: Vec<IkLock>,

    pub mass: f32,
    pub contents: u32,

    /// Other models to load animations from.
    // The virtual model is a runtime pointer.
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    #[br(pad_after = 4)]
    pub include_models: Vec<IncludeModel>,

    #[br(parse_with = parse_string_opt_ptr32, offset = base_offset)]
    pub anim_block_name: Option<String>,

    // The anim block model is a runtime pointer.
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    #[br(pad_after = 4)]
    pub anim_blocks: Vec<AnimBlock>,

    /// Bone indices sorted by bone name.
    #[br(parse_with = parse_bone_table, args(base_offset, bones.len()))]
    #[br(pad_after = 8)]
    pub bone_table_by_name: Vec<u8>,

    pub const_directional_light_dot: u8,
    pub root_lod: u8,
    #[br(pad_after = 5)]
    pub allowed_root_lod_count: u8,

    // TODO: Decode the flex controller UI count and offset.
    #[br(pad_before = 8, pad_after = 4)]
    pub vertex_animation_fixed_point_scale: f32,

    #[br(parse_with = parse_opt_ptr32, offset = base_offset)]
    #[br(pad_after = 4)]
    pub header2: Option<Header2>,
}

/// An axis-aligned bounding box.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// `mstudiobone_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Bone {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    /// The index of the parent bone or `-1` for root bones.
    pub parent_index: i32,

    /// Indices into [Mdl::bone_controllers] for each component or `-1`.
    pub bone_controller_indices: [i32; 6],

    pub position: [f32; 3],
    /// Rotation quaternion in XYZW order.
    pub rotation: [f32; 4],
    /// Rotation as euler angles in radians.
    pub euler_rotation: [f32; 3],
    pub position_scale: [f32; 3],
    pub rotation_scale: [f32; 3],

    /// The inverse bind matrix as rows of a 3x4 matrix.
    pub pose_to_bone: [[f32; 4]; 3],
    pub alignment: [f32; 4],
    pub flags: u32,

    /// The procedural rule type or 0 for no rule.
    #[br(pad_after = 4)]
    pub procedural_type: i32,

    pub physics_bone: i32,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub surface_prop: String,

    // unused[8]
    #[br(pad_after = 32)]
    pub contents: u32,
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent_index < 0
    }
}

fn parents_precede_children(bones: &[Bone]) -> bool {
    bones
        .iter()
        .enumerate()
        .all(|(i, b)| b.parent_index == -1 || (b.parent_index >= 0 && (b.parent_index as usize) < i))
}

/// `mstudiobonecontroller_t`
#[derive(Debug, BinRead, PartialEq, Clone)]
pub struct BoneController {
    pub bone: i32,
    /// Bit flags for the controlled translation or rotation axes.
    pub kind: i32,
    pub start: f32,
    pub end: f32,
    pub rest: i32,
    // unused[8]
    #[br(pad_after = 32)]
    pub input_field: i32,
}

/// `mstudiohitboxset_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct HitboxSet {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub hitboxes: Vec<Hitbox>,
}

/// `mstudiobbox_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Hitbox {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    pub bone: i32,
    pub group: i32,
    pub bounds: BoundingBox,

    /// The hitbox name or an empty string for unnamed hitboxes.
    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    #[br(pad_after = 32)]
    pub name: String,
}

/// `mstudioanimdesc_t`
///
/// Animations are not decoded.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct LocalAnimation;

/// `mstudioseqdesc_t`
///
/// Sequences are not decoded.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct LocalSequence;

/// `mstudiotexture_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Texture {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// The material name relative to one of the [Mdl::texture_paths].
    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    // The remaining fields are only used at runtime.
    #[br(pad_after = 56)]
    pub flags: u32,
}

fn parse_skin_families<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    (base_offset, reference_count, family_count): (u64, i32, i32),
) -> BinResult<Vec<Vec<i16>>> {
    let pos = reader.stream_position()?;
    let delta = i32::read_options(reader, endian, ())?;

    if reference_count < 0 || family_count < 0 {
        return Err(LayoutError::inconsistent(
            "skin count",
            format!("{family_count} families with {reference_count} references"),
        )
        .at(pos));
    }

    let count = i32::try_from(reference_count as i64 * family_count as i64).map_err(|_| {
        LayoutError::inconsistent(
            "skin count",
            format!("{family_count} families with {reference_count} references"),
        )
        .at(pos)
    })?;

    let indices: Vec<i16> = parse_table(
        reader,
        endian,
        (),
        RelativeOffset::new(base_offset, delta),
        count,
    )?;

    Ok(indices
        .chunks(reference_count.max(1) as usize)
        .map(|c| c.to_vec())
        .collect())
}

/// `mstudiobodyparts_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct BodyPart {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    #[br(temp)]
    model_count: i32,

    /// The multiplier used to combine model choices across body parts.
    pub base: i32,

    /// Alternative models for this body part.
    #[br(parse_with = parse_offset32_count, args(base_offset, model_count))]
    pub models: Vec<Model>,
}

/// `mstudiomodel_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Model {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(map = |bytes: [u8; 64]| fixed_string(bytes))]
    pub name: String,

    pub kind: i32,
    pub bounding_radius: f32,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub meshes: Vec<Mesh>,

    /// The number of vertices in the [Vvd](crate::vvd::Vvd) used by this model.
    pub vertex_count: i32,
    /// The byte offset of the first vertex in the [Vvd](crate::vvd::Vvd) vertex data.
    pub vertex_index: i32,
    /// The byte offset of the first tangent in the [Vvd](crate::vvd::Vvd) tangent data.
    // Model attachments are unused.
    #[br(pad_after = 8)]
    pub tangent_index: i32,

    // Vertex data pointers and unused[8].
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    #[br(pad_after = 40)]
    pub eyeballs: Vec<Eyeball>,
}

impl Model {
    /// The index of the first [Vvd](crate::vvd::Vvd) vertex used by this model.
    pub fn first_vertex(&self) -> usize {
        self.vertex_index.max(0) as usize / crate::vvd::VERTEX_SIZE
    }
}

/// `mstudioeyeball_t`
///
/// Eyeballs are not decoded.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct Eyeball;

/// `mstudiomesh_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Mesh {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// Index into the skin family table or [Mdl::textures] for the default skin.
    pub material_index: i32,

    // Offset back to the parent model.
    #[br(temp)]
    model_offset: i32,

    pub vertex_count: i32,
    /// The index of the first vertex relative to [Model::first_vertex].
    pub vertex_offset: i32,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub flexes: Vec<Flex>,

    pub material_type: i32,
    pub material_param: i32,
    pub id: i32,
    pub center: [f32; 3],

    /// The vertex count for each level of detail.
    // The vertex data pointer is only used at runtime.
    #[br(pad_before = 4, pad_after = 32)]
    pub lod_vertex_counts: [i32; 8],
}

/// `mstudioflex_t`
///
/// Flexes are not decoded.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct Flex;

/// `mstudioattachment_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Attachment {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    pub flags: u32,
    pub bone: i32,

    /// The transform relative to [bone](#structfield.bone) as rows of a 3x4 matrix.
    #[br(pad_after = 32)]
    pub transform: [[f32; 4]; 3],
}

/// A named node used for sequence transitions.
#[derive(Debug, PartialEq, Clone)]
pub struct Node {
    pub name: String,
    /// The transition node index for each destination node.
    pub transitions: Vec<u8>,
}

fn parse_nodes<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    (base_offset, count): (u64, i32),
) -> BinResult<Vec<Node>> {
    let pos = reader.stream_position()?;
    let transition_delta = i32::read_options(reader, endian, ())?;
    let name_delta = i32::read_options(reader, endian, ())?;

    let transition_count = i32::try_from(count as i64 * count as i64).map_err(|_| {
        LayoutError::inconsistent("node count", format!("{count} nodes")).at(pos)
    })?;

    let transitions: Vec<u8> = parse_table(
        reader,
        endian,
        (),
        RelativeOffset::new(base_offset, transition_delta),
        transition_count,
    )?;

    // Node names are offsets relative to the start of the file.
    let name_offsets: Vec<i32> = parse_table(
        reader,
        endian,
        (),
        RelativeOffset::new(base_offset, name_delta),
        count,
    )?;

    name_offsets
        .into_iter()
        .zip(transitions.chunks(count.max(1) as usize))
        .map(|(name_delta, transitions)| {
            let pos = RelativeOffset::new(base_offset, name_delta).position(reader)?;
            Ok(Node {
                name: read_string_at(reader, pos)?,
                transitions: transitions.to_vec(),
            })
        })
        .collect()
}

/// `mstudioflexdesc_t`
///
/// Flex descriptors are not decoded.
#[derive(Debug, BinRead, PartialEq, Clone, Copy)]
pub struct FlexDesc;

/// `mstudioflexcontroller_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct FlexController {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub kind: String,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    pub local_to_global: i32,
    pub min: f32,
    pub max: f32,
}

/// `mstudioflexrule_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct FlexRule {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    /// Index into [Mdl::flex_descs].
    pub flex: i32,

    /// Instructions for a stack machine computing the flex weight.
    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub ops: Vec<FlexOp>,
}

/// `mstudioflexop_t`
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct FlexOp {
    pub op: i32,
    /// An index or `f32` depending on the [op](#structfield.op).
    pub value: u32,
}

impl FlexOp {
    /// Interpret the value as a float for constant operations.
    pub fn value_f32(&self) -> f32 {
        f32::from_bits(self.value)
    }
}

/// `mstudioikchain_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct IkChain {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    pub link_type: i32,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub links: Vec<IkLink>,
}

/// `mstudioiklink_t`
#[derive(Debug, BinRead, PartialEq, Clone)]
pub struct IkLink {
    pub bone: i32,
    #[br(pad_after = 12)]
    pub knee_direction: [f32; 3],
}

/// `mstudioiklock_t`
#[derive(Debug, BinRead, PartialEq, Clone)]
pub struct IkLock {
    pub chain: i32,
    pub position_weight: f32,
    pub local_rotation_weight: f32,
    #[br(pad_after = 16)]
    pub flags: u32,
}

/// `mstudiomouth_t`
#[derive(Debug, BinRead, PartialEq, Clone)]
pub struct Mouth {
    pub bone: i32,
    pub forward: [f32; 3],
    pub flex_desc: i32,
}

/// `mstudioposeparamdesc_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct PoseParameter {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    pub flags: u32,
    pub start: f32,
    pub end: f32,
    pub loop_range: f32,
}

/// `mstudiomodelgroup_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct IncludeModel {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub label: String,

    /// The path of the `.mdl` containing the animations.
    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub file_name: String,
}

/// `mstudioanimblock_t`
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct AnimBlock {
    pub data_start: i32,
    pub data_end: i32,
}

fn parse_bone_table<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    (base_offset, bone_count): (u64, usize),
) -> BinResult<Vec<u8>> {
    let delta = i32::read_options(reader, endian, ())?;
    // Some older models don't include the table.
    if delta == 0 {
        return Ok(Vec::new());
    }
    parse_table(
        reader,
        endian,
        (),
        RelativeOffset::new(base_offset, delta),
        bone_count as i32,
    )
}

/// `studiohdr2_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct Header2 {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_count32_offset32, offset = base_offset)]
    pub source_bone_transforms: Vec<SourceBoneTransform>,

    pub illumination_position_attachment: i32,
    pub max_eye_deflection: f32,

    /// The offset of the `mstudiolinearbone_t` bone data.
    pub linear_bone_offset: i32,

    /// The full model name when the name does not fit in [Mdl::name].
    #[br(parse_with = parse_string_opt_ptr32, offset = base_offset)]
    pub name: Option<String>,
}

/// `mstudiosrcbonetransform_t`
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(stream = r)]
pub struct SourceBoneTransform {
    #[br(temp, try_calc = r.stream_position())]
    base_offset: u64,

    #[br(parse_with = parse_string_ptr32, offset = base_offset)]
    pub name: String,

    pub pre_transform: [[f32; 4]; 3],
    pub post_transform: [[f32; 4]; 3],
}

impl Mdl {
    /// The full model name from [Header2] if present.
    pub fn full_name(&self) -> &str {
        self.header2
            .as_ref()
            .and_then(|h| h.name.as_deref())
            .unwrap_or(&self.name)
    }

    /// The material index for `mesh` using the given skin family.
    ///
    /// Returns `None` if the indices are out of range.
    pub fn skin_material_index(&self, skin: usize, mesh: &Mesh) -> Option<usize> {
        let material = usize::try_from(mesh.material_index).ok()?;
        match self.skin_families.get(skin) {
            Some(family) => family.get(material).and_then(|i| usize::try_from(*i).ok()),
            None if self.skin_families.is_empty() => Some(material),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use binrw::BinReaderExt;
    use hexlit::hex;

    fn bone(parent_index: i32) -> Bone {
        Bone {
            name: String::new(),
            parent_index,
            bone_controller_indices: [-1; 6],
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            euler_rotation: [0.0; 3],
            position_scale: [0.0; 3],
            rotation_scale: [0.0; 3],
            pose_to_bone: [[0.0; 4]; 3],
            alignment: [0.0; 4],
            flags: 0,
            procedural_type: 0,
            physics_bone: 0,
            surface_prop: String::new(),
            contents: 0,
        }
    }

    #[test]
    fn bone_parent_order() {
        assert!(parents_precede_children(&[]));
        assert!(parents_precede_children(&[bone(-1), bone(0), bone(1), bone(0)]));
        assert!(!parents_precede_children(&[bone(0)]));
        assert!(!parents_precede_children(&[bone(-1), bone(2), bone(0)]));
        assert!(!parents_precede_children(&[bone(-1), bone(-2)]));
    }

    #[test]
    fn read_hitbox_set() {
        // Hitbox names are relative to the hitbox.
        // A null name offset indicates no name.
        let mut reader = Cursor::new(hex!(
            // set
            55000000 01000000 0c000000
            // hitbox
            03000000 00000000
            000080bf 000080bf 000080bf
            0000803f 0000803f 0000803f
            44000000
            00000000 00000000 00000000 00000000
            00000000 00000000 00000000 00000000
            // strings
            68656164 00 6869747300
        ));
        let value: HitboxSet = reader.read_le().unwrap();
        assert_eq!(
            HitboxSet {
                name: "hits".to_string(),
                hitboxes: vec![Hitbox {
                    bone: 3,
                    group: 0,
                    bounds: BoundingBox {
                        min: [-1.0; 3],
                        max: [1.0; 3]
                    },
                    name: "head".to_string()
                }]
            },
            value
        );
        assert_eq!(12, reader.position());
    }

    #[test]
    fn skin_families_split_by_reference_count() {
        let mut reader = Cursor::new(hex!(04000000 0000 0100 0200 0300));
        let value = parse_skin_families(&mut reader, binrw::Endian::Little, (0, 2, 2)).unwrap();
        assert_eq!(vec![vec![0, 1], vec![2, 3]], value);
        assert_eq!(4, reader.position());
    }

    #[test]
    fn nodes_with_names() {
        let mut reader = Cursor::new(hex!(
            08000000 0c000000
            00010100
            14000000 17000000
            616200 636400
        ));
        let value = parse_nodes(&mut reader, binrw::Endian::Little, (0, 2)).unwrap();
        assert_eq!(
            vec![
                Node {
                    name: "ab".to_string(),
                    transitions: vec![0, 1]
                },
                Node {
                    name: "cd".to_string(),
                    transitions: vec![1, 0]
                }
            ],
            value
        );
        assert_eq!(8, reader.position());
    }
}
