//! Valve texture format `.vtf` textures.
//!
//! A texture contains an optional low resolution thumbnail
//! and a high resolution image with mipmaps, animation frames, cube faces, and depth slices.
//!
//! # File Paths
//! | Game | Versions | File Patterns |
//! | --- | --- | --- |
//! | Half-Life 2 | 7.1, 7.2 | `materials/**/*.vtf` |
//! | Team Fortress 2 | 7.2 to 7.5 | `materials/**/*.vtf` |
//! | Portal 2 | 7.2 to 7.5 | `materials/**/*.vtf` |
//!
//! Resource offsets are relative to the start of the file.
use std::io::{Read, Seek, SeekFrom};

use bilge::prelude::*;
use binrw::{binread, BinRead, BinResult};
use log::debug;
use strum::FromRepr;
use thiserror::Error;

use crate::{check_remaining, error::LayoutError, read_bytes, RelativeOffset};

/// A decoded texture with all image data.
#[derive(Debug, PartialEq, Clone)]
pub struct Vtf {
    pub header: VtfHeader,
    /// The thumbnail using [VtfHeader::low_res_format] or empty if not present.
    pub low_res_image_data: Vec<u8>,
    /// Mipmaps for the high resolution image from largest to smallest.
    pub mipmaps: Vec<Mipmap>,
}

/// A single mip level for all frames and faces.
#[derive(Debug, PartialEq, Clone)]
pub struct Mipmap {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Image data for each array slice `face + faces * frame`
    /// with all depth slices for that face and frame.
    pub slices: Vec<Vec<u8>>,
}

/// The header for all versions.
/// Fields added in later versions use default values for older versions.
#[binread]
#[derive(Debug, PartialEq, Clone)]
#[br(magic(b"VTF\0"))]
pub struct VtfHeader {
    #[br(assert(version_major == 7, LayoutError::version("major version", 7, version_major)))]
    pub version_major: u32,

    #[br(assert(version_minor <= 5, LayoutError::version("minor version", "0 to 5", version_minor)))]
    pub version_minor: u32,

    /// The size of the header including resources.
    pub header_size: u32,

    pub width: u16,
    pub height: u16,
    pub flags: TextureFlags,
    pub frame_count: u16,
    pub start_frame: u16,

    #[br(pad_before = 4)]
    pub reflectivity: [f32; 3],

    #[br(pad_before = 4)]
    pub bumpmap_scale: f32,

    pub high_res_format: ImageFormat,
    pub mipmap_count: u8,
    pub low_res_format: ImageFormat,
    pub low_res_width: u8,
    pub low_res_height: u8,

    /// The depth for 3D textures added in version 7.2.
    #[br(if(version_minor >= 2, 1))]
    pub depth: u16,

    /// Resources added in version 7.3.
    #[br(if(version_minor >= 3))]
    #[br(parse_with = parse_resources)]
    pub resources: Vec<Resource>,
}

#[bitsize(32)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Clone, Copy)]
#[br(map = u32::into)]
pub struct TextureFlags {
    pub point_sample: bool,
    pub trilinear: bool,
    pub clamp_s: bool,
    pub clamp_t: bool,
    pub anisotropic: bool,
    pub hint_dxt5: bool,
    pub pwl_corrected: bool,
    pub normal: bool,
    pub no_mip: bool,
    pub no_lod: bool,
    pub all_mips: bool,
    pub procedural: bool,
    pub one_bit_alpha: bool,
    pub eight_bit_alpha: bool,
    /// A cube map with 6 faces and an optional sphere map face.
    pub envmap: bool,
    pub render_target: bool,
    pub depth_render_target: bool,
    pub no_debug_override: bool,
    pub single_copy: bool,
    pub pre_srgb: bool,
    pub unk20: bool,
    pub unk21: bool,
    pub clamp_u: bool,
    pub vertex_texture: bool,
    pub ssbump: bool,
    pub unk25: bool,
    pub border: bool,
    pub unk: u5,
}

/// An entry in the resource directory.
#[derive(Debug, BinRead, PartialEq, Eq, Clone, Copy)]
pub struct Resource {
    #[br(map = |tag: [u8; 3]| ResourceType::from(tag))]
    pub resource_type: ResourceType,
    pub flags: ResourceFlags,
    /// An inline value or an offset from the start of the file.
    pub data: u32,
}

#[bitsize(8)]
#[derive(DebugBits, FromBits, BinRead, PartialEq, Eq, Clone, Copy)]
#[br(map = u8::into)]
pub struct ResourceFlags {
    pub unk0: bool,
    /// The [Resource::data] is an inline value instead of an offset.
    pub has_no_data_chunk: bool,
    pub unk: u6,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResourceType {
    /// The thumbnail image data.
    LowResImage,
    /// The high resolution image data for all mipmaps.
    Image,
    /// Sprite sheet data for particles.
    Sheet,
    /// CRC checksum of the source file.
    Crc,
    /// Clamped level of detail settings.
    TextureLodSettings,
    /// Additional texture flags.
    ExtendedFlags,
    /// Arbitrary KeyValues text.
    KeyValues,
    Unknown([u8; 3]),
}

impl From<[u8; 3]> for ResourceType {
    fn from(tag: [u8; 3]) -> Self {
        match &tag {
            b"\x01\0\0" => Self::LowResImage,
            b"\x30\0\0" => Self::Image,
            b"\x10\0\0" => Self::Sheet,
            b"CRC" => Self::Crc,
            b"LOD" => Self::TextureLodSettings,
            b"TSO" => Self::ExtendedFlags,
            b"KVD" => Self::KeyValues,
            _ => Self::Unknown(tag),
        }
    }
}

/// The payload of a [Resource].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResourceData {
    /// A small value stored directly in the resource entry.
    Inline(u32),
    /// The position of the data relative to the start of the file.
    Offset(u32),
}

impl Resource {
    pub fn resource_data(&self) -> ResourceData {
        if self.flags.has_no_data_chunk() {
            ResourceData::Inline(self.data)
        } else {
            ResourceData::Offset(self.data)
        }
    }
}

fn parse_resources<R: Read + Seek>(
    reader: &mut R,
    endian: binrw::Endian,
    _args: (),
) -> BinResult<Vec<Resource>> {
    reader.seek(SeekFrom::Current(3))?;
    let count = u32::read_options(reader, endian, ())?;
    reader.seek(SeekFrom::Current(8))?;

    let pos = reader.stream_position()?;
    check_remaining(reader, pos, count as u64 * 8)?;

    (0..count)
        .map(|_| Resource::read_options(reader, endian, ()))
        .collect()
}

/// The pixel format for image data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromRepr)]
#[repr(i32)]
pub enum ImageFormat {
    None = -1,
    Rgba8888 = 0,
    Abgr8888 = 1,
    Rgb888 = 2,
    Bgr888 = 3,
    Rgb565 = 4,
    I8 = 5,
    Ia88 = 6,
    P8 = 7,
    A8 = 8,
    Rgb888Bluescreen = 9,
    Bgr888Bluescreen = 10,
    Argb8888 = 11,
    Bgra8888 = 12,
    Dxt1 = 13,
    Dxt3 = 14,
    Dxt5 = 15,
    Bgrx8888 = 16,
    Bgr565 = 17,
    Bgrx5551 = 18,
    Bgra4444 = 19,
    Dxt1OneBitAlpha = 20,
    Bgra5551 = 21,
    Uv88 = 22,
    Uvwq8888 = 23,
    Rgba16161616F = 24,
    Rgba16161616 = 25,
    Uvlx8888 = 26,
}

impl BinRead for ImageFormat {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let value = i32::read_options(reader, endian, ())?;
        Self::from_repr(value).ok_or_else(|| {
            LayoutError::Unsupported {
                field: "image format",
                value: value.into(),
                reason: UnsupportedFormat::Unknown.to_string(),
            }
            .at(pos)
        })
    }
}

/// How texels are stored for an [ImageFormat].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Encoding {
    /// 4x4 texel blocks with a fixed size in bytes.
    Block { block_size: u32 },
    /// Individual texels with a fixed size in bytes.
    Texel { bytes_per_texel: u32 },
}

/// The reason an [ImageFormat] cannot be decoded.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum UnsupportedFormat {
    #[error("no image format")]
    None,

    #[error("paletted formats are not supported")]
    Paletted,

    #[error("packed channels smaller than a byte are not supported")]
    PackedChannels,

    #[error("channel swizzled formats are not supported")]
    Swizzled,

    #[error("unknown image format")]
    Unknown,
}

impl ImageFormat {
    /// The storage encoding for this format.
    pub fn encoding(&self) -> Result<Encoding, UnsupportedFormat> {
        match self {
            ImageFormat::Dxt1 | ImageFormat::Dxt1OneBitAlpha => Ok(Encoding::Block { block_size: 8 }),
            ImageFormat::Dxt3 | ImageFormat::Dxt5 => Ok(Encoding::Block { block_size: 16 }),
            ImageFormat::Rgba16161616F | ImageFormat::Rgba16161616 => {
                Ok(Encoding::Texel { bytes_per_texel: 8 })
            }
            ImageFormat::Rgba8888
            | ImageFormat::Bgra8888
            | ImageFormat::Bgrx8888
            | ImageFormat::Uvwq8888 => Ok(Encoding::Texel { bytes_per_texel: 4 }),
            ImageFormat::Rgb888
            | ImageFormat::Bgr888
            | ImageFormat::Rgb888Bluescreen
            | ImageFormat::Bgr888Bluescreen => Ok(Encoding::Texel { bytes_per_texel: 3 }),
            ImageFormat::Ia88 | ImageFormat::Uv88 => Ok(Encoding::Texel { bytes_per_texel: 2 }),
            ImageFormat::I8 | ImageFormat::A8 => Ok(Encoding::Texel { bytes_per_texel: 1 }),
            ImageFormat::None => Err(UnsupportedFormat::None),
            ImageFormat::P8 => Err(UnsupportedFormat::Paletted),
            ImageFormat::Rgb565
            | ImageFormat::Bgr565
            | ImageFormat::Bgrx5551
            | ImageFormat::Bgra5551
            | ImageFormat::Bgra4444 => Err(UnsupportedFormat::PackedChannels),
            ImageFormat::Abgr8888 | ImageFormat::Argb8888 | ImageFormat::Uvlx8888 => {
                Err(UnsupportedFormat::Swizzled)
            }
        }
    }

    /// The size in bytes of a surface with the given dimensions.
    pub fn surface_size(&self, width: u32, height: u32, depth: u32) -> Result<u64, UnsupportedFormat> {
        let depth = depth.max(1) as u64;
        match self.encoding()? {
            Encoding::Block { block_size } => {
                let blocks_x = width.max(1).div_ceil(4) as u64;
                let blocks_y = height.max(1).div_ceil(4) as u64;
                Ok(blocks_x * blocks_y * block_size as u64 * depth)
            }
            Encoding::Texel { bytes_per_texel } => {
                Ok(width.max(1) as u64 * height.max(1) as u64 * bytes_per_texel as u64 * depth)
            }
        }
    }
}

/// The size of a dimension at the given mip level.
pub fn mip_dimension(base: u32, mip: u32) -> u32 {
    base.checked_shr(mip).unwrap_or(0).max(1)
}

impl VtfHeader {
    /// The number of cube map faces for each frame.
    pub fn face_count(&self) -> u32 {
        if self.flags.envmap() {
            // Older versions include a sphere map unless disabled by the start frame.
            if self.start_frame != 0xFFFF && self.version_minor < 5 {
                7
            } else {
                6
            }
        } else {
            1
        }
    }

    /// The number of array slices `frames * faces` for each mipmap.
    pub fn slice_count(&self) -> u32 {
        self.frame_count as u32 * self.face_count()
    }

    /// Returns `true` if the file contains thumbnail data.
    pub fn has_low_res_image(&self) -> bool {
        self.low_res_format != ImageFormat::None
            && self.low_res_width > 0
            && self.low_res_height > 0
    }

    /// The first resource with the given type.
    pub fn resource(&self, resource_type: ResourceType) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
    }
}

impl Vtf {
    /// The image data for the given mipmap, frame, and face.
    pub fn image_data(&self, mip: usize, frame: usize, face: usize) -> Option<&[u8]> {
        let faces = self.header.face_count() as usize;
        if face >= faces {
            return None;
        }
        self.mipmaps
            .get(mip)?
            .slices
            .get(face + faces * frame)
            .map(|s| s.as_slice())
    }
}

impl BinRead for Vtf {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let base_offset = reader.stream_position()?;
        let header = VtfHeader::read_options(reader, endian, ())?;

        // Check formats before reading any image data.
        let format_pos = base_offset + 52;
        header
            .high_res_format
            .encoding()
            .map_err(|e| unsupported_format(header.high_res_format, e).at(format_pos))?;
        if header.has_low_res_image() {
            header
                .low_res_format
                .encoding()
                .map_err(|e| unsupported_format(header.low_res_format, e).at(format_pos + 5))?;
        }

        let low_res_image_data = if header.version_minor >= 3 {
            let image = required_resource(&header, ResourceType::Image, base_offset)?;

            let low_res_image_data = if header.has_low_res_image() {
                let low_res = required_resource(&header, ResourceType::LowResImage, base_offset)?;
                let pos = low_res.position(reader)?;
                reader.seek(SeekFrom::Start(pos))?;
                read_low_res_image(reader, &header)?
            } else {
                Vec::new()
            };

            for resource in &header.resources {
                if !matches!(
                    resource.resource_type,
                    ResourceType::Image | ResourceType::LowResImage
                ) {
                    debug!("Skipping VTF resource {:?}", resource.resource_type);
                }
            }

            let pos = image.position(reader)?;
            reader.seek(SeekFrom::Start(pos))?;
            low_res_image_data
        } else {
            // The image data follows the header without any resources.
            let pos = RelativeOffset::new(base_offset, header.header_size as i32).position(reader)?;
            reader.seek(SeekFrom::Start(pos))?;

            if header.has_low_res_image() {
                read_low_res_image(reader, &header)?
            } else {
                Vec::new()
            }
        };

        let mipmaps = read_mipmaps(reader, &header)?;

        Ok(Self {
            header,
            low_res_image_data,
            mipmaps,
        })
    }
}

fn unsupported_format(format: ImageFormat, reason: UnsupportedFormat) -> LayoutError {
    LayoutError::Unsupported {
        field: "image format",
        value: format as i64,
        reason: reason.to_string(),
    }
}

fn required_resource(
    header: &VtfHeader,
    resource_type: ResourceType,
    base_offset: u64,
) -> BinResult<RelativeOffset> {
    // The resource entries start after the fixed size header fields.
    let pos = base_offset + 80;
    let resource = header.resource(resource_type).ok_or_else(|| {
        LayoutError::truncated(format!("missing required resource {resource_type:?}")).at(pos)
    })?;

    match resource.resource_data() {
        ResourceData::Offset(offset) => {
            let delta = i32::try_from(offset).map_err(|_| {
                LayoutError::truncated(format!("resource offset {offset} exceeds stream length"))
                    .at(pos)
            })?;
            Ok(RelativeOffset::new(base_offset, delta))
        }
        ResourceData::Inline(_) => Err(LayoutError::inconsistent(
            "resource flags",
            format!("{resource_type:?} resource has no data"),
        )
        .at(pos)),
    }
}

fn read_low_res_image<R: Read + Seek>(reader: &mut R, header: &VtfHeader) -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    let size = header
        .low_res_format
        .surface_size(header.low_res_width.into(), header.low_res_height.into(), 1)
        .map_err(|e| unsupported_format(header.low_res_format, e).at(pos))?;
    read_bytes(reader, size as usize)
}

fn read_mipmaps<R: Read + Seek>(reader: &mut R, header: &VtfHeader) -> BinResult<Vec<Mipmap>> {
    let mut mipmaps: Vec<_> = (0..header.mipmap_count as u32)
        .map(|mip| Mipmap {
            width: mip_dimension(header.width.into(), mip),
            height: mip_dimension(header.height.into(), mip),
            depth: mip_dimension(header.depth.into(), mip),
            slices: Vec::new(),
        })
        .collect();

    // Mipmaps are stored from smallest to largest.
    for mipmap in mipmaps.iter_mut().rev() {
        let pos = reader.stream_position()?;
        let size = header
            .high_res_format
            .surface_size(mipmap.width, mipmap.height, mipmap.depth)
            .map_err(|e| unsupported_format(header.high_res_format, e).at(pos))?;

        // Check all frames and faces at once to fail before any large allocations.
        let total_size = size
            .checked_mul(header.slice_count() as u64)
            .ok_or_else(|| {
                LayoutError::truncated(format!(
                    "{size} bytes for each of {} slices exceed stream length",
                    header.slice_count()
                ))
                .at(pos)
            })?;
        check_remaining(reader, pos, total_size)?;

        for _frame in 0..header.frame_count {
            for _face in 0..header.face_count() {
                mipmap.slices.push(read_bytes(reader, size as usize)?);
            }
        }
    }

    Ok(mipmaps)
}
