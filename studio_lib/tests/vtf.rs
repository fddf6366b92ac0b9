use studio_lib::{
    error::DecodeError,
    vtf::{ImageFormat, ResourceData, ResourceType, Vtf},
};

mod common;
use common::{vtf_header, FileBuilder, VTF_HEADER_SIZE};

const RGBA8888: i32 = 0;
const P8: i32 = 7;
const DXT1: i32 = 13;
const RGBA16161616: i32 = 25;

const LOW_RES_IMAGE: [u8; 3] = [0x01, 0, 0];
const IMAGE: [u8; 3] = [0x30, 0, 0];

/// Add resource entries and update the header size to include them.
fn add_resources(builder: &mut FileBuilder, resources: &[([u8; 3], u8, u32)]) {
    builder
        .u32(12, (VTF_HEADER_SIZE + resources.len() * 8) as u32)
        .u32(68, resources.len() as u32);
    for (i, (tag, flags, data)) in resources.iter().enumerate() {
        let pos = VTF_HEADER_SIZE + i * 8;
        builder.bytes(pos, tag).u8(pos + 3, *flags).u32(pos + 4, *data);
    }
}

/// A texture with a single image resource following the header.
fn vtf_with_image(version_minor: u32, width: u16, height: u16) -> FileBuilder {
    let mut builder = vtf_header(version_minor, width, height, RGBA8888, 1);
    let data = VTF_HEADER_SIZE + 8;
    add_resources(&mut builder, &[(IMAGE, 0, data as u32)]);
    builder
}

#[test]
fn read_vtf_7_1_rgba() {
    let mut builder = vtf_header(1, 4, 4, RGBA8888, 1);
    let pixels: Vec<u8> = (0..64).collect();
    builder.bytes(64, &pixels);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert_eq!(7, vtf.header.version_major);
    assert_eq!(1, vtf.header.version_minor);
    assert_eq!(64, vtf.header.header_size);
    assert_eq!(ImageFormat::Rgba8888, vtf.header.high_res_format);
    assert_eq!(ImageFormat::None, vtf.header.low_res_format);
    assert_eq!(1, vtf.header.depth);
    assert!(vtf.header.resources.is_empty());
    assert!(vtf.low_res_image_data.is_empty());

    assert_eq!(1, vtf.mipmaps.len());
    assert_eq!(4, vtf.mipmaps[0].width);
    assert_eq!(4, vtf.mipmaps[0].height);
    assert_eq!(vec![pixels.clone()], vtf.mipmaps[0].slices);
    assert_eq!(Some(pixels.as_slice()), vtf.image_data(0, 0, 0));
    assert_eq!(None, vtf.image_data(0, 0, 1));
    assert_eq!(None, vtf.image_data(1, 0, 0));
}

#[test]
fn read_vtf_7_2_dxt1_mipmaps_with_thumbnail() {
    let mut builder = vtf_header(2, 8, 8, DXT1, 2);
    builder
        .i32(57, DXT1)
        .u8(61, 4)
        .u8(62, 4)
        .bytes(80, &[0x11; 8])
        .bytes(88, &[0x22; 8])
        .bytes(96, &[0x33; 32]);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert_eq!(ImageFormat::Dxt1, vtf.header.low_res_format);
    assert!(vtf.header.has_low_res_image());
    assert_eq!(vec![0x11; 8], vtf.low_res_image_data);

    assert_eq!(2, vtf.mipmaps.len());
    assert_eq!((8, 8), (vtf.mipmaps[0].width, vtf.mipmaps[0].height));
    assert_eq!(vec![vec![0x33; 32]], vtf.mipmaps[0].slices);
    assert_eq!((4, 4), (vtf.mipmaps[1].width, vtf.mipmaps[1].height));
    assert_eq!(vec![vec![0x22; 8]], vtf.mipmaps[1].slices);
}

#[test]
fn read_vtf_7_3_resources() {
    let mut builder = vtf_header(3, 2, 2, RGBA8888, 1);
    builder.i32(57, DXT1).u8(61, 4).u8(62, 4);
    // Resources are found by type regardless of order.
    add_resources(
        &mut builder,
        &[
            (IMAGE, 0, 112),
            (*b"CRC", 0x02, 0xdeadbeef),
            (LOW_RES_IMAGE, 0, 104),
        ],
    );
    builder.bytes(104, &[0x11; 8]).bytes(112, &[0x44; 16]);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert_eq!(104, vtf.header.header_size);
    assert_eq!(3, vtf.header.resources.len());

    let crc = vtf.header.resource(ResourceType::Crc).unwrap();
    assert_eq!(ResourceData::Inline(0xdeadbeef), crc.resource_data());
    let image = vtf.header.resource(ResourceType::Image).unwrap();
    assert_eq!(ResourceData::Offset(112), image.resource_data());

    assert_eq!(vec![0x11; 8], vtf.low_res_image_data);
    assert_eq!(vec![vec![0x44; 16]], vtf.mipmaps[0].slices);
}

#[test]
fn read_vtf_7_3_missing_image_resource() {
    let mut builder = vtf_header(3, 4, 4, RGBA8888, 1);
    add_resources(&mut builder, &[(LOW_RES_IMAGE, 0, 88)]);
    builder.bytes(88, &[0; 64]);

    assert!(matches!(
        Vtf::from_bytes(builder.build()),
        Err(DecodeError::TruncatedData { .. })
    ));
}

#[test]
fn read_vtf_7_3_missing_low_res_resource() {
    let mut builder = vtf_with_image(3, 1, 1);
    builder.i32(57, DXT1).u8(61, 1).u8(62, 1).bytes(88, &[0; 4]);

    assert!(matches!(
        Vtf::from_bytes(builder.build()),
        Err(DecodeError::TruncatedData { .. })
    ));
}

#[test]
fn read_vtf_inline_image_resource() {
    let mut builder = vtf_header(4, 1, 1, RGBA8888, 1);
    add_resources(&mut builder, &[(IMAGE, 0x02, 0)]);

    assert!(matches!(
        Vtf::from_bytes(builder.build()),
        Err(DecodeError::InconsistentLayout { .. })
    ));
}

#[test]
fn read_vtf_envmap_sphere_map_face() {
    let mut builder = vtf_with_image(4, 1, 1);
    builder.u32(20, 0x4000).u16(26, 0);
    let pixels: Vec<u8> = (0..28).collect();
    builder.bytes(88, &pixels);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert!(vtf.header.flags.envmap());
    assert_eq!(7, vtf.header.face_count());
    assert_eq!(
        pixels.chunks(4).map(|c| c.to_vec()).collect::<Vec<_>>(),
        vtf.mipmaps[0].slices
    );
    assert_eq!(Some(&pixels[24..28]), vtf.image_data(0, 0, 6));
}

#[test]
fn read_vtf_envmap_7_5() {
    let mut builder = vtf_with_image(5, 1, 1);
    builder.u32(20, 0x4000).u16(26, 0).bytes(88, &[0; 24]);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert_eq!(6, vtf.header.face_count());
    assert_eq!(6, vtf.mipmaps[0].slices.len());
}

#[test]
fn read_vtf_frames() {
    let mut builder = vtf_with_image(4, 1, 1);
    builder.u16(24, 3).bytes(88, &[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    assert_eq!(Some([2u8; 4].as_slice()), vtf.image_data(0, 1, 0));
    assert_eq!(Some([3u8; 4].as_slice()), vtf.image_data(0, 2, 0));
}

#[test]
fn read_vtf_paletted_format() {
    let bytes = vtf_header(2, 4, 4, P8, 1).bytes(80, &[0; 16]).build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::UnsupportedEncoding { value: 7, .. })
    ));
}

#[test]
fn read_vtf_unknown_format() {
    let bytes = vtf_header(2, 4, 4, 99, 1).build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::UnsupportedEncoding { value: 99, .. })
    ));
}

#[test]
fn read_vtf_truncated_image_data() {
    let bytes = vtf_header(2, 4, 4, RGBA8888, 1).bytes(80, &[0; 63]).build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::TruncatedData { .. })
    ));
}

#[test]
fn read_vtf_image_size_overflow() {
    // The size of all frames and depth slices does not fit in 64 bits.
    let bytes = vtf_header(2, 65535, 65535, RGBA16161616, 1)
        .u16(24, 65535)
        .u16(63, 65535)
        .build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::TruncatedData { .. })
    ));
}

#[test]
fn read_vtf_unsupported_version() {
    let bytes = vtf_header(6, 4, 4, RGBA8888, 1).build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::FormatVersion {
            field: "minor version",
            ..
        })
    ));

    let bytes = vtf_header(2, 4, 4, RGBA8888, 1).u32(4, 8).build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::FormatVersion {
            field: "major version",
            ..
        })
    ));
}

#[test]
fn read_vtf_bad_magic() {
    let bytes = vtf_header(2, 4, 4, RGBA8888, 1).bytes(0, b"VTF2").build();
    assert!(matches!(
        Vtf::from_bytes(bytes),
        Err(DecodeError::FormatIdentity { .. })
    ));
}

#[test]
fn vtf_to_dds() {
    let mut builder = vtf_header(2, 4, 4, RGBA8888, 3);
    builder.bytes(80, &[0; 4 + 16 + 64]);

    let vtf = Vtf::from_bytes(builder.build()).unwrap();
    let dds = vtf.to_dds().unwrap();
    assert_eq!(4, dds.get_width());
    assert_eq!(4, dds.get_height());
}
