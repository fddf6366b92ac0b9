#![allow(dead_code)]
//! Helpers for building little endian test files with data at fixed positions.

pub struct FileBuilder {
    pub bytes: Vec<u8>,
}

impl FileBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    pub fn bytes(&mut self, pos: usize, value: &[u8]) -> &mut Self {
        if self.bytes.len() < pos + value.len() {
            self.bytes.resize(pos + value.len(), 0);
        }
        self.bytes[pos..pos + value.len()].copy_from_slice(value);
        self
    }

    pub fn u8(&mut self, pos: usize, value: u8) -> &mut Self {
        self.bytes(pos, &[value])
    }

    pub fn u16(&mut self, pos: usize, value: u16) -> &mut Self {
        self.bytes(pos, &value.to_le_bytes())
    }

    pub fn i16(&mut self, pos: usize, value: i16) -> &mut Self {
        self.bytes(pos, &value.to_le_bytes())
    }

    pub fn i32(&mut self, pos: usize, value: i32) -> &mut Self {
        self.bytes(pos, &value.to_le_bytes())
    }

    pub fn u32(&mut self, pos: usize, value: u32) -> &mut Self {
        self.bytes(pos, &value.to_le_bytes())
    }

    pub fn f32(&mut self, pos: usize, value: f32) -> &mut Self {
        self.bytes(pos, &value.to_le_bytes())
    }

    /// Write a null terminated string.
    pub fn string(&mut self, pos: usize, value: &str) -> &mut Self {
        self.bytes(pos, value.as_bytes()).u8(pos + value.len(), 0)
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

pub const MDL_HEADER_SIZE: usize = 408;

/// A studio model header with every section empty.
pub fn mdl_header(version: i32) -> FileBuilder {
    let mut builder = FileBuilder::new(MDL_HEADER_SIZE);
    builder
        .bytes(0, b"IDST")
        .i32(4, version)
        .i32(8, 1234)
        .i32(76, MDL_HEADER_SIZE as i32);
    builder
}

pub const VTF_HEADER_SIZE: usize = 80;

/// A texture header without resources.
pub fn vtf_header(
    version_minor: u32,
    width: u16,
    height: u16,
    high_res_format: i32,
    mipmap_count: u8,
) -> FileBuilder {
    let header_size = if version_minor < 2 { 64 } else { VTF_HEADER_SIZE };
    let mut builder = FileBuilder::new(header_size);
    builder
        .bytes(0, b"VTF\0")
        .u32(4, 7)
        .u32(8, version_minor)
        .u32(12, header_size as u32)
        .u16(16, width)
        .u16(18, height)
        .u16(24, 1)
        .f32(48, 1.0)
        .i32(52, high_res_format)
        .u8(56, mipmap_count)
        .i32(57, -1);
    if version_minor >= 2 {
        builder.u16(63, 1);
    }
    builder
}
