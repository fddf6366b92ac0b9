//! Conversions from [Vtf] to [Dds].
use image_dds::{ddsfile::Dds, Surface};
use thiserror::Error;

use crate::vtf::{ImageFormat, Vtf};

#[derive(Debug, Error)]
pub enum CreateDdsError {
    #[error("image format {0:?} has no equivalent DDS format")]
    UnsupportedImageFormat(ImageFormat),

    #[error("error creating DDS")]
    DdsError(#[from] image_dds::CreateDdsError),
}

impl Vtf {
    /// Combines all frames, faces, and mipmaps of the high resolution image into a surface.
    ///
    /// Each layer is a single `face + faces * frame` slice.
    /// Formats with 3 channels are expanded to RGBA.
    pub fn to_surface(&self) -> Result<Surface<Vec<u8>>, CreateDdsError> {
        let format = self.header.high_res_format;
        let image_format = dds_image_format(format)?;

        let layers = self.header.slice_count();

        // DDS stores all mipmaps for the first layer before the next layer.
        let mut data = Vec::new();
        for layer in 0..layers as usize {
            for mipmap in &self.mipmaps {
                if let Some(slice) = mipmap.slices.get(layer) {
                    match format {
                        ImageFormat::Rgb888 | ImageFormat::Rgb888Bluescreen => {
                            data.extend(slice.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255u8]))
                        }
                        ImageFormat::Bgr888 | ImageFormat::Bgr888Bluescreen => {
                            data.extend(slice.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0], 255u8]))
                        }
                        _ => data.extend_from_slice(slice),
                    }
                }
            }
        }

        Ok(Surface {
            width: self.header.width.into(),
            height: self.header.height.into(),
            depth: self.header.depth.into(),
            layers,
            mipmaps: self.mipmaps.len() as u32,
            image_format,
            data,
        })
    }

    /// Converts the high resolution image to a Direct Draw Surface (DDS).
    pub fn to_dds(&self) -> Result<Dds, CreateDdsError> {
        self.to_surface()?.to_dds().map_err(Into::into)
    }
}

fn dds_image_format(format: ImageFormat) -> Result<image_dds::ImageFormat, CreateDdsError> {
    match format {
        ImageFormat::Dxt1 | ImageFormat::Dxt1OneBitAlpha => Ok(image_dds::ImageFormat::BC1RgbaUnorm),
        ImageFormat::Dxt3 => Ok(image_dds::ImageFormat::BC2RgbaUnorm),
        ImageFormat::Dxt5 => Ok(image_dds::ImageFormat::BC3RgbaUnorm),
        ImageFormat::Rgba8888
        | ImageFormat::Rgb888
        | ImageFormat::Bgr888
        | ImageFormat::Rgb888Bluescreen
        | ImageFormat::Bgr888Bluescreen => Ok(image_dds::ImageFormat::Rgba8Unorm),
        ImageFormat::Bgra8888 | ImageFormat::Bgrx8888 => Ok(image_dds::ImageFormat::Bgra8Unorm),
        ImageFormat::Rgba16161616F => Ok(image_dds::ImageFormat::Rgba16Float),
        ImageFormat::I8 | ImageFormat::A8 => Ok(image_dds::ImageFormat::R8Unorm),
        _ => Err(CreateDdsError::UnsupportedImageFormat(format)),
    }
}
