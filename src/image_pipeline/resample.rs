//! Resampling module
//!
//! Shrinks a decoded raster to the planned output size in a single
//! convolution pass.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, MulDiv, PixelType, ResizeAlg, ResizeOptions, Resizer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::plan::OutputPlan;
use crate::image_pipeline::tiff::DecodedRaster;

/// Convolution filter used when downsampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Area averaging
    #[default]
    Box,
    Bilinear,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Box => FilterType::Box,
            ResampleFilter::Bilinear => FilterType::Bilinear,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

pub trait Resampler {
    /// Consumes `raster` and returns it at the planned size. A plan matching
    /// the raster's dimensions returns the raster itself without copying.
    fn resample(&self, raster: DecodedRaster, plan: &OutputPlan) -> Result<DecodedRaster>;
}

/// Resampler backed by fast_image_resize.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvolutionResampler {
    filter: ResampleFilter,
}

impl ConvolutionResampler {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }
}

impl Resampler for ConvolutionResampler {
    fn resample(&self, raster: DecodedRaster, plan: &OutputPlan) -> Result<DecodedRaster> {
        if plan.matches_source(raster.width, raster.height) {
            return Ok(raster);
        }

        let (src_width, src_height) = (raster.width, raster.height);
        let (dst_width, dst_height) = (plan.target_width, plan.target_height);
        if dst_width == 0 || dst_height == 0 {
            return Err(ConversionError::InvalidDimensions(dst_width, dst_height));
        }

        debug!(
            "Resampling {}x{} -> {}x{} with {:?}",
            src_width, src_height, dst_width, dst_height, self.filter
        );

        let has_alpha = raster.pixels.chunks_exact(4).any(|px| px[3] != u8::MAX);

        // The source image takes over the decoded buffer; nothing is copied.
        let mut src = Image::from_vec_u8(src_width, src_height, raster.pixels, PixelType::U8x4)
            .map_err(|e| ConversionError::Resample(format!("source buffer rejected: {e:?}")))?;
        let mut dst = Image::new(dst_width, dst_height, PixelType::U8x4);

        // Premultiply in place rather than through the resizer, which would
        // allocate a second full-resolution source.
        let mul_div = MulDiv::new();
        if has_alpha {
            mul_div
                .multiply_alpha_inplace(&mut src)
                .map_err(|e| ConversionError::Resample(format!("premultiply: {e:?}")))?;
        }

        let options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(self.filter.into()))
            .use_alpha(false);
        Resizer::new()
            .resize(&src, &mut dst, &options)
            .map_err(|e| ConversionError::Resample(format!("{e:?}")))?;
        drop(src);

        if has_alpha {
            mul_div
                .divide_alpha_inplace(&mut dst)
                .map_err(|e| ConversionError::Resample(format!("unpremultiply: {e:?}")))?;
        }

        Ok(DecodedRaster {
            width: dst_width,
            height: dst_height,
            pixels: dst.into_vec(),
        })
    }
}
