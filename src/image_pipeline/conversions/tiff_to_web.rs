use tracing::{error, info, instrument};

use crate::image_pipeline::{
    common::error::{ConversionError, DecodeError, EncodeError, Result},
    conversions::types::{ConversionConfig, OutputSpec, TranscodeOutput},
    encode::{RasterEncoder, StandardEncoder},
    plan::{self, OutputPlan, PlanOptions},
    resample::{ConvolutionResampler, Resampler},
    tiff::{RasterDecoder, RasterHeader, TiffRasterReader},
    timing::PipelineTimings,
};

/// Decode → plan → resample → encode, for one source raster at a time.
///
/// Every stage takes the previous stage's buffer by value, so at most the
/// decoded frame and its resampled copy are alive together.
pub struct TiffToWebPipeline<D: RasterDecoder, R: Resampler, E: RasterEncoder> {
    decoder: D,
    resampler: R,
    encoder: E,
    config: ConversionConfig,
}

impl TiffToWebPipeline<TiffRasterReader, ConvolutionResampler, StandardEncoder> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            decoder: TiffRasterReader::new(config.max_source_pixels),
            resampler: ConvolutionResampler::new(config.filter),
            encoder: StandardEncoder,
            config,
        }
    }
}

impl<D: RasterDecoder, R: Resampler, E: RasterEncoder> TiffToWebPipeline<D, R, E> {
    pub fn with_custom(decoder: D, resampler: R, encoder: E, config: ConversionConfig) -> Self {
        Self {
            decoder,
            resampler,
            encoder,
            config,
        }
    }

    /// Caller caps, tightened by the output codec's own dimension limit.
    fn plan_options(&self, spec: &OutputSpec) -> PlanOptions {
        let codec_cap = spec.format.max_dimension();
        let tighten = |requested: Option<u32>| match (requested, codec_cap) {
            (Some(r), Some(c)) => Some(r.min(c)),
            (r, c) => r.or(c),
        };
        PlanOptions {
            max_width: tighten(spec.max_width),
            max_height: tighten(spec.max_height),
            max_pixels: self.config.max_pixels,
        }
    }

    /// Computes the output plan from the container header alone.
    pub fn plan(&self, input_data: &[u8], spec: &OutputSpec) -> Result<(RasterHeader, OutputPlan)> {
        let header = {
            let _span = tracing::info_span!("decode_header").entered();
            self.decoder.read_header(input_data)?
        };
        let plan = plan::plan(header.width, header.height, &self.plan_options(spec));
        Ok((header, plan))
    }

    fn validate_output_size(&self, size: usize) -> Result<()> {
        match self.config.max_output_bytes {
            Some(limit) if size > limit => {
                Err(EncodeError::OutputTooLarge { size, limit }.into())
            }
            _ => Ok(()),
        }
    }

    #[instrument(
        skip(self, input_data, spec),
        fields(input_size = input_data.len(), format = %spec.format, quality = %spec.quality)
    )]
    pub fn convert(&self, input_data: &[u8], spec: &OutputSpec) -> Result<TranscodeOutput> {
        let mut timings = PipelineTimings::new();
        info!("Starting TIFF conversion");

        let (header, plan) = {
            let _span = tracing::info_span!("plan").entered();
            timings.time("plan", || self.plan(input_data, spec))?
        };

        let raster = {
            let _span = tracing::info_span!("decode_pixels",
                width = header.width,
                height = header.height
            ).entered();
            timings.time("decode_pixels", || self.decoder.read_rgba(input_data))?
        };

        if raster.header() != header {
            return Err(DecodeError::Corrupt(format!(
                "header reports {}x{} but pixel data is {}x{}",
                header.width, header.height, raster.width, raster.height
            ))
            .into());
        }

        let raster = {
            let _span = tracing::info_span!("resample",
                target_width = plan.target_width,
                target_height = plan.target_height
            ).entered();
            timings.time("resample", || self.resampler.resample(raster, &plan))?
        };

        if raster.width == 0 || raster.height == 0 {
            return Err(ConversionError::InvalidDimensions(raster.width, raster.height));
        }

        let bytes = {
            let _span = tracing::info_span!("encode").entered();
            timings
                .time("encode", || self.encoder.encode(&raster, spec.format, spec.quality))
                .inspect_err(|e| {
                    error!(
                        width = raster.width,
                        height = raster.height,
                        format = %spec.format,
                        quality = %spec.quality,
                        "Encode failed: {}", e
                    )
                })?
        };
        drop(raster);

        self.validate_output_size(bytes.len())?;

        info!(
            source_width = header.width,
            source_height = header.height,
            width = plan.target_width,
            height = plan.target_height,
            scale = plan.scale_factor,
            output_size = bytes.len(),
            "Conversion complete"
        );

        Ok(TranscodeOutput {
            bytes,
            source: header,
            plan,
            timings,
        })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }
}
