//! Output dimension planning.
//!
//! Decides the size of the buffer the resampler produces before any pixel is
//! decoded. Caller-requested caps are applied first; the pixel budget is
//! applied last and unconditionally, so no input can yield a plan larger than
//! `max_pixels`.

/// Default pixel budget for a materialized output buffer. At 4 bytes per
/// pixel this is 80 MB, which leaves room for the encoder inside a 128 MB
/// invocation.
pub const MAX_PIXELS: u64 = 20_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub max_pixels: u64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_pixels: MAX_PIXELS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputPlan {
    pub target_width: u32,
    pub target_height: u32,
    /// `target_width / source_width`, in `(0, 1]`.
    pub scale_factor: f64,
}

impl OutputPlan {
    pub fn pixel_count(&self) -> u64 {
        self.target_width as u64 * self.target_height as u64
    }

    /// True when the plan keeps a `width` x `height` source as it is.
    pub fn matches_source(&self, width: u32, height: u32) -> bool {
        self.target_width == width && self.target_height == height
    }
}

/// Computes output dimensions for a `source_width` x `source_height` raster.
pub fn plan(source_width: u32, source_height: u32, opts: &PlanOptions) -> OutputPlan {
    let source_width = source_width.max(1);
    let source_height = source_height.max(1);

    let mut width = source_width as f64;
    let mut height = source_height as f64;

    if let Some(max_width) = opts.max_width.map(f64::from) {
        if width > max_width {
            let ratio = max_width / width;
            width = max_width;
            height = (height * ratio).round();
        }
    }

    if let Some(max_height) = opts.max_height.map(f64::from) {
        if height > max_height {
            let ratio = max_height / height;
            height = max_height;
            width = (width * ratio).round();
        }
    }

    let max_pixels = opts.max_pixels.max(1);
    let mut w = (width as u64).max(1);
    let mut h = (height as u64).max(1);

    if w * h > max_pixels {
        let scale = (max_pixels as f64 / (w * h) as f64).sqrt();
        w = ((w as f64 * scale).floor() as u64).max(1);
        h = ((h as f64 * scale).floor() as u64).max(1);
    }

    // Floating point can leave the product a pixel row over budget, and the
    // clamp to 1 above can do the same for extreme aspect ratios.
    if w * h > max_pixels {
        if w >= h {
            w = (max_pixels / h).max(1);
        } else {
            h = (max_pixels / w).max(1);
        }
    }

    let target_width = w as u32;
    let target_height = h as u32;
    let scale_factor = if target_width == source_width && target_height == source_height {
        1.0
    } else {
        target_width as f64 / source_width as f64
    };

    OutputPlan {
        target_width,
        target_height,
        scale_factor,
    }
}
