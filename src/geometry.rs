//! Ink bounds measurement and the projection into the target square

use crate::extract::{RawPrimitives, RectPrimitive};
use crate::{Error, Result};
use log::{debug, warn};

/// Tightest box around all drawn QR geometry, in encoder coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl InkBounds {
    /// Union of every module rect, every alignment-dot rect, and every
    /// finder anchor grown by `corner_footprint`.
    ///
    /// Finder path interiors are not walked; only the start anchor is read
    /// and the known glyph side is added. Returns `None` when nothing
    /// contributed.
    pub fn measure(primitives: &RawPrimitives, corner_footprint: f64) -> Option<Self> {
        let mut bounds: Option<InkBounds> = None;

        for r in primitives.modules.iter().chain(&primitives.alignment_dots) {
            extend(&mut bounds, r.x, r.y, r.x + r.width, r.y + r.height);
        }

        for finder in &primitives.finders {
            match finder.anchor() {
                Some((x, y)) => extend(&mut bounds, x, y, x + corner_footprint, y + corner_footprint),
                None => warn!("finder path without a moveto anchor skipped: {:?}", finder.d),
            }
        }

        bounds
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

fn extend(bounds: &mut Option<InkBounds>, x0: f64, y0: f64, x1: f64, y1: f64) {
    match bounds {
        Some(b) => {
            b.min_x = b.min_x.min(x0);
            b.min_y = b.min_y.min(y0);
            b.max_x = b.max_x.max(x1);
            b.max_y = b.max_y.max(y1);
        }
        None => {
            *bounds = Some(InkBounds {
                min_x: x0,
                min_y: y0,
                max_x: x1,
                max_y: y1,
            })
        }
    }
}

/// Uniform scale plus translation shared by every primitive of one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
}

impl Projection {
    /// Fit `bounds` into `[margin, size - margin]` on both axes, scaling by
    /// the larger dimension and centering the other.
    pub fn fit(bounds: &InkBounds, size: u32, margin: u32) -> Result<Self> {
        let qr_width = bounds.width();
        let qr_height = bounds.height();
        if !(qr_width > 0.0 && qr_height > 0.0) {
            return Err(Error::EmptyGeometry(format!(
                "ink bounds are {}x{}",
                qr_width, qr_height
            )));
        }

        let margin = f64::from(margin);
        let drawable = f64::from(size) - margin * 2.0;
        if drawable <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "drawable area {} is not positive",
                drawable
            )));
        }

        let scale = drawable / qr_width.max(qr_height);
        let scaled_width = qr_width * scale;
        let scaled_height = qr_height * scale;
        let projection = Projection {
            scale,
            offset_x: margin + (drawable - scaled_width) / 2.0 - bounds.min_x * scale,
            offset_y: margin + (drawable - scaled_height) / 2.0 - bounds.min_y * scale,
            scaled_width,
            scaled_height,
        };
        debug!("projection for {:?}: {:?}", bounds, projection);
        Ok(projection)
    }

    pub fn apply_x(&self, x: f64) -> f64 {
        x * self.scale + self.offset_x
    }

    pub fn apply_y(&self, y: f64) -> f64 {
        y * self.scale + self.offset_y
    }

    /// Transformed `(x, y, width, height)` of a rectangle
    pub fn apply_rect(&self, r: &RectPrimitive) -> (f64, f64, f64, f64) {
        (
            self.apply_x(r.x),
            self.apply_y(r.y),
            r.width * self.scale,
            r.height * self.scale,
        )
    }
}
