//! Built-in encoder on top of the `qrcode` crate.
//!
//! Emits the clip-path layout used by browser QR stylers: geometry lives in
//! `<clipPath>` definitions and full-canvas rects paint through them. The
//! normalizer later throws that plumbing away, but producing it here keeps
//! the extraction path identical for every encoder.

use super::{EncoderOptions, OutputType, QrEncoder};
use crate::fragment::escape_attr;
use crate::surface::{RawRendering, SurfaceSink};
use crate::{Error, Result};
use log::debug;
use qrcode::{Color, EcLevel, QrCode};
use std::fmt::Write;

/// Modules per side of a finder pattern
const FINDER_MODULES: usize = 7;

/// Top-left, top-right and bottom-left finder positions as (column, row) flags
const CORNERS: [(usize, usize); 3] = [(0, 0), (1, 0), (0, 1)];

/// Built-in encoder drawing the symbol as clip-path geometry
pub struct StyledQrEncoder {
    ec_level: EcLevel,
}

impl StyledQrEncoder {
    /// Encoder at error-correction level Q, the stylers' default
    pub fn new() -> Self {
        Self { ec_level: EcLevel::Q }
    }

    pub fn with_error_correction(ec_level: EcLevel) -> Self {
        Self { ec_level }
    }

    /// Render synchronously into clip-path SVG markup
    pub fn render_svg(&self, options: &EncoderOptions) -> Result<RawRendering> {
        if options.output != OutputType::Svg {
            return Err(Error::EncoderProduceFailure(
                "only svg output is supported".to_string(),
            ));
        }

        let code = QrCode::with_error_correction_level(options.data.as_bytes(), self.ec_level)
            .map_err(|e| Error::EncoderProduceFailure(format!("QR encode error: {}", e)))?;
        let count = code.width();

        let side = options.width.min(options.height).saturating_sub(options.margin * 2);
        let dot = (side as usize / count) as f64;
        if dot < 1.0 {
            return Err(Error::EncoderProduceFailure(format!(
                "{}x{} canvas cannot fit {} modules",
                options.width, options.height, count
            )));
        }

        let symbol = count as f64 * dot;
        let x0 = ((f64::from(options.width) - symbol) / 2.0).floor();
        let y0 = ((f64::from(options.height) - symbol) / 2.0).floor();
        let in_finder = |x: usize, y: usize| {
            let near = |v: usize| v < FINDER_MODULES;
            let far = |v: usize| v >= count - FINDER_MODULES;
            (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
        };

        let w = options.width;
        let h = options.height;
        let mut svg = String::new();
        let mut emit = || -> std::fmt::Result {
            write!(
                svg,
                r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}"><defs>"#
            )?;
            write!(
                svg,
                r#"<clipPath id="clip-path-background-color"><rect x="0" y="0" height="{h}" width="{w}"/></clipPath>"#
            )?;

            svg.push_str(r#"<clipPath id="clip-path-dot-color">"#);
            for y in 0..count {
                for x in 0..count {
                    if code[(x, y)] != Color::Dark || in_finder(x, y) {
                        continue;
                    }
                    let px = x0 + x as f64 * dot;
                    let py = y0 + y as f64 * dot;
                    write!(svg, r#"<rect x="{px}" y="{py}" width="{dot}" height="{dot}"/>"#)?;
                }
            }
            svg.push_str("</clipPath>");

            let reach = (count - FINDER_MODULES) as f64 * dot;
            for (cx, cy) in CORNERS {
                let x = x0 + cx as f64 * reach;
                let y = y0 + cy as f64 * reach;
                let outer = FINDER_MODULES as f64 * dot;
                let inner = (FINDER_MODULES - 2) as f64 * dot;
                write!(
                    svg,
                    r#"<clipPath id="clip-path-corners-square-color-{cx}-{cy}"><path clip-rule="evenodd" d="M {x} {y}v {outer}h {outer}v -{outer}zM {ix} {iy}h {inner}v {inner}h -{inner}z"/></clipPath>"#,
                    ix = x + dot,
                    iy = y + dot,
                )?;
                write!(
                    svg,
                    r#"<clipPath id="clip-path-corners-dot-color-{cx}-{cy}"><rect x="{dx}" y="{dy}" width="{s}" height="{s}"/></clipPath>"#,
                    dx = x + 2.0 * dot,
                    dy = y + 2.0 * dot,
                    s = 3.0 * dot,
                )?;
            }
            svg.push_str("</defs>");

            write!(
                svg,
                r#"<rect x="0" y="0" height="{h}" width="{w}" clip-path="url('#clip-path-background-color')" fill="{}"/>"#,
                escape_attr(&options.background_options.color)
            )?;
            write!(
                svg,
                r#"<rect x="0" y="0" height="{h}" width="{w}" clip-path="url('#clip-path-dot-color')" fill="{}"/>"#,
                escape_attr(&options.dots_options.color)
            )?;
            for (cx, cy) in CORNERS {
                write!(
                    svg,
                    r#"<rect x="0" y="0" height="{h}" width="{w}" clip-path="url('#clip-path-corners-square-color-{cx}-{cy}')" fill="{}"/>"#,
                    escape_attr(&options.corners_square_options.color)
                )?;
                write!(
                    svg,
                    r#"<rect x="0" y="0" height="{h}" width="{w}" clip-path="url('#clip-path-corners-dot-color-{cx}-{cy}')" fill="{}"/>"#,
                    escape_attr(&options.corners_dot_options.color)
                )?;
            }
            svg.push_str("</svg>");
            Ok(())
        };
        emit().map_err(|e| Error::EncoderProduceFailure(e.to_string()))?;

        debug!(
            "encoded {} modules per side at {}px per module ({} bytes of svg)",
            count,
            dot,
            svg.len()
        );
        Ok(RawRendering::new(svg).with_corner_footprint(FINDER_MODULES as f64 * dot))
    }
}

impl Default for StyledQrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrEncoder for StyledQrEncoder {
    fn append(&self, options: &EncoderOptions, sink: SurfaceSink) -> Result<()> {
        let rendering = self.render_svg(options)?;
        if !sink.complete(rendering) {
            debug!("container was torn down before the encoder finished");
        }
        Ok(())
    }
}
